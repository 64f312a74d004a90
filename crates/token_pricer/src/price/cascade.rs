//! Ordered fallback over the oracle adapters.

use super::adapters::{default_adapters, PriceAdapter, PriceSource, QuoteContext};
use super::aggregate::consensus_price;
use super::{OracleOrder, OracleType, PriceQuote};
use crate::chain::{Address, ContractReader};
use crate::config::ChainConfig;
use bigdecimal::BigDecimal;
use tracing::{debug, warn};

/// Deepest chain of nested lookups (an LP token priced from its underlying coin, and so on).
const MAX_NESTING: u8 = 3;

/// Outcome of the checks that run before any adapter.
enum Plan<'c> {
    Done(PriceQuote),
    Run {
        token: Address,
        order: &'c OracleOrder,
    },
}

/// Resolves USD prices for one chain through a [`ContractReader`].
pub struct Resolver<R> {
    config: ChainConfig,
    reader: R,
    adapters: Vec<Box<dyn PriceAdapter>>,
}

impl<R: ContractReader> Resolver<R> {
    pub fn new(config: ChainConfig, reader: R) -> Self {
        Self {
            config,
            reader,
            adapters: default_adapters(),
        }
    }

    /// Replace the adapter set. Oracles in an order with no adapter are skipped.
    pub fn with_adapters(mut self, adapters: Vec<Box<dyn PriceAdapter>>) -> Self {
        self.adapters = adapters;
        self
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// USD price of `token` at `block`; a failed quote when no source has one.
    pub fn resolve(&self, token: &Address, block: Option<u64>) -> PriceQuote {
        self.resolve_nested(token, block, 0)
    }

    /// `amount` (already scaled by token decimals) times the price; zero when unpriced.
    pub fn usd_value(
        &self,
        token: &Address,
        amount: &BigDecimal,
        block: Option<u64>,
    ) -> BigDecimal {
        match self.resolve(token, block).usd_price() {
            Some(price) => price * amount,
            None => BigDecimal::from(0),
        }
    }

    /// Every adapter of the effective order, tried regardless of earlier successes.
    /// Empty when the token is settled before any adapter runs.
    pub fn attempts(
        &self,
        token: &Address,
        block: Option<u64>,
    ) -> Vec<(OracleType, PriceQuote)> {
        let Plan::Run { token, order } = self.plan(token, block) else {
            return Vec::new();
        };
        let ctx = self.context(block, 0);
        order
            .order
            .iter()
            .filter_map(|kind| self.adapter(*kind))
            .map(|adapter| (adapter.oracle(), adapter.quote(&token, &ctx)))
            .collect()
    }

    /// Runs every adapter and averages the `k`-closest successful quotes.
    pub fn resolve_consensus(&self, token: &Address, block: Option<u64>, k: usize) -> PriceQuote {
        let (token, order) = match self.plan(token, block) {
            Plan::Done(q) => return q,
            Plan::Run { token, order } => (token, order),
        };
        let ctx = self.context(block, 0);
        let mut found: Vec<PriceQuote> = order
            .order
            .iter()
            .filter_map(|kind| self.adapter(*kind))
            .map(|adapter| adapter.quote(&token, &ctx))
            .filter(|q| !q.is_reverted())
            .collect();
        match found.len() {
            0 => PriceQuote::failed(),
            1 => found.pop().unwrap_or_default(),
            _ => consensus_price(&found, k),
        }
    }

    /// [`Resolver::resolve`] plus the adapters it tried on the way, in order.
    /// Shortcut tokens come back with no attempts.
    pub fn resolve_traced(
        &self,
        token: &Address,
        block: Option<u64>,
    ) -> (PriceQuote, Vec<(OracleType, PriceQuote)>) {
        match self.plan(token, block) {
            Plan::Done(q) => (q, Vec::new()),
            Plan::Run { token, order } => self.run(&token, block, order, 0),
        }
    }

    fn resolve_nested(&self, token: &Address, block: Option<u64>, depth: u8) -> PriceQuote {
        match self.plan(token, block) {
            Plan::Done(q) => q,
            Plan::Run { token, order } => self.run(&token, block, order, depth).0,
        }
    }

    fn plan(&self, token: &Address, block: Option<u64>) -> Plan<'_> {
        let config = &self.config;
        if token.is_zero() || config.ignore_list.contains(token) {
            return Plan::Done(PriceQuote::failed());
        }
        if config.is_template() {
            warn!(
                network = %config.network,
                token = ?token,
                "no chain config, price unavailable"
            );
            return Plan::Done(PriceQuote::failed());
        }
        let token = if *token == config.eth_address {
            config.weth_address
        } else {
            *token
        };
        if config.hardcoded_stables.contains(&token) {
            return Plan::Done(PriceQuote::one_usd());
        }
        Plan::Run {
            token,
            order: config.effective_order(&token, block),
        }
    }

    fn run(
        &self,
        token: &Address,
        block: Option<u64>,
        order: &OracleOrder,
        depth: u8,
    ) -> (PriceQuote, Vec<(OracleType, PriceQuote)>) {
        let ctx = self.context(block, depth);
        let wanted = order.count.max(1);
        let mut tried = Vec::new();
        let mut found = Vec::with_capacity(wanted);
        for kind in &order.order {
            let Some(adapter) = self.adapter(*kind) else {
                continue;
            };
            let quote = adapter.quote(token, &ctx);
            tried.push((*kind, quote.clone()));
            if quote.is_reverted() {
                warn!(token = ?token, oracle = %kind, block = ?block, "price attempt failed");
                continue;
            }
            debug!(token = ?token, oracle = %kind, block = ?block, "price found");
            found.push(quote);
            if found.len() >= wanted {
                break;
            }
        }
        let quote = match found.len() {
            0 => {
                warn!(token = ?token, block = ?block, "all price sources failed");
                PriceQuote::failed()
            }
            1 => found.pop().unwrap_or_default(),
            _ => consensus_price(&found, order.k()),
        };
        (quote, tried)
    }

    fn context(&self, block: Option<u64>, depth: u8) -> QuoteContext<'_> {
        QuoteContext {
            config: &self.config,
            reader: &self.reader,
            block,
            prices: self,
            depth,
        }
    }

    fn adapter(&self, kind: OracleType) -> Option<&dyn PriceAdapter> {
        self.adapters
            .iter()
            .find(|a| a.oracle() == kind)
            .map(|a| a.as_ref())
    }
}

impl<R: ContractReader> PriceSource for Resolver<R> {
    fn nested_price(&self, token: &Address, block: Option<u64>, depth: u8) -> PriceQuote {
        if depth > MAX_NESTING {
            debug!(token = ?token, depth, "nesting limit reached");
            return PriceQuote::failed();
        }
        self.resolve_nested(token, block, depth)
    }
}
