//! Oracle adapters. Each turns a token address into a [`PriceQuote`] attempt.
//!
//! Adapters never return errors: reverts, missing contracts, blacklist hits and
//! pre-deployment blocks all yield [`PriceQuote::failed`].

mod aave;
mod calculations;
mod chainlink;
mod curve_router;
mod uniswap_forks;
mod yearn_lens;

pub use aave::AaveOracle;
pub use calculations::{CurveCalculations, SushiCalculations};
pub use chainlink::{ChainlinkFeed, USD_DENOMINATION};
pub use curve_router::{preferred_coin, CurveRouter};
pub use uniswap_forks::UniswapForksRouter;
pub use yearn_lens::YearnLensOracle;

use crate::chain::{Address, Call, CallValue, ContractReader};
use crate::config::{ChainConfig, OracleContract};
use crate::price::{OracleType, PriceQuote};
use num_bigint::{BigInt, Sign};
use tracing::debug;

/// Nested price lookups, used by adapters that price a token from another token.
pub trait PriceSource {
    fn nested_price(&self, token: &Address, block: Option<u64>, depth: u8) -> PriceQuote;
}

/// Source that knows no prices.
pub struct NoPrices;

impl PriceSource for NoPrices {
    fn nested_price(&self, _token: &Address, _block: Option<u64>, _depth: u8) -> PriceQuote {
        PriceQuote::failed()
    }
}

/// Everything an adapter may consult for one quote.
pub struct QuoteContext<'a> {
    pub config: &'a ChainConfig,
    pub reader: &'a dyn ContractReader,
    pub block: Option<u64>,
    pub prices: &'a dyn PriceSource,
    /// Nesting level of this lookup; zero for a top-level request.
    pub depth: u8,
}

impl<'a> QuoteContext<'a> {
    pub fn new(
        config: &'a ChainConfig,
        reader: &'a dyn ContractReader,
        block: Option<u64>,
    ) -> Self {
        Self {
            config,
            reader,
            block,
            prices: &NoPrices,
            depth: 0,
        }
    }

    /// Address of `contract` if configured and deployed at the query block.
    pub fn available(&self, contract: Option<&OracleContract>) -> Option<Address> {
        let contract = contract?;
        if contract.available_at(self.block) {
            Some(contract.address)
        } else {
            debug!(
                contract = ?contract.address,
                block = ?self.block,
                "contract not yet deployed"
            );
            None
        }
    }

    pub fn call(&self, contract: Address, call: &Call) -> Option<CallValue> {
        match self.reader.try_call(contract, call, self.block) {
            Ok(v) => Some(v),
            Err(e) => {
                debug!(contract = ?contract, call = call.name(), error = %e, "call failed");
                None
            }
        }
    }

    pub fn call_int(&self, contract: Address, call: &Call) -> Option<BigInt> {
        self.call(contract, call)?.into_int().ok()
    }
}

/// One price source.
pub trait PriceAdapter: Send + Sync {
    fn oracle(&self) -> OracleType;
    fn quote(&self, token: &Address, ctx: &QuoteContext<'_>) -> PriceQuote;
}

/// One adapter per [`OracleType`].
pub fn default_adapters() -> Vec<Box<dyn PriceAdapter>> {
    vec![
        Box::new(YearnLensOracle),
        Box::new(ChainlinkFeed),
        Box::new(CurveCalculations),
        Box::new(SushiCalculations),
        Box::new(CurveRouter),
        Box::new(UniswapForksRouter),
        Box::new(AaveOracle),
    ]
}

/// Zero and negative answers carry no price.
pub(crate) fn positive(v: BigInt) -> Option<BigInt> {
    (v.sign() == Sign::Plus).then_some(v)
}

/// Shared shape of the single-call oracles: blacklist, deployment guard, one integer answer.
pub(crate) fn single_call_quote(
    ctx: &QuoteContext<'_>,
    oracle: OracleType,
    contract: Option<&OracleContract>,
    blacklisted: bool,
    call: Call,
    decimals: u32,
) -> PriceQuote {
    if blacklisted {
        return PriceQuote::failed();
    }
    let Some(address) = ctx.available(contract) else {
        return PriceQuote::failed();
    };
    match ctx.call_int(address, &call).and_then(positive) {
        Some(raw) => PriceQuote::from_raw_int(raw, decimals, Some(oracle)),
        None => PriceQuote::failed(),
    }
}
