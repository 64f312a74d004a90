//! Curve LP tokens priced as virtual price times the price of a preferred underlying coin.

use super::{positive, PriceAdapter, QuoteContext};
use crate::chain::{Address, Call};
use crate::price::{OracleType, PriceQuote};
use bigdecimal::BigDecimal;
use tracing::debug;

pub const VIRTUAL_PRICE_DECIMALS: u32 = 18;

/// Registry pools expose at most eight underlying coins.
const MAX_COINS: usize = 8;

/// Last coin of the first contiguous run of non-zero coins.
pub fn preferred_coin(coins: &[Address]) -> Option<Address> {
    coins
        .iter()
        .take(MAX_COINS)
        .skip_while(|c| c.is_zero())
        .take_while(|c| !c.is_zero())
        .last()
        .copied()
}

pub struct CurveRouter;

impl CurveRouter {
    fn price(&self, lp: &Address, ctx: &QuoteContext<'_>) -> Option<PriceQuote> {
        let registries: Vec<Address> = ctx
            .config
            .curve_registries
            .iter()
            .filter_map(|r| ctx.available(Some(r)))
            .collect();
        if registries.is_empty() {
            return None;
        }

        let pool = registries.iter().find_map(|r| {
            ctx.call(*r, &Call::PoolFromLpToken { lp: *lp })
                .and_then(|v| v.into_address().ok())
                .filter(|p| !p.is_zero())
        })?;
        let coin = registries
            .iter()
            .find_map(|r| {
                ctx.call(*r, &Call::UnderlyingCoins { pool })
                    .and_then(|v| v.into_addresses().ok())
                    .filter(|coins| !coins.is_empty())
            })
            .and_then(|coins| preferred_coin(&coins))?;
        if coin == *lp {
            debug!(lp = ?lp, "underlying coin is the lp token itself");
            return None;
        }

        let base = ctx
            .prices
            .nested_price(&coin, ctx.block, ctx.depth + 1)
            .usd_price()?;
        let virtual_price = registries
            .iter()
            .find_map(|r| ctx.call_int(*r, &Call::VirtualPriceFromLpToken { lp: *lp }))
            .and_then(positive)?;

        Some(PriceQuote::initialize(
            BigDecimal::from(virtual_price) * base,
            VIRTUAL_PRICE_DECIMALS,
            Some(self.oracle()),
        ))
    }
}

impl PriceAdapter for CurveRouter {
    fn oracle(&self) -> OracleType {
        OracleType::CurveRouter
    }

    fn quote(&self, token: &Address, ctx: &QuoteContext<'_>) -> PriceQuote {
        self.price(token, ctx).unwrap_or_else(PriceQuote::failed)
    }
}
