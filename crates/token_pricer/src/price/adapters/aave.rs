use super::{single_call_quote, PriceAdapter, QuoteContext};
use crate::chain::{Address, Call};
use crate::price::{OracleType, PriceQuote};

/// Lending-pool price oracle answers carry 8 decimals.
pub const AAVE_ORACLE_DECIMALS: u32 = 8;

pub struct AaveOracle;

impl PriceAdapter for AaveOracle {
    fn oracle(&self) -> OracleType {
        OracleType::AaveOracle
    }

    fn quote(&self, token: &Address, ctx: &QuoteContext<'_>) -> PriceQuote {
        let config = ctx.config;
        single_call_quote(
            ctx,
            self.oracle(),
            config.aave_oracle.as_ref(),
            config.aave_oracle_blacklist.contains(token),
            Call::AssetPrice { asset: *token },
            AAVE_ORACLE_DECIMALS,
        )
    }
}
