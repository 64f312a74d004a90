use super::{single_call_quote, PriceAdapter, QuoteContext};
use crate::chain::{Address, Call};
use crate::price::{OracleType, PriceQuote};

/// Yearn lens oracle: `getPriceUsdcRecommended`, answered in USDC decimals.
pub struct YearnLensOracle;

impl PriceAdapter for YearnLensOracle {
    fn oracle(&self) -> OracleType {
        OracleType::YearnLensOracle
    }

    fn quote(&self, token: &Address, ctx: &QuoteContext<'_>) -> PriceQuote {
        let config = ctx.config;
        single_call_quote(
            ctx,
            self.oracle(),
            config.yearn_lens.as_ref(),
            config.yearn_lens_blacklist.contains(token),
            Call::PriceUsdcRecommended { token: *token },
            config.usdc_decimals,
        )
    }
}
