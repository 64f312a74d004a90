//! Helper contracts that compute a USDC price on-chain.

use super::{single_call_quote, PriceAdapter, QuoteContext};
use crate::chain::{Address, Call};
use crate::price::{OracleType, PriceQuote};

/// `getCurvePriceUsdc(lp)` on the Curve calculations contract.
pub struct CurveCalculations;

/// `getPriceUsdc(token)` on the Sushi calculations contract.
pub struct SushiCalculations;

impl PriceAdapter for CurveCalculations {
    fn oracle(&self) -> OracleType {
        OracleType::CurveCalculations
    }

    fn quote(&self, token: &Address, ctx: &QuoteContext<'_>) -> PriceQuote {
        let config = ctx.config;
        single_call_quote(
            ctx,
            self.oracle(),
            config.curve_calculations.as_ref(),
            config.curve_calculations_blacklist.contains(token),
            Call::CurvePriceUsdc { lp: *token },
            config.usdc_decimals,
        )
    }
}

impl PriceAdapter for SushiCalculations {
    fn oracle(&self) -> OracleType {
        OracleType::SushiCalculations
    }

    fn quote(&self, token: &Address, ctx: &QuoteContext<'_>) -> PriceQuote {
        let config = ctx.config;
        single_call_quote(
            ctx,
            self.oracle(),
            config.sushi_calculations.as_ref(),
            config.sushi_calculations_blacklist.contains(token),
            Call::PriceUsdc { token: *token },
            config.usdc_decimals,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::CallValue;
    use crate::config::{ChainConfig, OracleContract};
    use crate::price::adapters::testing::TableReader;
    use bigdecimal::BigDecimal;

    #[test]
    fn curve_and_sushi_use_their_own_call() {
        let curve = Address::repeat_byte(0xc0);
        let sushi = Address::repeat_byte(0x50);
        let token = Address::repeat_byte(0x01);
        let mut config = ChainConfig::template();
        config.curve_calculations = Some(OracleContract::new(curve, 0));
        config.sushi_calculations = Some(OracleContract::new(sushi, 0));
        let reader = TableReader::default()
            .with(curve, Call::CurvePriceUsdc { lp: token }, CallValue::Int(3_000_000.into()))
            .with(sushi, Call::PriceUsdc { token }, CallValue::Int(0.into()));
        let ctx = QuoteContext::new(&config, &reader, Some(10));
        assert_eq!(
            CurveCalculations.quote(&token, &ctx).usd_price(),
            Some(BigDecimal::from(3))
        );
        // zero answer is no answer
        assert!(SushiCalculations.quote(&token, &ctx).is_reverted());
    }

    #[test]
    fn curve_blacklist() {
        let curve = Address::repeat_byte(0xc0);
        let token = Address::repeat_byte(0x02);
        let mut config = ChainConfig::template();
        config.curve_calculations = Some(OracleContract::new(curve, 0));
        config.curve_calculations_blacklist.insert(token);
        let reader = TableReader::default();
        assert!(CurveCalculations
            .quote(&token, &QuoteContext::new(&config, &reader, None))
            .is_reverted());
        assert_eq!(reader.call_count(), 0);
    }
}
