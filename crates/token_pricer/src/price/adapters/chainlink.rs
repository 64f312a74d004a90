use super::{positive, PriceAdapter, QuoteContext};
use crate::chain::{Address, Call};
use crate::price::{OracleType, PriceQuote};
use ethabi::ethereum_types::H160;
use hex_literal::hex;

/// Feed registry denomination for US dollars.
pub const USD_DENOMINATION: Address = H160(hex!("0000000000000000000000000000000000000348"));

/// Chainlink feed registry lookup of the `(token, USD)` pair.
pub struct ChainlinkFeed;

impl PriceAdapter for ChainlinkFeed {
    fn oracle(&self) -> OracleType {
        OracleType::ChainlinkFeed
    }

    fn quote(&self, token: &Address, ctx: &QuoteContext<'_>) -> PriceQuote {
        let Some(registry) = ctx.available(ctx.config.chainlink.as_ref()) else {
            return PriceQuote::failed();
        };
        let answer = ctx.call_int(
            registry,
            &Call::FeedLatestAnswer {
                base: *token,
                quote: USD_DENOMINATION,
            },
        );
        let Some(answer) = answer.and_then(positive) else {
            return PriceQuote::failed();
        };
        let decimals = ctx
            .call_int(
                registry,
                &Call::FeedDecimals {
                    base: *token,
                    quote: USD_DENOMINATION,
                },
            )
            .and_then(|d| u32::try_from(&d).ok());
        match decimals {
            Some(decimals) => PriceQuote::from_raw_int(answer, decimals, Some(self.oracle())),
            None => PriceQuote::failed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::CallValue;
    use crate::config::{ChainConfig, OracleContract};
    use crate::price::adapters::testing::TableReader;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn config(registry: Address) -> ChainConfig {
        let mut config = ChainConfig::template();
        config.chainlink = Some(OracleContract::new(registry, 100));
        config
    }

    #[test]
    fn answer_scaled_by_feed_decimals() {
        let registry = Address::repeat_byte(0x47);
        let token = Address::repeat_byte(0x09);
        let reader = TableReader::default()
            .with(
                registry,
                Call::FeedLatestAnswer {
                    base: token,
                    quote: USD_DENOMINATION,
                },
                CallValue::Int(250_000_000u64.into()),
            )
            .with(
                registry,
                Call::FeedDecimals {
                    base: token,
                    quote: USD_DENOMINATION,
                },
                CallValue::Int(8.into()),
            );
        let config = config(registry);
        let q = ChainlinkFeed.quote(&token, &QuoteContext::new(&config, &reader, Some(200)));
        assert_eq!(q.usd_price(), Some(BigDecimal::from_str("2.5").unwrap()));
        assert_eq!(q.decimals(), 8);
    }

    #[test]
    fn unregistered_pair_fails_after_one_call() {
        let registry = Address::repeat_byte(0x47);
        let config = config(registry);
        let reader = TableReader::default();
        let q = ChainlinkFeed.quote(
            &Address::repeat_byte(0x01),
            &QuoteContext::new(&config, &reader, Some(200)),
        );
        assert!(q.is_reverted());
        assert_eq!(reader.call_count(), 1);
    }

    #[test]
    fn negative_answer_fails() {
        let registry = Address::repeat_byte(0x47);
        let token = Address::repeat_byte(0x02);
        let reader = TableReader::default().with(
            registry,
            Call::FeedLatestAnswer {
                base: token,
                quote: USD_DENOMINATION,
            },
            CallValue::Int((-5).into()),
        );
        let config = config(registry);
        let q = ChainlinkFeed.quote(&token, &QuoteContext::new(&config, &reader, None));
        assert!(q.is_reverted());
    }
}
