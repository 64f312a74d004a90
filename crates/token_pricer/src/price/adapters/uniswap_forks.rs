use super::{positive, PriceAdapter, QuoteContext};
use crate::chain::{Address, Call};
use crate::price::{OracleType, PriceQuote};
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use tracing::debug;

/// Used when a token's `decimals()` reverts.
pub const DEFAULT_TOKEN_DECIMALS: u32 = 18;

/// Largest exponent for which `10^decimals` fits in a uint256.
const MAX_DECIMALS: u8 = 77;

/// Swap fee per hop, in basis points.
const FEE_BIPS: u32 = 30;
const BIPS: u32 = 10_000;

/// Quotes one whole token through Uniswap V2 style routers into USDC.
pub struct UniswapForksRouter;

impl UniswapForksRouter {
    fn path(token: Address, weth: Address, usdc: Address) -> Vec<Address> {
        if token == weth {
            vec![weth, usdc]
        } else {
            vec![token, weth, usdc]
        }
    }

    /// `decimals()` of `token`, or the default when it reverts.
    /// `None` when the answer is too large to be a real token's decimals.
    fn token_decimals(token: Address, ctx: &QuoteContext<'_>) -> Option<u32> {
        match ctx.call_int(token, &Call::Decimals) {
            None => Some(DEFAULT_TOKEN_DECIMALS),
            Some(d) => bounded_decimals(&d),
        }
    }

    /// A pair answers `factory()`; plain tokens revert.
    fn is_pair(token: Address, ctx: &QuoteContext<'_>) -> bool {
        ctx.call(token, &Call::Factory)
            .and_then(|v| v.into_address().ok())
            .is_some_and(|f| !f.is_zero())
    }

    fn pair_token(pair: Address, call: &Call, ctx: &QuoteContext<'_>) -> Option<Address> {
        ctx.call(pair, call)
            .and_then(|v| v.into_address().ok())
            .filter(|t| !t.is_zero())
    }

    /// USD value of both reserves, each side priced through the full cascade.
    fn pair_liquidity(pair: Address, ctx: &QuoteContext<'_>) -> Option<BigDecimal> {
        let token0 = Self::pair_token(pair, &Call::Token0, ctx)?;
        let token1 = Self::pair_token(pair, &Call::Token1, ctx)?;
        let decimals0 = Self::token_decimals(token0, ctx)?;
        let decimals1 = Self::token_decimals(token1, ctx)?;
        let reserves = ctx.call(pair, &Call::Reserves)?.into_ints().ok()?;
        let (reserve0, reserve1) = match reserves.as_slice() {
            [r0, r1, ..] => (r0.clone(), r1.clone()),
            _ => return None,
        };
        if reserve0 == BigInt::from(0) && reserve1 == BigInt::from(0) {
            return None;
        }

        let price0 = ctx
            .prices
            .nested_price(&token0, ctx.block, ctx.depth + 1)
            .usd_price()?;
        let price1 = ctx
            .prices
            .nested_price(&token1, ctx.block, ctx.depth + 1)
            .usd_price()?;
        let side0 = BigDecimal::new(reserve0, i64::from(decimals0)) * price0;
        let side1 = BigDecimal::new(reserve1, i64::from(decimals1)) * price1;
        Some(side0 + side1)
    }

    /// Pool liquidity divided by the whole-token LP supply.
    fn pair_price(&self, pair: Address, ctx: &QuoteContext<'_>) -> Option<PriceQuote> {
        let supply = ctx.call_int(pair, &Call::TotalSupply).and_then(positive)?;
        let liquidity = Self::pair_liquidity(pair, ctx)?;
        let pair_decimals = ctx
            .call_int(pair, &Call::Decimals)
            .and_then(|d| bounded_decimals(&d))?;
        let supply = BigDecimal::new(supply, i64::from(pair_decimals));
        let decimals = ctx.config.usdc_decimals;
        let price = (liquidity / supply).with_scale(i64::from(decimals));
        Some(PriceQuote::from_usd(&price, decimals, Some(self.oracle())))
    }

    /// Undo the per-hop fee so the quote reflects price rather than execution.
    fn without_fees(amount_out: BigInt, hops: usize) -> BigInt {
        let fees = FEE_BIPS * u32::try_from(hops).unwrap_or(u32::MAX / FEE_BIPS);
        amount_out * BigInt::from(BIPS) / BigInt::from(BIPS.saturating_sub(fees).max(1))
    }
}

fn bounded_decimals(raw: &BigInt) -> Option<u32> {
    u8::try_from(raw)
        .ok()
        .filter(|d| *d <= MAX_DECIMALS)
        .map(u32::from)
}

impl PriceAdapter for UniswapForksRouter {
    fn oracle(&self) -> OracleType {
        OracleType::UniswapForksRouter
    }

    fn quote(&self, token: &Address, ctx: &QuoteContext<'_>) -> PriceQuote {
        let config = ctx.config;
        let routers: Vec<Address> = config
            .uniswap_forks
            .iter()
            .filter_map(|r| ctx.available(Some(r)))
            .collect();
        if routers.is_empty() {
            return PriceQuote::failed();
        }
        if *token != config.weth_address && Self::is_pair(*token, ctx) {
            return self
                .pair_price(*token, ctx)
                .unwrap_or_else(PriceQuote::failed);
        }

        let Some(decimals) = Self::token_decimals(*token, ctx) else {
            debug!(token = ?token, "decimals out of range");
            return PriceQuote::failed();
        };
        let amount_in = BigInt::from(10u32).pow(decimals);
        let path = Self::path(*token, config.weth_address, config.usdc_address);
        let hops = path.len() - 1;
        let call = Call::AmountsOut { amount_in, path };

        for router in routers {
            let out = ctx
                .call(router, &call)
                .and_then(|v| v.into_ints().ok())
                .and_then(|amounts| amounts.last().cloned())
                .and_then(positive);
            if let Some(out) = out {
                return PriceQuote::from_raw_int(
                    Self::without_fees(out, hops),
                    config.usdc_decimals,
                    Some(self.oracle()),
                );
            }
        }
        PriceQuote::failed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::CallValue;
    use crate::config::{ChainConfig, OracleContract};
    use crate::price::adapters::testing::TableReader;
    use crate::price::adapters::PriceSource;
    use std::collections::HashMap;

    struct Setup {
        config: ChainConfig,
        first: Address,
        second: Address,
        token: Address,
    }

    fn setup() -> Setup {
        let first = Address::repeat_byte(0xd9);
        let second = Address::repeat_byte(0x7a);
        let mut config = ChainConfig::template();
        config.weth_address = Address::repeat_byte(0xee);
        config.usdc_address = Address::repeat_byte(0xa0);
        config.uniswap_forks = vec![
            OracleContract::new(first, 100),
            OracleContract::new(second, 50),
        ];
        Setup {
            config,
            first,
            second,
            token: Address::repeat_byte(0x33),
        }
    }

    fn amounts_call(s: &Setup, decimals: u32) -> Call {
        Call::AmountsOut {
            amount_in: BigInt::from(10u32).pow(decimals),
            path: vec![s.token, s.config.weth_address, s.config.usdc_address],
        }
    }

    #[test]
    fn falls_through_to_second_router_and_removes_fees() {
        let s = setup();
        // 2 hops: 9_940_000 * 10000 / 9940 = 10_000_000
        let reader = TableReader::default()
            .with(s.token, Call::Decimals, CallValue::Int(18.into()))
            .with(
                s.first,
                amounts_call(&s, 18),
                CallValue::Ints(vec![1.into(), 5.into(), 0.into()]),
            )
            .with(
                s.second,
                amounts_call(&s, 18),
                CallValue::Ints(vec![1.into(), 5.into(), 9_940_000.into()]),
            );
        let ctx = QuoteContext::new(&s.config, &reader, Some(200));
        let q = UniswapForksRouter.quote(&s.token, &ctx);
        assert_eq!(q.usd_price(), Some(BigDecimal::from(10)));
    }

    #[test]
    fn only_deployed_routers_are_tried() {
        let s = setup();
        let reader = TableReader::default().with(
            s.first,
            amounts_call(&s, 18),
            CallValue::Ints(vec![1.into(), 9_940_000.into()]),
        );
        let ctx = QuoteContext::new(&s.config, &reader, Some(60));
        let q = UniswapForksRouter.quote(&s.token, &ctx);
        assert!(q.is_reverted());
        let calls = reader.calls.lock().unwrap();
        assert!(calls.iter().all(|(c, _)| *c != s.first));
    }

    #[test]
    fn weth_uses_direct_path() {
        let s = setup();
        let weth = s.config.weth_address;
        let call = Call::AmountsOut {
            amount_in: BigInt::from(10u32).pow(6),
            path: vec![weth, s.config.usdc_address],
        };
        // 1 hop: 2_994_000_000 * 10000 / 9970 = 3_003_009_027
        let reader = TableReader::default()
            .with(weth, Call::Decimals, CallValue::Int(6.into()))
            .with(
                s.first,
                call,
                CallValue::Ints(vec![1.into(), 2_994_000_000u64.into()]),
            );
        let q = UniswapForksRouter.quote(&weth, &QuoteContext::new(&s.config, &reader, None));
        assert_eq!(q.raw_price(), &BigDecimal::from(3_003_009_027u64));
    }

    #[test]
    fn oversized_decimals_fail_before_quoting() {
        let s = setup();
        for decimals in [78u64, 20_000_000] {
            let reader = TableReader::default().with(
                s.token,
                Call::Decimals,
                CallValue::Int(decimals.into()),
            );
            let ctx = QuoteContext::new(&s.config, &reader, Some(200));
            let q = UniswapForksRouter.quote(&s.token, &ctx);
            assert!(q.is_reverted());
            let calls = reader.calls.lock().unwrap();
            assert!(calls
                .iter()
                .all(|(_, c)| !matches!(c, Call::AmountsOut { .. })));
        }
    }

    #[test]
    fn decimals_bounds() {
        assert_eq!(bounded_decimals(&BigInt::from(77)), Some(77));
        assert_eq!(bounded_decimals(&BigInt::from(78)), None);
        assert_eq!(bounded_decimals(&BigInt::from(-1)), None);
        assert_eq!(bounded_decimals(&BigInt::from(u64::MAX)), None);
    }

    struct TablePrices(HashMap<Address, PriceQuote>);

    impl PriceSource for TablePrices {
        fn nested_price(&self, token: &Address, _block: Option<u64>, _depth: u8) -> PriceQuote {
            self.0.get(token).cloned().unwrap_or_else(PriceQuote::failed)
        }
    }

    /// Pair of a 6-decimal dollar token and an 18-decimal token worth 2000.
    fn pair_setup(pair: Address) -> (TableReader, TablePrices) {
        let usd = Address::repeat_byte(0x0a);
        let eth = Address::repeat_byte(0x0b);
        let reader = TableReader::default()
            .with(pair, Call::Factory, CallValue::Address(Address::repeat_byte(0xfa)))
            .with(pair, Call::Token0, CallValue::Address(usd))
            .with(pair, Call::Token1, CallValue::Address(eth))
            .with(usd, Call::Decimals, CallValue::Int(6.into()))
            .with(eth, Call::Decimals, CallValue::Int(18.into()))
            .with(
                pair,
                Call::Reserves,
                CallValue::Ints(vec![
                    2_000_000_000u64.into(),
                    1_000_000_000_000_000_000u64.into(),
                    1_700_000_000u64.into(),
                ]),
            )
            .with(
                pair,
                Call::TotalSupply,
                CallValue::Int(2_000_000_000_000_000_000u64.into()),
            )
            .with(pair, Call::Decimals, CallValue::Int(18.into()));
        let prices = TablePrices(HashMap::from([
            (usd, PriceQuote::one_usd()),
            (eth, PriceQuote::from_usd(&BigDecimal::from(2_000), 6, None)),
        ]));
        (reader, prices)
    }

    #[test]
    fn lp_token_priced_from_reserves() {
        let s = setup();
        let pair = Address::repeat_byte(0x5a);
        let (reader, prices) = pair_setup(pair);
        let ctx = QuoteContext {
            prices: &prices,
            ..QuoteContext::new(&s.config, &reader, Some(200))
        };
        // (2000 * 1 + 1 * 2000) / 2 LP tokens
        let q = UniswapForksRouter.quote(&pair, &ctx);
        assert_eq!(q.usd_price(), Some(BigDecimal::from(2_000)));
        assert_eq!(q.oracle(), Some(OracleType::UniswapForksRouter));
        let calls = reader.calls.lock().unwrap();
        assert!(calls
            .iter()
            .all(|(_, c)| !matches!(c, Call::AmountsOut { .. })));
    }

    #[test]
    fn lp_token_needs_both_prices() {
        let s = setup();
        let pair = Address::repeat_byte(0x5a);
        let (reader, mut prices) = pair_setup(pair);
        prices.0.remove(&Address::repeat_byte(0x0b));
        let ctx = QuoteContext {
            prices: &prices,
            ..QuoteContext::new(&s.config, &reader, Some(200))
        };
        assert!(UniswapForksRouter.quote(&pair, &ctx).is_reverted());
    }

    #[test]
    fn empty_pair_fails() {
        let s = setup();
        let pair = Address::repeat_byte(0x5a);
        let (reader, prices) = pair_setup(pair);
        let reader = reader.with(
            pair,
            Call::Reserves,
            CallValue::Ints(vec![0.into(), 0.into(), 1.into()]),
        );
        let ctx = QuoteContext {
            prices: &prices,
            ..QuoteContext::new(&s.config, &reader, Some(200))
        };
        assert!(UniswapForksRouter.quote(&pair, &ctx).is_reverted());
    }

    #[test]
    fn no_routers_no_calls() {
        let config = ChainConfig::template();
        let reader = TableReader::default();
        let q = UniswapForksRouter.quote(
            &Address::repeat_byte(1),
            &QuoteContext::new(&config, &reader, None),
        );
        assert!(q.is_reverted());
        assert_eq!(reader.call_count(), 0);
    }
}
