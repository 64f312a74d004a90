//! Consensus over several successful quotes: keep the tightest cluster, then average it.

use super::{PriceQuote, DEFAULT_USDC_DECIMALS};
use bigdecimal::BigDecimal;
use std::collections::BTreeSet;

/// Quotes bounding the `k` smallest gaps between adjacent sorted prices.
///
/// Failed quotes are dropped first. With fewer than two prices or `k == 0` the
/// successful input is returned as is. Equal gaps are taken in price order and
/// `k` is clamped to the number of gaps. The result is sorted by price.
pub fn k_closest_prices(quotes: &[PriceQuote], k: usize) -> Vec<PriceQuote> {
    let mut priced: Vec<(BigDecimal, &PriceQuote)> = quotes
        .iter()
        .filter_map(|q| q.usd_price().map(|p| (p, q)))
        .collect();
    priced.sort_by(|a, b| a.0.cmp(&b.0));
    if priced.len() <= 1 || k == 0 {
        return priced.into_iter().map(|(_, q)| q.clone()).collect();
    }

    let mut gaps: Vec<(BigDecimal, usize)> = priced
        .windows(2)
        .enumerate()
        .map(|(i, w)| (&w[1].0 - &w[0].0, i))
        .collect();
    gaps.sort();

    let keep: BTreeSet<usize> = gaps
        .iter()
        .take(k.min(gaps.len()))
        .flat_map(|(_, i)| [*i, i + 1])
        .collect();
    keep.into_iter().map(|i| priced[i].1.clone()).collect()
}

/// Mean of the usable quotes at USDC scale. Failed and zero quotes are ignored;
/// nothing usable yields a failed quote.
pub fn average_price(quotes: &[PriceQuote]) -> PriceQuote {
    let prices: Vec<BigDecimal> = quotes
        .iter()
        .filter_map(PriceQuote::usd_price)
        .filter(|p| *p != BigDecimal::from(0))
        .collect();
    if prices.is_empty() {
        return PriceQuote::failed();
    }
    let count = BigDecimal::from(prices.len() as u64);
    let sum: BigDecimal = prices.iter().sum();
    let mean = (sum / count).with_scale(i64::from(DEFAULT_USDC_DECIMALS));
    PriceQuote::from_usd(&mean, DEFAULT_USDC_DECIMALS, None)
}

/// Average of the `k`-closest cluster.
pub fn consensus_price(quotes: &[PriceQuote], k: usize) -> PriceQuote {
    average_price(&k_closest_prices(quotes, k))
}
