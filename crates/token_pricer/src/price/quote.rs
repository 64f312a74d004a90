//! Price quote value object and oracle identifiers.

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scale of USDC-denominated oracle answers, and of stable and consensus quotes.
pub const DEFAULT_USDC_DECIMALS: u32 = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleType {
    YearnLensOracle,
    ChainlinkFeed,
    CurveCalculations,
    SushiCalculations,
    CurveRouter,
    UniswapForksRouter,
    AaveOracle,
}

impl OracleType {
    pub const ALL: [OracleType; 7] = [
        OracleType::YearnLensOracle,
        OracleType::ChainlinkFeed,
        OracleType::CurveCalculations,
        OracleType::SushiCalculations,
        OracleType::CurveRouter,
        OracleType::UniswapForksRouter,
        OracleType::AaveOracle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OracleType::YearnLensOracle => "yearn_lens_oracle",
            OracleType::ChainlinkFeed => "chainlink_feed",
            OracleType::CurveCalculations => "curve_calculations",
            OracleType::SushiCalculations => "sushi_calculations",
            OracleType::CurveRouter => "curve_router",
            OracleType::UniswapForksRouter => "uniswap_forks_router",
            OracleType::AaveOracle => "aave_oracle",
        }
    }
}

impl fmt::Display for OracleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OracleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        OracleType::ALL
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown oracle type: {}", s))
    }
}

/// Adapter priority and how many successful quotes to gather before stopping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleOrder {
    pub count: usize,
    pub order: Vec<OracleType>,
}

impl OracleOrder {
    pub fn first_success(order: Vec<OracleType>) -> Self {
        Self { count: 1, order }
    }

    /// Cluster size used when more than one quote is gathered.
    pub fn k(&self) -> usize {
        self.count.div_ceil(2).max(1)
    }
}

/// Result of one price attempt.
///
/// The raw price is stored at its oracle's fixed-point scale; `usd_price` applies
/// `decimals`. A reverted quote exposes no price at all.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceQuote {
    reverted: bool,
    raw_price: BigDecimal,
    decimals: u32,
    oracle: Option<OracleType>,
}

impl Default for PriceQuote {
    fn default() -> Self {
        Self::failed()
    }
}

impl PriceQuote {
    pub fn failed() -> Self {
        Self {
            reverted: true,
            raw_price: BigDecimal::from(0),
            decimals: 0,
            oracle: None,
        }
    }

    /// Sets price and scale together; the only way to build a successful quote.
    pub fn initialize(raw_price: BigDecimal, decimals: u32, oracle: Option<OracleType>) -> Self {
        Self {
            reverted: false,
            raw_price,
            decimals,
            oracle,
        }
    }

    pub fn from_raw_int(raw_price: BigInt, decimals: u32, oracle: Option<OracleType>) -> Self {
        Self::initialize(BigDecimal::from(raw_price), decimals, oracle)
    }

    /// Exactly 1 USD at the USDC scale.
    pub fn one_usd() -> Self {
        Self::from_raw_int(
            BigInt::from(10u64).pow(DEFAULT_USDC_DECIMALS),
            DEFAULT_USDC_DECIMALS,
            None,
        )
    }

    /// Re-express an already decoded USD price at `decimals`.
    pub fn from_usd(price: &BigDecimal, decimals: u32, oracle: Option<OracleType>) -> Self {
        let raw = price * BigDecimal::new(BigInt::from(10u64).pow(decimals), 0);
        Self::initialize(raw, decimals, oracle)
    }

    pub fn is_reverted(&self) -> bool {
        self.reverted
    }

    /// Decoded USD price; `None` for a failed quote.
    pub fn usd_price(&self) -> Option<BigDecimal> {
        if self.reverted {
            return None;
        }
        Some(&self.raw_price * BigDecimal::new(BigInt::from(1), i64::from(self.decimals)))
    }

    pub fn raw_price(&self) -> &BigDecimal {
        &self.raw_price
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    pub fn oracle(&self) -> Option<OracleType> {
        self.oracle
    }
}
