//! USD price resolution: quotes, oracle adapters, the cascade resolver, consensus and caching.

pub mod adapters;
mod aggregate;
mod cache;
mod cascade;
mod quote;

pub use aggregate::{average_price, consensus_price, k_closest_prices};
pub use cache::{CachedPrice, PriceCache};
pub use cascade::Resolver;
pub use quote::{OracleOrder, OracleType, PriceQuote, DEFAULT_USDC_DECIMALS};
