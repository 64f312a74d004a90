//! token_pricer: USD prices for ERC-20 tokens from an ordered cascade of on-chain oracles.
//!
//! A per-network [`ChainConfig`] names the oracle and router contracts, blacklists and
//! hardcoded stables. The [`Resolver`] tries adapters in priority order (or a per-token
//! override order) and returns the first successful [`PriceQuote`]; a consensus mode
//! averages the tightest cluster of several quotes. Read-only; failures are values.

pub mod chain;
pub mod config;
pub mod price;
pub mod report;
pub mod sheet;

pub use chain::{Address, Call, CallValue, ContractReader, RpcConfig, RpcReader};
pub use config::{active_config, ChainConfig, OracleContract, OracleOverride, Registry, Settings};
pub use price::{OracleOrder, OracleType, PriceCache, PriceQuote, Resolver};
pub use report::ReportData;
pub use sheet::{sheet_hash, verify_sheet_hash, PriceSheet, SheetEntry};
