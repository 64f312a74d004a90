//! Price sheets: resolved prices for a token list at one block, with every attempt recorded.

mod hash;

pub use hash::{normalize_for_hash, sheet_hash, verify_sheet_hash, SheetError, SheetVerification};

use crate::chain::{format_address, Address, ContractReader};
use crate::price::{OracleType, PriceQuote, Resolver};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SHEET_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetAttempt {
    pub oracle: OracleType,
    pub reverted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usd_price: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetEntry {
    pub token: String,
    pub reverted: bool,
    /// Decimal string; absent when no source priced the token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usd_price: Option<String>,
    pub decimals: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oracle: Option<OracleType>,
    pub attempts: Vec<SheetAttempt>,
}

impl SheetEntry {
    pub fn new(token: &Address, quote: &PriceQuote, attempts: &[(OracleType, PriceQuote)]) -> Self {
        Self {
            token: format_address(token),
            reverted: quote.is_reverted(),
            usd_price: quote.usd_price().map(|p| p.normalized().to_string()),
            decimals: quote.decimals(),
            oracle: quote.oracle(),
            attempts: attempts
                .iter()
                .map(|(oracle, q)| SheetAttempt {
                    oracle: *oracle,
                    reverted: q.is_reverted(),
                    usd_price: q.usd_price().map(|p| p.normalized().to_string()),
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSheet {
    pub version: u32,
    pub network: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<u64>,
    pub created_utc_rfc3339: String,
    /// Sorted by token address.
    pub entries: Vec<SheetEntry>,
}

impl PriceSheet {
    pub fn new(network: String, block: Option<u64>, mut entries: Vec<SheetEntry>) -> Self {
        entries.sort_by(|a, b| a.token.cmp(&b.token));
        entries.dedup_by(|a, b| a.token == b.token);
        let created_utc_rfc3339 = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        Self {
            version: SHEET_VERSION,
            network,
            block,
            created_utc_rfc3339,
            entries,
        }
    }

    /// Resolve every token at `block` once, recording each adapter the cascade tried.
    pub fn build<R: ContractReader>(
        resolver: &Resolver<R>,
        tokens: &[Address],
        block: Option<u64>,
    ) -> Self {
        let entries = tokens
            .iter()
            .map(|token| {
                let (quote, attempts) = resolver.resolve_traced(token, block);
                SheetEntry::new(token, &quote, &attempts)
            })
            .collect();
        Self::new(resolver.config().network.clone(), block, entries)
    }

    pub fn priced_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.reverted).count()
    }

    /// `<network>-<block>` (or `-latest`), the stem shared by a sheet's files.
    pub fn file_stem(&self) -> String {
        match self.block {
            Some(b) => format!("{}-{}", self.network, b),
            None => format!("{}-latest", self.network),
        }
    }
}

/// The `.sha256` file that accompanies `sheet_path`.
pub fn hash_path_for(sheet_path: &Path) -> PathBuf {
    let stem = sheet_path
        .file_name()
        .map(|n| n.to_string_lossy().trim_end_matches(".json").to_string())
        .unwrap_or_default();
    sheet_path.with_file_name(format!("{}.sha256", stem))
}
