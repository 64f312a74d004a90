//! Report data structure (HTML is generated in the token_pricer_report crate).

use crate::sheet::{sheet_hash, PriceSheet, SheetError};
use serde::{Deserialize, Serialize};

/// Data passed to the HTML report generator: price sheet + its hash.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportData {
    pub sheet: PriceSheet,
    pub sheet_hash_sha256: String,
}

impl ReportData {
    pub fn new(sheet: PriceSheet) -> Result<Self, SheetError> {
        let sheet_hash_sha256 = sheet_hash(&sheet)?;
        Ok(Self {
            sheet,
            sheet_hash_sha256,
        })
    }
}
