//! Normalization of address and block inputs for deterministic requests.

use crate::chain::call::Address;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("invalid block: {0}")]
    InvalidBlock(String),
}

/// Parse a 20-byte hex address, with or without `0x`, any case.
pub fn parse_address(s: &str) -> Result<Address, NormalizeError> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(digits).map_err(|_| NormalizeError::InvalidAddress(s.to_string()))?;
    if bytes.len() != 20 {
        return Err(NormalizeError::InvalidAddress(s.to_string()));
    }
    Ok(Address::from_slice(&bytes))
}

/// Lowercase `0x`-prefixed form used for cache keys, logs and files.
pub fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_bytes()))
}

/// Parse a block number given as decimal or `0x` hex. Empty or `latest` means no pin.
pub fn parse_block(s: &str) -> Result<Option<u64>, NormalizeError> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("latest") {
        return Ok(None);
    }
    let parsed = match s.strip_prefix("0x") {
        Some(h) => u64::from_str_radix(h, 16),
        None => s.parse::<u64>(),
    };
    parsed
        .map(Some)
        .map_err(|_| NormalizeError::InvalidBlock(s.to_string()))
}

/// JSON-RPC block tag.
pub fn block_tag(block: Option<u64>) -> String {
    match block {
        Some(n) => format!("0x{:x}", n),
        None => "latest".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_roundtrip_lowercases() {
        let a = parse_address("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2").unwrap();
        assert_eq!(
            format_address(&a),
            "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"
        );
        assert_eq!(
            parse_address("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2").unwrap(),
            a
        );
    }

    #[test]
    fn address_rejects_wrong_length() {
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("not hex").is_err());
    }

    #[test]
    fn block_forms() {
        assert_eq!(parse_block("12345").unwrap(), Some(12345));
        assert_eq!(parse_block("0x10").unwrap(), Some(16));
        assert_eq!(parse_block("").unwrap(), None);
        assert_eq!(parse_block("latest").unwrap(), None);
        assert!(parse_block("abc").is_err());
    }

    #[test]
    fn block_tag_hex() {
        assert_eq!(block_tag(Some(255)), "0xff");
        assert_eq!(block_tag(None), "latest");
    }
}
