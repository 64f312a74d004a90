//! SQLite cache of `eth_call` return data, keyed by a hash of the pinned request.

use crate::chain::call::Address;
use crate::chain::normalize::{block_tag, format_address};
use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("lock poisoned")]
    Poisoned,
}

/// Open (creating parent dirs) a sqlite file and apply `schema`.
pub(crate) fn open_db(path: &Path, schema: &str) -> Result<Connection, CacheError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    conn.execute_batch(schema)?;
    Ok(conn)
}

/// Call results at a pinned block never change, so entries are never expired.
pub struct CallCache {
    conn: Mutex<Connection>,
}

impl CallCache {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let conn = open_db(
            path.as_ref(),
            r#"
            CREATE TABLE IF NOT EXISTS call_cache (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                reverted INTEGER NOT NULL,
                created_utc INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Key = SHA-256 over `network|contract|calldata|block`, all lowercase hex.
    pub fn key_for(network: &str, contract: &Address, data: &[u8], block: u64) -> String {
        let norm = format!(
            "{}|{}|0x{}|{}",
            network,
            format_address(contract),
            hex::encode(data),
            block_tag(Some(block))
        );
        let mut hasher = Sha256::new();
        hasher.update(norm.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// `Some(None)` is a cached revert; `None` is a miss.
    pub fn get(&self, key: &str) -> Result<Option<Option<Vec<u8>>>, CacheError> {
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        let mut stmt = conn.prepare("SELECT value, reverted FROM call_cache WHERE key = ?1")?;
        let row = stmt
            .query_row([key], |r| Ok((r.get::<_, Vec<u8>>(0)?, r.get::<_, i64>(1)?)))
            .optional()?;
        Ok(row.map(|(value, reverted)| if reverted != 0 { None } else { Some(value) }))
    }

    pub fn set(&self, key: &str, value: Option<&[u8]>) -> Result<(), CacheError> {
        let created = time::OffsetDateTime::now_utc().unix_timestamp();
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        conn.execute(
            "INSERT OR REPLACE INTO call_cache (key, value, reverted, created_utc) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![key, value.unwrap_or_default(), value.is_none() as i64, created],
        )?;
        Ok(())
    }
}
