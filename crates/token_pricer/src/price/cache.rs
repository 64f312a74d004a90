//! Last resolved price per `(network, token)`, refreshed after a block-count threshold.

use super::{OracleType, PriceQuote, Resolver};
use crate::chain::{format_address, open_db, Address, CacheError, ContractReader};
use bigdecimal::BigDecimal;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq)]
pub struct CachedPrice {
    pub quote: PriceQuote,
    pub block: u64,
}

impl CachedPrice {
    /// Fresh when at most `max_age_blocks` old. An entry from a later block is never fresh.
    pub fn is_fresh(&self, block: u64, max_age_blocks: u64) -> bool {
        block
            .checked_sub(self.block)
            .is_some_and(|age| age <= max_age_blocks)
    }
}

pub struct PriceCache {
    conn: Mutex<Connection>,
}

impl PriceCache {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let conn = open_db(
            path.as_ref(),
            r#"
            CREATE TABLE IF NOT EXISTS price_cache (
                network TEXT NOT NULL,
                token TEXT NOT NULL,
                raw_price TEXT NOT NULL,
                decimals INTEGER NOT NULL,
                oracle TEXT,
                block INTEGER NOT NULL,
                updated_utc INTEGER NOT NULL,
                PRIMARY KEY (network, token)
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn get(&self, network: &str, token: &Address) -> Result<Option<CachedPrice>, CacheError> {
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        let mut stmt = conn.prepare(
            "SELECT raw_price, decimals, oracle, block FROM price_cache \
             WHERE network = ?1 AND token = ?2",
        )?;
        let row = stmt
            .query_row(rusqlite::params![network, format_address(token)], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, u32>(1)?,
                    r.get::<_, Option<String>>(2)?,
                    r.get::<_, i64>(3)?,
                ))
            })
            .optional()?;
        let Some((raw, decimals, oracle, block)) = row else {
            return Ok(None);
        };
        // Unparseable rows count as misses.
        let (Ok(raw), Ok(block)) = (BigDecimal::from_str(&raw), u64::try_from(block)) else {
            return Ok(None);
        };
        let oracle = oracle.and_then(|o| OracleType::from_str(&o).ok());
        Ok(Some(CachedPrice {
            quote: PriceQuote::initialize(raw, decimals, oracle),
            block,
        }))
    }

    /// Stores successful quotes only, and never replaces a later entry with an earlier one.
    pub fn put(
        &self,
        network: &str,
        token: &Address,
        quote: &PriceQuote,
        block: u64,
    ) -> Result<(), CacheError> {
        if quote.is_reverted() {
            return Ok(());
        }
        let updated = time::OffsetDateTime::now_utc().unix_timestamp();
        let conn = self.conn.lock().map_err(|_| CacheError::Poisoned)?;
        conn.execute(
            r#"
            INSERT INTO price_cache (network, token, raw_price, decimals, oracle, block, updated_utc)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (network, token) DO UPDATE SET
                raw_price = excluded.raw_price,
                decimals = excluded.decimals,
                oracle = excluded.oracle,
                block = excluded.block,
                updated_utc = excluded.updated_utc
            WHERE excluded.block >= price_cache.block
            "#,
            rusqlite::params![
                network,
                format_address(token),
                quote.raw_price().to_string(),
                quote.decimals(),
                quote.oracle().map(|o| o.as_str()),
                i64::try_from(block).unwrap_or(i64::MAX),
                updated,
            ],
        )?;
        Ok(())
    }
}

impl<R: ContractReader> Resolver<R> {
    /// Cached price when fresh, else a live resolution that refreshes the cache.
    /// Unpinned requests bypass the cache; cache errors fall through to live resolution.
    pub fn resolve_cached(
        &self,
        cache: &PriceCache,
        token: &Address,
        block: Option<u64>,
        max_age_blocks: u64,
    ) -> PriceQuote {
        let Some(at) = block else {
            return self.resolve(token, None);
        };
        let network = self.config().network.as_str();
        match cache.get(network, token) {
            Ok(Some(hit)) if hit.is_fresh(at, max_age_blocks) => {
                debug!(token = ?token, cached_block = hit.block, block = at, "price cache hit");
                return hit.quote;
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "price cache read failed"),
        }
        let quote = self.resolve(token, block);
        if !quote.is_reverted() {
            match cache.put(network, token, &quote, at) {
                Ok(()) => info!(token = ?token, block = at, "price cached"),
                Err(e) => warn!(error = %e, "price cache write failed"),
            }
        }
        quote
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::NullReader;
    use crate::config::ChainConfig;
    use crate::price::adapters::{PriceAdapter, QuoteContext};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    struct Counting(Arc<AtomicUsize>);

    impl PriceAdapter for Counting {
        fn oracle(&self) -> OracleType {
            OracleType::ChainlinkFeed
        }

        fn quote(&self, _token: &Address, _ctx: &QuoteContext<'_>) -> PriceQuote {
            let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            PriceQuote::from_raw_int((n as u64).into(), 0, Some(OracleType::ChainlinkFeed))
        }
    }

    fn resolver() -> (Resolver<NullReader>, Arc<AtomicUsize>) {
        let mut config = ChainConfig::template();
        config.network = "test".to_string();
        let calls = Arc::new(AtomicUsize::new(0));
        let r = Resolver::new(config, NullReader)
            .with_adapters(vec![Box::new(Counting(calls.clone()))]);
        (r, calls)
    }

    #[test]
    fn freshness_window() {
        let hit = CachedPrice {
            quote: PriceQuote::one_usd(),
            block: 1_000,
        };
        assert!(hit.is_fresh(1_000, 300));
        assert!(hit.is_fresh(1_300, 300));
        assert!(!hit.is_fresh(1_301, 300));
        assert!(!hit.is_fresh(999, 300));
    }

    #[test]
    fn roundtrips_quote() {
        let tmp = NamedTempFile::new().unwrap();
        let cache = PriceCache::open(tmp.path()).unwrap();
        let token = Address::repeat_byte(4);
        let q = PriceQuote::from_raw_int(123_456_789u64.into(), 8, Some(OracleType::AaveOracle));
        cache.put("mainnet", &token, &q, 50).unwrap();
        let hit = cache.get("mainnet", &token).unwrap().unwrap();
        assert_eq!(hit.block, 50);
        assert_eq!(hit.quote.usd_price(), q.usd_price());
        assert_eq!(hit.quote.oracle(), Some(OracleType::AaveOracle));
        assert!(cache.get("other", &token).unwrap().is_none());
    }

    #[test]
    fn earlier_block_does_not_replace_later() {
        let tmp = NamedTempFile::new().unwrap();
        let cache = PriceCache::open(tmp.path()).unwrap();
        let token = Address::repeat_byte(4);
        cache.put("n", &token, &PriceQuote::one_usd(), 100).unwrap();
        cache.put("n", &token, &PriceQuote::failed(), 200).unwrap();
        cache
            .put("n", &token, &PriceQuote::from_raw_int(2.into(), 0, None), 90)
            .unwrap();
        let hit = cache.get("n", &token).unwrap().unwrap();
        assert_eq!(hit.block, 100);
        assert_eq!(hit.quote.usd_price(), Some(BigDecimal::from(1)));
    }

    #[test]
    fn resolve_cached_refreshes_only_when_stale() {
        let tmp = NamedTempFile::new().unwrap();
        let cache = PriceCache::open(tmp.path()).unwrap();
        let (r, calls) = resolver();
        let token = Address::repeat_byte(9);

        let first = r.resolve_cached(&cache, &token, Some(1_000), 300);
        let second = r.resolve_cached(&cache, &token, Some(1_200), 300);
        assert_eq!(first.usd_price(), second.usd_price());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let third = r.resolve_cached(&cache, &token, Some(1_400), 300);
        assert_eq!(third.usd_price(), Some(BigDecimal::from(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // unpinned requests always resolve live
        r.resolve_cached(&cache, &token, None, 300);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
