//! JSON-RPC `eth_call` reader with rate limiting, retries and an optional SQLite cache.

use crate::chain::abi::{decode_return, encode_call};
use crate::chain::cache::{CacheError, CallCache};
use crate::chain::call::{Address, Call, CallError, CallValue, ContractReader};
use crate::chain::normalize::{block_tag, format_address};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

const RATE_LIMIT_MS: u64 = 50;
const MAX_RETRIES: u32 = 3;
const RETRY_BACKOFF_MS: u64 = 500;
const MAX_BACKOFF_MS: u64 = 60_000;
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct RpcConfig {
    pub url: String,
    /// Network identifier mixed into cache keys.
    pub network: String,
    pub rate_limit_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub offline: bool,
}

impl RpcConfig {
    pub fn new(url: impl Into<String>, network: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            network: network.into(),
            rate_limit_ms: RATE_LIMIT_MS,
            max_retries: MAX_RETRIES,
            retry_backoff_ms: RETRY_BACKOFF_MS,
            offline: false,
        }
    }
}

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("request: {0}")]
    Request(#[from] reqwest::Error),
    #[error("cache: {0}")]
    Cache(#[from] CacheError),
    #[error("runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("invalid rpc url: {0}")]
    Url(#[from] url::ParseError),
    #[error("http status {0}: {1}")]
    Http(u16, String),
    #[error("node error {code}: {message}")]
    Node { code: i64, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("offline mode: no cached response")]
    OfflineMiss,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl RpcErrorBody {
    /// Code 3 carries revert data; older nodes only say so in the message.
    fn is_revert(&self) -> bool {
        self.code == 3 || self.message.to_lowercase().contains("execution reverted")
    }
}

/// `base * 2^attempt`, capped.
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    base.saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX))
        .min(MAX_BACKOFF_MS)
}

/// Outcome of one eth_call as seen on the wire: return data, or a node-reported revert.
enum Outcome {
    Data(Vec<u8>),
    Reverted,
}

/// Synchronous [`ContractReader`] over an async HTTP client. Owns a current-thread runtime,
/// so it must not be used from inside another tokio runtime.
pub struct RpcReader {
    config: RpcConfig,
    client: Option<reqwest::Client>,
    cache: Option<CallCache>,
    runtime: tokio::runtime::Runtime,
    last_request: Mutex<Option<Instant>>,
    request_count: AtomicU64,
}

impl RpcReader {
    pub fn new(config: RpcConfig, cache: Option<CallCache>) -> Result<Self, RpcError> {
        let client = if config.offline {
            None
        } else {
            url::Url::parse(&config.url)?;
            Some(
                reqwest::Client::builder()
                    .use_rustls_tls()
                    .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                    .build()?,
            )
        };
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            config,
            client,
            cache,
            runtime,
            last_request: Mutex::new(None),
            request_count: AtomicU64::new(0),
        })
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    async fn rate_limit(&self) {
        let wait = {
            let last = self.last_request.lock().ok().and_then(|g| *g);
            let need = Duration::from_millis(self.config.rate_limit_ms);
            last.map(|prev| need.saturating_sub(prev.elapsed()))
                .unwrap_or_default()
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(Instant::now());
        }
    }

    async fn eth_call(
        &self,
        contract: &Address,
        data: &[u8],
        block: Option<u64>,
    ) -> Result<Outcome, RpcError> {
        let key = block.map(|b| CallCache::key_for(&self.config.network, contract, data, b));
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(hit) = cache.get(key)? {
                debug!(key = %key, "call cache hit");
                return Ok(hit.map(Outcome::Data).unwrap_or(Outcome::Reverted));
            }
        }
        let client = self.client.as_ref().ok_or(RpcError::OfflineMiss)?;

        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                { "to": format_address(contract), "data": format!("0x{}", hex::encode(data)) },
                block_tag(block),
            ],
        });

        let mut last_err = None;
        for attempt in 0..=self.config.max_retries {
            self.rate_limit().await;
            match self.post(client, &body).await {
                Ok(outcome) => {
                    self.request_count.fetch_add(1, Ordering::Relaxed);
                    if let (Some(cache), Some(key)) = (&self.cache, &key) {
                        let stored = match &outcome {
                            Outcome::Data(d) => cache.set(key, Some(d)),
                            Outcome::Reverted => cache.set(key, None),
                        };
                        if let Err(e) = stored {
                            warn!(error = %e, "call cache write failed");
                        }
                    }
                    return Ok(outcome);
                }
                Err(e) => {
                    if attempt < self.config.max_retries {
                        let ms = backoff_ms(self.config.retry_backoff_ms, attempt);
                        warn!(attempt, ms, error = %e, "retry eth_call");
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                    }
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| RpcError::Malformed("no attempt made".to_string())))
    }

    async fn post(
        &self,
        client: &reqwest::Client,
        body: &serde_json::Value,
    ) -> Result<Outcome, RpcError> {
        let res = client.post(&self.config.url).json(body).send().await?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(RpcError::Http(status.as_u16(), text));
        }
        let parsed: RpcResponse =
            serde_json::from_str(&text).map_err(|e| RpcError::Malformed(e.to_string()))?;
        if let Some(err) = parsed.error {
            debug!(code = err.code, message = %err.message, "eth_call error");
            if err.is_revert() {
                return Ok(Outcome::Reverted);
            }
            return Err(RpcError::Node {
                code: err.code,
                message: err.message,
            });
        }
        let result = parsed
            .result
            .ok_or_else(|| RpcError::Malformed("missing result".to_string()))?;
        let hex_data = result.trim_start_matches("0x");
        let data = hex::decode(hex_data).map_err(|e| RpcError::Malformed(e.to_string()))?;
        Ok(Outcome::Data(data))
    }
}

impl ContractReader for RpcReader {
    fn try_call(
        &self,
        contract: Address,
        call: &Call,
        block: Option<u64>,
    ) -> Result<CallValue, CallError> {
        let data = encode_call(call)?;
        let outcome = self
            .runtime
            .block_on(self.eth_call(&contract, &data, block))
            .map_err(|e| CallError::Transport(e.to_string()))?;
        match outcome {
            Outcome::Data(ret) => decode_return(call, &ret),
            Outcome::Reverted => Err(CallError::Reverted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    /// Reads one HTTP request: headers, then `content-length` bytes of body.
    fn read_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).unwrap_or(0);
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let len = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + len {
                    return;
                }
            }
        }
    }

    /// Local node answering every request with `body`; returns its url and a request counter.
    fn stub_node(body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                read_request(&mut stream);
                counter.fetch_add(1, Ordering::SeqCst);
                let reply = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                     content-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(reply.as_bytes());
            }
        });
        (url, hits)
    }

    fn online_reader(url: &str, cache: CallCache) -> RpcReader {
        let config = RpcConfig {
            rate_limit_ms: 0,
            max_retries: 2,
            retry_backoff_ms: 1,
            ..RpcConfig::new(url, "mainnet")
        };
        RpcReader::new(config, Some(cache)).unwrap()
    }

    fn offline_reader(cache: CallCache) -> RpcReader {
        let mut config = RpcConfig::new("http://127.0.0.1:1", "mainnet");
        config.offline = true;
        RpcReader::new(config, Some(cache)).unwrap()
    }

    #[test]
    fn node_errors_are_retried_and_not_cached() {
        let (url, hits) = stub_node(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32005,"message":"limit exceeded"}}"#,
        );
        let tmp = NamedTempFile::new().unwrap();
        let token = Address::repeat_byte(0x44);
        let reader = online_reader(&url, CallCache::open(tmp.path()).unwrap());
        let res = reader.try_call(token, &Call::Decimals, Some(100));
        assert!(matches!(res, Err(CallError::Transport(_))));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(reader.request_count(), 0);

        let replay = offline_reader(CallCache::open(tmp.path()).unwrap());
        let res = replay.try_call(token, &Call::Decimals, Some(100));
        assert!(matches!(res, Err(CallError::Transport(_))));
    }

    #[test]
    fn node_reverts_are_cached_answers() {
        let (url, hits) = stub_node(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":3,"message":"execution reverted"}}"#,
        );
        let tmp = NamedTempFile::new().unwrap();
        let token = Address::repeat_byte(0x45);
        let reader = online_reader(&url, CallCache::open(tmp.path()).unwrap());
        assert_eq!(
            reader.try_call(token, &Call::Decimals, Some(100)),
            Err(CallError::Reverted)
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let replay = offline_reader(CallCache::open(tmp.path()).unwrap());
        assert_eq!(
            replay.try_call(token, &Call::Decimals, Some(100)),
            Err(CallError::Reverted)
        );
    }

    #[test]
    fn revert_detection() {
        let body = |code, message: &str| RpcErrorBody {
            code,
            message: message.to_string(),
        };
        assert!(body(3, "execution reverted: no feed").is_revert());
        assert!(body(-32000, "Execution reverted").is_revert());
        assert!(!body(-32005, "limit exceeded").is_revert());
        assert!(!body(-32603, "internal error").is_revert());
    }

    #[test]
    fn backoff_saturates() {
        assert_eq!(backoff_ms(500, 0), 500);
        assert_eq!(backoff_ms(500, 3), 4_000);
        assert_eq!(backoff_ms(500, 40), MAX_BACKOFF_MS);
        assert_eq!(backoff_ms(500, 64), MAX_BACKOFF_MS);
        assert_eq!(backoff_ms(500, u32::MAX), MAX_BACKOFF_MS);
    }

    #[test]
    fn offline_reader_serves_cached_calls() {
        let tmp = NamedTempFile::new().unwrap();
        let cache = CallCache::open(tmp.path()).unwrap();
        let token = Address::repeat_byte(0x42);
        let data = encode_call(&Call::Decimals).unwrap();
        let mut word = [0u8; 32];
        word[31] = 18;
        cache
            .set(&CallCache::key_for("mainnet", &token, &data, 100), Some(&word))
            .unwrap();

        let mut config = RpcConfig::new("http://127.0.0.1:1", "mainnet");
        config.offline = true;
        let reader = RpcReader::new(config, Some(cache)).unwrap();

        let v = reader.try_call(token, &Call::Decimals, Some(100)).unwrap();
        assert_eq!(v, CallValue::Int(18.into()));
        let miss = reader.try_call(token, &Call::Decimals, Some(101));
        assert!(matches!(miss, Err(CallError::Transport(_))));
        assert_eq!(reader.request_count(), 0);
    }

    #[test]
    fn offline_reader_replays_cached_revert() {
        let tmp = NamedTempFile::new().unwrap();
        let cache = CallCache::open(tmp.path()).unwrap();
        let token = Address::repeat_byte(0x43);
        let data = encode_call(&Call::Decimals).unwrap();
        cache
            .set(&CallCache::key_for("mainnet", &token, &data, 5), None)
            .unwrap();
        let mut config = RpcConfig::new("http://127.0.0.1:1", "mainnet");
        config.offline = true;
        let reader = RpcReader::new(config, Some(cache)).unwrap();
        assert_eq!(
            reader.try_call(token, &Call::Decimals, Some(5)),
            Err(CallError::Reverted)
        );
    }

    #[test]
    fn rejects_bad_url_when_online() {
        let config = RpcConfig::new("not a url", "mainnet");
        assert!(matches!(RpcReader::new(config, None), Err(RpcError::Url(_))));
    }
}
