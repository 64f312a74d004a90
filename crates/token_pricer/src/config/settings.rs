//! Runtime settings: network selection, RPC tuning, cache location and extra chain tables.
//!
//! Load from: env `TOKEN_PRICER_CONFIG_PATH`, or `./config/token_pricer.json`,
//! or `./token_pricer.json`.

use super::file::ChainConfigFile;
use super::MAINNET;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

pub const CONFIG_PATH_ENV: &str = "TOKEN_PRICER_CONFIG_PATH";

/// About one hour of mainnet blocks.
pub const DEFAULT_MAX_AGE_BLOCKS: u64 = 300;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Network identifier used to pick the active chain table.
    pub network: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    pub cache_dir: PathBuf,
    /// Cached prices older than this many blocks are refreshed.
    pub max_age_blocks: u64,
    pub rate_limit_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    /// Serve calls from cache only.
    pub offline: bool,
    /// Extra or replacement chain tables.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<ChainConfigFile>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            network: MAINNET.to_string(),
            rpc_url: None,
            cache_dir: PathBuf::from("./data/cache"),
            max_age_blocks: DEFAULT_MAX_AGE_BLOCKS,
            rate_limit_ms: 50,
            max_retries: 3,
            retry_backoff_ms: 500,
            offline: false,
            networks: Vec::new(),
        }
    }
}

impl Settings {
    pub fn load_from_path(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load settings: env TOKEN_PRICER_CONFIG_PATH, then ./config/token_pricer.json,
    /// then ./token_pricer.json. Unreadable files log a warning and yield defaults.
    pub fn load() -> Self {
        let Some(path) = Self::locate() else {
            return Self::default();
        };
        match Self::load_from_path(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring settings file");
                Self::default()
            }
        }
    }

    fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let p = PathBuf::from(path);
            if p.exists() {
                return Some(p);
            }
        }
        [
            Path::new("./config/token_pricer.json"),
            Path::new("./token_pricer.json"),
        ]
        .into_iter()
        .find(|p| p.exists())
        .map(Path::to_path_buf)
    }

    pub fn call_cache_path(&self) -> PathBuf {
        self.cache_dir.join("calls.sqlite")
    }

    pub fn price_cache_path(&self) -> PathBuf {
        self.cache_dir.join("prices.sqlite")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut f = NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{ "network": "arbitrum", "offline": true,
                 "networks": [{{ "network": "arbitrum" }}] }}"#
        )
        .unwrap();
        let s = Settings::load_from_path(f.path()).unwrap();
        assert_eq!(s.network, "arbitrum");
        assert!(s.offline);
        assert_eq!(s.max_age_blocks, DEFAULT_MAX_AGE_BLOCKS);
        assert_eq!(s.networks.len(), 1);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "{{ not json").unwrap();
        assert!(matches!(
            Settings::load_from_path(f.path()),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn file_tables_extend_registry() {
        let settings = Settings {
            networks: vec![ChainConfigFile {
                network: "arbitrum".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let registry = crate::config::Registry::from_settings(&settings);
        assert_eq!(registry.networks(), vec!["arbitrum", "mainnet"]);
        assert!(!registry.config("arbitrum").is_template());
    }
}
