//! Per-network oracle tables, selected once per process.
//!
//! A [`Registry`] maps network identifiers to [`ChainConfig`] values. Unknown
//! identifiers resolve to the template config, which has no oracle contracts and
//! makes every resolution fail instead of erroring.

mod file;
mod mainnet;
mod settings;

pub use file::{ChainConfigError, ChainConfigFile, OracleContractFile, OracleOverrideFile};
pub use settings::{Settings, SettingsError};

use crate::chain::Address;
use crate::price::{OracleOrder, OracleType, DEFAULT_USDC_DECIMALS};
use ethabi::ethereum_types::H160;
use hex_literal::hex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use tracing::{info, warn};

pub const TEMPLATE_NETWORK: &str = "default";
pub const MAINNET: &str = "mainnet";

/// Native-currency sentinel used by many protocols in place of a token address.
pub const ETH_SENTINEL: Address = H160(hex!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee"));

/// An oracle or router contract and the block it was deployed at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OracleContract {
    pub address: Address,
    /// `None` means always available.
    pub deployed_at: Option<u64>,
}

impl OracleContract {
    pub const fn new(address: Address, deployed_at: u64) -> Self {
        Self {
            address,
            deployed_at: Some(deployed_at),
        }
    }

    /// False when the query block predates deployment. Unpinned queries see every contract.
    pub fn available_at(&self, block: Option<u64>) -> bool {
        match (self.deployed_at, block) {
            (Some(deployed), Some(block)) => block >= deployed,
            _ => true,
        }
    }
}

/// Half-open block range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockRange {
    pub start: u64,
    pub end: u64,
}

impl BlockRange {
    pub fn contains(&self, block: u64) -> bool {
        self.start <= block && block < self.end
    }
}

/// Replacement adapter order for a set of tokens, optionally limited to a block range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OracleOverride {
    pub label: String,
    pub tokens: HashSet<Address>,
    pub blocks: Option<BlockRange>,
    pub order: OracleOrder,
}

impl OracleOverride {
    pub fn matches(&self, token: &Address, block: Option<u64>) -> bool {
        if !self.tokens.contains(token) {
            return false;
        }
        match self.blocks {
            None => true,
            Some(range) => block.is_some_and(|b| range.contains(b)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainConfig {
    pub network: String,

    pub yearn_lens: Option<OracleContract>,
    pub chainlink: Option<OracleContract>,
    pub aave_oracle: Option<OracleContract>,
    pub curve_calculations: Option<OracleContract>,
    pub sushi_calculations: Option<OracleContract>,
    pub curve_registries: Vec<OracleContract>,
    pub uniswap_forks: Vec<OracleContract>,

    pub yearn_lens_blacklist: HashSet<Address>,
    pub aave_oracle_blacklist: HashSet<Address>,
    pub curve_calculations_blacklist: HashSet<Address>,
    pub sushi_calculations_blacklist: HashSet<Address>,

    /// Tokens priced at exactly 1 USD without any call.
    pub hardcoded_stables: HashSet<Address>,
    /// Tokens that never get a price.
    pub ignore_list: HashSet<Address>,

    pub eth_address: Address,
    pub weth_address: Address,
    pub usdc_address: Address,
    pub usdc_decimals: u32,

    pub default_order: OracleOrder,
    /// Checked in order; the first match wins.
    pub overrides: Vec<OracleOverride>,
}

/// Adapter order used when a network does not set its own.
pub fn default_oracle_order() -> OracleOrder {
    OracleOrder::first_success(vec![
        OracleType::YearnLensOracle,
        OracleType::ChainlinkFeed,
        OracleType::CurveCalculations,
        OracleType::SushiCalculations,
        OracleType::CurveRouter,
        OracleType::UniswapForksRouter,
        OracleType::AaveOracle,
    ])
}

impl ChainConfig {
    /// Empty config for unrecognized networks.
    pub fn template() -> Self {
        Self {
            network: TEMPLATE_NETWORK.to_string(),
            yearn_lens: None,
            chainlink: None,
            aave_oracle: None,
            curve_calculations: None,
            sushi_calculations: None,
            curve_registries: Vec::new(),
            uniswap_forks: Vec::new(),
            yearn_lens_blacklist: HashSet::new(),
            aave_oracle_blacklist: HashSet::new(),
            curve_calculations_blacklist: HashSet::new(),
            sushi_calculations_blacklist: HashSet::new(),
            hardcoded_stables: HashSet::new(),
            ignore_list: HashSet::new(),
            eth_address: ETH_SENTINEL,
            weth_address: Address::zero(),
            usdc_address: Address::zero(),
            usdc_decimals: DEFAULT_USDC_DECIMALS,
            default_order: default_oracle_order(),
            overrides: Vec::new(),
        }
    }

    pub fn is_template(&self) -> bool {
        self.network == TEMPLATE_NETWORK
    }

    /// First override matching `(token, block)`. A missing token never matches;
    /// block-scoped rules need a block.
    pub fn oracle_override(
        &self,
        token: Option<&Address>,
        block: Option<u64>,
    ) -> Option<&OracleOverride> {
        let token = token?;
        self.overrides.iter().find(|o| o.matches(token, block))
    }

    /// Override order if one applies, else the default order.
    pub fn effective_order(&self, token: &Address, block: Option<u64>) -> &OracleOrder {
        self.oracle_override(Some(token), block)
            .map(|o| &o.order)
            .unwrap_or(&self.default_order)
    }
}

/// Network identifier to config table, with the template as fallback.
#[derive(Clone, Debug)]
pub struct Registry {
    configs: HashMap<String, ChainConfig>,
    template: ChainConfig,
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Registry {
    pub fn empty() -> Self {
        Self {
            configs: HashMap::new(),
            template: ChainConfig::template(),
        }
    }

    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.insert(mainnet::config());
        registry
    }

    /// Built-in tables overlaid with the settings' extra networks. Invalid tables are skipped.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut registry = Self::builtin();
        for table in &settings.networks {
            match ChainConfig::try_from(table.clone()) {
                Ok(config) => registry.insert(config),
                Err(e) => warn!(network = %table.network, error = %e, "skipping network table"),
            }
        }
        registry
    }

    /// Adds or replaces a network. Inserting the template name is ignored.
    pub fn insert(&mut self, config: ChainConfig) {
        if config.is_template() {
            return;
        }
        self.configs.insert(config.network.to_lowercase(), config);
    }

    /// Never fails: unknown networks get the template.
    pub fn config(&self, network: &str) -> &ChainConfig {
        self.configs
            .get(&network.trim().to_lowercase())
            .unwrap_or(&self.template)
    }

    pub fn networks(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.configs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// The process-wide config, chosen on first use from [`Settings::load`].
pub fn active_config() -> &'static ChainConfig {
    static ACTIVE: OnceLock<ChainConfig> = OnceLock::new();
    ACTIVE.get_or_init(|| {
        let settings = Settings::load();
        let config = Registry::from_settings(&settings)
            .config(&settings.network)
            .clone();
        if config.is_template() {
            warn!(network = %settings.network, "unrecognized network, prices disabled");
        } else {
            info!(network = %config.network, "chain config selected");
        }
        config
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::repeat_byte(b)
    }

    #[test]
    fn deployment_guard() {
        let c = OracleContract::new(addr(1), 100);
        assert!(!c.available_at(Some(99)));
        assert!(c.available_at(Some(100)));
        assert!(c.available_at(None));
        let undated = OracleContract {
            address: addr(1),
            deployed_at: None,
        };
        assert!(undated.available_at(Some(0)));
    }

    #[test]
    fn unknown_network_is_template() {
        let registry = Registry::builtin();
        assert!(registry.config("no-such-chain").is_template());
        assert!(!registry.config("mainnet").is_template());
        assert!(!registry.config(" MAINNET ").is_template());
    }

    #[test]
    fn override_first_match_wins() {
        let mut config = ChainConfig::template();
        let token = addr(9);
        for label in ["first", "second"] {
            config.overrides.push(OracleOverride {
                label: label.to_string(),
                tokens: HashSet::from([token]),
                blocks: None,
                order: OracleOrder::first_success(vec![OracleType::ChainlinkFeed]),
            });
        }
        let hit = config.oracle_override(Some(&token), Some(1)).unwrap();
        assert_eq!(hit.label, "first");
        assert!(config.oracle_override(None, Some(1)).is_none());
        assert!(config.oracle_override(None, None).is_none());
        assert!(config.oracle_override(Some(&addr(8)), None).is_none());
    }

    #[test]
    fn block_scoped_override_needs_block_in_range() {
        let token = addr(3);
        let rule = OracleOverride {
            label: "scoped".to_string(),
            tokens: HashSet::from([token]),
            blocks: Some(BlockRange { start: 10, end: 20 }),
            order: OracleOrder::first_success(vec![]),
        };
        assert!(rule.matches(&token, Some(10)));
        assert!(rule.matches(&token, Some(19)));
        assert!(!rule.matches(&token, Some(20)));
        assert!(!rule.matches(&token, Some(9)));
        assert!(!rule.matches(&token, None));
    }

    #[test]
    fn template_name_cannot_be_registered() {
        let mut registry = Registry::empty();
        registry.insert(ChainConfig::template());
        assert!(registry.networks().is_empty());
    }
}
