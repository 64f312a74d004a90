//! String-typed chain tables as they appear in settings files and `config` output.

use super::{BlockRange, ChainConfig, OracleContract, OracleOverride};
use crate::chain::{format_address, parse_address, Address, NormalizeError};
use crate::price::{OracleOrder, OracleType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainConfigError {
    #[error(transparent)]
    Address(#[from] NormalizeError),
    #[error("{0}")]
    Oracle(String),
    #[error("network name is reserved: {0}")]
    ReservedNetwork(String),
    #[error("override {0}: empty block range")]
    EmptyRange(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleContractFile {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_at: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleOverrideFile {
    pub label: String,
    pub tokens: Vec<String>,
    /// `[start, end)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<(u64, u64)>,
    #[serde(default = "one")]
    pub count: usize,
    pub order: Vec<String>,
}

fn one() -> usize {
    1
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfigFile {
    pub network: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub yearn_lens: Option<OracleContractFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chainlink: Option<OracleContractFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aave_oracle: Option<OracleContractFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curve_calculations: Option<OracleContractFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sushi_calculations: Option<OracleContractFile>,
    pub curve_registries: Vec<OracleContractFile>,
    pub uniswap_forks: Vec<OracleContractFile>,

    pub yearn_lens_blacklist: Vec<String>,
    pub aave_oracle_blacklist: Vec<String>,
    pub curve_calculations_blacklist: Vec<String>,
    pub sushi_calculations_blacklist: Vec<String>,
    pub hardcoded_stables: Vec<String>,
    pub ignore_list: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub eth_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weth_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usdc_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usdc_decimals: Option<u32>,

    /// Adapter names; empty keeps the built-in default order.
    pub default_order: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_count: Option<usize>,
    pub overrides: Vec<OracleOverrideFile>,
}

fn contract(c: &OracleContractFile) -> Result<OracleContract, ChainConfigError> {
    Ok(OracleContract {
        address: parse_address(&c.address)?,
        deployed_at: c.deployed_at,
    })
}

fn contract_file(c: &OracleContract) -> OracleContractFile {
    OracleContractFile {
        address: format_address(&c.address),
        deployed_at: c.deployed_at,
    }
}

fn address_set(list: &[String]) -> Result<HashSet<Address>, ChainConfigError> {
    list.iter()
        .map(|s| parse_address(s).map_err(ChainConfigError::from))
        .collect()
}

/// Sorted so `config` output is stable.
fn address_list(set: &HashSet<Address>) -> Vec<String> {
    let mut out: Vec<String> = set.iter().map(format_address).collect();
    out.sort();
    out
}

fn address_or(s: Option<&str>, fallback: Address) -> Result<Address, ChainConfigError> {
    match s {
        Some(s) => Ok(parse_address(s)?),
        None => Ok(fallback),
    }
}

fn order(names: &[String]) -> Result<Vec<OracleType>, ChainConfigError> {
    names
        .iter()
        .map(|n| n.parse::<OracleType>().map_err(ChainConfigError::Oracle))
        .collect()
}

fn order_names(order: &[OracleType]) -> Vec<String> {
    order.iter().map(|o| o.as_str().to_string()).collect()
}

impl TryFrom<ChainConfigFile> for ChainConfig {
    type Error = ChainConfigError;

    fn try_from(file: ChainConfigFile) -> Result<Self, Self::Error> {
        let network = file.network.trim().to_lowercase();
        if network.is_empty() || network == super::TEMPLATE_NETWORK {
            return Err(ChainConfigError::ReservedNetwork(file.network));
        }
        let base = ChainConfig::template();

        let mut default_order = base.default_order.clone();
        if !file.default_order.is_empty() {
            default_order.order = order(&file.default_order)?;
        }
        if let Some(count) = file.default_count {
            default_order.count = count;
        }

        let mut overrides = Vec::with_capacity(file.overrides.len());
        for o in &file.overrides {
            let blocks = match o.blocks {
                Some((start, end)) if start >= end => {
                    return Err(ChainConfigError::EmptyRange(o.label.clone()))
                }
                Some((start, end)) => Some(BlockRange { start, end }),
                None => None,
            };
            overrides.push(OracleOverride {
                label: o.label.clone(),
                tokens: address_set(&o.tokens)?,
                blocks,
                order: OracleOrder {
                    count: o.count,
                    order: order(&o.order)?,
                },
            });
        }

        Ok(ChainConfig {
            network,
            yearn_lens: file.yearn_lens.as_ref().map(contract).transpose()?,
            chainlink: file.chainlink.as_ref().map(contract).transpose()?,
            aave_oracle: file.aave_oracle.as_ref().map(contract).transpose()?,
            curve_calculations: file.curve_calculations.as_ref().map(contract).transpose()?,
            sushi_calculations: file.sushi_calculations.as_ref().map(contract).transpose()?,
            curve_registries: file
                .curve_registries
                .iter()
                .map(contract)
                .collect::<Result<_, _>>()?,
            uniswap_forks: file
                .uniswap_forks
                .iter()
                .map(contract)
                .collect::<Result<_, _>>()?,
            yearn_lens_blacklist: address_set(&file.yearn_lens_blacklist)?,
            aave_oracle_blacklist: address_set(&file.aave_oracle_blacklist)?,
            curve_calculations_blacklist: address_set(&file.curve_calculations_blacklist)?,
            sushi_calculations_blacklist: address_set(&file.sushi_calculations_blacklist)?,
            hardcoded_stables: address_set(&file.hardcoded_stables)?,
            ignore_list: address_set(&file.ignore_list)?,
            eth_address: address_or(file.eth_address.as_deref(), base.eth_address)?,
            weth_address: address_or(file.weth_address.as_deref(), base.weth_address)?,
            usdc_address: address_or(file.usdc_address.as_deref(), base.usdc_address)?,
            usdc_decimals: file.usdc_decimals.unwrap_or(base.usdc_decimals),
            default_order,
            overrides,
        })
    }
}

impl From<&ChainConfig> for ChainConfigFile {
    fn from(c: &ChainConfig) -> Self {
        Self {
            network: c.network.clone(),
            yearn_lens: c.yearn_lens.as_ref().map(contract_file),
            chainlink: c.chainlink.as_ref().map(contract_file),
            aave_oracle: c.aave_oracle.as_ref().map(contract_file),
            curve_calculations: c.curve_calculations.as_ref().map(contract_file),
            sushi_calculations: c.sushi_calculations.as_ref().map(contract_file),
            curve_registries: c.curve_registries.iter().map(contract_file).collect(),
            uniswap_forks: c.uniswap_forks.iter().map(contract_file).collect(),
            yearn_lens_blacklist: address_list(&c.yearn_lens_blacklist),
            aave_oracle_blacklist: address_list(&c.aave_oracle_blacklist),
            curve_calculations_blacklist: address_list(&c.curve_calculations_blacklist),
            sushi_calculations_blacklist: address_list(&c.sushi_calculations_blacklist),
            hardcoded_stables: address_list(&c.hardcoded_stables),
            ignore_list: address_list(&c.ignore_list),
            eth_address: Some(format_address(&c.eth_address)),
            weth_address: Some(format_address(&c.weth_address)),
            usdc_address: Some(format_address(&c.usdc_address)),
            usdc_decimals: Some(c.usdc_decimals),
            default_order: order_names(&c.default_order.order),
            default_count: Some(c.default_order.count),
            overrides: c
                .overrides
                .iter()
                .map(|o| OracleOverrideFile {
                    label: o.label.clone(),
                    tokens: address_list(&o.tokens),
                    blocks: o.blocks.map(|r| (r.start, r.end)),
                    count: o.order.count,
                    order: order_names(&o.order.order),
                })
                .collect(),
        }
    }
}
