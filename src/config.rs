//! Client configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ClientError, Result};
use crate::types::Amount;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Wallet provider JSON-RPC endpoint
    #[serde(default = "default_wallet_url")]
    pub rpc_url: String,

    /// Poll interval for account/network change detection in milliseconds
    #[serde(default = "default_wallet_poll")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Contract gateway JSON-RPC endpoint
    #[serde(default = "default_chain_url")]
    pub rpc_url: String,

    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Upper bound on a confirmation wait in seconds
    #[serde(default = "default_tx_timeout")]
    pub tx_timeout_secs: u64,

    /// Receipt poll interval in milliseconds
    #[serde(default = "default_receipt_poll")]
    pub receipt_poll_ms: u64,

    /// Native-currency amount attached to a tip, in ether units
    #[serde(default = "default_tip_amount")]
    pub tip_amount: String,

    /// Native-currency amount attached to an event join, in ether units
    #[serde(default = "default_join_fee")]
    pub join_fee: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Pinning proxy API endpoint. Credentials for the upstream pinning
    /// service live in the proxy, never in this client.
    #[serde(default = "default_store_api")]
    pub api_url: String,

    /// Read gateway serving pinned content by CID
    #[serde(default = "default_store_gateway")]
    pub gateway_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

// Defaults
fn default_wallet_url() -> String {
    "http://127.0.0.1:8545".to_string()
}
fn default_wallet_poll() -> u64 {
    2000
}
fn default_chain_url() -> String {
    "http://127.0.0.1:8545".to_string()
}
fn default_http_timeout() -> u64 {
    30
}
fn default_tx_timeout() -> u64 {
    90
}
fn default_receipt_poll() -> u64 {
    1000
}
fn default_tip_amount() -> String {
    "0.1".to_string()
}
fn default_join_fee() -> String {
    "5.0".to_string()
}
fn default_store_api() -> String {
    "http://127.0.0.1:3100".to_string()
}
fn default_store_gateway() -> String {
    "http://127.0.0.1:3100/ipfs".to_string()
}
fn default_store_timeout() -> u64 {
    30
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_wallet_url(),
            poll_interval_ms: default_wallet_poll(),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_chain_url(),
            http_timeout_secs: default_http_timeout(),
            tx_timeout_secs: default_tx_timeout(),
            receipt_poll_ms: default_receipt_poll(),
            tip_amount: default_tip_amount(),
            join_fee: default_join_fee(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_url: default_store_api(),
            gateway_url: default_store_gateway(),
            timeout_secs: default_store_timeout(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wallet: WalletConfig::default(),
            chain: ChainConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    /// Load from a TOML file, or fall back to defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClientError::InvalidConfig(format!("{}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| ClientError::InvalidConfig(format!("{}: {e}", path.display())))
    }

    pub fn tip_amount(&self) -> Result<Amount> {
        Amount::parse_ether(&self.chain.tip_amount)
    }

    pub fn join_fee(&self) -> Result<Amount> {
        Amount::parse_ether(&self.chain.join_fee)
    }
}
