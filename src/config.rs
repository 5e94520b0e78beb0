//! Configuration module for the payment session engine
//!
//! This module handles configuration loading from TOML files, `.env` files and
//! `SOLPAY_*` environment variables, and provides structured configuration types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::allocator::AllocationPolicy;
use crate::ledger::RetryConfig;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletFlowConfig {
    /// Ledger RPC configuration
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Mobile wallet deep-link configuration
    #[serde(default)]
    pub deeplink: DeepLinkConfig,

    /// Transfer planning
    #[serde(default)]
    pub transfer: TransferConfig,

    /// Confirmation polling
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// Commitment used for balance and blockhash queries
    #[serde(default = "default_commitment")]
    pub commitment: String,

    /// Max attempts per request (including the first)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff between attempts in milliseconds
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepLinkConfig {
    /// Universal link the mobile wallet handles for connect
    #[serde(default = "default_connect_base")]
    pub connect_base: String,

    /// Universal link prefix for signing; the payload is appended as a path segment
    #[serde(default = "default_sign_base")]
    pub sign_base: String,

    /// Query marker set on the return URL after a connect round trip
    #[serde(default = "default_connected_marker")]
    pub connected_marker: String,

    /// Query marker set on the return URL after a signing round trip
    #[serde(default = "default_tx_success_marker")]
    pub tx_success_marker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Lamports kept back from the balance to pay the network fee
    #[serde(default = "default_fee_reserve")]
    pub fee_reserve_lamports: u64,

    /// Clamp the request to the spendable balance, or reject it
    #[serde(default)]
    pub policy: AllocationPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    /// Delay between signature status polls in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Give up after this many seconds; `None` waits indefinitely
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

// Default value functions
fn default_rpc_url() -> String { "https://api.mainnet-beta.solana.com".to_string() }
fn default_rpc_timeout() -> u64 { 30 }
fn default_commitment() -> String { "confirmed".to_string() }
fn default_max_attempts() -> u32 { 3 }
fn default_base_backoff_ms() -> u64 { 100 }
fn default_connect_base() -> String { "https://phantom.app/ul/v1/connect".to_string() }
fn default_sign_base() -> String { "https://phantom.app/ul/v1/sign".to_string() }
fn default_connected_marker() -> String { "phantom_connected".to_string() }
fn default_tx_success_marker() -> String { "tx_success".to_string() }
fn default_fee_reserve() -> u64 { 5_000 }
fn default_poll_interval_ms() -> u64 { 500 }

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            timeout_secs: default_rpc_timeout(),
            commitment: default_commitment(),
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
        }
    }
}

impl Default for DeepLinkConfig {
    fn default() -> Self {
        Self {
            connect_base: default_connect_base(),
            sign_base: default_sign_base(),
            connected_marker: default_connected_marker(),
            tx_success_marker: default_tx_success_marker(),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            fee_reserve_lamports: default_fee_reserve(),
            policy: AllocationPolicy::default(),
        }
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: None,
        }
    }
}

impl Default for WalletFlowConfig {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            deeplink: DeepLinkConfig::default(),
            transfer: TransferConfig::default(),
            confirmation: ConfirmationConfig::default(),
        }
    }
}

impl RpcConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            base_backoff_ms: self.base_backoff_ms,
            ..RetryConfig::default()
        }
    }
}

impl ConfirmationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl WalletFlowConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: WalletFlowConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` and `SOLPAY_<SECTION>__<KEY>` overrides
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config: WalletFlowConfig = ::config::Config::builder()
            .add_source(::config::File::new(path, ::config::FileFormat::Toml).required(false))
            .add_source(
                ::config::Environment::with_prefix("SOLPAY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc.url.trim().is_empty() {
            anyhow::bail!("rpc.url must not be empty");
        }
        if self.rpc.max_attempts == 0 {
            anyhow::bail!("rpc.max_attempts must be at least 1");
        }
        if !matches!(self.rpc.commitment.as_str(), "processed" | "confirmed" | "finalized") {
            anyhow::bail!(
                "rpc.commitment must be processed, confirmed or finalized, got {}",
                self.rpc.commitment
            );
        }
        if self.confirmation.poll_interval_ms == 0 {
            anyhow::bail!("confirmation.poll_interval_ms must be greater than zero");
        }
        for (name, value) in [
            ("deeplink.connect_base", &self.deeplink.connect_base),
            ("deeplink.sign_base", &self.deeplink.sign_base),
        ] {
            url::Url::parse(value)
                .map_err(|e| anyhow::anyhow!("{} is not a valid url: {}", name, e))?;
        }
        Ok(())
    }
}
