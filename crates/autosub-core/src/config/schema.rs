//! Configuration schema for autosub.toml
//!
//! Every scalar is optional so scopes can be layered: a value set in the
//! project file overrides the global one, unset values fall back to the
//! built-in defaults when the configuration is resolved into [`Settings`].

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::assets::AssetSpec;
use crate::deploy::{DeploySettings, ToggleMode};
use crate::types::amount::parse_amount;
use crate::types::{Address, ChainId, NATIVE_TOKEN};

pub const DEFAULT_API_URL: &str = "https://gtw.dev.brahma.fi/v1/";
pub const DEFAULT_EXPLORER_URL: &str = "https://explorer.swellnetwork.io";
pub const DEFAULT_CHAIN_ID: ChainId = 1923;
pub const DEFAULT_REGISTRY_ID: &str = "33238f96-1314-4f95-838f-d114bbd281ce";
pub const DEFAULT_REWARD_TOKEN: Address =
    alloy_primitives::address!("da1F8EA667dc5600F5f654DF44b47F1639a83DD1");
pub const DEFAULT_REWARD_INTERVAL: u64 = 3600;
pub const DEFAULT_REWARD_TOKEN_LIMIT: &str = "100000";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 1800;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const API_KEY_ENV: &str = "AUTOSUB_API_KEY";
pub const INDEXER_API_KEY_ENV: &str = "AUTOSUB_INDEXER_API_KEY";

/// Keys accepted by [`AutosubConfig::get`] and [`AutosubConfig::set`].
pub const CONFIG_KEYS: &[&str] = &[
    "api_url",
    "api_key",
    "rpc_url",
    "wallet_rpc_url",
    "chain_id",
    "fee_token",
    "registry_id",
    "operator_address",
    "reward_token",
    "reward_interval",
    "reward_token_limit",
    "explorer_url",
    "indexer_url",
    "indexer_api_key",
    "poll_interval_secs",
    "poll_timeout_secs",
    "request_timeout_secs",
    "toggle_mode",
];

/// Root configuration structure for autosub.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutosubConfig {
    /// Deployer service base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// JSON-RPC endpoint for chain reads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,

    /// JSON-RPC endpoint that holds the owner's keys; defaults to `rpc_url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_rpc_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<ChainId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_token: Option<Address>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_id: Option<String>,

    /// Contract exposing `operators` / `toggleOperator`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_address: Option<Address>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_token: Option<Address>,

    /// Seconds between automation runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_interval: Option<u64>,

    /// Spend limit for the reward token, in its smallest unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_token_limit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,

    /// Indexer base URL; the indexer is skipped when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexer_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexer_api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u64>,

    /// `0` polls until a terminal status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toggle_mode: Option<ToggleMode>,

    /// Tokens listed by `balances`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assets: Vec<AssetSpec>,
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: Url,
    pub api_key: Option<String>,
    pub rpc_url: Option<Url>,
    pub wallet_rpc_url: Option<Url>,
    pub indexer_url: Option<Url>,
    pub indexer_api_key: Option<String>,
    pub request_timeout: Duration,
    pub operator_address: Option<Address>,
    pub assets: Vec<AssetSpec>,
    pub chain_id: ChainId,
    pub fee_token: Address,
    pub registry_id: String,
    pub reward_token: Address,
    pub reward_interval: u64,
    pub reward_token_limit: alloy_primitives::U256,
    pub explorer_url: Url,
    pub poll_interval: Duration,
    pub poll_timeout: Option<Duration>,
    pub toggle_mode: ToggleMode,
}

impl Settings {
    /// Settings for the deploy flow; requires an operator contract.
    pub fn deploy_settings(&self) -> anyhow::Result<DeploySettings> {
        let operator_contract = self.operator_address.ok_or_else(|| {
            anyhow::anyhow!(
                "operator_address is not configured (set it with `autosub config set operator_address <address>`)"
            )
        })?;
        Ok(DeploySettings {
            chain_id: self.chain_id,
            fee_token: self.fee_token,
            registry_id: self.registry_id.clone(),
            operator_contract,
            reward_token: self.reward_token,
            reward_interval: self.reward_interval,
            reward_token_limit: self.reward_token_limit,
            explorer_url: self.explorer_url.clone(),
            poll_interval: self.poll_interval,
            poll_timeout: self.poll_timeout,
            toggle_mode: self.toggle_mode,
        })
    }

    pub fn require_rpc_url(&self) -> anyhow::Result<&Url> {
        self.rpc_url.as_ref().ok_or_else(|| {
            anyhow::anyhow!("rpc_url is not configured (set it with `autosub config set rpc_url <url>`)")
        })
    }

    pub fn require_wallet_rpc_url(&self) -> anyhow::Result<&Url> {
        match &self.wallet_rpc_url {
            Some(url) => Ok(url),
            None => self.require_rpc_url(),
        }
    }
}

impl AutosubConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values that can be checked without defaults.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (key, value) in [
            ("api_url", &self.api_url),
            ("rpc_url", &self.rpc_url),
            ("wallet_rpc_url", &self.wallet_rpc_url),
            ("explorer_url", &self.explorer_url),
            ("indexer_url", &self.indexer_url),
        ] {
            if let Some(raw) = value {
                parse_url(key, raw)?;
            }
        }

        if let Some(limit) = &self.reward_token_limit {
            parse_amount(limit)
                .map_err(|e| anyhow::anyhow!("Invalid reward_token_limit: {}", e))?;
        }
        if self.poll_interval_secs == Some(0) {
            anyhow::bail!("poll_interval_secs must be greater than zero");
        }
        if self.request_timeout_secs == Some(0) {
            anyhow::bail!("request_timeout_secs must be greater than zero");
        }
        if self.reward_interval == Some(0) {
            anyhow::bail!("reward_interval must be greater than zero");
        }
        if let Some(registry_id) = &self.registry_id
            && registry_id.trim().is_empty()
        {
            anyhow::bail!("registry_id must not be empty");
        }

        let mut seen = std::collections::HashSet::new();
        for asset in &self.assets {
            if !seen.insert(asset.token) {
                anyhow::bail!("Duplicate asset entry for token {}", asset.token);
            }
        }
        Ok(())
    }

    /// Resolve into runtime settings, reading API keys from the process
    /// environment.
    pub fn resolve(&self) -> anyhow::Result<Settings> {
        self.resolve_with_env(|key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with_env(&self, env: impl Fn(&str) -> Option<String>) -> anyhow::Result<Settings> {
        self.validate()?;

        let api_url = parse_url("api_url", self.api_url.as_deref().unwrap_or(DEFAULT_API_URL))?;
        let rpc_url = self
            .rpc_url
            .as_deref()
            .map(|raw| parse_url("rpc_url", raw))
            .transpose()?;
        let wallet_rpc_url = self
            .wallet_rpc_url
            .as_deref()
            .map(|raw| parse_url("wallet_rpc_url", raw))
            .transpose()?;
        let indexer_url = self
            .indexer_url
            .as_deref()
            .map(|raw| parse_url("indexer_url", raw))
            .transpose()?;
        let explorer_url = parse_url(
            "explorer_url",
            self.explorer_url.as_deref().unwrap_or(DEFAULT_EXPLORER_URL),
        )?;
        let reward_token_limit = parse_amount(
            self.reward_token_limit
                .as_deref()
                .unwrap_or(DEFAULT_REWARD_TOKEN_LIMIT),
        )
        .map_err(|e| anyhow::anyhow!("Invalid reward_token_limit: {}", e))?;

        let poll_timeout = match self.poll_timeout_secs.unwrap_or(DEFAULT_POLL_TIMEOUT_SECS) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let assets = if self.assets.is_empty() {
            vec![AssetSpec::native()]
        } else {
            self.assets.clone()
        };

        Ok(Settings {
            api_url,
            api_key: env(API_KEY_ENV).or_else(|| self.api_key.clone()),
            rpc_url,
            wallet_rpc_url,
            indexer_url,
            indexer_api_key: env(INDEXER_API_KEY_ENV).or_else(|| self.indexer_api_key.clone()),
            request_timeout: Duration::from_secs(
                self.request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            operator_address: self.operator_address,
            assets,
            chain_id: self.chain_id.unwrap_or(DEFAULT_CHAIN_ID),
            fee_token: self.fee_token.unwrap_or(NATIVE_TOKEN),
            registry_id: self
                .registry_id
                .clone()
                .unwrap_or_else(|| DEFAULT_REGISTRY_ID.to_string()),
            reward_token: self.reward_token.unwrap_or(DEFAULT_REWARD_TOKEN),
            reward_interval: self.reward_interval.unwrap_or(DEFAULT_REWARD_INTERVAL),
            reward_token_limit,
            explorer_url,
            poll_interval: Duration::from_secs(
                self.poll_interval_secs.unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            ),
            poll_timeout,
            toggle_mode: self.toggle_mode.unwrap_or_default(),
        })
    }

    /// Current value of a scalar key, rendered as a string.
    pub fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let value = match key {
            "api_url" => self.api_url.clone(),
            "api_key" => self.api_key.clone(),
            "rpc_url" => self.rpc_url.clone(),
            "wallet_rpc_url" => self.wallet_rpc_url.clone(),
            "chain_id" => self.chain_id.map(|v| v.to_string()),
            "fee_token" => self.fee_token.map(|v| v.to_string()),
            "registry_id" => self.registry_id.clone(),
            "operator_address" => self.operator_address.map(|v| v.to_string()),
            "reward_token" => self.reward_token.map(|v| v.to_string()),
            "reward_interval" => self.reward_interval.map(|v| v.to_string()),
            "reward_token_limit" => self.reward_token_limit.clone(),
            "explorer_url" => self.explorer_url.clone(),
            "indexer_url" => self.indexer_url.clone(),
            "indexer_api_key" => self.indexer_api_key.clone(),
            "poll_interval_secs" => self.poll_interval_secs.map(|v| v.to_string()),
            "poll_timeout_secs" => self.poll_timeout_secs.map(|v| v.to_string()),
            "request_timeout_secs" => self.request_timeout_secs.map(|v| v.to_string()),
            "toggle_mode" => self.toggle_mode.map(|v| v.to_string()),
            other => anyhow::bail!("Unknown config key '{}'", other),
        };
        Ok(value)
    }

    /// Set a scalar key from its string form.
    pub fn set(&mut self, key: &str, raw: &str) -> anyhow::Result<()> {
        let value = raw.trim().to_string();
        match key {
            "api_url" => self.api_url = Some(value),
            "api_key" => self.api_key = Some(value),
            "rpc_url" => self.rpc_url = Some(value),
            "wallet_rpc_url" => self.wallet_rpc_url = Some(value),
            "chain_id" => self.chain_id = Some(parse_number(key, &value)?),
            "fee_token" => self.fee_token = Some(parse_address(key, &value)?),
            "registry_id" => self.registry_id = Some(value),
            "operator_address" => self.operator_address = Some(parse_address(key, &value)?),
            "reward_token" => self.reward_token = Some(parse_address(key, &value)?),
            "reward_interval" => self.reward_interval = Some(parse_number(key, &value)?),
            "reward_token_limit" => self.reward_token_limit = Some(value),
            "explorer_url" => self.explorer_url = Some(value),
            "indexer_url" => self.indexer_url = Some(value),
            "indexer_api_key" => self.indexer_api_key = Some(value),
            "poll_interval_secs" => self.poll_interval_secs = Some(parse_number(key, &value)?),
            "poll_timeout_secs" => self.poll_timeout_secs = Some(parse_number(key, &value)?),
            "request_timeout_secs" => {
                self.request_timeout_secs = Some(parse_number(key, &value)?)
            }
            "toggle_mode" => {
                self.toggle_mode = Some(value.parse().map_err(|e: String| anyhow::anyhow!(e))?)
            }
            other => anyhow::bail!("Unknown config key '{}'", other),
        }
        self.validate()
            .with_context(|| format!("Invalid value for '{}'", key))
    }

    /// Clear a scalar key. Returns whether it was set.
    pub fn unset(&mut self, key: &str) -> anyhow::Result<bool> {
        let was_set = self.get(key)?.is_some();
        match key {
            "api_url" => self.api_url = None,
            "api_key" => self.api_key = None,
            "rpc_url" => self.rpc_url = None,
            "wallet_rpc_url" => self.wallet_rpc_url = None,
            "chain_id" => self.chain_id = None,
            "fee_token" => self.fee_token = None,
            "registry_id" => self.registry_id = None,
            "operator_address" => self.operator_address = None,
            "reward_token" => self.reward_token = None,
            "reward_interval" => self.reward_interval = None,
            "reward_token_limit" => self.reward_token_limit = None,
            "explorer_url" => self.explorer_url = None,
            "indexer_url" => self.indexer_url = None,
            "indexer_api_key" => self.indexer_api_key = None,
            "poll_interval_secs" => self.poll_interval_secs = None,
            "poll_timeout_secs" => self.poll_timeout_secs = None,
            "request_timeout_secs" => self.request_timeout_secs = None,
            "toggle_mode" => self.toggle_mode = None,
            other => anyhow::bail!("Unknown config key '{}'", other),
        }
        Ok(was_set)
    }
}

fn parse_url(key: &str, raw: &str) -> anyhow::Result<Url> {
    Url::parse(raw).with_context(|| format!("Invalid URL for '{}': {}", key, raw))
}

fn parse_address(key: &str, raw: &str) -> anyhow::Result<Address> {
    raw.parse::<Address>()
        .with_context(|| format!("Invalid address for '{}': {}", key, raw))
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .with_context(|| format!("Invalid number for '{}': {}", key, raw))
}
