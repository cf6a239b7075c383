use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Default LI.FI API base URL.
pub const DEFAULT_LIFI_API_URL: &str = "https://li.quest/v1";

/// Integrator tag sent with every aggregator request.
pub const DEFAULT_INTEGRATOR: &str = "evm-actions";

/// Configuration for all supported chains
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub chains: HashMap<String, ChainConfig>,
}

/// Configuration for a single chain
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
    pub name: String,
    #[serde(rename = "chainId")]
    pub chain_id: u64,
    pub rpc: String,
    pub explorer: String,
    #[serde(rename = "nativeToken")]
    pub native_token: NativeTokenConfig,
    #[serde(default)]
    pub tokens: HashMap<String, TokenConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NativeTokenConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Token information from config
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    pub name: String,
    pub address: String,
    pub decimals: u8,
}

impl Config {
    /// Load configuration from embedded JSON
    pub fn load() -> Result<Self> {
        let config_str = include_str!("../chains.json");
        Self::from_json(config_str)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    /// Get a specific chain configuration
    pub fn get_chain(&self, chain_name: &str) -> Option<&ChainConfig> {
        self.chains.get(chain_name)
    }
}

/// Settings supplied by the hosting environment.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub private_key: Option<String>,
    pub chain: String,
    /// RPC endpoint overrides keyed by chain identifier.
    pub rpc_overrides: HashMap<String, String>,
    pub lifi: LifiSettings,
}

#[derive(Debug, Clone)]
pub struct LifiSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub integrator: String,
}

impl Default for LifiSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_LIFI_API_URL.to_string(),
            api_key: None,
            integrator: DEFAULT_INTEGRATOR.to_string(),
        }
    }
}

impl Settings {
    /// Read settings from process environment variables.
    pub fn from_env(config: &Config) -> Self {
        Self::from_lookup(config, |key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    ///
    /// Per-chain RPC overrides come from `ETHEREUM_PROVIDER_<CHAIN>`; `EVM_PROVIDER_URL`
    /// overrides mainnet when no chain-specific value is present.
    pub fn from_lookup<F>(config: &Config, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut rpc_overrides = HashMap::new();
        for id in config.chains.keys() {
            let key = format!("ETHEREUM_PROVIDER_{}", id.to_uppercase());
            if let Some(url) = non_empty(&key) {
                rpc_overrides.insert(id.clone(), url);
            }
        }
        if let Some(url) = non_empty("EVM_PROVIDER_URL") {
            rpc_overrides.entry("mainnet".to_string()).or_insert(url);
        }

        let defaults = LifiSettings::default();
        Self {
            private_key: non_empty("EVM_PRIVATE_KEY"),
            chain: non_empty("EVM_CHAIN").unwrap_or_else(|| "mainnet".to_string()),
            rpc_overrides,
            lifi: LifiSettings {
                api_url: non_empty("LIFI_API_URL").unwrap_or(defaults.api_url),
                api_key: non_empty("LIFI_API_KEY"),
                integrator: non_empty("LIFI_INTEGRATOR").unwrap_or(defaults.integrator),
            },
        }
    }

    /// True when a private key is configured and shaped like `0x` + 64 hex digits.
    pub fn has_valid_private_key(&self) -> bool {
        self.private_key
            .as_deref()
            .map(is_valid_private_key)
            .unwrap_or(false)
    }
}

pub fn is_valid_private_key(key: &str) -> bool {
    match key.strip_prefix("0x") {
        Some(hex) => hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_load_config() {
        let config = Config::load().unwrap();
        assert!(config.chains.contains_key("mainnet"));
        assert!(config.chains.contains_key("sepolia"));
        assert!(config.chains.contains_key("base"));
    }

    #[test]
    fn test_sepolia_config() {
        let config = Config::load().unwrap();
        let sepolia = config.get_chain("sepolia").unwrap();
        assert_eq!(sepolia.chain_id, 11155111);
        assert_eq!(sepolia.native_token.decimals, 18);
        assert!(sepolia.tokens.contains_key("USDC"));
        assert!(sepolia.tokens.contains_key("EURC"));
    }

    #[test]
    fn test_settings_from_lookup() {
        let config = Config::load().unwrap();
        let settings = Settings::from_lookup(&config, |key| match key {
            "EVM_PRIVATE_KEY" => Some(KEY.to_string()),
            "EVM_CHAIN" => Some("base".to_string()),
            "ETHEREUM_PROVIDER_BASE" => Some("http://localhost:8545".to_string()),
            "EVM_PROVIDER_URL" => Some("http://localhost:9545".to_string()),
            "LIFI_API_KEY" => Some("".to_string()),
            _ => None,
        });

        assert_eq!(settings.chain, "base");
        assert!(settings.has_valid_private_key());
        assert_eq!(settings.rpc_overrides["base"], "http://localhost:8545");
        assert_eq!(settings.rpc_overrides["mainnet"], "http://localhost:9545");
        assert_eq!(settings.lifi.api_key, None);
        assert_eq!(settings.lifi.api_url, DEFAULT_LIFI_API_URL);
    }

    #[test]
    fn test_settings_defaults() {
        let config = Config::load().unwrap();
        let settings = Settings::from_lookup(&config, |_| None);
        assert_eq!(settings.chain, "mainnet");
        assert!(!settings.has_valid_private_key());
        assert!(settings.rpc_overrides.is_empty());
    }

    #[test]
    fn test_private_key_shape() {
        assert!(is_valid_private_key(KEY));
        assert!(!is_valid_private_key(&KEY[2..]));
        assert!(!is_valid_private_key("0x1234"));
        assert!(!is_valid_private_key(&KEY.replace('a', "z")));
    }
}
