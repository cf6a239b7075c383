use alloy::primitives::Address;
use reqwest::Url;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::{Config, Settings};
use crate::error::{Error, Result};

/// Native currency descriptor for a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Static token list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
}

/// Metadata for a supported chain.
#[derive(Debug, Clone)]
pub struct ChainMetadata {
    /// Registry identifier, e.g. `"base"`.
    pub id: String,
    pub chain_id: u64,
    pub name: String,
    pub native_currency: NativeCurrency,
    pub rpc_url: Url,
    pub block_explorer_url: String,
    pub tokens: Vec<TokenInfo>,
}

impl ChainMetadata {
    pub fn explorer_tx_url(&self, hash: impl std::fmt::Display) -> String {
        format!("{}/tx/{}", self.block_explorer_url.trim_end_matches('/'), hash)
    }

    /// Finds a token from the static list by address.
    pub fn token(&self, address: &Address) -> Option<&TokenInfo> {
        self.tokens.iter().find(|t| &t.address == address)
    }
}

/// Immutable chain registry, built once and shared.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: BTreeMap<String, ChainMetadata>,
}

impl ChainRegistry {
    /// Builds the registry from chain configuration, applying any RPC overrides.
    pub fn from_config(config: &Config, rpc_overrides: &HashMap<String, String>) -> Result<Self> {
        let mut chains = BTreeMap::new();
        let mut seen = HashSet::new();

        for (id, chain) in &config.chains {
            if !seen.insert(chain.chain_id) {
                return Err(Error::Config(format!(
                    "chain id {} is declared more than once",
                    chain.chain_id
                )));
            }

            let rpc = rpc_overrides.get(id).unwrap_or(&chain.rpc);
            let rpc_url: Url = rpc
                .parse()
                .map_err(|e| Error::Config(format!("invalid rpc url for {id}: {e}")))?;

            let mut tokens = chain
                .tokens
                .iter()
                .map(|(symbol, token)| {
                    let address = token.address.parse().map_err(|e| {
                        Error::Config(format!("invalid address for {symbol} on {id}: {e}"))
                    })?;
                    Ok(TokenInfo {
                        address,
                        symbol: symbol.clone(),
                        name: token.name.clone(),
                        decimals: token.decimals,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            tokens.sort_by(|a, b| a.symbol.cmp(&b.symbol));

            chains.insert(
                id.clone(),
                ChainMetadata {
                    id: id.clone(),
                    chain_id: chain.chain_id,
                    name: chain.name.clone(),
                    native_currency: NativeCurrency {
                        name: chain.native_token.name.clone(),
                        symbol: chain.native_token.symbol.clone(),
                        decimals: chain.native_token.decimals,
                    },
                    rpc_url,
                    block_explorer_url: chain.explorer.clone(),
                    tokens,
                },
            );
        }

        Ok(Self { chains })
    }

    /// Registry from the embedded chain list and the given settings.
    pub fn load(settings: &Settings) -> Result<Self> {
        Self::from_config(&Config::load()?, &settings.rpc_overrides)
    }

    pub fn lookup(&self, id: &str) -> Result<&ChainMetadata> {
        self.chains
            .get(id)
            .ok_or_else(|| Error::UnsupportedChain(id.to_string()))
    }

    pub fn by_chain_id(&self, chain_id: u64) -> Option<&ChainMetadata> {
        self.chains.values().find(|c| c.chain_id == chain_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.chains.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainMetadata> {
        self.chains.values()
    }
}
