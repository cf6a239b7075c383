use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::chain::{ChainClient, SigningClient};
use crate::config::is_valid_private_key;
use crate::error::{Error, Result};
use crate::ethereum::{LocalSigningClient, RpcChainClient};
use crate::registry::{ChainMetadata, ChainRegistry};
use crate::types::{format_amount, WalletStatus};

/// Wallet holding one signing account across all registry chains.
pub struct WalletProvider {
    account: PrivateKeySigner,
    registry: Arc<ChainRegistry>,
    current_chain: String,
    public_clients: HashMap<String, Arc<dyn ChainClient>>,
    signing_client: Option<Arc<dyn SigningClient>>,
}

impl WalletProvider {
    /// Derives the account from `secret` and connects RPC clients for every chain.
    pub fn initialize(
        secret: Option<&str>,
        registry: Arc<ChainRegistry>,
        chain: &str,
    ) -> Result<Self> {
        let account = parse_account(secret)?;
        let current = registry.lookup(chain)?;

        let public_clients = registry
            .iter()
            .map(|c| {
                let client: Arc<dyn ChainClient> = Arc::new(RpcChainClient::for_chain(c));
                (c.id.clone(), client)
            })
            .collect();
        let signing_client: Arc<dyn SigningClient> =
            Arc::new(LocalSigningClient::new(account.clone(), current));

        Self::with_clients(
            account,
            registry,
            chain,
            public_clients,
            Some(signing_client),
        )
    }

    /// Builds a wallet from prebuilt clients.
    pub fn with_clients(
        account: PrivateKeySigner,
        registry: Arc<ChainRegistry>,
        chain: &str,
        public_clients: HashMap<String, Arc<dyn ChainClient>>,
        signing_client: Option<Arc<dyn SigningClient>>,
    ) -> Result<Self> {
        registry.lookup(chain)?;
        Ok(Self {
            account,
            registry,
            current_chain: chain.to_string(),
            public_clients,
            signing_client,
        })
    }

    pub fn address(&self) -> Address {
        self.account.address()
    }

    pub fn registry(&self) -> &Arc<ChainRegistry> {
        &self.registry
    }

    pub fn current_chain(&self) -> &str {
        &self.current_chain
    }

    pub fn current_chain_metadata(&self) -> Result<&ChainMetadata> {
        self.registry.lookup(&self.current_chain)
    }

    pub fn public_client(&self, chain: &str) -> Result<&Arc<dyn ChainClient>> {
        self.public_clients
            .get(chain)
            .ok_or_else(|| Error::UnsupportedChain(chain.to_string()))
    }

    pub fn signing_client(&self) -> Result<&Arc<dyn SigningClient>> {
        self.signing_client.as_ref().ok_or(Error::WalletNotConnected)
    }

    pub fn attach_signing_client(&mut self, client: Arc<dyn SigningClient>) {
        self.signing_client = Some(client);
    }

    /// Native balance on the current chain as a decimal string.
    pub async fn wallet_balance(&self) -> Result<String> {
        let chain = self.current_chain_metadata()?;
        let client = self.public_client(&chain.id)?;
        let balance = client.get_native_balance(self.address()).await?;
        Ok(format_amount(balance, chain.native_currency.decimals))
    }

    /// Makes `target` the active chain for all subsequent signing.
    ///
    /// A signer that does not know the chain gets it added once, then the switch is
    /// retried once. Every other rejection is returned as is.
    #[instrument(skip(self), fields(from = %self.current_chain))]
    pub async fn switch_chain(&mut self, target: &str) -> Result<()> {
        let signing = Arc::clone(self.signing_client()?);
        let chain = self.registry.lookup(target)?.clone();

        if self.current_chain == target {
            debug!("already on requested chain");
            return Ok(());
        }

        match signing.switch_chain(chain.chain_id).await {
            Ok(()) => {}
            Err(err) if err.is_unrecognized_chain() => {
                info!(chain_id = chain.chain_id, "signer does not know chain, adding it");
                signing.add_chain(chain.clone()).await?;
                signing.switch_chain(chain.chain_id).await?;
            }
            Err(err) => return Err(err),
        }

        info!(to = %target, "switched chain");
        self.current_chain = chain.id;
        Ok(())
    }

    /// Wallet summary; a failed balance read reports a disconnected wallet.
    pub async fn wallet_status(&self) -> WalletStatus {
        let address = self.address();
        let chain = self.current_chain.clone();

        match self.wallet_balance().await {
            Ok(balance) => WalletStatus {
                connected: self.signing_client.is_some(),
                balance,
                address,
                chain,
            },
            Err(err) => {
                warn!(%err, "failed to read wallet balance");
                WalletStatus {
                    connected: false,
                    balance: "0".to_string(),
                    address,
                    chain,
                }
            }
        }
    }
}

fn parse_account(secret: Option<&str>) -> Result<PrivateKeySigner> {
    let secret =
        secret.ok_or_else(|| Error::InvalidCredential("EVM_PRIVATE_KEY is not set".into()))?;
    if !is_valid_private_key(secret) {
        return Err(Error::InvalidCredential(
            "private key must be 0x-prefixed 32-byte hex".into(),
        ));
    }
    secret
        .parse()
        .map_err(|e| Error::InvalidCredential(format!("{e}")))
}
