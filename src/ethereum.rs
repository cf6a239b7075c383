use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{BlockNumberOrTag, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use reqwest::Url;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::chain::{ChainClient, SigningClient};
use crate::error::{Error, Result, UNRECOGNIZED_CHAIN_CODE};
use crate::registry::ChainMetadata;

// ERC-20 subset used for balances, decimals and allowance approvals
sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

/// Calldata for `approve(spender, amount)`.
pub fn encode_approve(spender: Address, amount: U256) -> Bytes {
    IERC20::approveCall { spender, amount }.abi_encode().into()
}

/// Read-only chain client over JSON-RPC.
pub struct RpcChainClient {
    rpc_url: Url,
}

impl RpcChainClient {
    pub fn new(rpc_url: Url) -> Self {
        Self { rpc_url }
    }

    pub fn for_chain(chain: &ChainMetadata) -> Self {
        Self::new(chain.rpc_url.clone())
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn get_native_balance(&self, address: Address) -> Result<U256> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());

        let balance = provider
            .get_balance(address)
            .block_id(BlockNumberOrTag::Latest.into())
            .await?;

        Ok(balance)
    }

    async fn get_token_balance(&self, token: Address, owner: Address) -> Result<U256> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());

        let contract = IERC20::new(token, provider);
        let balance: U256 = contract.balanceOf(owner).call().await?._0;

        Ok(balance)
    }

    async fn get_token_decimals(&self, token: Address) -> Result<u8> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());

        let contract = IERC20::new(token, provider);
        Ok(contract.decimals().call().await?._0)
    }

    async fn get_token_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());

        let contract = IERC20::new(token, provider);
        Ok(contract.allowance(owner, spender).call().await?._0)
    }

    async fn get_receipt_status(&self, hash: B256) -> Result<Option<bool>> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());

        let receipt = provider.get_transaction_receipt(hash).await?;
        Ok(receipt.map(|r| r.status()))
    }

    async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());

        Ok(provider.estimate_gas(&tx).await?)
    }
}

struct SignerState {
    active: u64,
    known: HashMap<u64, Url>,
}

/// Signing client backed by a local private key.
///
/// Only chains explicitly added can be switched to, mirroring how an injected
/// wallet tracks the networks it was told about.
pub struct LocalSigningClient {
    wallet: EthereumWallet,
    state: RwLock<SignerState>,
}

impl LocalSigningClient {
    pub fn new(signer: PrivateKeySigner, chain: &ChainMetadata) -> Self {
        let known = HashMap::from([(chain.chain_id, chain.rpc_url.clone())]);
        Self {
            wallet: EthereumWallet::from(signer),
            state: RwLock::new(SignerState {
                active: chain.chain_id,
                known,
            }),
        }
    }
}

#[async_trait]
impl SigningClient for LocalSigningClient {
    async fn chain_id(&self) -> u64 {
        self.state.read().await.active
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.known.contains_key(&chain_id) {
            return Err(Error::SwitchRejected {
                code: UNRECOGNIZED_CHAIN_CODE,
                message: format!("Unrecognized chain ID {chain_id}"),
            });
        }
        state.active = chain_id;
        Ok(())
    }

    async fn add_chain(&self, chain: ChainMetadata) -> Result<()> {
        debug!(chain = %chain.id, chain_id = chain.chain_id, "adding chain to signer");
        self.state
            .write()
            .await
            .known
            .insert(chain.chain_id, chain.rpc_url);
        Ok(())
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256> {
        let (chain_id, rpc_url) = {
            let state = self.state.read().await;
            let url = state.known.get(&state.active).cloned().ok_or_else(|| {
                Error::UnsupportedChain(format!("chain id {}", state.active))
            })?;
            (state.active, url)
        };

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(self.wallet.clone())
            .on_http(rpc_url);

        let pending = provider
            .send_transaction(tx.with_chain_id(chain_id))
            .await?;

        Ok(*pending.tx_hash())
    }
}
