use alloy::primitives::{Address, B256, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

use crate::error::Result;
use crate::registry::ChainMetadata;

/// Read-only access to one chain.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Native currency balance in the smallest unit.
    async fn get_native_balance(&self, address: Address) -> Result<U256>;

    /// ERC-20 balance of `owner` in the token's smallest unit.
    async fn get_token_balance(&self, token: Address, owner: Address) -> Result<U256>;

    async fn get_token_decimals(&self, token: Address) -> Result<u8>;

    /// Amount of `token` that `spender` may move on behalf of `owner`.
    async fn get_token_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256>;

    /// Receipt status of a mined transaction, `None` while it has no receipt yet.
    async fn get_receipt_status(&self, hash: B256) -> Result<Option<bool>>;

    async fn estimate_gas(&self, tx: TransactionRequest) -> Result<u64>;
}

/// A client that can authorize and submit transactions for the held account.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SigningClient: Send + Sync {
    /// Chain id transactions are currently submitted to.
    async fn chain_id(&self) -> u64;

    /// Makes `chain_id` the active chain. Fails with a 4902 rejection when unknown.
    async fn switch_chain(&self, chain_id: u64) -> Result<()>;

    /// Teaches the client about a chain so it can be switched to.
    async fn add_chain(&self, chain: ChainMetadata) -> Result<()>;

    /// Signs and broadcasts on the active chain, returning the transaction hash.
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256>;
}
