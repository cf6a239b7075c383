use alloy::primitives::{Address, U256};
use futures::future::{join, join_all, try_join_all};
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::chain::ChainClient;
use crate::error::Result;
use crate::registry::{ChainMetadata, TokenInfo};
use crate::route::{is_native_token, PriceSource, NATIVE_TOKEN};
use crate::types::{format_amount, TokenBalance, WalletBalance};
use crate::wallet::WalletProvider;

/// Token holdings and their USD value for the wallet's account.
pub struct BalancesProvider<'a> {
    wallet: &'a WalletProvider,
    prices: &'a dyn PriceSource,
}

impl<'a> BalancesProvider<'a> {
    pub fn new(wallet: &'a WalletProvider, prices: &'a dyn PriceSource) -> Self {
        Self { wallet, prices }
    }

    /// Balances on each chain, in the order the chains were given.
    pub async fn wallet_balances(&self, chains: &[String]) -> Result<Vec<WalletBalance>> {
        try_join_all(chains.iter().map(|chain| self.chain_balance(chain))).await
    }

    #[instrument(skip(self))]
    pub async fn chain_balance(&self, chain: &str) -> Result<WalletBalance> {
        let metadata = self.wallet.registry().lookup(chain)?;
        let client = self.wallet.public_client(chain)?;
        let owner = self.wallet.address();

        let results = join_all(
            known_tokens(metadata)
                .into_iter()
                .map(|token| self.token_balance(client, metadata.chain_id, owner, token)),
        )
        .await;

        let mut tokens = Vec::new();
        for result in results {
            let token = result?;
            if !token.balance.is_zero() {
                tokens.push(token);
            }
        }
        let total: f64 = tokens.iter().map(|t| t.value_usd).sum();

        Ok(WalletBalance {
            chain: metadata.id.clone(),
            address: owner,
            total_value_usd: format!("{total:.2}"),
            tokens,
        })
    }

    async fn token_balance(
        &self,
        client: &Arc<dyn ChainClient>,
        chain_id: u64,
        owner: Address,
        token: TokenInfo,
    ) -> Result<TokenBalance> {
        let balance = async {
            if is_native_token(&token.address) {
                client.get_native_balance(owner).await
            } else {
                client.get_token_balance(token.address, owner).await
            }
        };
        let price = async {
            match self.prices.token_price(chain_id, token.address).await {
                Ok(price) => price,
                Err(err) => {
                    warn!(token = %token.symbol, chain_id, %err, "price lookup failed");
                    "0".to_string()
                }
            }
        };

        let (balance, price) = join(balance, price).await;
        let balance = balance?;
        let value_usd = token_value(balance, token.decimals, &price);

        Ok(TokenBalance {
            symbol: token.symbol,
            decimals: token.decimals,
            address: token.address,
            name: token.name,
            price,
            balance,
            value_usd,
        })
    }
}

/// Native currency first, then the chain's static token list.
fn known_tokens(chain: &ChainMetadata) -> Vec<TokenInfo> {
    let native = TokenInfo {
        address: NATIVE_TOKEN,
        symbol: chain.native_currency.symbol.clone(),
        name: chain.native_currency.name.clone(),
        decimals: chain.native_currency.decimals,
    };
    std::iter::once(native)
        .chain(chain.tokens.iter().cloned())
        .collect()
}

fn token_value(balance: U256, decimals: u8, price: &str) -> f64 {
    let amount: f64 = format_amount(balance, decimals).parse().unwrap_or(0.0);
    let price: f64 = price.parse().unwrap_or(0.0);
    amount * price
}
