use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::routing::{self, execute_first_route, routes_request, RouteIntent};
use super::{address_option, amount_option};
use crate::error::{Error, Result};
use crate::executor::ExecutorConfig;
use crate::plugin::{
    ensure_valid, respond, Action, Callback, ExampleMessage, HandlerOutcome, PluginContext,
};
use crate::route::{RouteProvider, RoutesRequest};
use crate::types::{GasEstimate, Transaction, TxStatus};
use crate::wallet::WalletProvider;

/// Same-chain token swap.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapParams {
    pub chain: String,
    pub from_token: Address,
    pub to_token: Address,
    pub amount: String,
    /// Fraction, e.g. `0.005` for 0.5%.
    pub slippage: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapOptions {
    pub chain: Option<String>,
    pub from_token: Option<String>,
    pub to_token: Option<String>,
    pub amount: Option<Value>,
    pub slippage: Option<f64>,
}

impl SwapOptions {
    pub fn into_params(self, current_chain: &str) -> Result<SwapParams> {
        let from_token = address_option("fromToken", self.from_token.as_deref())?;
        let to_token = address_option("toToken", self.to_token.as_deref())?;
        let (Some(from_token), Some(to_token)) = (from_token, to_token) else {
            return Err(Error::InvalidParams(
                "fromToken and toToken are required".into(),
            ));
        };

        Ok(SwapParams {
            chain: self.chain.unwrap_or_else(|| current_chain.to_string()),
            from_token,
            to_token,
            amount: amount_option(self.amount.as_ref())?,
            slippage: self.slippage,
        })
    }
}

pub struct SwapAction<'a> {
    wallet: &'a mut WalletProvider,
    router: &'a dyn RouteProvider,
    executor: ExecutorConfig,
}

impl<'a> SwapAction<'a> {
    pub fn new(wallet: &'a mut WalletProvider, router: &'a dyn RouteProvider) -> Self {
        Self {
            wallet,
            router,
            executor: ExecutorConfig::default(),
        }
    }

    pub fn with_executor(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }

    /// Swaps along the aggregator's first route and returns its main transaction.
    #[instrument(skip(self, params), fields(chain = %params.chain, from = %params.from_token, to = %params.to_token))]
    pub async fn swap(&mut self, params: SwapParams) -> Result<Transaction> {
        self.wallet.switch_chain(&params.chain).await?;

        let request = self.request(&params).await?;
        let gas = routing::estimate_gas(self.wallet, self.router, request.clone()).await;
        debug!(?gas, "swap gas estimate");

        execute_first_route(self.wallet, self.router, request, self.executor.clone()).await
    }

    /// Gas for the swap's first transaction. Parameter errors are returned as
    /// `Err`; route or estimator failures as [`GasEstimate::Unavailable`].
    pub async fn estimate_gas(&self, params: &SwapParams) -> Result<GasEstimate> {
        let request = self.request(params).await?;
        Ok(routing::estimate_gas(self.wallet, self.router, request).await)
    }

    pub async fn transaction_status(&self, hash: B256, chain: &str) -> Result<TxStatus> {
        super::transaction_status(self.wallet, hash, chain).await
    }

    async fn request(&self, params: &SwapParams) -> Result<RoutesRequest> {
        routes_request(
            self.wallet,
            &RouteIntent {
                from_chain: &params.chain,
                to_chain: &params.chain,
                from_token: params.from_token,
                to_token: params.to_token,
                amount: &params.amount,
                to_address: None,
                slippage: params.slippage,
            },
        )
        .await
    }
}

/// Host-facing `SWAP_TOKENS` action.
pub struct SwapTokens;

#[async_trait]
impl Action for SwapTokens {
    fn name(&self) -> &'static str {
        "SWAP_TOKENS"
    }

    fn similes(&self) -> &'static [&'static str] {
        &["TOKEN_SWAP", "EXCHANGE_TOKENS", "TRADE_TOKENS"]
    }

    fn description(&self) -> &'static str {
        "Swap tokens on the same chain using the LI.FI aggregator"
    }

    fn examples(&self) -> Vec<Vec<ExampleMessage>> {
        vec![
            vec![
                ExampleMessage {
                    user: "user",
                    text: "Swap 1 ETH for USDC on Base",
                    action: None,
                },
                ExampleMessage {
                    user: "agent",
                    text: "I'll swap 1 ETH for USDC on Base.",
                    action: Some("SWAP_TOKENS"),
                },
            ],
            vec![
                ExampleMessage {
                    user: "user",
                    text: "Exchange 100 USDC for WETH with 1% slippage",
                    action: None,
                },
                ExampleMessage {
                    user: "agent",
                    text: "Swapping 100 USDC for WETH with 1% slippage.",
                    action: Some("SWAP_TOKENS"),
                },
            ],
        ]
    }

    async fn handle(
        &self,
        ctx: &mut PluginContext,
        options: &Value,
        callback: &mut Callback<'_>,
    ) -> HandlerOutcome {
        let result = async {
            ensure_valid(self, ctx)?;
            let options: SwapOptions = serde_json::from_value(options.clone())
                .map_err(|e| Error::InvalidParams(e.to_string()))?;
            let params = options.into_params(ctx.wallet.current_chain())?;

            let status = ctx.wallet.wallet_status().await;
            if !status.connected {
                return Err(Error::WalletNotConnected);
            }
            if status.balance.parse::<f64>().unwrap_or(0.0) <= 0.0 {
                return Err(Error::InvalidParams("wallet has no balance".into()));
            }

            let amount = params.amount.clone();
            let (from, to) = (params.from_token, params.to_token);
            let tx = SwapAction::new(&mut ctx.wallet, ctx.router.as_ref())
                .with_executor(ctx.executor.clone())
                .swap(params)
                .await?;
            let text = format!(
                "Successfully swapped {amount} {from} for {to}\nTransaction Hash: {}",
                tx.hash
            );
            Ok::<_, Error>((tx, text))
        }
        .await;

        respond(result, callback, |reason| Error::SwapFailed { reason })
    }
}
