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
use crate::route::{BridgeStatus, RouteProvider, RoutesRequest};
use crate::types::{GasEstimate, Transaction, TxStatus};
use crate::wallet::WalletProvider;

/// Cross-chain token movement.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeParams {
    pub from_chain: String,
    pub to_chain: String,
    pub from_token: Address,
    pub to_token: Address,
    pub amount: String,
    /// Recipient on the destination chain; the sender when unset.
    pub to_address: Option<Address>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeOptions {
    pub from_chain: Option<String>,
    pub to_chain: Option<String>,
    pub from_token: Option<String>,
    pub to_token: Option<String>,
    pub amount: Option<Value>,
    pub to_address: Option<String>,
}

impl BridgeOptions {
    pub fn into_params(self, current_chain: &str) -> Result<BridgeParams> {
        let to_chain = self
            .to_chain
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::InvalidParams("toChain is required".into()))?;
        let from_token = address_option("fromToken", self.from_token.as_deref())?;
        let to_token = address_option("toToken", self.to_token.as_deref())?;
        let (Some(from_token), Some(to_token)) = (from_token, to_token) else {
            return Err(Error::InvalidParams(
                "fromToken and toToken are required".into(),
            ));
        };

        Ok(BridgeParams {
            from_chain: self.from_chain.unwrap_or_else(|| current_chain.to_string()),
            to_chain,
            from_token,
            to_token,
            amount: amount_option(self.amount.as_ref())?,
            to_address: address_option("toAddress", self.to_address.as_deref())?,
        })
    }
}

pub struct BridgeAction<'a> {
    wallet: &'a mut WalletProvider,
    router: &'a dyn RouteProvider,
    executor: ExecutorConfig,
}

impl<'a> BridgeAction<'a> {
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

    /// Bridges along the aggregator's first route. Returns the source-chain transaction.
    #[instrument(skip(self, params), fields(from = %params.from_chain, to = %params.to_chain))]
    pub async fn bridge(&mut self, params: BridgeParams) -> Result<Transaction> {
        let request = self.request(&params).await?;
        self.wallet.switch_chain(&params.from_chain).await?;

        let gas = routing::estimate_gas(self.wallet, self.router, request.clone()).await;
        debug!(?gas, "bridge gas estimate");

        execute_first_route(self.wallet, self.router, request, self.executor.clone()).await
    }

    pub async fn estimate_gas(&self, params: &BridgeParams) -> Result<GasEstimate> {
        let request = self.request(params).await?;
        Ok(routing::estimate_gas(self.wallet, self.router, request).await)
    }

    /// Receipt status on the source chain only.
    pub async fn transaction_status(&self, hash: B256, params: &BridgeParams) -> Result<TxStatus> {
        super::transaction_status(self.wallet, hash, &params.from_chain).await
    }

    /// Delivery progress as tracked by the aggregator.
    pub async fn bridge_status(&self, hash: B256, params: &BridgeParams) -> Result<BridgeStatus> {
        let registry = self.wallet.registry();
        let from = registry.lookup(&params.from_chain)?.chain_id;
        let to = registry.lookup(&params.to_chain)?.chain_id;
        self.router.bridge_status(hash, None, from, to).await
    }

    async fn request(&self, params: &BridgeParams) -> Result<RoutesRequest> {
        if params.from_chain == params.to_chain {
            return Err(Error::InvalidParams(format!(
                "source and destination chain are both {}",
                params.from_chain
            )));
        }
        routes_request(
            self.wallet,
            &RouteIntent {
                from_chain: &params.from_chain,
                to_chain: &params.to_chain,
                from_token: params.from_token,
                to_token: params.to_token,
                amount: &params.amount,
                to_address: params.to_address,
                slippage: None,
            },
        )
        .await
    }
}

/// Host-facing `bridge` action.
pub struct BridgeTokens;

#[async_trait]
impl Action for BridgeTokens {
    fn name(&self) -> &'static str {
        "bridge"
    }

    fn similes(&self) -> &'static [&'static str] {
        &["BRIDGE_TOKENS", "CROSS_CHAIN_TRANSFER", "CHAIN_BRIDGE", "MOVE_CROSS_CHAIN"]
    }

    fn description(&self) -> &'static str {
        "Bridge tokens between different chains using the LI.FI aggregator"
    }

    fn examples(&self) -> Vec<Vec<ExampleMessage>> {
        vec![vec![
            ExampleMessage {
                user: "user",
                text: "Bridge 1 ETH from Ethereum to Base",
                action: None,
            },
            ExampleMessage {
                user: "agent",
                text: "Sure, I'll bridge 1 ETH from Ethereum to Base.",
                action: Some("CROSS_CHAIN_TRANSFER"),
            },
        ]]
    }

    async fn handle(
        &self,
        ctx: &mut PluginContext,
        options: &Value,
        callback: &mut Callback<'_>,
    ) -> HandlerOutcome {
        let result = async {
            ensure_valid(self, ctx)?;
            let options: BridgeOptions = serde_json::from_value(options.clone())
                .map_err(|e| Error::InvalidParams(e.to_string()))?;
            let params = options.into_params(ctx.wallet.current_chain())?;
            let summary = format!(
                "{} tokens from {} to {}",
                params.amount, params.from_chain, params.to_chain
            );
            let tx = BridgeAction::new(&mut ctx.wallet, ctx.router.as_ref())
                .with_executor(ctx.executor.clone())
                .bridge(params)
                .await?;
            let text = format!("Successfully bridged {summary}\nTransaction Hash: {}", tx.hash);
            Ok::<_, Error>((tx, text))
        }
        .await;

        respond(result, callback, |reason| Error::BridgeFailed { reason })
    }
}
