use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument};

use super::{address_option, amount_option, parse_amount};
use crate::error::{Error, Result};
use crate::plugin::{
    ensure_valid, respond, Action, Callback, ExampleMessage, HandlerOutcome, PluginContext,
};
use crate::types::Transaction;
use crate::wallet::WalletProvider;

#[derive(Debug, Clone, PartialEq)]
pub struct TransferParams {
    pub from_chain: String,
    pub to_address: Address,
    /// Decimal amount of the chain's native currency.
    pub amount: String,
    pub data: Option<Bytes>,
}

/// Free-form handler options, as sent by the host.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOptions {
    pub from_chain: Option<String>,
    pub to_address: Option<String>,
    pub amount: Option<Value>,
    pub data: Option<String>,
}

impl TransferOptions {
    /// Resolves options into params; a missing chain means `current_chain`.
    pub fn into_params(self, current_chain: &str) -> Result<TransferParams> {
        let to_address = address_option("toAddress", self.to_address.as_deref())?
            .ok_or_else(|| Error::InvalidParams("toAddress is required".into()))?;
        let data = self
            .data
            .filter(|d| !d.is_empty() && d != "0x")
            .map(|d| {
                d.parse::<Bytes>()
                    .map_err(|e| Error::InvalidParams(format!("invalid data {d:?}: {e}")))
            })
            .transpose()?;

        Ok(TransferParams {
            from_chain: self.from_chain.unwrap_or_else(|| current_chain.to_string()),
            to_address,
            amount: amount_option(self.amount.as_ref())?,
            data,
        })
    }
}

/// Native-currency transfer from the wallet's account.
pub struct TransferAction<'a> {
    wallet: &'a mut WalletProvider,
}

impl<'a> TransferAction<'a> {
    pub fn new(wallet: &'a mut WalletProvider) -> Self {
        Self { wallet }
    }

    #[instrument(skip(self, params), fields(chain = %params.from_chain, to = %params.to_address))]
    pub async fn transfer(&mut self, params: TransferParams) -> Result<Transaction> {
        let decimals = self
            .wallet
            .registry()
            .lookup(&params.from_chain)?
            .native_currency
            .decimals;
        let value = parse_amount(&params.amount, decimals)?;
        self.send(params, value)
            .await
            .map_err(|err| Error::TransferFailed {
                reason: err.to_string(),
            })
    }

    async fn send(&mut self, params: TransferParams, value: U256) -> Result<Transaction> {
        self.wallet.switch_chain(&params.from_chain).await?;

        let from = self.wallet.address();
        let mut request = TransactionRequest::default()
            .with_from(from)
            .with_to(params.to_address)
            .with_value(value);
        if let Some(data) = &params.data {
            request = request.with_input(data.clone());
        }

        let hash = self.wallet.signing_client()?.send_transaction(request).await?;
        let chain_id = self.wallet.current_chain_metadata()?.chain_id;
        info!(%hash, %value, "transfer sent");

        Ok(Transaction {
            hash,
            from,
            to: params.to_address,
            value,
            data: params.data,
            chain_id: Some(chain_id),
        })
    }
}

/// Host-facing `transfer` action.
pub struct TransferTokens;

#[async_trait]
impl Action for TransferTokens {
    fn name(&self) -> &'static str {
        "transfer"
    }

    fn similes(&self) -> &'static [&'static str] {
        &["TRANSFER_TOKENS", "SEND_TOKENS", "SEND_ETH", "PAY"]
    }

    fn description(&self) -> &'static str {
        "Transfer native tokens between addresses on the same chain"
    }

    fn examples(&self) -> Vec<Vec<ExampleMessage>> {
        vec![vec![
            ExampleMessage {
                user: "user",
                text: "Transfer 1 ETH to 0x742d35Cc6634C0532925a3b844Bc454e4438f44e",
                action: None,
            },
            ExampleMessage {
                user: "agent",
                text: "Sure, I'll transfer 1 ETH to that address now.",
                action: Some("SEND_TOKENS"),
            },
            ExampleMessage {
                user: "agent",
                text: "Successfully transferred 1 ETH to 0x742d35Cc6634C0532925a3b844Bc454e4438f44e\nTransaction: 0xdde850f9257365fffffc11324726ebdcf5b90b01c6eec9b3e7ab3e81fde6f14b",
                action: None,
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
            let options: TransferOptions = serde_json::from_value(options.clone())
                .map_err(|e| Error::InvalidParams(e.to_string()))?;
            let params = options.into_params(ctx.wallet.current_chain())?;
            let amount = params.amount.clone();
            let tx = TransferAction::new(&mut ctx.wallet).transfer(params).await?;
            let text = format!(
                "Successfully transferred {amount} tokens to {}\nTransaction Hash: {}",
                tx.to, tx.hash
            );
            Ok::<_, Error>((tx, text))
        }
        .await;

        respond(result, callback, |reason| Error::TransferFailed { reason })
    }
}
