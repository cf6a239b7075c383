use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::error;

use crate::actions::{BridgeTokens, SwapTokens, TransferTokens};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::executor::ExecutorConfig;
use crate::lifi::LifiClient;
use crate::registry::ChainRegistry;
use crate::route::{PriceSource, RouteProvider};
use crate::types::Transaction;
use crate::wallet::WalletProvider;

/// Everything an action handler needs from the host process.
pub struct PluginContext {
    pub settings: Settings,
    pub wallet: WalletProvider,
    pub router: Arc<dyn RouteProvider>,
    pub prices: Arc<dyn PriceSource>,
    pub executor: ExecutorConfig,
}

impl PluginContext {
    /// Wallet and LI.FI clients built from `settings`.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let registry = Arc::new(ChainRegistry::load(&settings)?);
        let wallet =
            WalletProvider::initialize(settings.private_key.as_deref(), registry, &settings.chain)?;
        let lifi = Arc::new(LifiClient::new(&settings.lifi)?);

        Ok(Self {
            settings,
            wallet,
            router: lifi.clone(),
            prices: lifi,
            executor: ExecutorConfig::default(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Message passed back to the host through the handler callback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResponse {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: ResponseStatus,
}

impl ActionResponse {
    pub fn success(text: String, transaction: &Transaction) -> Self {
        Self {
            text,
            content: serde_json::to_value(transaction).ok(),
            error: None,
            status: ResponseStatus::Success,
        }
    }

    pub fn failure(err: &Error) -> Self {
        Self {
            text: format!("Error: {err}"),
            content: None,
            error: Some(err.to_string()),
            status: ResponseStatus::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    Success(Transaction),
    Failure,
}

impl HandlerOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, HandlerOutcome::Success(_))
    }
}

/// One turn of an example dialogue used for intent matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExampleMessage {
    pub user: &'static str,
    pub text: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'static str>,
}

pub type Callback<'c> = dyn FnMut(ActionResponse) + Send + 'c;

/// An action a host runtime can dispatch to.
#[async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> &'static str;

    /// Alternative names the host matches intents against.
    fn similes(&self) -> &'static [&'static str];

    fn description(&self) -> &'static str;

    fn examples(&self) -> Vec<Vec<ExampleMessage>>;

    /// Whether the action can run with these settings.
    fn validate(&self, settings: &Settings) -> bool {
        settings.has_valid_private_key()
    }

    /// Runs the action. Failures are reported through `callback`, never returned.
    async fn handle(
        &self,
        ctx: &mut PluginContext,
        options: &Value,
        callback: &mut Callback<'_>,
    ) -> HandlerOutcome;
}

/// Fails when `action` cannot run with the context's settings.
pub(crate) fn ensure_valid<A: Action + ?Sized>(action: &A, ctx: &PluginContext) -> Result<()> {
    if action.validate(&ctx.settings) {
        Ok(())
    } else {
        Err(Error::InvalidCredential(
            "EVM_PRIVATE_KEY is missing or malformed".into(),
        ))
    }
}

/// Report the result of an action through the callback.
pub(crate) fn respond(
    result: Result<(Transaction, String)>,
    callback: &mut Callback<'_>,
    wrap: impl FnOnce(String) -> Error,
) -> HandlerOutcome {
    match result {
        Ok((tx, text)) => {
            callback(ActionResponse::success(text, &tx));
            HandlerOutcome::Success(tx)
        }
        Err(err) => {
            let err = match err {
                e @ (Error::TransferFailed { .. }
                | Error::SwapFailed { .. }
                | Error::BridgeFailed { .. }) => e,
                other => wrap(other.to_string()),
            };
            error!(%err, "action failed");
            callback(ActionResponse::failure(&err));
            HandlerOutcome::Failure
        }
    }
}

/// Plugin bundle handed to a host.
pub struct Plugin {
    pub name: &'static str,
    pub description: &'static str,
    pub actions: Vec<Box<dyn Action>>,
}

impl Plugin {
    pub fn evm() -> Self {
        Self {
            name: "evm",
            description: "EVM wallet transfers, token swaps and cross-chain bridging",
            actions: vec![
                Box::new(TransferTokens),
                Box::new(SwapTokens),
                Box::new(BridgeTokens),
            ],
        }
    }

    /// Finds an action by name or simile, ignoring case.
    pub fn action(&self, name: &str) -> Option<&dyn Action> {
        self.actions
            .iter()
            .find(|a| {
                a.name().eq_ignore_ascii_case(name)
                    || a.similes().iter().any(|s| s.eq_ignore_ascii_case(name))
            })
            .map(|a| a.as_ref())
    }
}

/// Wallet summary text a host injects into its prompts.
pub async fn wallet_context(wallet: &WalletProvider) -> String {
    let status = wallet.wallet_status().await;
    let (symbol, chain_name, chain_id) = match wallet.current_chain_metadata() {
        Ok(chain) => (
            chain.native_currency.symbol.as_str(),
            chain.name.as_str(),
            chain.chain_id,
        ),
        Err(_) => ("ETH", status.chain.as_str(), 0),
    };
    format!(
        "EVM Wallet Address: {}\nBalance: {} {}\nChain ID: {}, Name: {}",
        status.address, status.balance, symbol, chain_id, chain_name
    )
}
