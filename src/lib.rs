pub mod actions;
mod balances;
mod chain;
mod config;
mod error;
mod ethereum;
mod executor;
mod lifi;
mod plugin;
mod registry;
mod route;
mod types;
mod wallet;

#[cfg(test)]
mod test_support;

pub use actions::{
    BridgeAction, BridgeParams, BridgeTokens, SwapAction, SwapParams, SwapTokens,
    TransferAction, TransferParams, TransferTokens,
};
pub use balances::BalancesProvider;
pub use chain::{ChainClient, SigningClient};
pub use config::{ChainConfig, Config, LifiSettings, Settings};
pub use error::{Error, Result};
pub use ethereum::{LocalSigningClient, RpcChainClient};
pub use executor::{ExecutorConfig, RouteExecutor};
pub use lifi::LifiClient;
pub use plugin::{
    wallet_context, Action, ActionResponse, Callback, ExampleMessage, HandlerOutcome, Plugin,
    PluginContext, ResponseStatus,
};
pub use registry::{ChainMetadata, ChainRegistry, NativeCurrency, TokenInfo};
pub use route::{
    BridgeStatus, PriceSource, Process, ProcessKind, ProcessStatus, Route, RouteExecution,
    RouteProvider, RouteStep, RouteToken, RoutesRequest, StepAction, StepKind,
};
pub use types::{GasEstimate, TokenBalance, Transaction, TxStatus, WalletBalance, WalletStatus};
pub use wallet::WalletProvider;

/// Balances of the configured wallet on each of `chains`, priced through LI.FI.
///
/// Settings are read from the environment.
pub async fn get_balances(chains: &[String]) -> Result<Vec<WalletBalance>> {
    let config = Config::load()?;
    let ctx = PluginContext::from_settings(Settings::from_env(&config))?;
    BalancesProvider::new(&ctx.wallet, ctx.prices.as_ref())
        .wallet_balances(chains)
        .await
}
