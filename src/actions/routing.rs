//! Route discovery, gas estimation and execution shared by swaps and bridges.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, U256};
use alloy::rpc::types::TransactionRequest;
use tracing::{info, warn};

use super::{parse_amount, token_decimals};
use crate::error::{Error, Result};
use crate::executor::{ExecutorConfig, RouteExecutor};
use crate::route::{
    is_native_token, ProcessStatus, Route, RouteProvider, RoutesRequest,
    DEFAULT_SLIPPAGE,
};
use crate::types::{GasEstimate, Transaction};
use crate::wallet::WalletProvider;

/// A token movement to route, as requested by a swap or a bridge.
pub(crate) struct RouteIntent<'p> {
    pub from_chain: &'p str,
    pub to_chain: &'p str,
    pub from_token: Address,
    pub to_token: Address,
    pub amount: &'p str,
    pub to_address: Option<Address>,
    pub slippage: Option<f64>,
}

pub(crate) async fn routes_request(
    wallet: &WalletProvider,
    intent: &RouteIntent<'_>,
) -> Result<RoutesRequest> {
    let registry = wallet.registry();
    let from_chain = registry.lookup(intent.from_chain)?;
    let to_chain = registry.lookup(intent.to_chain)?;

    let decimals = token_decimals(wallet, from_chain, intent.from_token).await?;
    let from_amount = parse_amount(intent.amount, decimals)?;
    if from_amount.is_zero() {
        return Err(Error::InvalidParams("amount must be greater than zero".into()));
    }

    let slippage = intent.slippage.unwrap_or(DEFAULT_SLIPPAGE);
    if !(0.0..1.0).contains(&slippage) {
        return Err(Error::InvalidParams(format!(
            "slippage must be a fraction between 0 and 1, got {slippage}"
        )));
    }

    Ok(RoutesRequest {
        from_chain_id: from_chain.chain_id,
        to_chain_id: to_chain.chain_id,
        from_token: intent.from_token,
        to_token: intent.to_token,
        from_amount,
        from_address: wallet.address(),
        to_address: intent.to_address.unwrap_or_else(|| wallet.address()),
        slippage,
    })
}

/// Gas for the first transaction of the aggregator's preferred route.
pub(crate) async fn estimate_gas(
    wallet: &WalletProvider,
    router: &dyn RouteProvider,
    request: RoutesRequest,
) -> GasEstimate {
    let routes = match router.get_routes(request).await {
        Ok(routes) => routes,
        Err(err) => {
            warn!(%err, "route lookup for gas estimate failed");
            return GasEstimate::Unavailable {
                reason: err.to_string(),
            };
        }
    };
    let Some(route) = routes.into_iter().next() else {
        return GasEstimate::Unavailable {
            reason: Error::NoRouteFound.to_string(),
        };
    };

    match estimate_route(wallet, router, &route).await {
        Ok(gas) => GasEstimate::Estimated(gas),
        Err(err) => {
            warn!(route = %route.id, %err, "gas estimation failed");
            GasEstimate::Unavailable {
                reason: err.to_string(),
            }
        }
    }
}

async fn estimate_route(
    wallet: &WalletProvider,
    router: &dyn RouteProvider,
    route: &Route,
) -> Result<u64> {
    let step = route.steps.first().ok_or(Error::NoRouteFound)?;
    let from = wallet.address();

    let tx = match step.approval() {
        Some(approval) => approval.to_request(from),
        None => {
            let actions = router.step_actions(step.clone(), from).await?;
            let call = actions
                .iter()
                .rev()
                .find(|a| !a.is_approval())
                .ok_or_else(|| Error::TransactionFailed(format!("step {} has no transaction", step.id)))?;
            let value = if is_native_token(&route.from_token.address) {
                route.from_amount
            } else {
                U256::ZERO
            };
            let tx = TransactionRequest::default()
                .with_from(from)
                .with_to(call.target())
                .with_value(value);
            match call.data() {
                Some(data) => tx.with_input(data),
                None => tx,
            }
        }
    };

    let chain = wallet
        .registry()
        .by_chain_id(route.from_chain_id)
        .ok_or_else(|| Error::UnsupportedChain(format!("chain id {}", route.from_chain_id)))?;
    wallet.public_client(&chain.id)?.estimate_gas(tx).await
}

/// Executes the aggregator's first route and reports its main transaction.
pub(crate) async fn execute_first_route(
    wallet: &WalletProvider,
    router: &dyn RouteProvider,
    request: RoutesRequest,
    config: ExecutorConfig,
) -> Result<Transaction> {
    let routes = router.get_routes(request).await?;
    let route = routes.into_iter().next().ok_or(Error::NoRouteFound)?;
    info!(route = %route.id, steps = route.steps.len(), "executing route");

    let execution = RouteExecutor::with_config(wallet, router, config)
        .execute(&route)
        .await?;

    let first = execution
        .first_process()
        .ok_or_else(|| Error::TransactionFailed("route execution reported no status".into()))?;
    if first.status == ProcessStatus::Failed {
        return Err(Error::TransactionFailed(
            first
                .message
                .clone()
                .unwrap_or_else(|| "transaction reverted".into()),
        ));
    }

    let step = execution
        .first_step()
        .ok_or_else(|| Error::TransactionFailed("route execution reported no status".into()))?;
    let main = step
        .process
        .last()
        .filter(|p| p.status != ProcessStatus::Failed)
        .and_then(|p| p.tx_hash)
        .ok_or_else(|| Error::TransactionFailed("route transaction was not sent".into()))?;
    let action = step
        .main_action()
        .ok_or_else(|| Error::TransactionFailed("route has no transaction".into()))?;

    Ok(Transaction {
        hash: main,
        from: wallet.address(),
        to: action.target(),
        value: route.from_amount,
        data: action.data(),
        chain_id: Some(route.from_chain_id),
    })
}
