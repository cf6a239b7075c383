use alloy::primitives::{address, Address, U256};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::chain::{ChainClient, MockChainClient, MockSigningClient, SigningClient};
use crate::config::{Config, Settings};
use crate::executor::ExecutorConfig;
use crate::plugin::PluginContext;
use crate::registry::ChainRegistry;
use crate::route::{MockPriceSource, MockRouteProvider, Route, RouteStep, RouteToken, StepKind};
use crate::wallet::WalletProvider;

/// First well-known anvil development key.
pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub fn test_address() -> Address {
    address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
}

pub fn registry() -> Arc<ChainRegistry> {
    Arc::new(ChainRegistry::from_config(&Config::load().unwrap(), &HashMap::new()).unwrap())
}

/// Wallet on `chain` with the given read clients; chains without one get an
/// expectation-free mock that panics if used.
pub fn wallet_with(
    chain: &str,
    clients: Vec<(&str, MockChainClient)>,
    signer: Option<MockSigningClient>,
) -> WalletProvider {
    let registry = registry();
    let mut public_clients: HashMap<String, Arc<dyn ChainClient>> = registry
        .ids()
        .map(|id| {
            let client: Arc<dyn ChainClient> = Arc::new(MockChainClient::new());
            (id.to_string(), client)
        })
        .collect();
    for (id, client) in clients {
        public_clients.insert(id.to_string(), Arc::new(client));
    }
    let signing_client = signer.map(|s| Arc::new(s) as Arc<dyn SigningClient>);

    WalletProvider::with_clients(
        TEST_KEY.parse().unwrap(),
        registry,
        chain,
        public_clients,
        signing_client,
    )
    .unwrap()
}

/// A one-step LI.FI route in wire format.
pub fn lifi_route_json(
    from_chain: u64,
    to_chain: u64,
    from_token: &str,
    to_token: &str,
    from_amount: &str,
) -> serde_json::Value {
    let step_type = if from_chain == to_chain { "swap" } else { "cross" };
    json!({
        "id": "route-1",
        "fromChainId": from_chain,
        "toChainId": to_chain,
        "fromAmount": from_amount,
        "toAmount": "990000",
        "fromAddress": test_address(),
        "toAddress": test_address(),
        "fromToken": {
            "address": from_token,
            "chainId": from_chain,
            "symbol": "FROM",
            "decimals": 18,
            "name": "From Token",
            "priceUSD": "1.00"
        },
        "toToken": {
            "address": to_token,
            "chainId": to_chain,
            "symbol": "TO",
            "decimals": 6,
            "name": "To Token",
            "priceUSD": "1.00"
        },
        "steps": [{
            "id": "step-1",
            "type": step_type,
            "tool": "1inch",
            "action": {
                "fromChainId": from_chain,
                "toChainId": to_chain,
                "fromAmount": from_amount,
                "fromToken": { "address": from_token, "chainId": from_chain, "symbol": "FROM", "decimals": 18, "name": "From Token" },
                "toToken": { "address": to_token, "chainId": to_chain, "symbol": "TO", "decimals": 6, "name": "To Token" }
            },
            "estimate": {
                "approvalAddress": "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE",
                "fromAmount": from_amount,
                "toAmount": "990000"
            }
        }]
    })
}

/// A decoded one-step route from `from_token` on `from_chain_id`.
pub fn route(from_chain_id: u64, to_chain_id: u64, from_token: Address, from_amount: u64) -> Route {
    let token = |address: Address, chain_id: u64| RouteToken {
        address,
        chain_id,
        symbol: "T".into(),
        decimals: 18,
        name: "Token".into(),
    };
    Route {
        id: "route-1".into(),
        from_chain_id,
        to_chain_id,
        from_token: token(from_token, from_chain_id),
        to_token: token(Address::repeat_byte(0x77), to_chain_id),
        from_amount: U256::from(from_amount),
        to_amount: U256::from(from_amount),
        from_address: test_address(),
        to_address: test_address(),
        steps: vec![RouteStep {
            id: "step-1".into(),
            tool: "1inch".into(),
            kind: if from_chain_id == to_chain_id {
                StepKind::Swap
            } else {
                StepKind::Cross
            },
            from_chain_id,
            to_chain_id,
            from_token,
            from_amount: U256::from(from_amount),
            approval_address: Some(address!("1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE")),
            raw: serde_json::Value::Null,
        }],
    }
}

pub fn fast_executor() -> ExecutorConfig {
    ExecutorConfig {
        poll_interval: Duration::ZERO,
        max_receipt_polls: 3,
    }
}

/// Handler context around `wallet`, routing through `router`.
pub fn context(wallet: WalletProvider, router: MockRouteProvider) -> PluginContext {
    let config = Config::load().unwrap();
    let settings = Settings::from_lookup(&config, |k| {
        (k == "EVM_PRIVATE_KEY").then(|| TEST_KEY.to_string())
    });
    PluginContext {
        settings,
        wallet,
        router: Arc::new(router),
        prices: Arc::new(MockPriceSource::new()),
        executor: fast_executor(),
    }
}
