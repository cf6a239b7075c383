use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::LifiSettings;
use crate::error::{Error, Result};
use crate::route::{
    BridgeStatus, PriceSource, Route, RouteProvider, RouteStep, RouteToken,
    RoutesRequest, StepAction, StepKind,
};

/// Route ordering requested from the aggregator; the first route returned is used.
const ROUTE_ORDER: &str = "RECOMMENDED";

/// HTTP client for the LI.FI aggregator API.
#[derive(Debug, Clone)]
pub struct LifiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    integrator: String,
}

impl LifiClient {
    pub fn new(settings: &LifiSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("evm-actions/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.api_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            integrator: settings.integrator.clone(),
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.get(format!("{}{}", self.base_url, path)))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.post(format!("{}{}", self.base_url, path)))
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("x-lifi-api-key", key),
            None => req,
        }
    }
}

async fn read_json<T: for<'de> Deserialize<'de>>(resp: Response) -> Result<T> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        // LI.FI errors carry a `message` field
        let reason = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str().map(String::from)))
            .unwrap_or_else(|| format!("HTTP {status}"));
        return Err(Error::Network(format!("LI.FI: {reason}")));
    }
    Ok(serde_json::from_str(&body)?)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoutesBody<'a> {
    from_chain_id: u64,
    to_chain_id: u64,
    from_token_address: Address,
    to_token_address: Address,
    from_amount: String,
    from_address: Address,
    to_address: Address,
    options: RouteOptions<'a>,
}

#[derive(Serialize)]
struct RouteOptions<'a> {
    slippage: f64,
    order: &'static str,
    integrator: &'a str,
}

#[derive(Deserialize)]
struct RoutesResponse {
    #[serde(default)]
    routes: Vec<WireRoute>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRoute {
    id: String,
    from_chain_id: u64,
    to_chain_id: u64,
    from_amount: String,
    to_amount: String,
    from_address: Option<Address>,
    to_address: Option<Address>,
    from_token: WireToken,
    to_token: WireToken,
    steps: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireToken {
    address: Address,
    chain_id: u64,
    symbol: String,
    decimals: u8,
    #[serde(default)]
    name: String,
}

impl From<WireToken> for RouteToken {
    fn from(t: WireToken) -> Self {
        RouteToken {
            address: t.address,
            chain_id: t.chain_id,
            symbol: t.symbol,
            decimals: t.decimals,
            name: t.name,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireStep {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    tool: String,
    action: WireAction,
    #[serde(default)]
    estimate: Option<WireEstimate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAction {
    from_chain_id: u64,
    to_chain_id: u64,
    from_amount: String,
    from_token: WireToken,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEstimate {
    approval_address: Option<Address>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StepTransactionResponse {
    transaction_request: Option<WireTransactionRequest>,
}

#[derive(Deserialize)]
struct WireTransactionRequest {
    to: Address,
    #[serde(default)]
    data: Option<Bytes>,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(rename = "priceUSD")]
    price_usd: Option<String>,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: String,
}

fn parse_amount(value: &str) -> Result<U256> {
    value
        .parse()
        .map_err(|e| Error::Network(format!("malformed amount {value:?}: {e}")))
}

fn decode_step(raw: serde_json::Value) -> Result<RouteStep> {
    let wire: WireStep = serde_json::from_value(raw.clone())?;
    let kind = match wire.kind.as_str() {
        "swap" => StepKind::Swap,
        "cross" => StepKind::Cross,
        "lifi" => StepKind::Lifi,
        _ => StepKind::Protocol,
    };

    Ok(RouteStep {
        id: wire.id,
        tool: wire.tool,
        kind,
        from_chain_id: wire.action.from_chain_id,
        to_chain_id: wire.action.to_chain_id,
        from_token: wire.action.from_token.address,
        from_amount: parse_amount(&wire.action.from_amount)?,
        approval_address: wire.estimate.and_then(|e| e.approval_address),
        raw,
    })
}

fn decode_route(wire: WireRoute, request: &RoutesRequest) -> Result<Route> {
    Ok(Route {
        id: wire.id,
        from_chain_id: wire.from_chain_id,
        to_chain_id: wire.to_chain_id,
        from_token: wire.from_token.into(),
        to_token: wire.to_token.into(),
        from_amount: parse_amount(&wire.from_amount)?,
        to_amount: parse_amount(&wire.to_amount)?,
        from_address: wire.from_address.unwrap_or(request.from_address),
        to_address: wire.to_address.unwrap_or(request.to_address),
        steps: wire
            .steps
            .into_iter()
            .map(decode_step)
            .collect::<Result<Vec<_>>>()?,
    })
}

/// Approval (when needed) followed by the step's populated transaction.
fn decode_step_actions(step: &RouteStep, response: StepTransactionResponse) -> Result<Vec<StepAction>> {
    let tx = response.transaction_request.ok_or_else(|| {
        Error::Network(format!("LI.FI returned no transaction for step {}", step.id))
    })?;
    let value = match tx.value.as_deref() {
        Some(v) => parse_amount(v)?,
        None => U256::ZERO,
    };

    let mut actions = Vec::with_capacity(2);
    if let Some(approval) = step.approval() {
        actions.push(approval);
    }
    actions.push(StepAction::from_transaction(
        tx.to,
        tx.data.unwrap_or_default(),
        value,
    ));
    Ok(actions)
}

fn decode_status(status: &str) -> BridgeStatus {
    match status {
        "DONE" => BridgeStatus::Done,
        "PENDING" => BridgeStatus::Pending,
        "FAILED" => BridgeStatus::Failed,
        _ => BridgeStatus::NotFound,
    }
}

#[async_trait]
impl RouteProvider for LifiClient {
    #[instrument(skip(self, request), fields(from = request.from_chain_id, to = request.to_chain_id))]
    async fn get_routes(&self, request: RoutesRequest) -> Result<Vec<Route>> {
        let body = RoutesBody {
            from_chain_id: request.from_chain_id,
            to_chain_id: request.to_chain_id,
            from_token_address: request.from_token,
            to_token_address: request.to_token,
            from_amount: request.from_amount.to_string(),
            from_address: request.from_address,
            to_address: request.to_address,
            options: RouteOptions {
                slippage: request.slippage,
                order: ROUTE_ORDER,
                integrator: &self.integrator,
            },
        };

        let resp = self.post("/advanced/routes").json(&body).send().await?;
        let response: RoutesResponse = read_json(resp).await?;
        debug!(count = response.routes.len(), "received routes");

        response
            .routes
            .into_iter()
            .map(|r| decode_route(r, &request))
            .collect()
    }

    async fn step_actions(&self, step: RouteStep, _from: Address) -> Result<Vec<StepAction>> {
        let resp = self
            .post("/advanced/stepTransaction")
            .json(&step.raw)
            .send()
            .await?;
        let response: StepTransactionResponse = read_json(resp).await?;
        decode_step_actions(&step, response)
    }

    async fn bridge_status(
        &self,
        tx_hash: B256,
        bridge: Option<String>,
        from_chain_id: u64,
        to_chain_id: u64,
    ) -> Result<BridgeStatus> {
        let mut query = vec![
            ("txHash", tx_hash.to_string()),
            ("fromChain", from_chain_id.to_string()),
            ("toChain", to_chain_id.to_string()),
        ];
        if let Some(bridge) = bridge {
            query.push(("bridge", bridge));
        }

        let resp = self.get("/status").query(&query).send().await?;
        let response: StatusResponse = read_json(resp).await?;
        Ok(decode_status(&response.status))
    }
}

#[async_trait]
impl PriceSource for LifiClient {
    async fn token_price(&self, chain_id: u64, token: Address) -> Result<String> {
        let resp = self
            .get("/token")
            .query(&[("chain", chain_id.to_string()), ("token", token.to_string())])
            .send()
            .await?;
        let response: TokenResponse = read_json(resp).await?;
        Ok(response.price_usd.unwrap_or_else(|| "0".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::NATIVE_TOKEN;
    use crate::test_support::{lifi_route_json, test_address};
    use serde_json::json;

    const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";

    fn request() -> RoutesRequest {
        RoutesRequest {
            from_chain_id: 1,
            to_chain_id: 1,
            from_token: USDC.parse().unwrap(),
            to_token: NATIVE_TOKEN,
            from_amount: U256::from(1_000_000u64),
            from_address: test_address(),
            to_address: test_address(),
            slippage: 0.005,
        }
    }

    #[test]
    fn test_routes_body_shape() {
        let request = request();
        let body = RoutesBody {
            from_chain_id: 1,
            to_chain_id: 10,
            from_token_address: request.from_token,
            to_token_address: request.to_token,
            from_amount: request.from_amount.to_string(),
            from_address: request.from_address,
            to_address: request.to_address,
            options: RouteOptions {
                slippage: 0.005,
                order: ROUTE_ORDER,
                integrator: "evm-actions",
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["fromChainId"], 1);
        assert_eq!(value["toChainId"], 10);
        assert_eq!(value["fromAmount"], "1000000");
        assert_eq!(value["options"]["order"], "RECOMMENDED");
        assert_eq!(value["options"]["slippage"], 0.005);
    }

    #[test]
    fn test_decode_route() {
        let json = lifi_route_json(1, 1, USDC, "0x0000000000000000000000000000000000000000", "1000000");
        let wire: WireRoute = serde_json::from_value(json).unwrap();
        let route = decode_route(wire, &request()).unwrap();

        assert_eq!(route.id, "route-1");
        assert_eq!(route.from_amount, U256::from(1_000_000u64));
        assert_eq!(route.to_amount, U256::from(990_000u64));
        assert_eq!(route.from_address, test_address());
        assert_eq!(route.steps.len(), 1);

        let step = &route.steps[0];
        assert_eq!(step.kind, StepKind::Swap);
        assert_eq!(step.tool, "1inch");
        assert!(!step.is_cross_chain());
        assert!(step.approval_address.is_some());
        assert!(step.approval().is_some());
    }

    #[test]
    fn test_decode_cross_chain_step() {
        let json = lifi_route_json(1, 8453, USDC, "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913", "5");
        let wire: WireRoute = serde_json::from_value(json).unwrap();
        let route = decode_route(wire, &request()).unwrap();
        assert_eq!(route.steps[0].kind, StepKind::Cross);
        assert!(route.steps[0].is_cross_chain());
    }

    #[test]
    fn test_decode_step_actions_with_approval() {
        let json = lifi_route_json(1, 1, USDC, "0x0000000000000000000000000000000000000000", "1000000");
        let step = decode_step(json["steps"][0].clone()).unwrap();
        let response: StepTransactionResponse = serde_json::from_value(json!({
            "transactionRequest": {
                "to": "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE",
                "data": "0xdeadbeef",
                "value": "0x0"
            }
        }))
        .unwrap();

        let actions = decode_step_actions(&step, response).unwrap();
        assert_eq!(actions.len(), 2);
        assert!(actions[0].is_approval());
        assert!(matches!(&actions[1], StepAction::ContractCall { data, value, .. }
            if data.len() == 4 && value.is_zero()));
    }

    #[test]
    fn test_decode_step_actions_native_source() {
        let json = lifi_route_json(
            1,
            1,
            "0x0000000000000000000000000000000000000000",
            USDC,
            "1000000000000000000",
        );
        let step = decode_step(json["steps"][0].clone()).unwrap();
        let response: StepTransactionResponse = serde_json::from_value(json!({
            "transactionRequest": {
                "to": "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE",
                "data": "0xdeadbeef",
                "value": "0xde0b6b3a7640000"
            }
        }))
        .unwrap();

        let actions = decode_step_actions(&step, response).unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].value(), U256::from(10u64).pow(U256::from(18u64)));
    }

    #[test]
    fn test_decode_step_without_transaction() {
        let json = lifi_route_json(1, 1, USDC, USDC, "1");
        let step = decode_step(json["steps"][0].clone()).unwrap();
        let response: StepTransactionResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            decode_step_actions(&step, response),
            Err(Error::Network(_))
        ));
    }

    #[test]
    fn test_decode_status() {
        assert_eq!(decode_status("DONE"), BridgeStatus::Done);
        assert_eq!(decode_status("PENDING"), BridgeStatus::Pending);
        assert_eq!(decode_status("FAILED"), BridgeStatus::Failed);
        assert_eq!(decode_status("NOT_FOUND"), BridgeStatus::NotFound);
        assert_eq!(decode_status("INVALID"), BridgeStatus::NotFound);
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_mainnet_usdc_to_eth_routes() {
        let client = LifiClient::new(&LifiSettings::default()).unwrap();
        let routes = client.get_routes(request()).await.unwrap();
        assert!(!routes.is_empty());
    }
}
