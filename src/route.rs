//! Aggregator domain model.
//!
//! Routes arrive from the aggregator as loosely typed JSON; the aggregator client
//! decodes them into these types once, and everything downstream matches on the
//! closed [`StepAction`] set.

use alloy::network::TransactionBuilder;
use alloy::primitives::{address, Address, Bytes, B256, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::ethereum::encode_approve;

/// Address the aggregator uses for a chain's native currency.
pub const NATIVE_TOKEN: Address = Address::ZERO;

/// Alternative native-currency pseudo-address used by some routers.
pub const NATIVE_TOKEN_SENTINEL: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// Default slippage, as a fraction (0.5%).
pub const DEFAULT_SLIPPAGE: f64 = 0.005;

pub fn is_native_token(token: &Address) -> bool {
    *token == NATIVE_TOKEN || *token == NATIVE_TOKEN_SENTINEL
}

/// Parameters for route discovery.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutesRequest {
    pub from_chain_id: u64,
    pub to_chain_id: u64,
    pub from_token: Address,
    pub to_token: Address,
    pub from_amount: U256,
    pub from_address: Address,
    pub to_address: Address,
    pub slippage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteToken {
    pub address: Address,
    pub chain_id: u64,
    pub symbol: String,
    pub decimals: u8,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Swap,
    Cross,
    Lifi,
    Protocol,
}

/// One step of a route. `raw` is the aggregator's own step object, sent back
/// verbatim when asking for the step's transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteStep {
    pub id: String,
    pub tool: String,
    pub kind: StepKind,
    pub from_chain_id: u64,
    pub to_chain_id: u64,
    pub from_token: Address,
    pub from_amount: U256,
    pub approval_address: Option<Address>,
    pub raw: serde_json::Value,
}

impl RouteStep {
    /// Allowance the step needs before it can spend `from_token`.
    pub fn approval(&self) -> Option<StepAction> {
        if is_native_token(&self.from_token) {
            return None;
        }
        self.approval_address.map(|spender| StepAction::Approval {
            token: self.from_token,
            spender,
            amount: self.from_amount,
        })
    }

    pub fn is_cross_chain(&self) -> bool {
        self.from_chain_id != self.to_chain_id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub id: String,
    pub from_chain_id: u64,
    pub to_chain_id: u64,
    pub from_token: RouteToken,
    pub to_token: RouteToken,
    pub from_amount: U256,
    pub to_amount: U256,
    pub from_address: Address,
    pub to_address: Address,
    pub steps: Vec<RouteStep>,
}

/// A single transaction the wallet sends while executing a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    NativeTransfer {
        to: Address,
        value: U256,
    },
    Approval {
        token: Address,
        spender: Address,
        amount: U256,
    },
    ContractCall {
        to: Address,
        data: Bytes,
        value: U256,
    },
}

impl StepAction {
    /// Decodes a populated transaction into an action.
    pub fn from_transaction(to: Address, data: Bytes, value: U256) -> Self {
        if data.is_empty() {
            StepAction::NativeTransfer { to, value }
        } else {
            StepAction::ContractCall { to, data, value }
        }
    }

    pub fn target(&self) -> Address {
        match self {
            StepAction::NativeTransfer { to, .. } | StepAction::ContractCall { to, .. } => *to,
            StepAction::Approval { token, .. } => *token,
        }
    }

    pub fn value(&self) -> U256 {
        match self {
            StepAction::NativeTransfer { value, .. } | StepAction::ContractCall { value, .. } => {
                *value
            }
            StepAction::Approval { .. } => U256::ZERO,
        }
    }

    pub fn data(&self) -> Option<Bytes> {
        match self {
            StepAction::NativeTransfer { .. } => None,
            StepAction::Approval {
                spender, amount, ..
            } => Some(encode_approve(*spender, *amount)),
            StepAction::ContractCall { data, .. } => Some(data.clone()),
        }
    }

    pub fn is_approval(&self) -> bool {
        matches!(self, StepAction::Approval { .. })
    }

    pub fn to_request(&self, from: Address) -> TransactionRequest {
        let request = TransactionRequest::default()
            .with_from(from)
            .with_to(self.target())
            .with_value(self.value());
        match self.data() {
            Some(data) => request.with_input(data),
            None => request,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessKind {
    TokenAllowance,
    Swap,
    CrossChain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessStatus {
    Pending,
    Done,
    Failed,
}

/// Progress record for one transaction sent during execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Process {
    pub kind: ProcessKind,
    pub status: ProcessStatus,
    pub tx_hash: Option<B256>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepExecution {
    pub step_id: String,
    pub actions: Vec<StepAction>,
    pub process: Vec<Process>,
}

impl StepExecution {
    /// The step's main (non-approval) action.
    pub fn main_action(&self) -> Option<&StepAction> {
        self.actions.iter().rev().find(|a| !a.is_approval())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteExecution {
    pub route_id: String,
    pub steps: Vec<StepExecution>,
}

impl RouteExecution {
    pub fn first_step(&self) -> Option<&StepExecution> {
        self.steps.first()
    }

    pub fn first_process(&self) -> Option<&Process> {
        self.first_step().and_then(|s| s.process.first())
    }
}

/// Cross-chain transfer state as tracked by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeStatus {
    NotFound,
    Pending,
    Done,
    Failed,
}

/// Route discovery and step population.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Candidate routes, best first according to the aggregator.
    async fn get_routes(&self, request: RoutesRequest) -> Result<Vec<Route>>;

    /// Transactions needed to execute `step` from `from`, approval first.
    async fn step_actions(&self, step: RouteStep, from: Address) -> Result<Vec<StepAction>>;

    /// Cross-chain progress of a source-chain transaction. `bridge` narrows the lookup
    /// to one bridge tool when known.
    async fn bridge_status(
        &self,
        tx_hash: B256,
        bridge: Option<String>,
        from_chain_id: u64,
        to_chain_id: u64,
    ) -> Result<BridgeStatus>;
}

/// Off-chain USD prices.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn token_price(&self, chain_id: u64, token: Address) -> Result<String>;
}
