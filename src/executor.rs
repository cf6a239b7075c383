use alloy::primitives::{Address, B256, U256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::chain::{ChainClient, SigningClient};
use crate::error::{Error, Result};
use crate::route::{
    Process, ProcessKind, ProcessStatus, Route, RouteExecution, RouteProvider, StepAction,
    StepExecution,
};
use crate::wallet::WalletProvider;

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub poll_interval: Duration,
    /// Receipt polls per transaction before leaving it `Pending`.
    pub max_receipt_polls: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_receipt_polls: 150,
        }
    }
}

/// Sends a route's transactions through the wallet, step by step.
///
/// The signer must already be on the route's source chain.
pub struct RouteExecutor<'a> {
    wallet: &'a WalletProvider,
    router: &'a dyn RouteProvider,
    config: ExecutorConfig,
}

impl<'a> RouteExecutor<'a> {
    pub fn new(wallet: &'a WalletProvider, router: &'a dyn RouteProvider) -> Self {
        Self::with_config(wallet, router, ExecutorConfig::default())
    }

    pub fn with_config(
        wallet: &'a WalletProvider,
        router: &'a dyn RouteProvider,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            wallet,
            router,
            config,
        }
    }

    /// Executes every step in order, stopping at the first failed transaction.
    ///
    /// A later step that starts on a chain the signer is not on is recorded as
    /// failed, and the steps already executed are still returned.
    pub async fn execute(&self, route: &Route) -> Result<RouteExecution> {
        let signer = self.wallet.signing_client()?;
        let from = self.wallet.address();
        let mut steps = Vec::with_capacity(route.steps.len());

        for (index, step) in route.steps.iter().enumerate() {
            let source = self
                .wallet
                .registry()
                .by_chain_id(step.from_chain_id)
                .ok_or_else(|| Error::UnsupportedChain(format!("chain id {}", step.from_chain_id)))?;
            let active = signer.chain_id().await;
            if active != step.from_chain_id {
                let message = format!(
                    "signer is on chain {active}, step {} starts on {}",
                    step.id, step.from_chain_id
                );
                if index == 0 {
                    return Err(Error::TransactionFailed(message));
                }
                warn!(route = %route.id, step = %step.id, %message, "route execution stopped");
                steps.push(StepExecution {
                    step_id: step.id.clone(),
                    actions: Vec::new(),
                    process: vec![Process {
                        kind: process_kind(step.is_cross_chain(), false),
                        status: ProcessStatus::Failed,
                        tx_hash: None,
                        message: Some(message),
                    }],
                });
                break;
            }
            let reader = self.wallet.public_client(&source.id)?;

            let actions = self.router.step_actions(step.clone(), from).await?;
            debug!(step = %step.id, tool = %step.tool, actions = actions.len(), "executing step");

            let mut process = Vec::with_capacity(actions.len());
            let mut failed = false;
            for action in &actions {
                if let StepAction::Approval {
                    token,
                    spender,
                    amount,
                } = action
                {
                    if self.has_allowance(reader, *token, from, *spender, *amount).await {
                        debug!(%token, %spender, "allowance already covers step");
                        continue;
                    }
                }
                let kind = process_kind(step.is_cross_chain(), action.is_approval());
                let entry = self.run(signer, reader, action, from, kind).await;
                failed = entry.status == ProcessStatus::Failed;
                process.push(entry);
                if failed {
                    break;
                }
            }

            steps.push(StepExecution {
                step_id: step.id.clone(),
                actions,
                process,
            });
            if failed {
                warn!(route = %route.id, step = %step.id, "route execution stopped");
                break;
            }
        }

        Ok(RouteExecution {
            route_id: route.id.clone(),
            steps,
        })
    }

    async fn has_allowance(
        &self,
        reader: &Arc<dyn ChainClient>,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> bool {
        match reader.get_token_allowance(token, owner, spender).await {
            Ok(current) => current >= amount,
            Err(err) => {
                warn!(%token, %err, "allowance read failed");
                false
            }
        }
    }

    async fn run(
        &self,
        signer: &Arc<dyn SigningClient>,
        reader: &Arc<dyn ChainClient>,
        action: &StepAction,
        from: Address,
        kind: ProcessKind,
    ) -> Process {
        match signer.send_transaction(action.to_request(from)).await {
            Ok(hash) => {
                info!(%hash, ?kind, "transaction sent");
                Process {
                    kind,
                    status: self.wait_for_receipt(reader, hash).await,
                    tx_hash: Some(hash),
                    message: None,
                }
            }
            Err(err) => Process {
                kind,
                status: ProcessStatus::Failed,
                tx_hash: None,
                message: Some(err.to_string()),
            },
        }
    }

    async fn wait_for_receipt(&self, reader: &Arc<dyn ChainClient>, hash: B256) -> ProcessStatus {
        for _ in 0..self.config.max_receipt_polls {
            match reader.get_receipt_status(hash).await {
                Ok(Some(true)) => return ProcessStatus::Done,
                Ok(Some(false)) => return ProcessStatus::Failed,
                Ok(None) => {}
                Err(err) => warn!(%hash, %err, "receipt poll failed"),
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
        ProcessStatus::Pending
    }
}

fn process_kind(cross_chain: bool, approval: bool) -> ProcessKind {
    if approval {
        ProcessKind::TokenAllowance
    } else if cross_chain {
        ProcessKind::CrossChain
    } else {
        ProcessKind::Swap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{MockChainClient, MockSigningClient};
    use crate::route::{MockRouteProvider, RouteStep, RouteToken, StepKind, NATIVE_TOKEN};
    use alloy::primitives::{Bytes, U256};

    fn fast() -> ExecutorConfig {
        ExecutorConfig {
            poll_interval: Duration::ZERO,
            max_receipt_polls: 3,
        }
    }

    fn token(address: Address) -> RouteToken {
        RouteToken {
            address,
            chain_id: 1,
            symbol: "T".into(),
            decimals: 18,
            name: "Token".into(),
        }
    }

    fn route(from_token: Address) -> Route {
        Route {
            id: "r".into(),
            from_chain_id: 1,
            to_chain_id: 1,
            from_token: token(from_token),
            to_token: token(NATIVE_TOKEN),
            from_amount: U256::from(100u64),
            to_amount: U256::from(99u64),
            from_address: Address::ZERO,
            to_address: Address::ZERO,
            steps: vec![RouteStep {
                id: "s1".into(),
                tool: "uniswap".into(),
                kind: StepKind::Swap,
                from_chain_id: 1,
                to_chain_id: 1,
                from_token,
                from_amount: U256::from(100u64),
                approval_address: Some(Address::repeat_byte(9)),
                raw: serde_json::Value::Null,
            }],
        }
    }

    fn call() -> StepAction {
        StepAction::ContractCall {
            to: Address::repeat_byte(9),
            data: Bytes::from(vec![1, 2, 3, 4]),
            value: U256::ZERO,
        }
    }

    fn router_with(actions: Vec<StepAction>) -> MockRouteProvider {
        let mut router = MockRouteProvider::new();
        router
            .expect_step_actions()
            .returning(move |_, _| Ok(actions.clone()));
        router
    }

    #[tokio::test]
    async fn test_executes_approval_then_call() {
        let erc20 = Address::repeat_byte(1);
        let r = route(erc20);
        let approval = r.steps[0].approval().unwrap();

        let mut signer = MockSigningClient::new();
        signer.expect_chain_id().returning(|| 1);
        let mut sent = 0u8;
        signer.expect_send_transaction().times(2).returning(move |_| {
            sent += 1;
            Ok(B256::repeat_byte(sent))
        });
        let mut reader = MockChainClient::new();
        reader
            .expect_get_token_allowance()
            .withf(move |token, _, spender| *token == erc20 && *spender == Address::repeat_byte(9))
            .returning(|_, _, _| Ok(U256::ZERO));
        reader.expect_get_receipt_status().returning(|_| Ok(Some(true)));

        let wallet = crate::test_support::wallet_with("mainnet", vec![("mainnet", reader)], Some(signer));
        let router = router_with(vec![approval, call()]);
        let execution = RouteExecutor::with_config(&wallet, &router, fast())
            .execute(&r)
            .await
            .unwrap();

        let step = execution.first_step().unwrap();
        assert_eq!(step.process.len(), 2);
        assert_eq!(step.process[0].kind, ProcessKind::TokenAllowance);
        assert_eq!(step.process[0].tx_hash, Some(B256::repeat_byte(1)));
        assert_eq!(step.process[1].kind, ProcessKind::Swap);
        assert_eq!(step.process[1].status, ProcessStatus::Done);
        assert_eq!(step.main_action(), Some(&call()));
    }

    #[tokio::test]
    async fn test_reverted_receipt_stops_execution() {
        let erc20 = Address::repeat_byte(1);
        let r = route(erc20);
        let approval = r.steps[0].approval().unwrap();

        let mut signer = MockSigningClient::new();
        signer.expect_chain_id().returning(|| 1);
        signer
            .expect_send_transaction()
            .times(1)
            .returning(|_| Ok(B256::repeat_byte(1)));
        let mut reader = MockChainClient::new();
        reader
            .expect_get_token_allowance()
            .returning(|_, _, _| Err(Error::Network("rpc unavailable".into())));
        reader.expect_get_receipt_status().returning(|_| Ok(Some(false)));

        let wallet = crate::test_support::wallet_with("mainnet", vec![("mainnet", reader)], Some(signer));
        let router = router_with(vec![approval, call()]);
        let execution = RouteExecutor::with_config(&wallet, &router, fast())
            .execute(&r)
            .await
            .unwrap();

        let first = execution.first_process().unwrap();
        assert_eq!(first.status, ProcessStatus::Failed);
        assert_eq!(execution.first_step().unwrap().process.len(), 1);
    }

    #[tokio::test]
    async fn test_sufficient_allowance_skips_approval() {
        let erc20 = Address::repeat_byte(1);
        let r = route(erc20);
        let approval = r.steps[0].approval().unwrap();

        let mut signer = MockSigningClient::new();
        signer.expect_chain_id().returning(|| 1);
        signer
            .expect_send_transaction()
            .withf(|tx| tx.to == Some(alloy::primitives::TxKind::Call(Address::repeat_byte(9))))
            .times(1)
            .returning(|_| Ok(B256::repeat_byte(2)));
        let mut reader = MockChainClient::new();
        reader
            .expect_get_token_allowance()
            .times(1)
            .returning(|_, _, _| Ok(U256::from(100u64)));
        reader.expect_get_receipt_status().returning(|_| Ok(Some(true)));

        let wallet = crate::test_support::wallet_with("mainnet", vec![("mainnet", reader)], Some(signer));
        let router = router_with(vec![approval, call()]);
        let execution = RouteExecutor::with_config(&wallet, &router, fast())
            .execute(&r)
            .await
            .unwrap();

        let step = execution.first_step().unwrap();
        assert_eq!(step.process.len(), 1);
        assert_eq!(step.process[0].kind, ProcessKind::Swap);
        assert_eq!(step.process[0].tx_hash, Some(B256::repeat_byte(2)));
        assert_eq!(step.main_action(), Some(&call()));
    }

    #[tokio::test]
    async fn test_later_step_on_other_chain_keeps_sent_transaction() {
        let mut r = route(NATIVE_TOKEN);
        r.to_chain_id = 10;
        r.steps[0].id = "bridge".into();
        r.steps[0].kind = StepKind::Cross;
        r.steps[0].to_chain_id = 10;
        let dest_swap = RouteStep {
            id: "dest-swap".into(),
            kind: StepKind::Swap,
            from_chain_id: 10,
            to_chain_id: 10,
            ..r.steps[0].clone()
        };
        r.steps.push(dest_swap);

        let mut signer = MockSigningClient::new();
        signer.expect_chain_id().returning(|| 1);
        signer
            .expect_send_transaction()
            .times(1)
            .returning(|_| Ok(B256::repeat_byte(0x0b)));
        let mut reader = MockChainClient::new();
        reader.expect_get_receipt_status().returning(|_| Ok(Some(true)));
        let mut router = MockRouteProvider::new();
        router
            .expect_step_actions()
            .withf(|step, _| step.id == "bridge")
            .times(1)
            .returning(|_, _| Ok(vec![call()]));

        let wallet = crate::test_support::wallet_with("mainnet", vec![("mainnet", reader)], Some(signer));
        let execution = RouteExecutor::with_config(&wallet, &router, fast())
            .execute(&r)
            .await
            .unwrap();

        assert_eq!(execution.steps.len(), 2);
        let first = execution.first_process().unwrap();
        assert_eq!(first.kind, ProcessKind::CrossChain);
        assert_eq!(first.status, ProcessStatus::Done);
        assert_eq!(first.tx_hash, Some(B256::repeat_byte(0x0b)));

        let stopped = &execution.steps[1].process[0];
        assert_eq!(stopped.status, ProcessStatus::Failed);
        assert_eq!(stopped.tx_hash, None);
        assert!(stopped.message.as_deref().unwrap().contains("starts on 10"));
    }

    #[tokio::test]
    async fn test_send_error_marks_process_failed() {
        let mut signer = MockSigningClient::new();
        signer.expect_chain_id().returning(|| 1);
        signer
            .expect_send_transaction()
            .returning(|_| Err(Error::Network("nonce too low".into())));

        let wallet = crate::test_support::wallet_with("mainnet", vec![], Some(signer));
        let router = router_with(vec![call()]);
        let execution = RouteExecutor::with_config(&wallet, &router, fast())
            .execute(&route(NATIVE_TOKEN))
            .await
            .unwrap();

        let first = execution.first_process().unwrap();
        assert_eq!(first.status, ProcessStatus::Failed);
        assert_eq!(first.tx_hash, None);
        assert!(first.message.as_deref().unwrap().contains("nonce too low"));
    }

    #[tokio::test]
    async fn test_missing_receipt_stays_pending() {
        let mut signer = MockSigningClient::new();
        signer.expect_chain_id().returning(|| 1);
        signer
            .expect_send_transaction()
            .returning(|_| Ok(B256::repeat_byte(5)));
        let mut reader = MockChainClient::new();
        reader
            .expect_get_receipt_status()
            .times(3)
            .returning(|_| Ok(None));

        let wallet = crate::test_support::wallet_with("mainnet", vec![("mainnet", reader)], Some(signer));
        let router = router_with(vec![call()]);
        let execution = RouteExecutor::with_config(&wallet, &router, fast())
            .execute(&route(NATIVE_TOKEN))
            .await
            .unwrap();

        assert_eq!(execution.first_process().unwrap().status, ProcessStatus::Pending);
    }

    #[tokio::test]
    async fn test_signer_on_wrong_chain() {
        let mut signer = MockSigningClient::new();
        signer.expect_chain_id().returning(|| 8453);
        let wallet = crate::test_support::wallet_with("mainnet", vec![], Some(signer));
        let router = MockRouteProvider::new();

        let err = RouteExecutor::with_config(&wallet, &router, fast())
            .execute(&route(NATIVE_TOKEN))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TransactionFailed(_)));
    }

    #[tokio::test]
    async fn test_requires_signer() {
        let wallet = crate::test_support::wallet_with("mainnet", vec![], None);
        let router = MockRouteProvider::new();
        let err = RouteExecutor::new(&wallet, &router)
            .execute(&route(NATIVE_TOKEN))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::WalletNotConnected));
    }
}
