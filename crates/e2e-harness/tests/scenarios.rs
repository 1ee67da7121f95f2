//! End-to-end scenarios against an in-process node and an unreachable
//! HTTP endpoint.

use async_trait::async_trait;
use e2e_harness::adapters::TOKEN_MODULE;
use e2e_harness::prelude::*;
use host_ledger::domain::context::Context;
use host_ledger::domain::errors::LedgerError;
use host_ledger::domain::services::module_address;
use host_ledger::ports::inbound::EvmAccountState;
use host_ledger::ports::outbound::BalanceCapability;
use std::sync::Arc;
use std::time::Duration;

type Token = NativeTokenRuntime<LedgerBank>;

const INITIAL_SUPPLY: u64 = 1_000_000;

fn funded_node(signers: &[&LocalSigner]) -> Arc<LocalNode> {
    init_test_tracing();
    let config = signers
        .iter()
        .fold(LocalNodeConfig::default(), |config, signer| {
            config.with_genesis_account(signer.address(), U256::exp10(18))
        });
    Arc::new(LocalNode::start(config).unwrap())
}

async fn deploy_token(harness: &Harness<LocalNode>, owner: &LocalSigner) -> ContractBinding {
    let (binding, _) = harness
        .deploy_contract(
            owner,
            &Token::artifact(),
            &Token::constructor_args(U256::from(INITIAL_SUPPLY)),
        )
        .await
        .unwrap();
    binding
}

// =============================================================================
// SCENARIO 1: successful token transfer
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_token_transfer_credits_recipient() {
    let owner = LocalSigner::random();
    let recipient = Address::new([0xb0; 20]);
    let node = funded_node(&[&owner]);
    let harness = Harness::new(Arc::clone(&node), HarnessConfig::default());

    let token = deploy_token(&harness, &owner).await;
    let before = harness.token_balance(&token, recipient).await.unwrap();

    let tx = harness
        .transact(
            &owner,
            token.address,
            U256::zero(),
            abi::transfer_call(recipient, U256::from(100u64)),
        )
        .await
        .unwrap();
    let receipt = harness.expect_success_receipt(tx.hash).await.unwrap();

    assert_eq!(receipt.status, TxStatus::Success);
    assert_eq!(receipt.to, Some(token.address));
    let after = harness.token_balance(&token, recipient).await.unwrap();
    assert_eq!(after - before, U256::from(100u64));
    assert_eq!(
        harness.token_balance(&token, owner.address()).await.unwrap(),
        U256::from(INITIAL_SUPPLY - 100)
    );
}

// =============================================================================
// SCENARIO 2: reverting transfer
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_overdrawn_transfer_yields_failed_receipt() {
    let owner = LocalSigner::random();
    let spender = LocalSigner::random();
    let node = funded_node(&[&owner, &spender]);
    let harness = Harness::new(Arc::clone(&node), HarnessConfig::default());
    let token = deploy_token(&harness, &owner).await;

    // The spender holds no tokens.
    let tx = harness
        .transact(
            &spender,
            token.address,
            U256::zero(),
            abi::transfer_call(owner.address(), U256::from(1u64)),
        )
        .await
        .unwrap();
    let receipt = harness.expect_failed_receipt(tx.hash).await.unwrap();
    assert!(!receipt.succeeded());

    // Fee and nonce persist; token balances are untouched.
    let ctx = node.store().query_context();
    assert_eq!(node.adapter().nonce(&ctx, spender.address()).unwrap(), 1);
    assert!(node.adapter().balance(&ctx, spender.address()).unwrap() < U256::exp10(18));
    assert_eq!(
        harness.token_balance(&token, owner.address()).await.unwrap(),
        U256::from(INITIAL_SUPPLY)
    );

    // Asserting the opposite status fails explicitly.
    assert_eq!(
        harness.expect_success_receipt(tx.hash).await.unwrap_err(),
        HarnessError::UnexpectedStatus {
            tx_hash: tx.hash,
            expected: TxStatus::Success,
            actual: TxStatus::Failed,
        }
    );
}

// =============================================================================
// SCENARIO 3: unreachable instance
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_halted_node_times_out_after_default_deadline() {
    let owner = LocalSigner::random();
    let node = funded_node(&[&owner]);
    let harness = Harness::new(Arc::clone(&node), HarnessConfig::default());

    let tx = harness
        .transact(&owner, Address::new([0xb0; 20]), U256::one(), Vec::new())
        .await
        .unwrap();
    node.halt();

    let started = tokio::time::Instant::now();
    let err = harness.expect_success_receipt(tx.hash).await.unwrap_err();

    assert_eq!(started.elapsed(), DEFAULT_TIMEOUT);
    match err {
        HarnessError::Timeout {
            tx_hash,
            waited,
            last_error,
        } => {
            assert_eq!(tx_hash, tx.hash);
            assert_eq!(waited, DEFAULT_TIMEOUT);
            assert!(last_error.unwrap().contains("node halted"));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_endpoint_times_out() {
    init_test_tracing();
    let config = HarnessConfig {
        request_timeout_ms: 500,
        ..HarnessConfig::default()
    };
    let client = HttpRpcClient::from_config("http://127.0.0.1:9", &config).unwrap();
    let harness = Harness::new(Arc::new(client), config);

    let started = std::time::Instant::now();
    let err = harness
        .wait_mined(Hash::new([0x5e; 32]), DEFAULT_TIMEOUT)
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(err.is_timeout(), "unexpected error: {err}");
    assert!(elapsed >= DEFAULT_TIMEOUT, "returned early after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(20), "overran deadline: {elapsed:?}");
}

// =============================================================================
// DEPLOYMENT
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_deployments_land_at_precomputed_addresses() {
    let owner = LocalSigner::random();
    let node = funded_node(&[&owner]);
    let harness = Harness::new(Arc::clone(&node), HarnessConfig::default());

    let first = deploy_token(&harness, &owner).await;
    let second = deploy_token(&harness, &owner).await;

    assert_eq!(first.address, compute_contract_address(owner.address(), 0));
    assert_eq!(second.address, compute_contract_address(owner.address(), 1));
    assert_ne!(first.address, second.address);
    assert!(!node.code_at(first.address).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_value_sent_to_token_module_address_keeps_deployments_working() {
    let owner = LocalSigner::random();
    let node = funded_node(&[&owner]);
    let harness = Harness::new(Arc::clone(&node), HarnessConfig::default());

    let tx = harness
        .transact(&owner, module_address(TOKEN_MODULE), U256::one(), Vec::new())
        .await
        .unwrap();
    harness.expect_success_receipt(tx.hash).await.unwrap();

    let token = deploy_token(&harness, &owner).await;
    assert_eq!(token.address, compute_contract_address(owner.address(), 1));
    assert_eq!(
        harness.token_balance(&token, owner.address()).await.unwrap(),
        U256::from(INITIAL_SUPPLY)
    );
}

/// Runtime that accepts every deployment but stores no code.
struct CodelessRuntime;

impl ContractRuntime for CodelessRuntime {
    fn create(&self, _: &mut Context, _: &CallEnv, _: &[u8]) -> Result<Execution, LedgerError> {
        Ok(Execution::Success {
            output: Vec::new(),
            gas_used: 0,
        })
    }

    fn call(
        &self,
        _: &mut Context,
        _: &CallEnv,
        _: &[u8],
        _: &[u8],
    ) -> Result<Execution, LedgerError> {
        Ok(Execution::Success {
            output: Vec::new(),
            gas_used: 0,
        })
    }
}

#[tokio::test(start_paused = true)]
async fn test_deployment_without_code_is_rejected() {
    let owner = LocalSigner::random();
    let config =
        LocalNodeConfig::default().with_genesis_account(owner.address(), U256::exp10(18));
    let node = Arc::new(LocalNode::start_with(config, |_| Arc::new(CodelessRuntime)).unwrap());
    let harness = Harness::new(node, HarnessConfig::default());

    let err = harness
        .deploy_contract(&owner, &Token::artifact(), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, HarnessError::NoCodeAfterDeploy { .. }));
}

/// Endpoint reporting every created contract at a fixed address.
struct Misreporting {
    node: Arc<LocalNode>,
    reported: Address,
}

#[async_trait]
impl EthRpc for Misreporting {
    async fn chain_id(&self) -> Result<u64, HarnessError> {
        self.node.chain_id().await
    }
    async fn block_number(&self) -> Result<u64, HarnessError> {
        self.node.block_number().await
    }
    async fn gas_price(&self) -> Result<U256, HarnessError> {
        self.node.gas_price().await
    }
    async fn transaction_count(&self, address: Address) -> Result<u64, HarnessError> {
        self.node.transaction_count(address).await
    }
    async fn balance(&self, address: Address) -> Result<U256, HarnessError> {
        self.node.balance(address).await
    }
    async fn code_at(&self, address: Address) -> Result<Bytes, HarnessError> {
        self.node.code_at(address).await
    }
    async fn send_raw_transaction(&self, raw: &Bytes) -> Result<Hash, HarnessError> {
        self.node.send_raw_transaction(raw).await
    }
    async fn transaction_receipt(&self, tx_hash: Hash) -> Result<Option<Receipt>, HarnessError> {
        Ok(self.node.transaction_receipt(tx_hash).await?.map(|mut receipt| {
            if receipt.contract_address.is_some() {
                receipt.contract_address = Some(self.reported);
            }
            receipt
        }))
    }
    async fn call(&self, request: &CallRequest) -> Result<Bytes, HarnessError> {
        self.node.call(request).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_deployment_at_unexpected_address_is_rejected() {
    let owner = LocalSigner::random();
    let node = funded_node(&[&owner]);
    let first = deploy_token(&Harness::new(Arc::clone(&node), HarnessConfig::default()), &owner).await;

    let harness = Harness::new(
        Arc::new(Misreporting {
            node,
            reported: first.address,
        }),
        HarnessConfig::default(),
    );
    let err = harness
        .deploy_contract(
            &owner,
            &Token::artifact(),
            &Token::constructor_args(U256::from(INITIAL_SUPPLY)),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        HarnessError::AddressMismatch {
            expected: compute_contract_address(owner.address(), 1),
            actual: first.address,
        }
    );
}

// =============================================================================
// LEDGER VIEW
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_native_value_moves_through_the_adapter() {
    let sender = LocalSigner::random();
    let recipient = Address::new([0xc0; 20]);
    let node = funded_node(&[&sender]);
    let harness = Harness::new(Arc::clone(&node), HarnessConfig::default());

    let ctx = node.store().query_context();
    let denom = node.adapter().denom().clone();
    let supply_before = node.adapter().bank().total_supply(&ctx, &denom).unwrap();

    let tx = harness
        .transact(&sender, recipient, U256::from(5_000u64), Vec::new())
        .await
        .unwrap();
    let receipt = harness.expect_success_receipt(tx.hash).await.unwrap();
    assert_eq!(receipt.gas_used, 21_000);

    assert_eq!(node.balance(recipient).await.unwrap(), U256::from(5_000u64));
    let ctx = node.store().query_context();
    assert_eq!(
        node.adapter().bank().total_supply(&ctx, &denom).unwrap(),
        supply_before
    );
}
