//! # Local Node
//!
//! In-process network instance serving [`EthRpc`] on top of the host-ledger
//! reference keepers. Transactions are decoded and recovered on submission,
//! queued, and applied when the next block is produced.
//!
//! ## Transaction Application
//!
//! ```text
//!   nonce == sequence ──→ intrinsic gas <= limit ──→ fee + value <= balance
//!        │ no                  │ no                        │ no
//!        ▼                     ▼                           ▼
//!     dropped               dropped                     dropped
//!
//!   charge branch:    collect_fee(intrinsic * price), increment_nonce
//!   execution branch: value transfer, then create or call
//!                     absorbed on success; discarded on revert/error/out of gas
//! ```
//!
//! Dropped transactions produce no receipt; their hash never resolves.
//!
//! ## Block Production
//!
//! One producer task ticks every `block_time_ms` and is stopped through a
//! `watch` channel when the node is dropped. A `block_time_ms` of zero
//! disables the task; blocks are then produced only through
//! [`LocalNode::produce_block`]. A halted node refuses every RPC and skips
//! production, like an instance that stopped responding.

use crate::adapters::token_runtime::{NativeTokenRuntime, TOKEN_MODULE};
use crate::domain::tx::{compute_contract_address, decode_raw_transaction, keccak256};
use crate::domain::types::{CallEnv, CallRequest, Execution, Receipt, TxStatus};
use crate::domain::SignedTransaction;
use crate::errors::HarnessError;
use crate::ports::{ContractRuntime, EthRpc};
use async_trait::async_trait;
use host_ledger::adapters::{AccountKeeper, BankKeeper, LedgerStore, StakingKeeper};
use host_ledger::domain::context::{Context, StoreKey};
use host_ledger::domain::entities::{BlockHeader, BondStatus, Permission, ValidatorRecord};
use host_ledger::domain::errors::LedgerError;
use host_ledger::domain::services::cons_address_from_pubkey;
use host_ledger::domain::value_objects::ConsAddress;
use host_ledger::ports::inbound::EvmAccountState;
use host_ledger::ports::outbound::AccountCapability;
use host_ledger::service::{AdapterConfig, HostLedgerAdapter};
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use shared_types::{Address, Bytes, Hash, U256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

/// Bank keeper wired to the node's account keeper.
pub type LedgerBank = BankKeeper<AccountKeeper>;

/// EVM-facing adapter over the node's keepers.
pub type LedgerAdapter = HostLedgerAdapter<AccountKeeper, LedgerBank, StakingKeeper>;

/// Store holding contract runtime code, keyed by contract address.
pub const CODE_STORE: StoreKey = "code";

/// Base cost of every transaction.
pub const TX_BASE_GAS: u64 = 21_000;
/// Extra base cost of contract creation.
pub const TX_CREATE_GAS: u64 = 32_000;
const TX_DATA_ZERO_GAS: u64 = 4;
const TX_DATA_NON_ZERO_GAS: u64 = 16;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Balance allocated at genesis.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct GenesisAccount {
    /// Funded address.
    pub address: Address,
    /// Native balance minted to it.
    pub balance: U256,
}

/// Validator registered at genesis.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct GenesisValidator {
    /// Operator address; receives fees when proposing.
    pub operator: Address,
    /// Consensus public key.
    pub cons_pubkey: Bytes,
    /// Human-readable name.
    pub moniker: String,
    /// Bonded tokens.
    pub tokens: U256,
}

/// Local node configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LocalNodeConfig {
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Block interval in milliseconds; zero disables the producer task.
    pub block_time_ms: u64,
    /// Gas price reported by `eth_gasPrice`, in wei.
    pub gas_price_wei: u64,
    /// Adapter settings (EVM denom and modules).
    pub adapter: AdapterConfig,
    /// Genesis balances.
    pub genesis_accounts: Vec<GenesisAccount>,
    /// Genesis validator set.
    pub genesis_validators: Vec<GenesisValidator>,
}

impl Default for LocalNodeConfig {
    fn default() -> Self {
        Self {
            chain_id: 2061,
            block_time_ms: 1_000,
            gas_price_wei: 1_000_000_000,
            adapter: AdapterConfig::default(),
            genesis_accounts: Vec::new(),
            genesis_validators: vec![GenesisValidator {
                operator: Address::new([0x0e; 20]),
                cons_pubkey: Bytes::from_slice(&[0x01; 32]),
                moniker: "validator-0".to_string(),
                tokens: U256::from(1_000_000u64),
            }],
        }
    }
}

impl LocalNodeConfig {
    /// Adds a genesis balance.
    #[must_use]
    pub fn with_genesis_account(mut self, address: Address, balance: U256) -> Self {
        self.genesis_accounts.push(GenesisAccount { address, balance });
        self
    }

    /// Block interval.
    #[must_use]
    pub fn block_time(&self) -> Duration {
        Duration::from_millis(self.block_time_ms)
    }
}

/// Minimum gas a transaction pays before execution.
#[must_use]
pub fn intrinsic_gas(is_create: bool, data: &[u8]) -> u64 {
    let base = if is_create {
        TX_BASE_GAS + TX_CREATE_GAS
    } else {
        TX_BASE_GAS
    };
    data.iter().fold(base, |gas, byte| {
        gas + if *byte == 0 {
            TX_DATA_ZERO_GAS
        } else {
            TX_DATA_NON_ZERO_GAS
        }
    })
}

// =============================================================================
// NODE STATE
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct ChainTip {
    height: u64,
    hash: Hash,
}

/// Outcome of a transaction that made it into a block.
struct Applied {
    status: TxStatus,
    gas_used: u64,
    contract_address: Option<Address>,
}

struct NodeInner {
    config: LocalNodeConfig,
    store: LedgerStore,
    adapter: LedgerAdapter,
    runtime: Arc<dyn ContractRuntime>,
    pool: Mutex<Vec<SignedTransaction>>,
    receipts: RwLock<HashMap<Hash, Receipt>>,
    /// Also serializes block production.
    tip: Mutex<ChainTip>,
    halted: AtomicBool,
}

fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn code_key(address: Address) -> Vec<u8> {
    address.as_bytes().to_vec()
}

fn code_of(ctx: &Context, address: Address) -> Option<Vec<u8>> {
    ctx.get(CODE_STORE, &code_key(address)).map(<[u8]>::to_vec)
}

impl NodeInner {
    fn ensure_reachable(&self) -> Result<(), HarnessError> {
        if self.halted.load(Ordering::SeqCst) {
            return Err(HarnessError::Rpc(
                "connection refused: node halted".to_string(),
            ));
        }
        Ok(())
    }

    fn genesis(&self) -> Result<(), HarnessError> {
        let staking = self.adapter.validators();
        let proposer = self
            .config
            .genesis_validators
            .first()
            .map(|v| cons_address_from_pubkey(&v.cons_pubkey))
            .unwrap_or_default();
        let mut ctx = self.store.begin(BlockHeader {
            chain_id: self.config.chain_id,
            height: 0,
            time: unix_time(),
            proposer,
        });

        let accounts = self.adapter.accounts();
        for name in accounts.module_names() {
            accounts.module_account(&mut ctx, name)?;
        }
        for validator in &self.config.genesis_validators {
            staking.set_validator(
                &mut ctx,
                &ValidatorRecord {
                    operator: validator.operator,
                    cons_address: cons_address_from_pubkey(&validator.cons_pubkey),
                    cons_pubkey: validator.cons_pubkey.clone(),
                    status: BondStatus::Bonded,
                    tokens: validator.tokens,
                    delegator_shares: validator.tokens,
                    jailed: false,
                    commission_rate_bps: 0,
                    moniker: validator.moniker.clone(),
                },
            )?;
        }
        for account in &self.config.genesis_accounts {
            self.adapter
                .add_balance(&mut ctx, account.address, account.balance)?;
        }
        self.store.commit(ctx)?;

        info!(
            chain_id = self.config.chain_id,
            accounts = self.config.genesis_accounts.len(),
            validators = self.config.genesis_validators.len(),
            "genesis committed"
        );
        Ok(())
    }

    /// Round-robin over the active validators.
    fn proposer(&self, height: u64) -> Result<ConsAddress, LedgerError> {
        let ctx = self.store.query_context();
        let active: Vec<_> = self
            .adapter
            .validators()
            .validators(&ctx)?
            .into_iter()
            .filter(ValidatorRecord::is_active)
            .collect();
        if active.is_empty() {
            return Ok(ConsAddress::default());
        }
        let index = usize::try_from(height % active.len() as u64).unwrap_or_default();
        Ok(active[index].cons_address)
    }

    // -------------------------------------------------------------------------
    // Submission
    // -------------------------------------------------------------------------

    fn submit(&self, raw: &[u8]) -> Result<Hash, HarnessError> {
        let tx = decode_raw_transaction(raw)?;
        if tx.request.chain_id != self.config.chain_id {
            return Err(HarnessError::Rpc(format!(
                "invalid chain id {}, expected {}",
                tx.request.chain_id, self.config.chain_id
            )));
        }

        let committed = self
            .adapter
            .nonce(&self.store.query_context(), tx.from)?;
        if tx.request.nonce < committed {
            return Err(HarnessError::Rpc(format!(
                "nonce too low: {} < {committed}",
                tx.request.nonce
            )));
        }

        let hash = tx.hash;
        if self.receipts.read().contains_key(&hash) {
            return Err(HarnessError::Rpc(format!("already known: {hash}")));
        }
        let mut pool = self.pool.lock();
        if pool.iter().any(|queued| queued.hash == hash) {
            return Err(HarnessError::Rpc(format!("already known: {hash}")));
        }
        debug!(tx = %hash, from = %tx.from, nonce = tx.request.nonce, "transaction queued");
        pool.push(tx);
        Ok(hash)
    }

    fn pending_nonce(&self, address: Address) -> Result<u64, HarnessError> {
        let committed = self
            .adapter
            .nonce(&self.store.query_context(), address)?;
        let queued = self
            .pool
            .lock()
            .iter()
            .filter(|tx| tx.from == address)
            .map(|tx| tx.request.nonce + 1)
            .max()
            .unwrap_or_default();
        Ok(committed.max(queued))
    }

    // -------------------------------------------------------------------------
    // Block production
    // -------------------------------------------------------------------------

    #[instrument(level = "debug", skip(self))]
    fn produce_block(&self) -> Result<u64, HarnessError> {
        let mut tip = self.tip.lock();
        let height = tip.height + 1;
        let header = BlockHeader {
            chain_id: self.config.chain_id,
            height,
            time: unix_time(),
            proposer: self.proposer(height)?,
        };
        let mut queued = std::mem::take(&mut *self.pool.lock());
        queued.sort_by_key(|tx| (tx.from, tx.request.nonce));

        let mut ctx = self.store.begin(header);
        let coinbase = self.adapter.coinbase(&ctx).ok();

        let mut included = Vec::with_capacity(queued.len());
        for tx in queued {
            match self.apply_tx(&mut ctx, &tx) {
                Ok(applied) => included.push((tx, applied)),
                Err(err) => warn!(tx = %tx.hash, from = %tx.from, error = %err, "transaction dropped"),
            }
        }

        let mut preimage = tip.hash.as_bytes().to_vec();
        preimage.extend_from_slice(&height.to_be_bytes());
        for (tx, _) in &included {
            preimage.extend_from_slice(tx.hash.as_bytes());
        }
        let block_hash = keccak256(&preimage);

        if let Err(err) = self.store.commit(ctx) {
            error!(height, requeued = included.len(), error = %err, "block commit failed");
            self.pool
                .lock()
                .extend(included.into_iter().map(|(tx, _)| tx));
            return Err(err.into());
        }

        let mut receipts = self.receipts.write();
        for (index, (tx, applied)) in included.iter().enumerate() {
            receipts.insert(
                tx.hash,
                Receipt {
                    transaction_hash: tx.hash,
                    transaction_index: index as u64,
                    block_hash,
                    block_number: height,
                    from: tx.from,
                    to: tx.request.to,
                    gas_used: applied.gas_used,
                    effective_gas_price: tx.request.gas_price,
                    contract_address: applied.contract_address,
                    status: applied.status,
                },
            );
        }
        drop(receipts);
        *tip = ChainTip {
            height,
            hash: block_hash,
        };

        if included.is_empty() {
            debug!(height, "empty block produced");
        } else {
            info!(
                height,
                hash = %block_hash,
                txs = included.len(),
                coinbase = ?coinbase,
                "block produced"
            );
        }
        Ok(height)
    }

    fn apply_tx(&self, ctx: &mut Context, tx: &SignedTransaction) -> Result<Applied, HarnessError> {
        let request = &tx.request;
        let sequence = self.adapter.nonce(ctx, tx.from)?;
        if request.nonce != sequence {
            return Err(HarnessError::Transaction(format!(
                "nonce {} does not match sequence {sequence}",
                request.nonce
            )));
        }

        let intrinsic = intrinsic_gas(request.is_create(), &request.data);
        if request.gas_limit < intrinsic {
            return Err(HarnessError::Transaction(format!(
                "intrinsic gas {intrinsic} exceeds gas limit {}",
                request.gas_limit
            )));
        }

        let fee = request
            .gas_price
            .checked_mul(U256::from(intrinsic))
            .ok_or_else(|| HarnessError::Transaction("fee overflow".to_string()))?;
        let balance = self.adapter.balance(ctx, tx.from)?;
        if fee.saturating_add(request.value) > balance {
            return Err(HarnessError::Transaction(format!(
                "insufficient funds for fee {fee} and value {}: balance {balance}",
                request.value
            )));
        }

        // Fee and sequence persist whatever the execution outcome.
        let mut charge = ctx.branch();
        self.adapter.collect_fee(&mut charge, tx.from, fee)?;
        self.adapter.increment_nonce(&mut charge, tx.from)?;
        ctx.absorb(charge)?;

        let mut execution_ctx = ctx.branch();
        let outcome = self.execute(&mut execution_ctx, tx, sequence);
        let applied = match outcome {
            Ok((Execution::Success { gas_used, .. }, created))
                if intrinsic.saturating_add(gas_used) <= request.gas_limit =>
            {
                ctx.absorb(execution_ctx)?;
                Applied {
                    status: TxStatus::Success,
                    gas_used: intrinsic + gas_used,
                    contract_address: created,
                }
            }
            Ok((execution, _)) => {
                if let Execution::Revert { reason, .. } = &execution {
                    debug!(tx = %tx.hash, %reason, "execution reverted");
                } else {
                    debug!(tx = %tx.hash, "execution ran out of gas");
                }
                Applied {
                    status: TxStatus::Failed,
                    gas_used: intrinsic
                        .saturating_add(execution.gas_used())
                        .min(request.gas_limit),
                    contract_address: None,
                }
            }
            Err(err) => {
                debug!(tx = %tx.hash, error = %err, "execution failed");
                Applied {
                    status: TxStatus::Failed,
                    gas_used: request.gas_limit,
                    contract_address: None,
                }
            }
        };
        Ok(applied)
    }

    /// Runs the value transfer and contract code of `tx` in `ctx`.
    fn execute(
        &self,
        ctx: &mut Context,
        tx: &SignedTransaction,
        sequence: u64,
    ) -> Result<(Execution, Option<Address>), LedgerError> {
        let request = &tx.request;
        let Some(to) = request.to else {
            let contract = compute_contract_address(tx.from, sequence);
            if code_of(ctx, contract).is_some() {
                return Ok((
                    Execution::Revert {
                        reason: "contract address collision".to_string(),
                        gas_used: 0,
                    },
                    None,
                ));
            }
            self.adapter.create_account(ctx, contract)?;
            self.adapter
                .transfer(ctx, tx.from, contract, request.value)?;

            let env = CallEnv {
                caller: tx.from,
                contract,
                value: request.value,
            };
            let execution = self.runtime.create(ctx, &env, &request.data)?;
            if let Execution::Success { output, .. } = &execution {
                if !output.is_empty() {
                    ctx.set(CODE_STORE, code_key(contract), output.clone())?;
                }
            }
            return Ok((execution, Some(contract)));
        };

        self.adapter.transfer(ctx, tx.from, to, request.value)?;
        let execution = match code_of(ctx, to) {
            Some(code) => {
                let env = CallEnv {
                    caller: tx.from,
                    contract: to,
                    value: request.value,
                };
                self.runtime.call(ctx, &env, &code, &request.data)?
            }
            None => Execution::Success {
                output: Vec::new(),
                gas_used: 0,
            },
        };
        Ok((execution, None))
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    fn query(&self, request: &CallRequest) -> Result<Bytes, HarnessError> {
        let mut ctx = self.store.query_context();
        let Some(code) = code_of(&ctx, request.to) else {
            return Ok(Bytes::new());
        };
        let env = CallEnv {
            caller: request.from.unwrap_or(Address::ZERO),
            contract: request.to,
            value: request.value.unwrap_or_default(),
        };
        match self.runtime.call(&mut ctx, &env, &code, &request.data)? {
            Execution::Success { output, .. } => Ok(Bytes::from(output)),
            Execution::Revert { reason, .. } => Err(HarnessError::Rpc(format!(
                "execution reverted: {reason}"
            ))),
        }
    }
}

async fn run_producer(inner: Arc<NodeInner>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(inner.config.block_time());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if inner.halted.load(Ordering::SeqCst) {
                    continue;
                }
                if let Err(err) = inner.produce_block() {
                    error!(error = %err, "block production failed");
                }
            }
            _ = shutdown.changed() => {
                debug!("block producer stopping");
                break;
            }
        }
    }
}

// =============================================================================
// LOCAL NODE
// =============================================================================

/// In-process network instance.
pub struct LocalNode {
    inner: Arc<NodeInner>,
    shutdown_tx: watch::Sender<bool>,
    producer: Option<JoinHandle<()>>,
}

impl LocalNode {
    /// Starts a node running the native token runtime.
    ///
    /// Must be called from within a Tokio runtime when `block_time_ms` is
    /// non-zero.
    pub fn start(config: LocalNodeConfig) -> Result<Self, HarnessError> {
        Self::start_with(config, |bank| Arc::new(NativeTokenRuntime::new(bank)))
    }

    /// Starts a node with a custom contract runtime built over its bank.
    pub fn start_with(
        config: LocalNodeConfig,
        runtime: impl FnOnce(Arc<LedgerBank>) -> Arc<dyn ContractRuntime>,
    ) -> Result<Self, HarnessError> {
        let accounts = Arc::new(
            AccountKeeper::with_default_modules()
                .with_module(TOKEN_MODULE, vec![Permission::Minter, Permission::Burner]),
        );
        let bank = Arc::new(BankKeeper::new(Arc::clone(&accounts)));
        let runtime = runtime(Arc::clone(&bank));
        let adapter = HostLedgerAdapter::new(
            config.adapter.clone(),
            accounts,
            bank,
            Arc::new(StakingKeeper::new()),
        );

        let inner = Arc::new(NodeInner {
            store: LedgerStore::new(),
            adapter,
            runtime,
            pool: Mutex::new(Vec::new()),
            receipts: RwLock::new(HashMap::new()),
            tip: Mutex::new(ChainTip {
                height: 0,
                hash: keccak256(&config.chain_id.to_be_bytes()),
            }),
            halted: AtomicBool::new(false),
            config,
        });
        inner.genesis()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let producer = (inner.config.block_time_ms > 0)
            .then(|| tokio::spawn(run_producer(Arc::clone(&inner), shutdown_rx)));

        Ok(Self {
            inner,
            shutdown_tx,
            producer,
        })
    }

    /// Node configuration.
    #[must_use]
    pub fn config(&self) -> &LocalNodeConfig {
        &self.inner.config
    }

    /// EVM-facing adapter over the node's keepers.
    #[must_use]
    pub fn adapter(&self) -> &LedgerAdapter {
        &self.inner.adapter
    }

    /// Committed ledger state.
    #[must_use]
    pub fn store(&self) -> &LedgerStore {
        &self.inner.store
    }

    /// Height of the latest block.
    #[must_use]
    pub fn height(&self) -> u64 {
        self.inner.tip.lock().height
    }

    /// Number of queued transactions.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pool.lock().len()
    }

    /// Produces one block from the queued transactions and returns its height.
    pub fn produce_block(&self) -> Result<u64, HarnessError> {
        self.inner.produce_block()
    }

    /// Stops serving RPC and producing blocks.
    pub fn halt(&self) {
        self.inner.halted.store(true, Ordering::SeqCst);
        warn!("local node halted");
    }

    /// Resumes after [`Self::halt`].
    pub fn resume(&self) {
        self.inner.halted.store(false, Ordering::SeqCst);
        info!("local node resumed");
    }

    /// Returns true while halted.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.inner.halted.load(Ordering::SeqCst)
    }
}

impl Drop for LocalNode {
    fn drop(&mut self) {
        if self.producer.take().is_some() {
            // Receiver is gone only if the producer already exited.
            let _ = self.shutdown_tx.send(true);
        }
    }
}

#[async_trait]
impl EthRpc for LocalNode {
    async fn chain_id(&self) -> Result<u64, HarnessError> {
        self.inner.ensure_reachable()?;
        Ok(self.inner.config.chain_id)
    }

    async fn block_number(&self) -> Result<u64, HarnessError> {
        self.inner.ensure_reachable()?;
        Ok(self.height())
    }

    async fn gas_price(&self) -> Result<U256, HarnessError> {
        self.inner.ensure_reachable()?;
        Ok(U256::from(self.inner.config.gas_price_wei))
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, HarnessError> {
        self.inner.ensure_reachable()?;
        self.inner.pending_nonce(address)
    }

    async fn balance(&self, address: Address) -> Result<U256, HarnessError> {
        self.inner.ensure_reachable()?;
        Ok(self
            .inner
            .adapter
            .balance(&self.inner.store.query_context(), address)?)
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, HarnessError> {
        self.inner.ensure_reachable()?;
        Ok(code_of(&self.inner.store.query_context(), address)
            .map(Bytes::from)
            .unwrap_or_default())
    }

    async fn send_raw_transaction(&self, raw: &Bytes) -> Result<Hash, HarnessError> {
        self.inner.ensure_reachable()?;
        self.inner.submit(raw)
    }

    async fn transaction_receipt(&self, tx_hash: Hash) -> Result<Option<Receipt>, HarnessError> {
        self.inner.ensure_reachable()?;
        Ok(self.inner.receipts.read().get(&tx_hash).cloned())
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes, HarnessError> {
        self.inner.ensure_reachable()?;
        self.inner.query(request)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tx::{LocalSigner, TransactionRequest};
    use host_ledger::adapters::STAKING_STORE;
    use host_ledger::domain::services::module_address;

    const GWEI: u64 = 1_000_000_000;

    fn manual_node(funded: Address) -> LocalNode {
        let config = LocalNodeConfig {
            block_time_ms: 0,
            ..LocalNodeConfig::default()
        }
        .with_genesis_account(funded, U256::from(10u64).pow(U256::from(18u64)));
        LocalNode::start(config).unwrap()
    }

    fn transfer(signer: &LocalSigner, nonce: u64, to: Address, value: u64) -> SignedTransaction {
        signer
            .sign(TransactionRequest {
                nonce,
                gas_price: U256::from(GWEI),
                gas_limit: 21_000,
                to: Some(to),
                value: U256::from(value),
                data: Bytes::new(),
                chain_id: 2061,
            })
            .unwrap()
    }

    #[test]
    fn test_intrinsic_gas() {
        assert_eq!(intrinsic_gas(false, &[]), 21_000);
        assert_eq!(intrinsic_gas(true, &[]), 53_000);
        assert_eq!(intrinsic_gas(false, &[0, 1]), 21_020);
    }

    #[tokio::test]
    async fn test_value_transfer_is_mined_with_fee() {
        let signer = LocalSigner::random();
        let node = manual_node(signer.address());
        let recipient = Address::new([0x42; 20]);
        let before = node.balance(signer.address()).await.unwrap();

        let tx = transfer(&signer, 0, recipient, 5_000);
        let hash = node.send_raw_transaction(&tx.raw).await.unwrap();
        assert_eq!(node.transaction_count(signer.address()).await.unwrap(), 1);
        assert_eq!(node.transaction_receipt(hash).await.unwrap(), None);

        assert_eq!(node.produce_block().unwrap(), 1);
        let receipt = node.transaction_receipt(hash).await.unwrap().unwrap();
        assert!(receipt.succeeded());
        assert_eq!(receipt.block_number, 1);
        assert_eq!(receipt.gas_used, 21_000);

        let fee = U256::from(21_000u64 * GWEI);
        assert_eq!(node.balance(recipient).await.unwrap(), U256::from(5_000u64));
        assert_eq!(
            node.balance(signer.address()).await.unwrap(),
            before - fee - U256::from(5_000u64)
        );
    }

    #[tokio::test]
    async fn test_nonce_gap_is_dropped_without_receipt() {
        let signer = LocalSigner::random();
        let node = manual_node(signer.address());

        let tx = transfer(&signer, 3, Address::new([0x42; 20]), 1);
        let hash = node.send_raw_transaction(&tx.raw).await.unwrap();
        node.produce_block().unwrap();

        assert_eq!(node.transaction_receipt(hash).await.unwrap(), None);
        assert_eq!(node.pending_count(), 0);
        assert_eq!(node.transaction_count(signer.address()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_block_keeps_queued_transactions() {
        let signer = LocalSigner::random();
        let node = manual_node(signer.address());
        let hash = node
            .send_raw_transaction(&transfer(&signer, 0, Address::new([0x42; 20]), 1).raw)
            .await
            .unwrap();

        // An undecodable validator record makes proposer selection fail.
        let mut ctx = node.store().begin(BlockHeader::default());
        ctx.set(STAKING_STORE, b"v/corrupt".to_vec(), vec![0xff]).unwrap();
        node.store().commit(ctx).unwrap();

        assert!(node.produce_block().is_err());
        assert_eq!(node.height(), 0);
        assert_eq!(node.pending_count(), 1);

        let mut ctx = node.store().begin(BlockHeader::default());
        ctx.delete(STAKING_STORE, b"v/corrupt").unwrap();
        node.store().commit(ctx).unwrap();

        assert_eq!(node.produce_block().unwrap(), 1);
        assert!(node.transaction_receipt(hash).await.unwrap().unwrap().succeeded());
    }

    #[tokio::test]
    async fn test_wrong_chain_and_duplicates_rejected() {
        let signer = LocalSigner::random();
        let node = manual_node(signer.address());

        let mut request = transfer(&signer, 0, Address::new([0x42; 20]), 1).request;
        request.chain_id = 1;
        let foreign = signer.sign(request).unwrap();
        assert!(node.send_raw_transaction(&foreign.raw).await.is_err());

        let tx = transfer(&signer, 0, Address::new([0x42; 20]), 1);
        node.send_raw_transaction(&tx.raw).await.unwrap();
        assert!(matches!(
            node.send_raw_transaction(&tx.raw).await,
            Err(HarnessError::Rpc(_))
        ));
    }

    #[tokio::test]
    async fn test_halted_node_refuses_rpc() {
        let node = manual_node(Address::new([1u8; 20]));
        node.halt();
        assert!(matches!(
            node.block_number().await,
            Err(HarnessError::Rpc(_))
        ));
        node.resume();
        assert_eq!(node.block_number().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_producer_advances_height() {
        let config = LocalNodeConfig::default();
        let node = LocalNode::start(config).unwrap();

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(node.block_number().await.unwrap(), 3);
    }

    #[test]
    fn test_genesis_registers_validator_as_coinbase() {
        let node = manual_node(Address::new([1u8; 20]));
        node.produce_block().unwrap();

        let ctx = node.store().query_context();
        assert_eq!(
            node.adapter().coinbase(&ctx).unwrap(),
            Address::new([0x0e; 20])
        );
    }

    #[test]
    fn test_genesis_materializes_module_accounts() {
        let node = manual_node(Address::new([1u8; 20]));
        let ctx = node.store().query_context();
        let accounts = node.adapter().accounts();

        for name in accounts.module_names() {
            let account = accounts.account(&ctx, module_address(name)).unwrap();
            assert_eq!(account.module_name(), Some(name));
        }
        assert!(accounts.has_account(&ctx, module_address(TOKEN_MODULE)).unwrap());
    }

    #[test]
    fn test_config_from_json() {
        let config: LocalNodeConfig = serde_json::from_str(
            r#"{"chain_id": 7, "block_time_ms": 0, "genesis_validators": []}"#,
        )
        .unwrap();
        assert_eq!(config.chain_id, 7);
        assert!(config.genesis_validators.is_empty());
        assert_eq!(config.adapter, AdapterConfig::default());
    }
}
