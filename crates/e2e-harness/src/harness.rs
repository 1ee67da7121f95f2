//! # Scenario Harness
//!
//! Drives a network instance through [`EthRpc`]: submits signed
//! transactions, waits for inclusion, asserts receipt status and deploys
//! contracts at their precomputed addresses.
//!
//! ## Deadlines
//!
//! | Operation | Default |
//! |-----------|---------|
//! | `expect_mined`, `expect_*_receipt` | 15 s |
//! | `deploy_contract` | 30 s |
//! | receipt poll interval | 1 s |
//!
//! Every failure surfaces to the caller immediately. Receipt polling is the
//! only retry: an unreachable node is retried until the deadline and then
//! reported as `Timeout` carrying the last RPC error.

use crate::config::HarnessConfig;
use crate::domain::abi;
use crate::domain::lifecycle::{TxLifecycle, TxState};
use crate::domain::tx::{compute_contract_address, LocalSigner, SignedTransaction, TransactionRequest};
use crate::domain::types::{CallRequest, ContractArtifact, ContractBinding, Receipt, TxStatus};
use crate::errors::HarnessError;
use crate::ports::EthRpc;
use shared_types::{Address, Bytes, Hash, U256};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument};

/// Scenario driver over an [`EthRpc`] endpoint.
pub struct Harness<R> {
    rpc: Arc<R>,
    config: HarnessConfig,
}

impl<R> Clone for Harness<R> {
    fn clone(&self) -> Self {
        Self {
            rpc: Arc::clone(&self.rpc),
            config: self.config.clone(),
        }
    }
}

impl<R: EthRpc> Harness<R> {
    /// Creates a harness.
    pub fn new(rpc: Arc<R>, config: HarnessConfig) -> Self {
        Self { rpc, config }
    }

    /// Underlying endpoint.
    pub fn rpc(&self) -> &Arc<R> {
        &self.rpc
    }

    /// Harness settings.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    // =========================================================================
    // INCLUSION
    // =========================================================================

    /// Polls for the receipt of `tx_hash` until it exists or `timeout`
    /// elapses.
    ///
    /// # Errors
    ///
    /// * `Timeout` - not mined before the deadline; carries the last poll error
    #[instrument(skip_all, fields(tx = %tx_hash, ?timeout))]
    pub async fn wait_mined(&self, tx_hash: Hash, timeout: Duration) -> Result<Receipt, HarnessError> {
        let mut lifecycle = TxLifecycle::submitted(tx_hash);
        lifecycle.advance(TxState::Pending)?;
        self.poll_until_mined(&mut lifecycle, timeout).await
    }

    async fn poll_until_mined(
        &self,
        lifecycle: &mut TxLifecycle,
        timeout: Duration,
    ) -> Result<Receipt, HarnessError> {
        let tx_hash = lifecycle.tx_hash();
        let deadline = Instant::now() + timeout;
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_error = None;

        loop {
            if timeout_at(deadline, ticker.tick()).await.is_err() {
                break;
            }
            match timeout_at(deadline, self.rpc.transaction_receipt(tx_hash)).await {
                Err(_) => break,
                Ok(Ok(Some(receipt))) => {
                    lifecycle.advance(TxState::Mined)?;
                    debug!(block = receipt.block_number, "transaction mined");
                    return Ok(receipt);
                }
                Ok(Ok(None)) => debug!("receipt not available yet"),
                Ok(Err(err)) => {
                    debug!(error = %err, "receipt poll failed, retrying");
                    last_error = Some(err.to_string());
                }
            }
        }

        lifecycle.advance(TxState::TimedOut)?;
        Err(HarnessError::Timeout {
            tx_hash,
            waited: timeout,
            last_error,
        })
    }

    /// Waits the default deadline for `tx_hash` to be mined.
    pub async fn expect_mined(&self, tx_hash: Hash) -> Result<Receipt, HarnessError> {
        self.wait_mined(tx_hash, self.config.default_timeout()).await
    }

    /// Waits for `tx_hash`, then requires a successful receipt.
    ///
    /// # Errors
    ///
    /// * `Timeout` - not mined in time
    /// * `UnexpectedStatus` - the receipt reports failure
    pub async fn expect_success_receipt(&self, tx_hash: Hash) -> Result<Receipt, HarnessError> {
        self.expect_status(tx_hash, TxStatus::Success).await
    }

    /// Waits for `tx_hash`, then requires a failed receipt.
    ///
    /// # Errors
    ///
    /// * `Timeout` - not mined in time
    /// * `UnexpectedStatus` - the receipt reports success
    pub async fn expect_failed_receipt(&self, tx_hash: Hash) -> Result<Receipt, HarnessError> {
        self.expect_status(tx_hash, TxStatus::Failed).await
    }

    #[instrument(skip_all, fields(tx = %tx_hash, %expected))]
    async fn expect_status(&self, tx_hash: Hash, expected: TxStatus) -> Result<Receipt, HarnessError> {
        let mut lifecycle = TxLifecycle::submitted(tx_hash);
        lifecycle.advance(TxState::Pending)?;
        self.poll_until_mined(&mut lifecycle, self.config.default_timeout())
            .await?;

        let receipt = self
            .rpc
            .transaction_receipt(tx_hash)
            .await?
            .ok_or_else(|| HarnessError::Rpc(format!("receipt of mined {tx_hash} disappeared")))?;
        lifecycle.advance(TxState::ReceiptFetched)?;
        lifecycle.advance(match receipt.status {
            TxStatus::Success => TxState::Success,
            TxStatus::Failed => TxState::Failed,
        })?;

        if receipt.status != expected {
            return Err(HarnessError::UnexpectedStatus {
                tx_hash,
                expected,
                actual: receipt.status,
            });
        }
        Ok(receipt)
    }

    // =========================================================================
    // SUBMISSION
    // =========================================================================

    async fn gas_price(&self) -> Result<U256, HarnessError> {
        match self.config.gas_price_wei {
            Some(price) => Ok(U256::from(price)),
            None => self.rpc.gas_price().await,
        }
    }

    async fn sign_and_send(
        &self,
        signer: &LocalSigner,
        nonce: u64,
        to: Option<Address>,
        value: U256,
        data: Vec<u8>,
        gas_limit: u64,
    ) -> Result<SignedTransaction, HarnessError> {
        let request = TransactionRequest {
            nonce,
            gas_price: self.gas_price().await?,
            gas_limit,
            to,
            value,
            data: Bytes(data),
            chain_id: self.rpc.chain_id().await?,
        };
        let tx = signer.sign(request)?;
        let accepted = self.rpc.send_raw_transaction(&tx.raw).await?;
        if accepted != tx.hash {
            return Err(HarnessError::Rpc(format!(
                "node acknowledged {accepted}, submitted {}",
                tx.hash
            )));
        }
        debug!(tx = %tx.hash, nonce, "transaction submitted");
        Ok(tx)
    }

    /// Signs and submits a transaction at the sender's pending nonce.
    ///
    /// Callers serialize submissions per signer.
    #[instrument(skip(self, signer, data), fields(from = %signer.address()))]
    pub async fn transact(
        &self,
        signer: &LocalSigner,
        to: Address,
        value: U256,
        data: Vec<u8>,
    ) -> Result<SignedTransaction, HarnessError> {
        let nonce = self.rpc.transaction_count(signer.address()).await?;
        self.sign_and_send(signer, nonce, Some(to), value, data, self.config.gas_limit)
            .await
    }

    /// Deploys `artifact` with `constructor_args` appended and returns the
    /// binding and its address.
    ///
    /// The address is precomputed from the deployer and its pre-deployment
    /// sequence.
    ///
    /// # Errors
    ///
    /// * `Timeout` - not mined within the deployment deadline
    /// * `NoCodeAfterDeploy` - no created address, or no code stored there
    /// * `AddressMismatch` - created address differs from the precomputed one
    #[instrument(skip(self, signer, artifact, constructor_args), fields(contract = %artifact.name, deployer = %signer.address()))]
    pub async fn deploy_contract(
        &self,
        signer: &LocalSigner,
        artifact: &ContractArtifact,
        constructor_args: &[u8],
    ) -> Result<(ContractBinding, Address), HarnessError> {
        let deployer = signer.address();
        let nonce = self.rpc.transaction_count(deployer).await?;
        let expected = compute_contract_address(deployer, nonce);

        let mut init_code = artifact.bytecode.to_vec();
        init_code.extend_from_slice(constructor_args);
        let tx = self
            .sign_and_send(
                signer,
                nonce,
                None,
                U256::zero(),
                init_code,
                self.config.deploy_gas_limit,
            )
            .await?;

        let receipt = self
            .wait_mined(tx.hash, self.config.deploy_timeout())
            .await?;
        let no_code = || HarnessError::NoCodeAfterDeploy { tx_hash: tx.hash };
        let actual = receipt
            .contract_address
            .filter(|address| !address.is_zero())
            .ok_or_else(no_code)?;
        if self.rpc.code_at(actual).await?.is_empty() {
            return Err(no_code());
        }
        if actual != expected {
            return Err(HarnessError::AddressMismatch { expected, actual });
        }

        info!(address = %actual, block = receipt.block_number, "contract deployed");
        Ok((
            ContractBinding {
                name: artifact.name.clone(),
                address: actual,
            },
            actual,
        ))
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Read-only call against a deployed contract.
    pub async fn call(&self, binding: &ContractBinding, data: Vec<u8>) -> Result<Bytes, HarnessError> {
        self.rpc
            .call(&CallRequest {
                to: binding.address,
                data: Bytes(data),
                ..CallRequest::default()
            })
            .await
    }

    /// ERC-20 `balanceOf(holder)`.
    pub async fn token_balance(
        &self,
        binding: &ContractBinding,
        holder: Address,
    ) -> Result<U256, HarnessError> {
        let output = self.call(binding, abi::balance_of_call(holder)).await?;
        abi::decode_uint(&output, 0)
    }
}

// =============================================================================
// TESTS
// =============================================================================
