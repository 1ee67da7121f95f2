//! # Ports
//!
//! - [`EthRpc`]: the JSON-RPC surface of a network instance. The harness
//!   drives everything through it; [`crate::adapters::HttpRpcClient`] talks
//!   to a real instance and [`crate::adapters::LocalNode`] serves the same
//!   surface in-process.
//! - [`ContractRuntime`]: the contract execution engine embedded in the
//!   in-process node. It reaches the host ledger only through the `Context`
//!   it is handed.

use crate::domain::types::{CallEnv, CallRequest, Execution, Receipt};
use crate::errors::HarnessError;
use async_trait::async_trait;
use host_ledger::domain::context::Context;
use host_ledger::domain::errors::LedgerError;
use shared_types::{Address, Bytes, Hash, U256};
use std::sync::Arc;

// =============================================================================
// JSON-RPC
// =============================================================================

/// Ethereum JSON-RPC methods used by the harness.
#[async_trait]
pub trait EthRpc: Send + Sync {
    /// `eth_chainId`
    async fn chain_id(&self) -> Result<u64, HarnessError>;

    /// `eth_blockNumber`
    async fn block_number(&self) -> Result<u64, HarnessError>;

    /// `eth_gasPrice`
    async fn gas_price(&self) -> Result<U256, HarnessError>;

    /// `eth_getTransactionCount` at the pending block.
    async fn transaction_count(&self, address: Address) -> Result<u64, HarnessError>;

    /// `eth_getBalance` at the latest block.
    async fn balance(&self, address: Address) -> Result<U256, HarnessError>;

    /// `eth_getCode` at the latest block. Empty when no contract exists.
    async fn code_at(&self, address: Address) -> Result<Bytes, HarnessError>;

    /// `eth_sendRawTransaction`
    async fn send_raw_transaction(&self, raw: &Bytes) -> Result<Hash, HarnessError>;

    /// `eth_getTransactionReceipt`. `None` until the transaction is mined.
    async fn transaction_receipt(&self, tx_hash: Hash) -> Result<Option<Receipt>, HarnessError>;

    /// `eth_call` at the latest block.
    async fn call(&self, request: &CallRequest) -> Result<Bytes, HarnessError>;
}

#[async_trait]
impl<T: EthRpc + ?Sized> EthRpc for Arc<T> {
    async fn chain_id(&self) -> Result<u64, HarnessError> {
        (**self).chain_id().await
    }

    async fn block_number(&self) -> Result<u64, HarnessError> {
        (**self).block_number().await
    }

    async fn gas_price(&self) -> Result<U256, HarnessError> {
        (**self).gas_price().await
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, HarnessError> {
        (**self).transaction_count(address).await
    }

    async fn balance(&self, address: Address) -> Result<U256, HarnessError> {
        (**self).balance(address).await
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, HarnessError> {
        (**self).code_at(address).await
    }

    async fn send_raw_transaction(&self, raw: &Bytes) -> Result<Hash, HarnessError> {
        (**self).send_raw_transaction(raw).await
    }

    async fn transaction_receipt(&self, tx_hash: Hash) -> Result<Option<Receipt>, HarnessError> {
        (**self).transaction_receipt(tx_hash).await
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes, HarnessError> {
        (**self).call(request).await
    }
}

// =============================================================================
// CONTRACT EXECUTION
// =============================================================================

/// Contract execution engine.
///
/// Implementations write only through `ctx`. The node runs every invocation
/// in a branch and discards it on [`Execution::Revert`] or on error.
pub trait ContractRuntime: Send + Sync {
    /// Runs creation code. On success `output` is the runtime code to store
    /// at `env.contract`.
    fn create(
        &self,
        ctx: &mut Context,
        env: &CallEnv,
        init_code: &[u8],
    ) -> Result<Execution, LedgerError>;

    /// Runs `code` stored at `env.contract` with calldata `input`.
    fn call(
        &self,
        ctx: &mut Context,
        env: &CallEnv,
        code: &[u8],
        input: &[u8],
    ) -> Result<Execution, LedgerError>;
}
