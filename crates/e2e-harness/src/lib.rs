//! # E2E Harness - Adapter Contract Scenarios
//!
//! ## Purpose
//!
//! Drives a network instance over Ethereum JSON-RPC and asserts that value
//! moved by EVM transactions lands in the host ledger exactly as the
//! adapter contract promises: mined within a deadline, with the expected
//! receipt status and the expected balance change.
//!
//! ## Architecture
//!
//! ```text
//!   Harness ──→ EthRpc ──┬──→ HttpRpcClient ──→ running instance (JSON-RPC/HTTP)
//!                        └──→ LocalNode ──→ HostLedgerAdapter ──→ keepers
//!                                  └──→ ContractRuntime (NativeTokenRuntime)
//! ```
//!
//! ## Guarantees
//!
//! | Guarantee | Enforcement Location |
//! |-----------|---------------------|
//! | Lifecycle terminal states are exclusive | `domain/lifecycle.rs` - `advance()` |
//! | Deployed address equals `keccak256(rlp([deployer, nonce]))[12..]` | `harness.rs` - `deploy_contract()` |
//! | Unreachable node is a `Timeout`, not a hang | `harness.rs` - `timeout_at` on tick and poll |
//! | Failed execution keeps fee and nonce only | `adapters/local_node.rs` - execution branch |
//! | Dropped transactions never resolve | `adapters/local_node.rs` - `produce_block()` |
//!
//! ## Usage Example
//!
//! ```ignore
//! use e2e_harness::prelude::*;
//!
//! let owner = LocalSigner::random();
//! let node = Arc::new(LocalNode::start(
//!     LocalNodeConfig::default().with_genesis_account(owner.address(), U256::exp10(18)),
//! )?);
//! let harness = Harness::new(node, HarnessConfig::default());
//!
//! let args = NativeTokenRuntime::<LedgerBank>::constructor_args(U256::from(1_000u64));
//! let (token, _) = harness
//!     .deploy_contract(&owner, &NativeTokenRuntime::<LedgerBank>::artifact(), &args)
//!     .await?;
//! let tx = harness
//!     .transact(&owner, token.address, U256::zero(), abi::transfer_call(bob, U256::from(100u64)))
//!     .await?;
//! harness.expect_success_receipt(tx.hash).await?;
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod config;
pub mod domain;
pub mod errors;
pub mod harness;
pub mod logging;
pub mod ports;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain
    pub use crate::domain::abi;
    pub use crate::domain::lifecycle::{TxLifecycle, TxState};
    pub use crate::domain::tx::{
        compute_contract_address, decode_raw_transaction, keccak256, LocalSigner,
        SignedTransaction, TransactionRequest,
    };
    pub use crate::domain::types::{
        CallEnv, CallRequest, ContractArtifact, ContractBinding, Execution, Receipt, TxStatus,
    };

    // Errors
    pub use crate::errors::HarnessError;

    // Ports
    pub use crate::ports::{ContractRuntime, EthRpc};

    // Adapters
    pub use crate::adapters::{
        HttpRpcClient, LedgerBank, LocalNode, LocalNodeConfig, NativeTokenRuntime,
    };

    // Configuration
    pub use crate::config::{
        default_fixture_config, FixtureConfig, HarnessConfig, RunningFixture, DEFAULT_TIMEOUT,
        TX_TIMEOUT,
    };

    // Harness
    pub use crate::harness::Harness;
    pub use crate::logging::init_test_tracing;

    // Shared value objects
    pub use shared_types::{Address, Bytes, Hash, U256};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
