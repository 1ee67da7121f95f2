//! # Host Ledger - EVM Capability Contract
//!
//! ## Purpose
//!
//! Defines the narrow interface through which an embedded EVM reads and
//! mutates a modular host ledger: accounts, balances and validator
//! resolution. The EVM adapter depends on three independent capabilities
//! rather than on one ledger object, so any backend providing them can host
//! the EVM.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Supply changes only through mint/burn | `adapters/bank_keeper.rs` - `send()` moves, `mint()`/`burn()` create and destroy |
//! | Transfers are all-or-nothing | `adapters/bank_keeper.rs` - funds and overflow checked before the first balance write |
//! | Sequences never decrease | `ports/outbound.rs` - `increment_sequence()`, `service.rs` - `set_nonce()` |
//! | Module addresses are pure in the name | `domain/services.rs` - `module_address()` |
//! | Aborted contexts leave no effects | `domain/context.rs` - `ensure_active()`, `adapters/memory_store.rs` - `commit()` |
//! | Validator lookups read the context's snapshot | `adapters/staking_keeper.rs` - no cache |
//!
//! ## Capabilities
//!
//! | Trait | Reference Keeper | Purpose |
//! |-------|------------------|---------|
//! | `AccountCapability` | `AccountKeeper` | Account CRUD, sequences, module accounts |
//! | `BalanceCapability` | `BankKeeper` | Balances, supply, transfers, mint/burn |
//! | `ValidatorCapability` | `StakingKeeper` | Consensus address to validator record |
//!
//! ## Usage Example
//!
//! ```ignore
//! use host_ledger::prelude::*;
//!
//! let store = LedgerStore::new();
//! let accounts = Arc::new(AccountKeeper::with_default_modules());
//! let bank = Arc::new(BankKeeper::new(Arc::clone(&accounts)));
//! let adapter = HostLedgerAdapter::new(
//!     AdapterConfig::default(),
//!     accounts,
//!     bank,
//!     Arc::new(StakingKeeper::new()),
//! );
//!
//! let mut ctx = store.begin(BlockHeader::default());
//! adapter.add_balance(&mut ctx, alice, U256::from(1_000u64))?;
//! store.commit(ctx)?;
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
pub mod domain;
pub mod ports;
pub mod service;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain
    pub use crate::domain::context::{CancelToken, Context, SnapshotId, StoreKey};
    pub use crate::domain::entities::{
        Account, AccountKind, BlockHeader, BondStatus, Permission, ValidatorRecord,
    };
    pub use crate::domain::errors::LedgerError;
    pub use crate::domain::services::{cons_address_from_pubkey, module_address};
    pub use crate::domain::value_objects::{Coin, ConsAddress, Denom};

    // Ports
    pub use crate::ports::inbound::EvmAccountState;
    pub use crate::ports::outbound::{AccountCapability, BalanceCapability, ValidatorCapability};

    // Adapters
    pub use crate::adapters::{modules, AccountKeeper, BankKeeper, LedgerStore, StakingKeeper};

    // Service
    pub use crate::service::{AdapterConfig, HostLedgerAdapter};

    // Shared value objects
    pub use shared_types::{Address, Bytes, U256};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// TESTS
// =============================================================================
