//! # Error Types
//!
//! Every capability operation fails with a [`LedgerError`]. Errors propagate
//! synchronously to the caller and are never retried inside a keeper.

use crate::domain::context::SnapshotId;
use crate::domain::entities::Permission;
use crate::domain::value_objects::ConsAddress;
use shared_types::{Address, U256};
use thiserror::Error;

/// Errors raised by the account, balance and validator capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// No account is stored at the address.
    #[error("account not found: {address}")]
    AccountNotFound { address: Address },

    /// The module name is not registered with the account keeper.
    #[error("module account not registered: {name}")]
    ModuleNotFound { name: String },

    /// No validator is registered under the consensus address.
    #[error("validator not found for consensus address {cons_address}")]
    ValidatorNotFound { cons_address: ConsAddress },

    /// Balance is short of the requested amount.
    #[error("insufficient funds: {address} holds {available}{denom}, needs {required}{denom}")]
    InsufficientFunds {
        address: Address,
        denom: String,
        required: U256,
        available: U256,
    },

    /// The module account lacks the permission for the operation.
    #[error("module {module} lacks {permission} permission")]
    Unauthorized {
        module: String,
        permission: Permission,
    },

    /// An account is already stored at the address.
    #[error("account already exists: {address}")]
    Conflict { address: Address },

    /// The execution context was cancelled or its deadline passed.
    #[error("execution context cancelled")]
    Cancelled,

    /// The context branched from a state that has since been overwritten.
    #[error("stale snapshot: context branched from {expected}, store is at {actual}")]
    StaleSnapshot {
        expected: SnapshotId,
        actual: SnapshotId,
    },

    /// A sequence may only move forward.
    #[error("sequence regression for {address}: current {current}, requested {requested}")]
    SequenceRegression {
        address: Address,
        current: u64,
        requested: u64,
    },

    /// Denom failed validation.
    #[error("invalid denom: {0:?}")]
    InvalidDenom(String),

    /// Amount arithmetic overflowed.
    #[error("amount overflow in denom {denom}")]
    Overflow { denom: String },

    /// Stored record could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),
}

impl LedgerError {
    /// Returns true for any of the not-found variants.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AccountNotFound { .. } | Self::ModuleNotFound { .. } | Self::ValidatorNotFound { .. }
        )
    }
}

impl From<bincode::Error> for LedgerError {
    fn from(err: bincode::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
