//! # Error Types
//!
//! Every harness operation fails with a [`HarnessError`]. Errors surface to
//! the scenario immediately; the only retries are receipt polls inside
//! `wait_mined`.

use crate::domain::lifecycle::TxState;
use crate::domain::types::TxStatus;
use host_ledger::domain::errors::LedgerError;
use shared_types::{Address, Hash};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the harness, its ports and adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarnessError {
    /// The deadline expired before the transaction was observed as mined.
    #[error("timed out after {waited:?} waiting for {tx_hash} to be mined{}", last_error_suffix(.last_error))]
    Timeout {
        tx_hash: Hash,
        waited: Duration,
        /// Last receipt retrieval error, if polling ever failed.
        last_error: Option<String>,
    },

    /// The deployed address differs from the precomputed one.
    #[error("contract deployed at {actual}, expected {expected}")]
    AddressMismatch { expected: Address, actual: Address },

    /// The receipt status differs from the expected one.
    #[error("transaction {tx_hash} status is {actual}, expected {expected}")]
    UnexpectedStatus {
        tx_hash: Hash,
        expected: TxStatus,
        actual: TxStatus,
    },

    /// Deployment was mined but no code exists at the created address.
    #[error("no contract code after deployment {tx_hash}")]
    NoCodeAfterDeploy { tx_hash: Hash },

    /// Illegal lifecycle step.
    #[error("invalid lifecycle transition for {tx_hash}: {from} -> {to}")]
    InvalidTransition {
        tx_hash: Hash,
        from: TxState,
        to: TxState,
    },

    /// Transport failure or JSON-RPC error response.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// Transaction could not be encoded, signed or decoded.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// The running instance did not map the labelled container port.
    #[error("container port {0} is not mapped")]
    UnmappedPort(String),

    /// Ledger operation failed inside the in-process node.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    last_error
        .as_ref()
        .map(|err| format!(" (last error: {err})"))
        .unwrap_or_default()
}

impl HarnessError {
    /// Returns true for deadline expiry.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<reqwest::Error> for HarnessError {
    fn from(err: reqwest::Error) -> Self {
        Self::Rpc(err.to_string())
    }
}

impl From<shared_types::HexError> for HarnessError {
    fn from(err: shared_types::HexError) -> Self {
        Self::Rpc(format!("malformed hex in response: {err}"))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display_carries_last_error() {
        let err = HarnessError::Timeout {
            tx_hash: Hash::ZERO,
            waited: Duration::from_secs(15),
            last_error: Some("connection refused".to_string()),
        };
        let text = err.to_string();
        assert!(text.starts_with("timed out after 15s"));
        assert!(text.ends_with("(last error: connection refused)"));
        assert!(err.is_timeout());
    }

    #[test]
    fn test_timeout_is_distinct_from_rpc() {
        assert!(!HarnessError::Rpc("boom".to_string()).is_timeout());
    }

    #[test]
    fn test_ledger_errors_convert() {
        let err: HarnessError = LedgerError::Cancelled.into();
        assert_eq!(err, HarnessError::Ledger(LedgerError::Cancelled));
    }
}
