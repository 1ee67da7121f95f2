//! # Transaction Lifecycle
//!
//! ```text
//! Submitted ──→ Pending ──┬──→ Mined ──→ ReceiptFetched ──┬──→ Success
//!                         │                               └──→ Failed
//!                         └──→ TimedOut
//! ```
//!
//! `TimedOut`, `Success` and `Failed` are terminal and mutually exclusive.

use crate::errors::HarnessError;
use shared_types::Hash;
use std::fmt;

/// Observable state of a submitted transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TxState {
    /// Handed to the node.
    Submitted,
    /// Accepted, awaiting inclusion.
    Pending,
    /// Included in a block.
    Mined,
    /// Deadline expired before inclusion was observed.
    TimedOut,
    /// Receipt retrieved after inclusion.
    ReceiptFetched,
    /// Receipt status is success.
    Success,
    /// Receipt status is failure.
    Failed,
}

impl TxState {
    /// Returns true for states with no outgoing transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::TimedOut | Self::Success | Self::Failed)
    }

    /// Returns true if `self → next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Submitted, Self::Pending)
                | (Self::Pending, Self::Mined | Self::TimedOut)
                | (Self::Mined, Self::ReceiptFetched)
                | (Self::ReceiptFetched, Self::Success | Self::Failed)
        )
    }
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Tracks one transaction through its lifecycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxLifecycle {
    tx_hash: Hash,
    state: TxState,
}

impl TxLifecycle {
    /// Starts tracking a freshly submitted transaction.
    #[must_use]
    pub fn submitted(tx_hash: Hash) -> Self {
        Self {
            tx_hash,
            state: TxState::Submitted,
        }
    }

    /// Transaction hash.
    #[must_use]
    pub fn tx_hash(&self) -> Hash {
        self.tx_hash
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> TxState {
        self.state
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// * `InvalidTransition` - `next` is not reachable from the current state
    pub fn advance(&mut self, next: TxState) -> Result<(), HarnessError> {
        if !self.state.can_transition_to(next) {
            return Err(HarnessError::InvalidTransition {
                tx_hash: self.tx_hash,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
