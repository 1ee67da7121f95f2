//! # Core Domain Entities
//!
//! Accounts, module permissions and validator records as the host ledger
//! stores them. The EVM never sees these types directly; it goes through the
//! flat view exposed by [`crate::service::HostLedgerAdapter`].

use crate::domain::value_objects::ConsAddress;
use serde::{Deserialize, Serialize};
use shared_types::{Address, Bytes, U256};
use std::fmt;

// =============================================================================
// BLOCK HEADER
// =============================================================================

/// Header of the block a context executes in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Chain identifier (EIP-155).
    pub chain_id: u64,
    /// Block height.
    pub height: u64,
    /// Unix timestamp in seconds.
    pub time: u64,
    /// Consensus address of the block proposer.
    pub proposer: ConsAddress,
}

// =============================================================================
// ACCOUNTS
// =============================================================================

/// Capabilities a module account may hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// May mint new supply into its own balance.
    Minter,
    /// May burn supply from its own balance.
    Burner,
    /// May hold bonded stake.
    Staking,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Minter => "minter",
            Self::Burner => "burner",
            Self::Staking => "staking",
        })
    }
}

/// Distinguishes externally owned accounts from module accounts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    /// Regular account, controlled by a key.
    Base,
    /// Account owned by a ledger module, addressed by the module name.
    Module {
        /// Module name the address derives from.
        name: String,
        /// Granted permissions.
        permissions: Vec<Permission>,
    },
}

/// Ledger account record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account address.
    pub address: Address,
    /// Ledger-wide creation index.
    pub account_number: u64,
    /// Number of transactions originated by this account (EVM nonce).
    pub sequence: u64,
    /// Public key, once known.
    pub pub_key: Option<Bytes>,
    /// Base or module account.
    pub kind: AccountKind,
}

impl Account {
    /// Creates a fresh base account with sequence zero.
    #[must_use]
    pub fn new_base(address: Address, account_number: u64) -> Self {
        Self {
            address,
            account_number,
            sequence: 0,
            pub_key: None,
            kind: AccountKind::Base,
        }
    }

    /// Creates a module account.
    #[must_use]
    pub fn new_module(
        address: Address,
        account_number: u64,
        name: impl Into<String>,
        permissions: Vec<Permission>,
    ) -> Self {
        Self {
            address,
            account_number,
            sequence: 0,
            pub_key: None,
            kind: AccountKind::Module {
                name: name.into(),
                permissions,
            },
        }
    }

    /// Returns the module name for module accounts.
    #[must_use]
    pub fn module_name(&self) -> Option<&str> {
        match &self.kind {
            AccountKind::Module { name, .. } => Some(name),
            AccountKind::Base => None,
        }
    }

    /// Returns true if this module account holds the permission.
    #[must_use]
    pub fn has_permission(&self, permission: Permission) -> bool {
        match &self.kind {
            AccountKind::Module { permissions, .. } => permissions.contains(&permission),
            AccountKind::Base => false,
        }
    }
}

// =============================================================================
// VALIDATORS
// =============================================================================

/// Bonding state of a validator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BondStatus {
    /// Not in the active set and not unbonding.
    #[default]
    Unbonded,
    /// Leaving the active set.
    Unbonding,
    /// In the active set.
    Bonded,
}

/// Validator record as sourced from the staking subsystem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorRecord {
    /// Operator address; receives fees when the validator proposes.
    pub operator: Address,
    /// Consensus address the record is keyed by.
    pub cons_address: ConsAddress,
    /// Consensus public key.
    pub cons_pubkey: Bytes,
    /// Bonding state.
    pub status: BondStatus,
    /// Bonded tokens.
    pub tokens: U256,
    /// Shares issued to delegators.
    pub delegator_shares: U256,
    /// Whether the validator is jailed.
    pub jailed: bool,
    /// Commission rate in basis points.
    pub commission_rate_bps: u32,
    /// Human-readable name.
    pub moniker: String,
}

impl ValidatorRecord {
    /// Returns true if the validator is bonded and not jailed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == BondStatus::Bonded && !self.jailed
    }
}

// =============================================================================
// TESTS
// =============================================================================
