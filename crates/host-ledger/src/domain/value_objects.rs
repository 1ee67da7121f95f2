//! # Value Objects
//!
//! Ledger-side primitives: denominations, coins and consensus addresses.

use crate::domain::errors::LedgerError;
use serde::{Deserialize, Serialize};
use shared_types::{Address, U256};
use std::fmt;

// =============================================================================
// DENOM
// =============================================================================

/// A validated coin denomination.
///
/// Must match `[a-zA-Z][a-zA-Z0-9/:._-]{2,127}`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Denom(pub(crate) String);

impl Denom {
    /// Minimum denom length.
    pub const MIN_LEN: usize = 3;
    /// Maximum denom length.
    pub const MAX_LEN: usize = 128;

    /// Validates and wraps a denom string.
    pub fn new(denom: impl Into<String>) -> Result<Self, LedgerError> {
        let denom = denom.into();
        let mut chars = denom.chars();
        let valid_first = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
        let valid_rest =
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-'));
        let valid_len = (Self::MIN_LEN..=Self::MAX_LEN).contains(&denom.len());

        if valid_first && valid_rest && valid_len {
            Ok(Self(denom))
        } else {
            Err(LedgerError::InvalidDenom(denom))
        }
    }

    /// Returns the denom as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Denom {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Denom> for String {
    fn from(denom: Denom) -> Self {
        denom.0
    }
}

impl fmt::Debug for Denom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for Denom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// COIN
// =============================================================================

/// An amount of a single denomination. Amounts are never negative.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Denomination.
    pub denom: Denom,
    /// Amount in the smallest unit.
    pub amount: U256,
}

impl Coin {
    /// Creates a coin.
    #[must_use]
    pub fn new(denom: Denom, amount: impl Into<U256>) -> Self {
        Self {
            denom,
            amount: amount.into(),
        }
    }

    /// Creates a zero-amount coin.
    #[must_use]
    pub fn zero(denom: Denom) -> Self {
        Self {
            denom,
            amount: U256::zero(),
        }
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

// =============================================================================
// CONSENSUS ADDRESS
// =============================================================================

/// Address derived from a validator's consensus public key.
///
/// Keys validator records in the staking subsystem; distinct from the
/// validator's operator address.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct ConsAddress(pub Address);

impl ConsAddress {
    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for ConsAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConsAddress({})", self.0)
    }
}

impl fmt::Display for ConsAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// =============================================================================
// TESTS
// =============================================================================
