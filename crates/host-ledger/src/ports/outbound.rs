//! # Driven Ports (SPI - Outbound)
//!
//! The three capabilities the EVM adapter needs from the host ledger. Each is
//! an independent trait so alternative ledger backends can satisfy them
//! separately; the reference keepers live in `crate::adapters`.
//!
//! Reads take `&Context`, writes take `&mut Context`. Writes are only
//! observable through the context until it is committed.

use crate::domain::context::Context;
use crate::domain::entities::{Account, ValidatorRecord};
use crate::domain::errors::LedgerError;
use crate::domain::services;
use crate::domain::value_objects::{Coin, ConsAddress, Denom};
use shared_types::Address;
use std::ops::ControlFlow;
use std::sync::Arc;

// =============================================================================
// ACCOUNT CAPABILITY
// =============================================================================

/// Create, read, update, delete and enumerate ledger accounts.
pub trait AccountCapability: Send + Sync {
    /// Creates and stores a base account at `address`.
    ///
    /// The account number is the next value of the ledger-wide counter, so
    /// the result is deterministic for a given state. An address reserved
    /// by a registered module receives that module's account instead.
    ///
    /// # Errors
    ///
    /// * `Conflict` - an account is already stored at `address`
    fn create_account(&self, ctx: &mut Context, address: Address) -> Result<Account, LedgerError>;

    /// Returns the sequence of `address`, or 0 for a never-seen address.
    fn sequence(&self, ctx: &Context, address: Address) -> Result<u64, LedgerError>;

    /// Returns true if an account is stored at `address`.
    fn has_account(&self, ctx: &Context, address: Address) -> Result<bool, LedgerError>;

    /// Loads the account stored at `address`.
    ///
    /// # Errors
    ///
    /// * `AccountNotFound` - nothing is stored at `address`
    fn account(&self, ctx: &Context, address: Address) -> Result<Account, LedgerError>;

    /// Stores `account`, replacing any record at its address.
    fn set_account(&self, ctx: &mut Context, account: Account) -> Result<(), LedgerError>;

    /// Removes `account`. A later [`AccountCapability::account`] yields
    /// `AccountNotFound`.
    fn remove_account(&self, ctx: &mut Context, account: &Account) -> Result<(), LedgerError>;

    /// Visits accounts in ascending address order until the callback breaks.
    ///
    /// The order is deterministic within a snapshot; nothing is promised
    /// across snapshots.
    fn iterate_accounts(
        &self,
        ctx: &Context,
        visit: &mut dyn FnMut(&Account) -> ControlFlow<()>,
    ) -> Result<(), LedgerError>;

    /// Returns the module account named `name`, creating it on first use.
    ///
    /// # Errors
    ///
    /// * `ModuleNotFound` - `name` is not a registered module
    fn module_account(&self, ctx: &mut Context, name: &str) -> Result<Account, LedgerError>;

    /// Resolves the address of a module account. Pure in `name`.
    fn module_address(&self, name: &str) -> Address {
        services::module_address(name)
    }

    /// Bumps the sequence of `address` by exactly one, creating the account
    /// if needed, and returns the new sequence.
    fn increment_sequence(&self, ctx: &mut Context, address: Address) -> Result<u64, LedgerError> {
        let mut account = match self.account(ctx, address) {
            Ok(account) => account,
            Err(LedgerError::AccountNotFound { .. }) => self.create_account(ctx, address)?,
            Err(err) => return Err(err),
        };
        account.sequence = account
            .sequence
            .checked_add(1)
            .ok_or_else(|| LedgerError::Overflow {
                denom: "sequence".to_string(),
            })?;
        let sequence = account.sequence;
        self.set_account(ctx, account)?;
        Ok(sequence)
    }
}

// =============================================================================
// BALANCE CAPABILITY
// =============================================================================

/// Read balances and move value between accounts and module accounts.
///
/// Every transfer is atomic: either the full amount moves or nothing does.
/// Outside of `mint`/`burn`, total supply per denom never changes.
pub trait BalanceCapability: Send + Sync {
    /// Balance of `address` in `denom`; absent balances read as zero.
    fn balance(&self, ctx: &Context, address: Address, denom: &Denom) -> Result<Coin, LedgerError>;

    /// Total supply of `denom`.
    fn total_supply(&self, ctx: &Context, denom: &Denom) -> Result<Coin, LedgerError>;

    /// Moves `coin` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// * `InsufficientFunds` - `from` holds less than `coin.amount`
    fn send(&self, ctx: &mut Context, from: Address, to: Address, coin: &Coin)
        -> Result<(), LedgerError>;

    /// Moves `coin` from a module account to `to` (fee distribution, refunds).
    fn send_from_module_to_account(
        &self,
        ctx: &mut Context,
        module: &str,
        to: Address,
        coin: &Coin,
    ) -> Result<(), LedgerError>;

    /// Moves `coin` from `from` to a module account (fee collection).
    fn send_from_account_to_module(
        &self,
        ctx: &mut Context,
        from: Address,
        module: &str,
        coin: &Coin,
    ) -> Result<(), LedgerError>;

    /// Creates `coin` in the module account, raising total supply.
    ///
    /// # Errors
    ///
    /// * `Unauthorized` - the module account lacks `Minter`
    fn mint(&self, ctx: &mut Context, module: &str, coin: &Coin) -> Result<(), LedgerError>;

    /// Destroys `coin` from the module account, lowering total supply.
    ///
    /// # Errors
    ///
    /// * `Unauthorized` - the module account lacks `Burner`
    /// * `InsufficientFunds` - the module holds less than `coin.amount`
    fn burn(&self, ctx: &mut Context, module: &str, coin: &Coin) -> Result<(), LedgerError>;
}

// =============================================================================
// VALIDATOR RESOLUTION CAPABILITY
// =============================================================================

/// Resolve consensus identities to validator records.
pub trait ValidatorCapability: Send + Sync {
    /// Loads the validator keyed by `cons_address` in the context's snapshot.
    ///
    /// Implementations must read through `ctx` on every call; caching across
    /// contexts would return records from the wrong height.
    ///
    /// # Errors
    ///
    /// * `ValidatorNotFound` - no validator is registered under the address
    fn validator_by_cons_addr(
        &self,
        ctx: &Context,
        cons_address: ConsAddress,
    ) -> Result<ValidatorRecord, LedgerError>;
}

// =============================================================================
// SHARED-OWNERSHIP FORWARDING
// =============================================================================

impl<T: AccountCapability + ?Sized> AccountCapability for Arc<T> {
    fn create_account(&self, ctx: &mut Context, address: Address) -> Result<Account, LedgerError> {
        (**self).create_account(ctx, address)
    }

    fn sequence(&self, ctx: &Context, address: Address) -> Result<u64, LedgerError> {
        (**self).sequence(ctx, address)
    }

    fn has_account(&self, ctx: &Context, address: Address) -> Result<bool, LedgerError> {
        (**self).has_account(ctx, address)
    }

    fn account(&self, ctx: &Context, address: Address) -> Result<Account, LedgerError> {
        (**self).account(ctx, address)
    }

    fn set_account(&self, ctx: &mut Context, account: Account) -> Result<(), LedgerError> {
        (**self).set_account(ctx, account)
    }

    fn remove_account(&self, ctx: &mut Context, account: &Account) -> Result<(), LedgerError> {
        (**self).remove_account(ctx, account)
    }

    fn iterate_accounts(
        &self,
        ctx: &Context,
        visit: &mut dyn FnMut(&Account) -> ControlFlow<()>,
    ) -> Result<(), LedgerError> {
        (**self).iterate_accounts(ctx, visit)
    }

    fn module_account(&self, ctx: &mut Context, name: &str) -> Result<Account, LedgerError> {
        (**self).module_account(ctx, name)
    }

    fn module_address(&self, name: &str) -> Address {
        (**self).module_address(name)
    }

    fn increment_sequence(&self, ctx: &mut Context, address: Address) -> Result<u64, LedgerError> {
        (**self).increment_sequence(ctx, address)
    }
}

impl<T: BalanceCapability + ?Sized> BalanceCapability for Arc<T> {
    fn balance(&self, ctx: &Context, address: Address, denom: &Denom) -> Result<Coin, LedgerError> {
        (**self).balance(ctx, address, denom)
    }

    fn total_supply(&self, ctx: &Context, denom: &Denom) -> Result<Coin, LedgerError> {
        (**self).total_supply(ctx, denom)
    }

    fn send(
        &self,
        ctx: &mut Context,
        from: Address,
        to: Address,
        coin: &Coin,
    ) -> Result<(), LedgerError> {
        (**self).send(ctx, from, to, coin)
    }

    fn send_from_module_to_account(
        &self,
        ctx: &mut Context,
        module: &str,
        to: Address,
        coin: &Coin,
    ) -> Result<(), LedgerError> {
        (**self).send_from_module_to_account(ctx, module, to, coin)
    }

    fn send_from_account_to_module(
        &self,
        ctx: &mut Context,
        from: Address,
        module: &str,
        coin: &Coin,
    ) -> Result<(), LedgerError> {
        (**self).send_from_account_to_module(ctx, from, module, coin)
    }

    fn mint(&self, ctx: &mut Context, module: &str, coin: &Coin) -> Result<(), LedgerError> {
        (**self).mint(ctx, module, coin)
    }

    fn burn(&self, ctx: &mut Context, module: &str, coin: &Coin) -> Result<(), LedgerError> {
        (**self).burn(ctx, module, coin)
    }
}

impl<T: ValidatorCapability + ?Sized> ValidatorCapability for Arc<T> {
    fn validator_by_cons_addr(
        &self,
        ctx: &Context,
        cons_address: ConsAddress,
    ) -> Result<ValidatorRecord, LedgerError> {
        (**self).validator_by_cons_addr(ctx, cons_address)
    }
}
