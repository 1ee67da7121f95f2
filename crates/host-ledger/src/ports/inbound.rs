//! # Driving Ports (API - Inbound)
//!
//! The flat account view the EVM execution engine drives: one address space,
//! one native balance, one nonce per account. Implemented by
//! [`crate::service::HostLedgerAdapter`] on top of the outbound capabilities.

use crate::domain::context::Context;
use crate::domain::errors::LedgerError;
use shared_types::{Address, U256};

/// EVM-facing account state backed by the host ledger.
pub trait EvmAccountState: Send + Sync {
    /// Native balance of `address` in the EVM denom.
    fn balance(&self, ctx: &Context, address: Address) -> Result<U256, LedgerError>;

    /// Credits `amount` to `address`, minting it into supply.
    fn add_balance(&self, ctx: &mut Context, address: Address, amount: U256)
        -> Result<(), LedgerError>;

    /// Debits `amount` from `address`, burning it from supply.
    fn sub_balance(&self, ctx: &mut Context, address: Address, amount: U256)
        -> Result<(), LedgerError>;

    /// Moves `amount` between accounts without touching supply.
    fn transfer(
        &self,
        ctx: &mut Context,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), LedgerError>;

    /// Nonce of `address` (the ledger sequence).
    fn nonce(&self, ctx: &Context, address: Address) -> Result<u64, LedgerError>;

    /// Sets the nonce of `address`. Nonces never decrease.
    fn set_nonce(&self, ctx: &mut Context, address: Address, nonce: u64) -> Result<(), LedgerError>;

    /// Bumps the nonce of `address` by one and returns the new value.
    fn increment_nonce(&self, ctx: &mut Context, address: Address) -> Result<u64, LedgerError>;

    /// Returns true if the ledger stores an account at `address`.
    fn account_exists(&self, ctx: &Context, address: Address) -> Result<bool, LedgerError>;

    /// Ensures an account exists at `address`. Existing accounts are kept
    /// untouched.
    fn create_account(&self, ctx: &mut Context, address: Address) -> Result<(), LedgerError>;

    /// Burns the remaining native balance and removes the account.
    fn delete_account(&self, ctx: &mut Context, address: Address) -> Result<(), LedgerError>;

    /// Charges a transaction fee from `payer` to the fee collector.
    fn collect_fee(&self, ctx: &mut Context, payer: Address, amount: U256)
        -> Result<(), LedgerError>;

    /// Fee recipient for the block: the operator of the proposing validator.
    fn coinbase(&self, ctx: &Context) -> Result<Address, LedgerError>;
}
