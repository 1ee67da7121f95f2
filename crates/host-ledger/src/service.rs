//! # Host Ledger Adapter Service
//!
//! Presents the three capabilities to the EVM as one flat account view.
//!
//! ## Value Flow
//!
//! ```text
//!   add_balance:  mint(evm) ──→ send(evm → account)
//!   sub_balance:  send(account → evm) ──→ burn(evm)
//!   transfer:     send(from → to)
//!   collect_fee:  send(payer → fee_collector)
//! ```
//!
//! Multi-step operations run in a branch of the caller's context and are
//! absorbed only when every step succeeds.

use crate::adapters::account_keeper::modules;
use crate::domain::context::Context;
use crate::domain::errors::LedgerError;
use crate::domain::value_objects::{Coin, Denom};
use crate::ports::inbound::EvmAccountState;
use crate::ports::outbound::{AccountCapability, BalanceCapability, ValidatorCapability};
use serde::Deserialize;
use shared_types::{Address, U256};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Adapter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Denom backing native EVM value.
    pub evm_denom: Denom,
    /// Module that mints and burns native EVM value.
    pub evm_module: String,
    /// Module receiving transaction fees.
    pub fee_collector: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            evm_denom: Denom("aevm".to_string()),
            evm_module: modules::EVM.to_string(),
            fee_collector: modules::FEE_COLLECTOR.to_string(),
        }
    }
}

/// EVM account state on top of the account, balance and validator
/// capabilities.
pub struct HostLedgerAdapter<A, B, V> {
    config: AdapterConfig,
    accounts: Arc<A>,
    bank: Arc<B>,
    validators: Arc<V>,
}

impl<A, B, V> Clone for HostLedgerAdapter<A, B, V> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            accounts: Arc::clone(&self.accounts),
            bank: Arc::clone(&self.bank),
            validators: Arc::clone(&self.validators),
        }
    }
}

impl<A, B, V> HostLedgerAdapter<A, B, V>
where
    A: AccountCapability,
    B: BalanceCapability,
    V: ValidatorCapability,
{
    /// Creates the adapter.
    pub fn new(config: AdapterConfig, accounts: Arc<A>, bank: Arc<B>, validators: Arc<V>) -> Self {
        Self {
            config,
            accounts,
            bank,
            validators,
        }
    }

    /// Adapter configuration.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Denom backing native EVM value.
    pub fn denom(&self) -> &Denom {
        &self.config.evm_denom
    }

    /// Account capability.
    pub fn accounts(&self) -> &Arc<A> {
        &self.accounts
    }

    /// Balance capability.
    pub fn bank(&self) -> &Arc<B> {
        &self.bank
    }

    /// Validator capability.
    pub fn validators(&self) -> &Arc<V> {
        &self.validators
    }

    fn coin(&self, amount: U256) -> Coin {
        Coin::new(self.config.evm_denom.clone(), amount)
    }

    /// Runs `op` in a branch of `ctx`, keeping its writes only on success.
    fn atomically<T>(
        &self,
        ctx: &mut Context,
        op: impl FnOnce(&mut Context) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut branch = ctx.branch();
        let out = op(&mut branch)?;
        ctx.absorb(branch)?;
        Ok(out)
    }
}

impl<A, B, V> EvmAccountState for HostLedgerAdapter<A, B, V>
where
    A: AccountCapability,
    B: BalanceCapability,
    V: ValidatorCapability,
{
    fn balance(&self, ctx: &Context, address: Address) -> Result<U256, LedgerError> {
        Ok(self.bank.balance(ctx, address, self.denom())?.amount)
    }

    #[instrument(level = "debug", skip_all, fields(%address, %amount))]
    fn add_balance(
        &self,
        ctx: &mut Context,
        address: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Ok(());
        }
        let coin = self.coin(amount);
        self.atomically(ctx, |branch| {
            self.bank.mint(branch, &self.config.evm_module, &coin)?;
            self.bank
                .send_from_module_to_account(branch, &self.config.evm_module, address, &coin)
        })
    }

    #[instrument(level = "debug", skip_all, fields(%address, %amount))]
    fn sub_balance(
        &self,
        ctx: &mut Context,
        address: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Ok(());
        }
        let coin = self.coin(amount);
        self.atomically(ctx, |branch| {
            self.bank
                .send_from_account_to_module(branch, address, &self.config.evm_module, &coin)?;
            self.bank.burn(branch, &self.config.evm_module, &coin)
        })
    }

    fn transfer(
        &self,
        ctx: &mut Context,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        self.bank.send(ctx, from, to, &self.coin(amount))
    }

    fn nonce(&self, ctx: &Context, address: Address) -> Result<u64, LedgerError> {
        self.accounts.sequence(ctx, address)
    }

    fn set_nonce(&self, ctx: &mut Context, address: Address, nonce: u64) -> Result<(), LedgerError> {
        let mut account = match self.accounts.account(ctx, address) {
            Ok(account) => account,
            Err(LedgerError::AccountNotFound { .. }) => {
                self.accounts.create_account(ctx, address)?
            }
            Err(err) => return Err(err),
        };
        if nonce < account.sequence {
            return Err(LedgerError::SequenceRegression {
                address,
                current: account.sequence,
                requested: nonce,
            });
        }
        account.sequence = nonce;
        self.accounts.set_account(ctx, account)
    }

    fn increment_nonce(&self, ctx: &mut Context, address: Address) -> Result<u64, LedgerError> {
        self.accounts.increment_sequence(ctx, address)
    }

    fn account_exists(&self, ctx: &Context, address: Address) -> Result<bool, LedgerError> {
        self.accounts.has_account(ctx, address)
    }

    fn create_account(&self, ctx: &mut Context, address: Address) -> Result<(), LedgerError> {
        if self.accounts.has_account(ctx, address)? {
            return Ok(());
        }
        self.accounts.create_account(ctx, address).map(|_| ())
    }

    /// Balances in denoms other than the EVM denom are left in place.
    #[instrument(level = "debug", skip_all, fields(%address))]
    fn delete_account(&self, ctx: &mut Context, address: Address) -> Result<(), LedgerError> {
        let account = match self.accounts.account(ctx, address) {
            Ok(account) => account,
            Err(LedgerError::AccountNotFound { .. }) => return Ok(()),
            Err(err) => return Err(err),
        };
        let remaining = self.balance(ctx, address)?;
        self.atomically(ctx, |branch| {
            if !remaining.is_zero() {
                let coin = self.coin(remaining);
                self.bank
                    .send_from_account_to_module(branch, address, &self.config.evm_module, &coin)?;
                self.bank.burn(branch, &self.config.evm_module, &coin)?;
            }
            self.accounts.remove_account(branch, &account)
        })?;
        debug!(%address, burned = %remaining, "account deleted");
        Ok(())
    }

    fn collect_fee(
        &self,
        ctx: &mut Context,
        payer: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        self.bank.send_from_account_to_module(
            ctx,
            payer,
            &self.config.fee_collector,
            &self.coin(amount),
        )
    }

    fn coinbase(&self, ctx: &Context) -> Result<Address, LedgerError> {
        let proposer = ctx.header().proposer;
        Ok(self.validators.validator_by_cons_addr(ctx, proposer)?.operator)
    }
}

// =============================================================================
// TESTS
// =============================================================================
