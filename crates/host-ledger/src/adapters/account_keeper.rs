//! # Account Keeper
//!
//! Reference implementation of [`AccountCapability`] over the `acc` store.
//!
//! ## Layout
//!
//! | Key | Value |
//! |-----|-------|
//! | `a/` ++ address | bincode `Account` |
//! | `n` | next account number, big-endian `u64` |

use crate::domain::context::{Context, StoreKey};
use crate::domain::entities::{Account, Permission};
use crate::domain::errors::LedgerError;
use crate::domain::services::module_address;
use crate::ports::outbound::AccountCapability;
use shared_types::Address;
use std::collections::BTreeMap;
use std::ops::ControlFlow;
use tracing::debug;

/// Store holding account records.
pub const ACCOUNT_STORE: StoreKey = "acc";

const ACCOUNT_PREFIX: &[u8] = b"a/";
const NEXT_NUMBER_KEY: &[u8] = b"n";

/// Well-known module names.
pub mod modules {
    /// Source and sink of native EVM value (mint on credit, burn on debit).
    pub const EVM: &str = "evm";
    /// Receives transaction fees.
    pub const FEE_COLLECTOR: &str = "fee_collector";
    /// Holds bonded stake.
    pub const BONDED_POOL: &str = "bonded_tokens_pool";
}

/// Account keeper with a registry of module accounts and their permissions.
#[derive(Debug, Clone, Default)]
pub struct AccountKeeper {
    modules: BTreeMap<String, Vec<Permission>>,
}

impl AccountKeeper {
    /// Creates a keeper with no registered modules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a keeper with the `evm`, `fee_collector` and
    /// `bonded_tokens_pool` modules registered.
    #[must_use]
    pub fn with_default_modules() -> Self {
        Self::new()
            .with_module(modules::EVM, vec![Permission::Minter, Permission::Burner])
            .with_module(modules::FEE_COLLECTOR, vec![])
            .with_module(
                modules::BONDED_POOL,
                vec![Permission::Burner, Permission::Staking],
            )
    }

    /// Registers a module account and its permissions.
    #[must_use]
    pub fn with_module(mut self, name: impl Into<String>, permissions: Vec<Permission>) -> Self {
        self.modules.insert(name.into(), permissions);
        self
    }

    /// Permissions registered for `name`.
    #[must_use]
    pub fn module_permissions(&self, name: &str) -> Option<&[Permission]> {
        self.modules.get(name).map(Vec::as_slice)
    }

    /// Names of the registered modules, in ascending order.
    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// Registered module whose address is `address`, if any.
    fn module_at(&self, address: Address) -> Option<&str> {
        self.module_names()
            .find(|name| module_address(name) == address)
    }

    fn account_key(address: Address) -> Vec<u8> {
        let mut key = Vec::with_capacity(ACCOUNT_PREFIX.len() + Address::LEN);
        key.extend_from_slice(ACCOUNT_PREFIX);
        key.extend_from_slice(address.as_bytes());
        key
    }

    fn load(&self, ctx: &Context, address: Address) -> Result<Option<Account>, LedgerError> {
        ctx.get_record(ACCOUNT_STORE, &Self::account_key(address))
    }

    fn next_account_number(&self, ctx: &mut Context) -> Result<u64, LedgerError> {
        let current = match ctx.get(ACCOUNT_STORE, NEXT_NUMBER_KEY) {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .try_into()
                    .map_err(|_| LedgerError::Codec("malformed account counter".to_string()))?;
                u64::from_be_bytes(raw)
            }
            None => 0,
        };
        ctx.set(
            ACCOUNT_STORE,
            NEXT_NUMBER_KEY.to_vec(),
            (current + 1).to_be_bytes().to_vec(),
        )?;
        Ok(current)
    }
}

impl AccountCapability for AccountKeeper {
    fn create_account(&self, ctx: &mut Context, address: Address) -> Result<Account, LedgerError> {
        ctx.ensure_active()?;
        if self.load(ctx, address)?.is_some() {
            return Err(LedgerError::Conflict { address });
        }
        // Module addresses are reserved: the first account stored there is
        // the module's own.
        if let Some(name) = self.module_at(address) {
            return self.module_account(ctx, name);
        }

        let number = self.next_account_number(ctx)?;
        let account = Account::new_base(address, number);
        self.set_account(ctx, account.clone())?;

        debug!(%address, account_number = number, "account created");
        Ok(account)
    }

    fn sequence(&self, ctx: &Context, address: Address) -> Result<u64, LedgerError> {
        Ok(self.load(ctx, address)?.map_or(0, |account| account.sequence))
    }

    fn has_account(&self, ctx: &Context, address: Address) -> Result<bool, LedgerError> {
        Ok(ctx
            .get(ACCOUNT_STORE, &Self::account_key(address))
            .is_some())
    }

    fn account(&self, ctx: &Context, address: Address) -> Result<Account, LedgerError> {
        self.load(ctx, address)?
            .ok_or(LedgerError::AccountNotFound { address })
    }

    fn set_account(&self, ctx: &mut Context, account: Account) -> Result<(), LedgerError> {
        ctx.set_record(ACCOUNT_STORE, Self::account_key(account.address), &account)
    }

    fn remove_account(&self, ctx: &mut Context, account: &Account) -> Result<(), LedgerError> {
        ctx.delete(ACCOUNT_STORE, &Self::account_key(account.address))
    }

    fn iterate_accounts(
        &self,
        ctx: &Context,
        visit: &mut dyn FnMut(&Account) -> ControlFlow<()>,
    ) -> Result<(), LedgerError> {
        for (_, bytes) in ctx.prefix_iter(ACCOUNT_STORE, ACCOUNT_PREFIX) {
            let account: Account = bincode::deserialize(bytes)?;
            if visit(&account).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn module_account(&self, ctx: &mut Context, name: &str) -> Result<Account, LedgerError> {
        let permissions = self
            .module_permissions(name)
            .ok_or_else(|| LedgerError::ModuleNotFound {
                name: name.to_string(),
            })?;
        let address = module_address(name);

        match self.load(ctx, address)? {
            Some(account) if account.module_name() == Some(name) => Ok(account),
            // A base account written directly over the reserved address.
            Some(_) => Err(LedgerError::Conflict { address }),
            None => {
                ctx.ensure_active()?;
                let number = self.next_account_number(ctx)?;
                let account = Account::new_module(address, number, name, permissions.to_vec());
                self.set_account(ctx, account.clone())?;
                debug!(module = name, %address, "module account created");
                Ok(account)
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
