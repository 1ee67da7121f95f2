//! # Bank Keeper
//!
//! Reference implementation of [`BalanceCapability`] over the `bank` store.
//!
//! Amounts are stored as 32-byte big-endian integers; a zero balance is
//! stored as an absent key. Every operation checks funds, permissions and
//! overflow before its first balance write, so a failed call never moves
//! value. Module accounts may still be created lazily along the way.

use crate::domain::context::{Context, StoreKey};
use crate::domain::entities::Permission;
use crate::domain::errors::LedgerError;
use crate::domain::value_objects::{Coin, Denom};
use crate::ports::outbound::{AccountCapability, BalanceCapability};
use shared_types::{Address, U256};
use std::sync::Arc;
use tracing::{debug, trace};

/// Store holding balances and supply.
pub const BANK_STORE: StoreKey = "bank";

const BALANCE_PREFIX: &[u8] = b"b/";
const SUPPLY_PREFIX: &[u8] = b"s/";

/// Bank keeper. Creates recipient accounts through the account capability.
#[derive(Debug)]
pub struct BankKeeper<A> {
    accounts: Arc<A>,
}

impl<A> Clone for BankKeeper<A> {
    fn clone(&self) -> Self {
        Self {
            accounts: Arc::clone(&self.accounts),
        }
    }
}

impl<A: AccountCapability> BankKeeper<A> {
    /// Creates a bank keeper bound to an account keeper.
    pub fn new(accounts: Arc<A>) -> Self {
        Self { accounts }
    }

    fn balance_key(address: Address, denom: &Denom) -> Vec<u8> {
        let mut key =
            Vec::with_capacity(BALANCE_PREFIX.len() + Address::LEN + denom.as_str().len());
        key.extend_from_slice(BALANCE_PREFIX);
        key.extend_from_slice(address.as_bytes());
        key.extend_from_slice(denom.as_str().as_bytes());
        key
    }

    fn supply_key(denom: &Denom) -> Vec<u8> {
        let mut key = SUPPLY_PREFIX.to_vec();
        key.extend_from_slice(denom.as_str().as_bytes());
        key
    }

    fn read_amount(ctx: &Context, key: &[u8]) -> Result<U256, LedgerError> {
        match ctx.get(BANK_STORE, key) {
            Some(bytes) if bytes.len() == 32 => Ok(U256::from_big_endian(bytes)),
            Some(bytes) => Err(LedgerError::Codec(format!(
                "amount must be 32 bytes, got {}",
                bytes.len()
            ))),
            None => Ok(U256::zero()),
        }
    }

    fn write_amount(ctx: &mut Context, key: Vec<u8>, amount: U256) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return ctx.delete(BANK_STORE, &key);
        }
        let mut bytes = [0u8; 32];
        amount.to_big_endian(&mut bytes);
        ctx.set(BANK_STORE, key, bytes.to_vec())
    }

    fn amount_of(ctx: &Context, address: Address, denom: &Denom) -> Result<U256, LedgerError> {
        Self::read_amount(ctx, &Self::balance_key(address, denom))
    }

    fn ensure_funds(
        ctx: &Context,
        address: Address,
        coin: &Coin,
    ) -> Result<U256, LedgerError> {
        let available = Self::amount_of(ctx, address, &coin.denom)?;
        if available < coin.amount {
            return Err(LedgerError::InsufficientFunds {
                address,
                denom: coin.denom.to_string(),
                required: coin.amount,
                available,
            });
        }
        Ok(available)
    }

    fn overflow(coin: &Coin) -> LedgerError {
        LedgerError::Overflow {
            denom: coin.denom.to_string(),
        }
    }

    /// Resolves a module account and checks it holds `permission`.
    fn authorized_module(
        &self,
        ctx: &mut Context,
        module: &str,
        permission: Permission,
    ) -> Result<Address, LedgerError> {
        let account = self.accounts.module_account(ctx, module)?;
        if !account.has_permission(permission) {
            return Err(LedgerError::Unauthorized {
                module: module.to_string(),
                permission,
            });
        }
        Ok(account.address)
    }

    /// Every non-zero balance held by `address`, ordered by denom.
    pub fn balances_of(&self, ctx: &Context, address: Address) -> Result<Vec<Coin>, LedgerError> {
        let mut prefix = BALANCE_PREFIX.to_vec();
        prefix.extend_from_slice(address.as_bytes());

        ctx.prefix_iter(BANK_STORE, &prefix)
            .map(|(key, value)| {
                let denom = std::str::from_utf8(&key[prefix.len()..])
                    .map_err(|err| LedgerError::Codec(err.to_string()))?;
                if value.len() != 32 {
                    return Err(LedgerError::Codec("malformed balance".to_string()));
                }
                Ok(Coin::new(Denom::new(denom)?, U256::from_big_endian(value)))
            })
            .collect()
    }

    /// Every address holding a non-zero balance of `denom`, with its amount.
    ///
    /// Scans the whole balance table; meant for audits and tests.
    pub fn holders(&self, ctx: &Context, denom: &Denom) -> Result<Vec<(Address, U256)>, LedgerError> {
        let suffix = denom.as_str().as_bytes();
        let mut holders = Vec::new();
        for (key, value) in ctx.prefix_iter(BANK_STORE, BALANCE_PREFIX) {
            let rest = &key[BALANCE_PREFIX.len()..];
            if rest.len() != Address::LEN + suffix.len() || &rest[Address::LEN..] != suffix {
                continue;
            }
            let address = Address::from_slice(&rest[..Address::LEN])
                .ok_or_else(|| LedgerError::Codec("malformed balance key".to_string()))?;
            if value.len() != 32 {
                return Err(LedgerError::Codec("malformed balance".to_string()));
            }
            holders.push((address, U256::from_big_endian(value)));
        }
        Ok(holders)
    }
}

impl<A: AccountCapability> BalanceCapability for BankKeeper<A> {
    fn balance(&self, ctx: &Context, address: Address, denom: &Denom) -> Result<Coin, LedgerError> {
        Ok(Coin::new(
            denom.clone(),
            Self::amount_of(ctx, address, denom)?,
        ))
    }

    fn total_supply(&self, ctx: &Context, denom: &Denom) -> Result<Coin, LedgerError> {
        Ok(Coin::new(
            denom.clone(),
            Self::read_amount(ctx, &Self::supply_key(denom))?,
        ))
    }

    fn send(
        &self,
        ctx: &mut Context,
        from: Address,
        to: Address,
        coin: &Coin,
    ) -> Result<(), LedgerError> {
        ctx.ensure_active()?;
        let from_balance = Self::ensure_funds(ctx, from, coin)?;
        if coin.is_zero() || from == to {
            return Ok(());
        }

        let to_balance = Self::amount_of(ctx, to, &coin.denom)?;
        let credited = to_balance
            .checked_add(coin.amount)
            .ok_or_else(|| Self::overflow(coin))?;

        if !self.accounts.has_account(ctx, to)? {
            self.accounts.create_account(ctx, to)?;
        }
        Self::write_amount(
            ctx,
            Self::balance_key(from, &coin.denom),
            from_balance - coin.amount,
        )?;
        Self::write_amount(ctx, Self::balance_key(to, &coin.denom), credited)?;

        trace!(%from, %to, %coin, "coins sent");
        Ok(())
    }

    fn send_from_module_to_account(
        &self,
        ctx: &mut Context,
        module: &str,
        to: Address,
        coin: &Coin,
    ) -> Result<(), LedgerError> {
        let module_addr = self.accounts.module_account(ctx, module)?.address;
        self.send(ctx, module_addr, to, coin)
    }

    fn send_from_account_to_module(
        &self,
        ctx: &mut Context,
        from: Address,
        module: &str,
        coin: &Coin,
    ) -> Result<(), LedgerError> {
        let module_addr = self.accounts.module_account(ctx, module)?.address;
        self.send(ctx, from, module_addr, coin)
    }

    fn mint(&self, ctx: &mut Context, module: &str, coin: &Coin) -> Result<(), LedgerError> {
        ctx.ensure_active()?;
        let module_addr = self.authorized_module(ctx, module, Permission::Minter)?;
        if coin.is_zero() {
            return Ok(());
        }

        let supply_key = Self::supply_key(&coin.denom);
        let supply = Self::read_amount(ctx, &supply_key)?
            .checked_add(coin.amount)
            .ok_or_else(|| Self::overflow(coin))?;
        // Supply bounds every balance, so this cannot overflow once supply did not.
        let balance = Self::amount_of(ctx, module_addr, &coin.denom)? + coin.amount;

        Self::write_amount(ctx, supply_key, supply)?;
        Self::write_amount(ctx, Self::balance_key(module_addr, &coin.denom), balance)?;

        debug!(module, %coin, "coins minted");
        Ok(())
    }

    fn burn(&self, ctx: &mut Context, module: &str, coin: &Coin) -> Result<(), LedgerError> {
        ctx.ensure_active()?;
        let module_addr = self.authorized_module(ctx, module, Permission::Burner)?;
        let balance = Self::ensure_funds(ctx, module_addr, coin)?;
        if coin.is_zero() {
            return Ok(());
        }

        let supply_key = Self::supply_key(&coin.denom);
        let supply = Self::read_amount(ctx, &supply_key)?.saturating_sub(coin.amount);

        Self::write_amount(
            ctx,
            Self::balance_key(module_addr, &coin.denom),
            balance - coin.amount,
        )?;
        Self::write_amount(ctx, supply_key, supply)?;

        debug!(module, %coin, "coins burned");
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
