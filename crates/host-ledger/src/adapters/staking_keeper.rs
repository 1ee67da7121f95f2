//! # Staking Keeper
//!
//! Validator records keyed by consensus address, stored in the `staking`
//! store. Lookups read through the context every time, so a context at an
//! older snapshot sees the validator set of that snapshot.

use crate::domain::context::{Context, StoreKey};
use crate::domain::entities::ValidatorRecord;
use crate::domain::errors::LedgerError;
use crate::domain::value_objects::ConsAddress;
use crate::ports::outbound::ValidatorCapability;
use tracing::debug;

/// Store holding validator records.
pub const STAKING_STORE: StoreKey = "staking";

const VALIDATOR_PREFIX: &[u8] = b"v/";

/// In-memory staking keeper.
#[derive(Debug, Clone, Copy, Default)]
pub struct StakingKeeper;

impl StakingKeeper {
    /// Creates the keeper.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn validator_key(cons_address: ConsAddress) -> Vec<u8> {
        let mut key = VALIDATOR_PREFIX.to_vec();
        key.extend_from_slice(cons_address.as_bytes());
        key
    }

    /// Registers or replaces a validator.
    pub fn set_validator(
        &self,
        ctx: &mut Context,
        validator: &ValidatorRecord,
    ) -> Result<(), LedgerError> {
        ctx.set_record(
            STAKING_STORE,
            Self::validator_key(validator.cons_address),
            validator,
        )?;
        debug!(
            cons_address = %validator.cons_address,
            operator = %validator.operator,
            "validator stored"
        );
        Ok(())
    }

    /// Removes a validator. Removing an unknown validator is an error.
    pub fn remove_validator(
        &self,
        ctx: &mut Context,
        cons_address: ConsAddress,
    ) -> Result<(), LedgerError> {
        let key = Self::validator_key(cons_address);
        if ctx.get(STAKING_STORE, &key).is_none() {
            return Err(LedgerError::ValidatorNotFound { cons_address });
        }
        ctx.delete(STAKING_STORE, &key)
    }

    /// All validators ordered by consensus address.
    pub fn validators(&self, ctx: &Context) -> Result<Vec<ValidatorRecord>, LedgerError> {
        ctx.prefix_iter(STAKING_STORE, VALIDATOR_PREFIX)
            .map(|(_, bytes)| bincode::deserialize(bytes).map_err(LedgerError::from))
            .collect()
    }
}

impl ValidatorCapability for StakingKeeper {
    fn validator_by_cons_addr(
        &self,
        ctx: &Context,
        cons_address: ConsAddress,
    ) -> Result<ValidatorRecord, LedgerError> {
        ctx.get_record(STAKING_STORE, &Self::validator_key(cons_address))?
            .ok_or(LedgerError::ValidatorNotFound { cons_address })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::LedgerStore;
    use crate::domain::entities::{BlockHeader, BondStatus};
    use shared_types::{Address, Bytes, U256};

    fn validator(byte: u8) -> ValidatorRecord {
        ValidatorRecord {
            operator: Address::new([byte; 20]),
            cons_address: ConsAddress(Address::new([byte + 100; 20])),
            cons_pubkey: Bytes::from_slice(&[byte; 33]),
            status: BondStatus::Bonded,
            tokens: U256::from(1_000u64),
            delegator_shares: U256::from(1_000u64),
            jailed: false,
            commission_rate_bps: 500,
            moniker: format!("val-{byte}"),
        }
    }

    #[test]
    fn test_lookup_by_cons_address() {
        let store = LedgerStore::new();
        let keeper = StakingKeeper::new();
        let mut ctx = store.begin(BlockHeader::default());
        let v = validator(1);
        keeper.set_validator(&mut ctx, &v).unwrap();

        assert_eq!(keeper.validator_by_cons_addr(&ctx, v.cons_address).unwrap(), v);
        // The operator address is not a consensus address.
        assert!(keeper
            .validator_by_cons_addr(&ctx, ConsAddress(v.operator))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_lookup_follows_snapshot() {
        let store = LedgerStore::new();
        let keeper = StakingKeeper::new();
        let v = validator(2);

        let mut ctx = store.begin(BlockHeader::default());
        keeper.set_validator(&mut ctx, &v).unwrap();
        store.commit(ctx).unwrap();

        let before = store.query_context();
        let mut ctx = store.begin(BlockHeader::default());
        keeper.remove_validator(&mut ctx, v.cons_address).unwrap();

        assert!(keeper.validator_by_cons_addr(&before, v.cons_address).is_ok());
        assert_eq!(
            keeper.validator_by_cons_addr(&ctx, v.cons_address),
            Err(LedgerError::ValidatorNotFound {
                cons_address: v.cons_address
            })
        );
    }

    #[test]
    fn test_validators_sorted() {
        let store = LedgerStore::new();
        let keeper = StakingKeeper::new();
        let mut ctx = store.begin(BlockHeader::default());
        keeper.set_validator(&mut ctx, &validator(3)).unwrap();
        keeper.set_validator(&mut ctx, &validator(1)).unwrap();

        let monikers: Vec<String> = keeper
            .validators(&ctx)
            .unwrap()
            .into_iter()
            .map(|v| v.moniker)
            .collect();
        assert_eq!(monikers, vec!["val-1", "val-3"]);
    }

    #[test]
    fn test_remove_unknown_validator() {
        let store = LedgerStore::new();
        let mut ctx = store.begin(BlockHeader::default());
        assert!(StakingKeeper::new()
            .remove_validator(&mut ctx, ConsAddress::default())
            .is_err());
    }
}
