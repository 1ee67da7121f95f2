//! Property tests for the reference host ledger.
//!
//! ## Properties Verified
//!
//! - Conservation: transfers never change total supply, and the sum of all
//!   balances always equals supply
//! - Sequence monotonicity: each increment raises the sequence by one
//! - Mint/burn duality: `mint(x)` then `burn(x)` restores supply and balance
//! - Abort: a cancelled context commits nothing
//! - Enumeration: iteration stops at the first `Break`

use host_ledger::adapters::bank_keeper::BankKeeper;
use host_ledger::prelude::*;
use proptest::prelude::*;
use std::ops::ControlFlow;
use std::sync::Arc;

type Adapter = HostLedgerAdapter<AccountKeeper, BankKeeper<AccountKeeper>, StakingKeeper>;

fn ledger() -> (Adapter, LedgerStore) {
    let accounts = Arc::new(AccountKeeper::with_default_modules());
    let bank = Arc::new(BankKeeper::new(Arc::clone(&accounts)));
    let adapter = HostLedgerAdapter::new(
        AdapterConfig::default(),
        accounts,
        bank,
        Arc::new(StakingKeeper::new()),
    );
    (adapter, LedgerStore::new())
}

fn addr(index: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = 0x10;
    bytes[19] = index;
    Address::new(bytes)
}

fn supply(adapter: &Adapter, ctx: &Context) -> U256 {
    adapter.bank().total_supply(ctx, adapter.denom()).unwrap().amount
}

fn sum_of_balances(adapter: &Adapter, ctx: &Context) -> U256 {
    adapter
        .bank()
        .holders(ctx, adapter.denom())
        .unwrap()
        .into_iter()
        .fold(U256::zero(), |acc, (_, amount)| acc + amount)
}

/// One randomly generated transfer between the first five addresses.
#[derive(Debug, Clone)]
struct Transfer {
    from: u8,
    to: u8,
    amount: u64,
}

fn arb_transfer() -> impl Strategy<Value = Transfer> {
    (0u8..5, 0u8..5, 0u64..2_000).prop_map(|(from, to, amount)| Transfer { from, to, amount })
}

// ============================================================================
// Conservation
// ============================================================================

proptest! {
    /// Property: transfers (successful or not) never change supply, and the
    /// sum of balances equals supply after every step.
    #[test]
    fn prop_transfers_conserve_supply(
        funding in prop::collection::vec(0u64..1_000, 5),
        transfers in prop::collection::vec(arb_transfer(), 0..40),
    ) {
        let (adapter, store) = ledger();
        let mut ctx = store.begin(BlockHeader::default());
        for (i, amount) in funding.iter().enumerate() {
            adapter.add_balance(&mut ctx, addr(i as u8), U256::from(*amount)).unwrap();
        }
        let initial: u64 = funding.iter().sum();
        prop_assert_eq!(supply(&adapter, &ctx), U256::from(initial));

        for t in &transfers {
            let before_from = adapter.balance(&ctx, addr(t.from)).unwrap();
            let before_to = adapter.balance(&ctx, addr(t.to)).unwrap();
            let result = adapter.transfer(&mut ctx, addr(t.from), addr(t.to), U256::from(t.amount));

            if result.is_err() {
                // A failed transfer changes neither side.
                prop_assert_eq!(adapter.balance(&ctx, addr(t.from)).unwrap(), before_from);
                prop_assert_eq!(adapter.balance(&ctx, addr(t.to)).unwrap(), before_to);
            }
            prop_assert_eq!(supply(&adapter, &ctx), U256::from(initial));
            prop_assert_eq!(sum_of_balances(&adapter, &ctx), U256::from(initial));
        }
    }

    /// Property: sequence increments by exactly one per call.
    #[test]
    fn prop_sequence_monotonic(start in 0u64..1_000_000, steps in 1usize..20) {
        let (adapter, store) = ledger();
        let mut ctx = store.begin(BlockHeader::default());
        adapter.set_nonce(&mut ctx, addr(1), start).unwrap();

        let mut previous = start;
        for _ in 0..steps {
            let next = adapter.increment_nonce(&mut ctx, addr(1)).unwrap();
            prop_assert_eq!(next, previous + 1);
            previous = next;
        }
        prop_assert!(adapter.set_nonce(&mut ctx, addr(1), start).is_err());
    }

    /// Property: mint followed by burn of the same amount is the identity on
    /// supply and on the module balance.
    #[test]
    fn prop_mint_burn_duality(seed in 0u64..10_000, amount in 0u64..10_000) {
        let (adapter, store) = ledger();
        let bank = Arc::clone(adapter.bank());
        let mut ctx = store.begin(BlockHeader::default());
        let coin = |n: u64| Coin::new(adapter.denom().clone(), n);
        bank.mint(&mut ctx, modules::EVM, &coin(seed)).unwrap();

        let evm = adapter.accounts().module_address(modules::EVM);
        let supply_before = supply(&adapter, &ctx);
        let balance_before = adapter.balance(&ctx, evm).unwrap();

        bank.mint(&mut ctx, modules::EVM, &coin(amount)).unwrap();
        bank.burn(&mut ctx, modules::EVM, &coin(amount)).unwrap();

        prop_assert_eq!(supply(&adapter, &ctx), supply_before);
        prop_assert_eq!(adapter.balance(&ctx, evm).unwrap(), balance_before);
    }
}

// ============================================================================
// Abort and enumeration
// ============================================================================

#[test]
fn test_aborted_context_leaves_no_effects() {
    let (adapter, store) = ledger();
    let mut ctx = store.begin(BlockHeader::default());
    adapter.add_balance(&mut ctx, addr(1), U256::from(10u64)).unwrap();
    adapter.increment_nonce(&mut ctx, addr(1)).unwrap();

    ctx.cancel();
    assert_eq!(
        adapter.add_balance(&mut ctx, addr(2), U256::from(1u64)),
        Err(LedgerError::Cancelled)
    );
    assert_eq!(store.commit(ctx), Err(LedgerError::Cancelled));

    let query = store.query_context();
    assert!(!adapter.account_exists(&query, addr(1)).unwrap());
    assert!(adapter.balance(&query, addr(1)).unwrap().is_zero());
    assert!(supply(&adapter, &query).is_zero());
}

#[test]
fn test_shared_cancel_token_aborts_branches() {
    let (adapter, store) = ledger();
    let token = CancelToken::new();
    let ctx = store.begin(BlockHeader::default()).with_cancel_token(token.clone());
    let mut branch = ctx.branch();

    token.cancel();
    assert_eq!(
        adapter.increment_nonce(&mut branch, addr(1)),
        Err(LedgerError::Cancelled)
    );
}

#[test]
fn test_iteration_visits_each_account_once_until_break() {
    let (adapter, store) = ledger();
    let accounts = Arc::clone(adapter.accounts());
    let mut ctx = store.begin(BlockHeader::default());
    for i in 0..10 {
        accounts.create_account(&mut ctx, addr(i)).unwrap();
    }

    let mut all = Vec::new();
    accounts
        .iterate_accounts(&ctx, &mut |account| {
            all.push(account.address);
            ControlFlow::Continue(())
        })
        .unwrap();
    let mut sorted = all.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(all, sorted);
    assert_eq!(all.len(), 10);

    let mut visited = 0;
    accounts
        .iterate_accounts(&ctx, &mut |_| {
            visited += 1;
            if visited == 4 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();
    assert_eq!(visited, 4);
}

#[test]
fn test_committed_state_survives_across_contexts() {
    let (adapter, store) = ledger();
    let mut ctx = store.begin(BlockHeader {
        height: 1,
        ..BlockHeader::default()
    });
    adapter.add_balance(&mut ctx, addr(1), U256::from(5u64)).unwrap();
    store.commit(ctx).unwrap();

    let mut ctx = store.begin(BlockHeader {
        height: 2,
        ..BlockHeader::default()
    });
    adapter
        .transfer(&mut ctx, addr(1), addr(2), U256::from(5u64))
        .unwrap();
    store.commit(ctx).unwrap();

    let query = store.query_context();
    assert_eq!(query.height(), 2);
    assert_eq!(adapter.balance(&query, addr(2)).unwrap(), U256::from(5u64));
}
