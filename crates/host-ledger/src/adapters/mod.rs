//! # Adapters
//!
//! In-memory reference implementations of the outbound capabilities.

pub mod account_keeper;
pub mod bank_keeper;
pub mod memory_store;
pub mod staking_keeper;

pub use account_keeper::{modules, AccountKeeper, ACCOUNT_STORE};
pub use bank_keeper::{BankKeeper, BANK_STORE};
pub use memory_store::LedgerStore;
pub use staking_keeper::{StakingKeeper, STAKING_STORE};
