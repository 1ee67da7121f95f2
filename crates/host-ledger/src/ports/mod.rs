//! # Ports Layer (Middle Hexagon)
//!
//! - **Driving Port (Inbound)**: `EvmAccountState`, used by the EVM engine
//! - **Driven Ports (Outbound)**: `AccountCapability`, `BalanceCapability`,
//!   `ValidatorCapability`, provided by the host ledger
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
