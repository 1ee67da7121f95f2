//! # Shared Types Crate
//!
//! Value objects used on both sides of the EVM/host-ledger boundary.
//!
//! ## Design Principles
//!
//! - **One address space**: the EVM and the host ledger share the same
//!   20-byte [`Address`]; no conversion layer exists between them.
//! - **Hex on the wire**: every byte-oriented type serializes as a
//!   `0x`-prefixed hex string, matching the Ethereum JSON-RPC conventions.

pub mod entities;
pub mod errors;
pub mod quantity;

pub use entities::*;
pub use errors::*;
