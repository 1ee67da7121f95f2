//! # Domain Services
//!
//! Pure address derivations. No I/O, no state.

use crate::domain::value_objects::ConsAddress;
use sha2::{Digest, Sha256};
use shared_types::Address;

/// Derives a module account address: `sha256(name)[0..20]`.
///
/// Stable for the lifetime of the ledger; the same name always maps to the
/// same address.
#[must_use]
pub fn module_address(name: &str) -> Address {
    truncated_sha256(name.as_bytes())
}

/// Derives a consensus address from a consensus public key:
/// `sha256(pubkey)[0..20]`.
#[must_use]
pub fn cons_address_from_pubkey(pubkey: &[u8]) -> ConsAddress {
    ConsAddress(truncated_sha256(pubkey))
}

fn truncated_sha256(data: &[u8]) -> Address {
    let digest = Sha256::digest(data);
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&digest[..20]);
    Address::new(addr)
}
