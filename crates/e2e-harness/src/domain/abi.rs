//! # ERC-20 ABI
//!
//! Just enough Solidity ABI encoding for the token surface the scenarios
//! exercise: static 32-byte words and 4-byte selectors.

use crate::domain::tx::keccak256;
use crate::errors::HarnessError;
use shared_types::{Address, U256};

/// Width of one ABI word.
pub const WORD: usize = 32;

/// `transfer(address,uint256)`
pub const TRANSFER: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];
/// `balanceOf(address)`
pub const BALANCE_OF: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];
/// `totalSupply()`
pub const TOTAL_SUPPLY: [u8; 4] = [0x18, 0x16, 0x0d, 0xdd];

/// First four bytes of the Keccak-256 of a function signature.
#[must_use]
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash.as_bytes()[..4]);
    out
}

// =============================================================================
// ENCODING
// =============================================================================

/// Left-pads an address into a word.
#[must_use]
pub fn encode_address(address: Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// Big-endian word.
#[must_use]
pub fn encode_uint(value: U256) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    value.to_big_endian(&mut word);
    word
}

/// ABI `bool`.
#[must_use]
pub fn encode_bool(value: bool) -> [u8; WORD] {
    encode_uint(U256::from(u8::from(value)))
}

/// Calldata for `transfer(to, amount)`.
#[must_use]
pub fn transfer_call(to: Address, amount: U256) -> Vec<u8> {
    let mut data = TRANSFER.to_vec();
    data.extend_from_slice(&encode_address(to));
    data.extend_from_slice(&encode_uint(amount));
    data
}

/// Calldata for `balanceOf(holder)`.
#[must_use]
pub fn balance_of_call(holder: Address) -> Vec<u8> {
    let mut data = BALANCE_OF.to_vec();
    data.extend_from_slice(&encode_address(holder));
    data
}

/// Calldata for `totalSupply()`.
#[must_use]
pub fn total_supply_call() -> Vec<u8> {
    TOTAL_SUPPLY.to_vec()
}

// =============================================================================
// DECODING
// =============================================================================

/// Splits calldata into selector and argument words.
pub fn split_call(input: &[u8]) -> Result<([u8; 4], &[u8]), HarnessError> {
    if input.len() < 4 {
        return Err(HarnessError::Transaction(format!(
            "calldata too short: {} bytes",
            input.len()
        )));
    }
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&input[..4]);
    Ok((selector, &input[4..]))
}

fn word(args: &[u8], index: usize) -> Result<&[u8], HarnessError> {
    args.get(index * WORD..(index + 1) * WORD).ok_or_else(|| {
        HarnessError::Transaction(format!("missing abi word {index}"))
    })
}

/// Decodes word `index` as a `uint256`.
pub fn decode_uint(args: &[u8], index: usize) -> Result<U256, HarnessError> {
    Ok(U256::from_big_endian(word(args, index)?))
}

/// Decodes word `index` as an `address`; the upper 12 bytes must be zero.
pub fn decode_address(args: &[u8], index: usize) -> Result<Address, HarnessError> {
    let word = word(args, index)?;
    if word[..12].iter().any(|b| *b != 0) {
        return Err(HarnessError::Transaction(format!(
            "abi word {index} is not an address"
        )));
    }
    Address::from_slice(&word[12..])
        .ok_or_else(|| HarnessError::Transaction("malformed address word".to_string()))
}

// =============================================================================
// TESTS
// =============================================================================
