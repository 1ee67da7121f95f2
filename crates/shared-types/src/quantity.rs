//! Hex quantity encoding for integers (`"0x1a"`), per the Ethereum JSON-RPC
//! conventions. Usable as `#[serde(with = "shared_types::quantity")]`.

use crate::errors::HexError;
use serde::{de, Deserialize, Deserializer, Serializer};

/// Formats an integer as a minimal hex quantity.
#[must_use]
pub fn format_u64(value: u64) -> String {
    format!("{value:#x}")
}

/// Parses a hex quantity into a `u64`.
pub fn parse_u64(s: &str) -> Result<u64, HexError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16).map_err(|_| HexError::QuantityOutOfRange(s.to_string()))
}

/// Serializes a `u64` as a hex quantity.
pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_u64(*value))
}

/// Deserializes a hex quantity into a `u64`.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let s = String::deserialize(deserializer)?;
    parse_u64(&s).map_err(de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_and_parse() {
        assert_eq!(format_u64(0), "0x0");
        assert_eq!(format_u64(26), "0x1a");
        assert_eq!(parse_u64("0x1a").unwrap(), 26);
        assert_eq!(parse_u64("0x").unwrap(), 0);
    }

    #[test]
    fn test_parse_overflow() {
        assert!(parse_u64("0x1ffffffffffffffff").is_err());
    }
}
