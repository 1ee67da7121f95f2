//! # Wire Types
//!
//! Receipts, call requests and contract handles as they cross the JSON-RPC
//! boundary. Integer fields use hex quantities (`"0x1a"`).

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use shared_types::{quantity, Address, Bytes, Hash, U256};
use std::fmt;

// =============================================================================
// RECEIPT
// =============================================================================

/// Execution outcome recorded in a receipt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TxStatus {
    /// Execution reverted or ran out of gas (`0x0`).
    Failed,
    /// Execution succeeded (`0x1`).
    Success,
}

impl TxStatus {
    /// Numeric status code.
    #[must_use]
    pub const fn code(self) -> u64 {
        match self {
            Self::Failed => 0,
            Self::Success => 1,
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed => f.write_str("failed (0x0)"),
            Self::Success => f.write_str("success (0x1)"),
        }
    }
}

impl Serialize for TxStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        quantity::serialize(&self.code(), serializer)
    }
}

impl<'de> Deserialize<'de> for TxStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match quantity::deserialize(deserializer)? {
            0 => Ok(Self::Failed),
            1 => Ok(Self::Success),
            other => Err(de::Error::custom(format!("invalid receipt status {other:#x}"))),
        }
    }
}

/// Transaction receipt. Immutable once produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Hash of the transaction.
    pub transaction_hash: Hash,
    /// Position of the transaction in its block.
    #[serde(with = "quantity")]
    pub transaction_index: u64,
    /// Hash of the including block.
    pub block_hash: Hash,
    /// Height of the including block.
    #[serde(with = "quantity")]
    pub block_number: u64,
    /// Sender.
    pub from: Address,
    /// Recipient; `None` for contract creation.
    pub to: Option<Address>,
    /// Gas consumed by this transaction.
    #[serde(with = "quantity")]
    pub gas_used: u64,
    /// Price paid per unit of gas.
    pub effective_gas_price: U256,
    /// Address of the created contract, for successful deployments.
    pub contract_address: Option<Address>,
    /// Execution outcome.
    pub status: TxStatus,
}

impl Receipt {
    /// Returns true if execution succeeded.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status == TxStatus::Success
    }
}

// =============================================================================
// CALL REQUEST
// =============================================================================

/// Read-only call (`eth_call`) parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    /// Caller; defaults to the zero address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    /// Contract to call.
    pub to: Address,
    /// Calldata.
    #[serde(default)]
    pub data: Bytes,
    /// Attached value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
}

// =============================================================================
// CONTRACTS
// =============================================================================

/// Deployable contract: creation bytecode plus a name for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractArtifact {
    /// Contract name.
    pub name: String,
    /// Creation bytecode; constructor arguments are appended to it.
    pub bytecode: Bytes,
}

/// Handle to a deployed contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractBinding {
    /// Contract name.
    pub name: String,
    /// Deployed address.
    pub address: Address,
}

// =============================================================================
// CONTRACT EXECUTION
// =============================================================================

/// Environment of a contract invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallEnv {
    /// Immediate caller.
    pub caller: Address,
    /// Address of the executing contract.
    pub contract: Address,
    /// Value sent with the call.
    pub value: U256,
}

/// Result of running contract code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Execution {
    /// Completed; for creation, `output` is the runtime code to store.
    Success {
        /// Return data.
        output: Vec<u8>,
        /// Gas consumed beyond the intrinsic cost.
        gas_used: u64,
    },
    /// Reverted; every write of the invocation is discarded.
    Revert {
        /// Revert reason.
        reason: String,
        /// Gas consumed beyond the intrinsic cost.
        gas_used: u64,
    },
}

impl Execution {
    /// Gas consumed beyond the intrinsic cost.
    #[must_use]
    pub fn gas_used(&self) -> u64 {
        match self {
            Self::Success { gas_used, .. } | Self::Revert { gas_used, .. } => *gas_used,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_json_uses_rpc_conventions() {
        let receipt = Receipt {
            transaction_hash: Hash::new([1u8; 32]),
            transaction_index: 0,
            block_hash: Hash::new([2u8; 32]),
            block_number: 26,
            from: Address::new([3u8; 20]),
            to: None,
            gas_used: 21_000,
            effective_gas_price: U256::from(1_000_000_000u64),
            contract_address: Some(Address::new([4u8; 20])),
            status: TxStatus::Success,
        };

        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["blockNumber"], "0x1a");
        assert_eq!(json["gasUsed"], "0x5208");
        assert_eq!(json["status"], "0x1");
        assert_eq!(json["to"], serde_json::Value::Null);

        let back: Receipt = serde_json::from_value(json).unwrap();
        assert_eq!(back, receipt);
    }

    #[test]
    fn test_status_rejects_unknown_codes() {
        assert_eq!(
            serde_json::from_str::<TxStatus>("\"0x0\"").unwrap(),
            TxStatus::Failed
        );
        assert!(serde_json::from_str::<TxStatus>("\"0x2\"").is_err());
    }

    #[test]
    fn test_call_request_omits_absent_fields() {
        let request = CallRequest {
            to: Address::new([5u8; 20]),
            data: Bytes::from_slice(&[0x18, 0x16, 0x0d, 0xdd]),
            ..CallRequest::default()
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("from").is_none());
        assert_eq!(json["data"], "0x18160ddd");
    }
}
