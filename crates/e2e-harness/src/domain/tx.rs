//! # Transactions
//!
//! Legacy EIP-155 transactions: signing on the harness side, decoding and
//! sender recovery on the node side.
//!
//! ## Wire Format
//!
//! ```text
//! signing payload: rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0])
//! signed:          rlp([nonce, gasPrice, gas, to, value, data, v, r, s])
//! v = chainId * 2 + 35 + recovery_id
//! ```

use crate::errors::HarnessError;
use rlp::{Rlp, RlpStream};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha3::{Digest, Keccak256};
use shared_types::{Address, Bytes, Hash, U256};

/// Upper bound for `s` (secp256k1 order / 2), per EIP-2.
const HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

// =============================================================================
// HASHING AND ADDRESSES
// =============================================================================

/// Keccak-256 of `data`.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    Hash::new(Keccak256::digest(data).into())
}

/// Address of a contract created by `deployer` at `nonce`:
/// `keccak256(rlp([deployer, nonce]))[12..]`.
#[must_use]
pub fn compute_contract_address(deployer: Address, nonce: u64) -> Address {
    let mut stream = RlpStream::new_list(2);
    stream.append(&deployer.as_bytes().to_vec());
    stream.append(&nonce);
    address_from_hash(&keccak256(&stream.out()))
}

/// Address controlled by a secp256k1 public key.
#[must_use]
pub fn public_key_address(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.serialize_uncompressed();
    address_from_hash(&keccak256(&uncompressed[1..]))
}

fn address_from_hash(hash: &Hash) -> Address {
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash.as_bytes()[12..]);
    Address::new(bytes)
}

// =============================================================================
// TRANSACTION REQUEST
// =============================================================================

/// Unsigned legacy transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRequest {
    /// Sender sequence.
    pub nonce: u64,
    /// Price per unit of gas.
    pub gas_price: U256,
    /// Gas limit.
    pub gas_limit: u64,
    /// Recipient; `None` creates a contract.
    pub to: Option<Address>,
    /// Attached value.
    pub value: U256,
    /// Calldata or creation code.
    pub data: Bytes,
    /// EIP-155 chain id.
    pub chain_id: u64,
}

impl TransactionRequest {
    /// Returns true if the transaction creates a contract.
    #[must_use]
    pub fn is_create(&self) -> bool {
        self.to.is_none()
    }

    fn append_common(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&self.gas_price);
        stream.append(&self.gas_limit);
        match &self.to {
            Some(to) => stream.append(&to.as_bytes().to_vec()),
            None => stream.append_empty_data(),
        };
        stream.append(&self.value);
        stream.append(&self.data.as_slice().to_vec());
    }

    /// Hash the sender signs.
    #[must_use]
    pub fn signing_hash(&self) -> Hash {
        let mut stream = RlpStream::new_list(9);
        self.append_common(&mut stream);
        stream.append(&self.chain_id);
        stream.append(&0u8);
        stream.append(&0u8);
        keccak256(&stream.out())
    }
}

/// Signed transaction with its raw encoding and recovered sender.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Transaction fields.
    pub request: TransactionRequest,
    /// Sender.
    pub from: Address,
    /// Keccak-256 of `raw`.
    pub hash: Hash,
    /// RLP encoding submitted with `eth_sendRawTransaction`.
    pub raw: Bytes,
}

// =============================================================================
// SIGNER
// =============================================================================

/// In-process secp256k1 key producing EIP-155 transactions.
#[derive(Clone)]
pub struct LocalSigner {
    secret: SecretKey,
    address: Address,
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl LocalSigner {
    /// Creates a signer from a 32-byte secret key.
    pub fn from_secret(secret: &[u8]) -> Result<Self, HarnessError> {
        let secret = SecretKey::from_slice(secret)
            .map_err(|e| HarnessError::Transaction(format!("invalid secret key: {e}")))?;
        Ok(Self::from_key(secret))
    }

    /// Creates a signer with a fresh random key.
    #[must_use]
    pub fn random() -> Self {
        Self::from_key(SecretKey::new(&mut secp256k1::rand::thread_rng()))
    }

    fn from_key(secret: SecretKey) -> Self {
        let public = PublicKey::from_secret_key(&Secp256k1::signing_only(), &secret);
        Self {
            secret,
            address: public_key_address(&public),
        }
    }

    /// Address controlled by this key.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Signs `request`.
    pub fn sign(&self, request: TransactionRequest) -> Result<SignedTransaction, HarnessError> {
        let digest = request.signing_hash();
        let message = Message::from_digest_slice(digest.as_bytes())
            .map_err(|e| HarnessError::Transaction(format!("invalid message hash: {e}")))?;
        let signature =
            Secp256k1::signing_only().sign_ecdsa_recoverable(&message, &self.secret);
        let (recovery_id, compact) = signature.serialize_compact();

        let v = request
            .chain_id
            .checked_mul(2)
            .and_then(|v| v.checked_add(35 + recovery_id.to_i32() as u64))
            .ok_or_else(|| HarnessError::Transaction("chain id too large".to_string()))?;

        let mut stream = RlpStream::new_list(9);
        request.append_common(&mut stream);
        stream.append(&v);
        stream.append(&U256::from_big_endian(&compact[..32]));
        stream.append(&U256::from_big_endian(&compact[32..]));
        let raw = stream.out().to_vec();

        Ok(SignedTransaction {
            hash: keccak256(&raw),
            from: self.address,
            request,
            raw: Bytes(raw),
        })
    }
}

// =============================================================================
// DECODING
// =============================================================================

fn decode_error(field: &str, err: rlp::DecoderError) -> HarnessError {
    HarnessError::Transaction(format!("rlp decode error for {field}: {err:?}"))
}

/// Decodes a raw legacy transaction and recovers its sender.
///
/// Accepts EIP-155 (`v >= 35`) and pre-EIP-155 (`v` = 27/28) signatures;
/// the latter decode with chain id 0.
pub fn decode_raw_transaction(raw: &[u8]) -> Result<SignedTransaction, HarnessError> {
    let rlp = Rlp::new(raw);
    if !rlp.is_list() {
        return Err(HarnessError::Transaction(
            "transaction must be an rlp list".to_string(),
        ));
    }
    let items = rlp.item_count().map_err(|e| decode_error("item count", e))?;
    if items != 9 {
        return Err(HarnessError::Transaction(format!(
            "legacy transaction must have 9 fields, got {items}"
        )));
    }

    let to_bytes: Vec<u8> = rlp.val_at(3).map_err(|e| decode_error("to", e))?;
    let to = match to_bytes.len() {
        0 => None,
        20 => Address::from_slice(&to_bytes),
        len => {
            return Err(HarnessError::Transaction(format!(
                "invalid recipient length {len}"
            )))
        }
    };
    let v: u64 = rlp.val_at(6).map_err(|e| decode_error("v", e))?;
    let (chain_id, recovery_id) = match v {
        27 | 28 => (0, v - 27),
        v if v >= 35 => ((v - 35) / 2, (v - 35) % 2),
        v => {
            return Err(HarnessError::Transaction(format!("invalid v value {v}")));
        }
    };

    let request = TransactionRequest {
        nonce: rlp.val_at(0).map_err(|e| decode_error("nonce", e))?,
        gas_price: rlp.val_at(1).map_err(|e| decode_error("gas price", e))?,
        gas_limit: rlp.val_at(2).map_err(|e| decode_error("gas limit", e))?,
        to,
        value: rlp.val_at(4).map_err(|e| decode_error("value", e))?,
        data: Bytes(rlp.val_at(5).map_err(|e| decode_error("data", e))?),
        chain_id,
    };
    let r: U256 = rlp.val_at(7).map_err(|e| decode_error("r", e))?;
    let s: U256 = rlp.val_at(8).map_err(|e| decode_error("s", e))?;

    let from = recover_sender(&request, v, recovery_id, r, s)?;
    Ok(SignedTransaction {
        request,
        from,
        hash: keccak256(raw),
        raw: Bytes::from_slice(raw),
    })
}

fn recover_sender(
    request: &TransactionRequest,
    v: u64,
    recovery_id: u64,
    r: U256,
    s: U256,
) -> Result<Address, HarnessError> {
    if r.is_zero() || s.is_zero() {
        return Err(HarnessError::Transaction(
            "invalid signature: r or s is zero".to_string(),
        ));
    }
    if s > U256::from_big_endian(&HALF_ORDER) {
        return Err(HarnessError::Transaction(
            "invalid signature: s value too high".to_string(),
        ));
    }

    // Pre-EIP-155 signatures commit to the six-field payload.
    let digest = if v >= 35 {
        request.signing_hash()
    } else {
        let mut stream = RlpStream::new_list(6);
        request.append_common(&mut stream);
        keccak256(&stream.out())
    };

    let mut compact = [0u8; 64];
    r.to_big_endian(&mut compact[..32]);
    s.to_big_endian(&mut compact[32..]);

    let recovery_id = RecoveryId::from_i32(recovery_id as i32)
        .map_err(|_| HarnessError::Transaction("invalid recovery id".to_string()))?;
    let signature = RecoverableSignature::from_compact(&compact, recovery_id)
        .map_err(|e| HarnessError::Transaction(format!("invalid signature: {e}")))?;
    let message = Message::from_digest_slice(digest.as_bytes())
        .map_err(|e| HarnessError::Transaction(format!("invalid message hash: {e}")))?;
    let public_key = Secp256k1::verification_only()
        .recover_ecdsa(&message, &signature)
        .map_err(|e| HarnessError::Transaction(format!("signature recovery failed: {e}")))?;

    Ok(public_key_address(&public_key))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn request(to: Option<Address>) -> TransactionRequest {
        TransactionRequest {
            nonce: 7,
            gas_price: U256::from(1_000_000_000u64),
            gas_limit: 21_000,
            to,
            value: U256::from(12_345u64),
            data: Bytes::from_slice(&[0xde, 0xad]),
            chain_id: 2061,
        }
    }

    #[test]
    fn test_contract_address_known_vector() {
        // Deployer 0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0 at nonces 0 and 1.
        let deployer = Address::from_str("0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0").unwrap();
        assert_eq!(
            compute_contract_address(deployer, 0),
            Address::from_str("0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d").unwrap()
        );
        assert_eq!(
            compute_contract_address(deployer, 1),
            Address::from_str("0x343c43a37d37dff08ae8c4a11544c718abb4fcf8").unwrap()
        );
    }

    #[test]
    fn test_sign_then_decode_recovers_sender() {
        let signer = LocalSigner::random();
        let to = Address::new([9u8; 20]);
        let signed = signer.sign(request(Some(to))).unwrap();

        let decoded = decode_raw_transaction(&signed.raw).unwrap();
        assert_eq!(decoded.from, signer.address());
        assert_eq!(decoded.hash, signed.hash);
        assert_eq!(decoded.request, signed.request);
    }

    #[test]
    fn test_decode_create_transaction() {
        let signer = LocalSigner::random();
        let signed = signer.sign(request(None)).unwrap();
        let decoded = decode_raw_transaction(&signed.raw).unwrap();
        assert!(decoded.request.is_create());
    }

    #[test]
    fn test_known_key_address() {
        // Secret key 1 controls 0x7e5f4552091a69125d5dfcb7b8c2659029395bdf.
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let signer = LocalSigner::from_secret(&secret).unwrap();
        assert_eq!(
            signer.address(),
            Address::from_str("0x7e5f4552091a69125d5dfcb7b8c2659029395bdf").unwrap()
        );
    }

    #[test]
    fn test_tampered_transaction_recovers_other_sender() {
        let signer = LocalSigner::random();
        let signed = signer.sign(request(Some(Address::new([1u8; 20])))).unwrap();

        let other = signer.sign(request(Some(Address::new([2u8; 20])))).unwrap();

        // Splice the signature of one transaction onto the body of another.
        let original = Rlp::new(&signed.raw);
        let forged_body = Rlp::new(&other.raw);
        let mut stream = RlpStream::new_list(9);
        for i in 0..6 {
            stream.append_raw(forged_body.at(i).unwrap().as_raw(), 1);
        }
        for i in 6..9 {
            stream.append_raw(original.at(i).unwrap().as_raw(), 1);
        }

        match decode_raw_transaction(&stream.out()) {
            Ok(decoded) => assert_ne!(decoded.from, signer.address()),
            Err(err) => assert!(matches!(err, HarnessError::Transaction(_))),
        }
    }

    #[test]
    fn test_decode_pre_eip155_transaction() {
        // Keyless deployment of the deterministic CREATE2 factory: v = 27,
        // r = s = 0x22..22, no chain id in the signing payload.
        let raw = Bytes::from_str(
            "0xf8a58085174876e800830186a08080b853604580600e600039806000f350fe\
         7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff\
         e03601600081602082378035828234f58015156039578182fd5b808252505050\
         6014600cf31ba022222222222222222222222222222222222222222222222222\
         22222222222222a0222222222222222222222222222222222222222222222222\
         2222222222222222",
        )
        .unwrap();

        let decoded = decode_raw_transaction(&raw.0).unwrap();
        assert_eq!(decoded.request.chain_id, 0);
        assert_eq!(decoded.request.nonce, 0);
        assert_eq!(decoded.request.gas_price, U256::from(100_000_000_000u64));
        assert_eq!(decoded.request.gas_limit, 100_000);
        assert!(decoded.request.is_create());
        assert_eq!(decoded.request.data.0.len(), 83);
        assert_eq!(
            decoded.from,
            Address::from_str("0x3fab184622dc19b6109349b94811493bf2a45362").unwrap()
        );
        assert_eq!(
            compute_contract_address(decoded.from, 0),
            Address::from_str("0x4e59b44847b379578588920ca78fbf26c0b4956c").unwrap()
        );
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert!(decode_raw_transaction(&[]).is_err());
        assert!(decode_raw_transaction(&[0xc0]).is_err());
        assert!(LocalSigner::from_secret(&[0u8; 32]).is_err());
    }
}
