//! # Domain Layer
//!
//! Transaction encoding, the per-transaction lifecycle, ABI helpers and the
//! wire types the ports exchange. No I/O.

pub mod abi;
pub mod lifecycle;
pub mod tx;
pub mod types;

pub use lifecycle::{TxLifecycle, TxState};
pub use tx::{
    compute_contract_address, decode_raw_transaction, keccak256, LocalSigner, SignedTransaction,
    TransactionRequest,
};
pub use types::{
    CallEnv, CallRequest, ContractArtifact, ContractBinding, Execution, Receipt, TxStatus,
};
