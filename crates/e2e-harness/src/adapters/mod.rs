//! # Adapters
//!
//! - [`HttpRpcClient`]: JSON-RPC over HTTP to a running instance
//! - [`LocalNode`]: in-process instance over the host-ledger keepers
//! - [`NativeTokenRuntime`]: ERC-20 contract runtime over the Balance Capability

pub mod http_client;
pub mod local_node;
pub mod token_runtime;

pub use http_client::HttpRpcClient;
pub use local_node::{
    intrinsic_gas, GenesisAccount, GenesisValidator, LedgerAdapter, LedgerBank, LocalNode,
    LocalNodeConfig,
};
pub use token_runtime::{token_denom, NativeTokenRuntime, TOKEN_CODE, TOKEN_MODULE};
