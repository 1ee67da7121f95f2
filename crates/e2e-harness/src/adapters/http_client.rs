//! # HTTP JSON-RPC Client
//!
//! [`EthRpc`] over JSON-RPC 2.0 / HTTP. Integers travel as hex quantities,
//! byte strings as `0x`-prefixed hex.

use crate::config::{HarnessConfig, RunningFixture};
use crate::domain::types::{CallRequest, Receipt};
use crate::errors::HarnessError;
use crate::ports::EthRpc;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_types::{quantity, Address, Bytes, Hash, U256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::trace;

/// JSON-RPC request structure.
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    params: T,
    id: u64,
}

/// JSON-RPC response structure.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Error message.
    pub message: String,
}

/// JSON-RPC client for a network instance.
#[derive(Debug)]
pub struct HttpRpcClient {
    http_client: reqwest::Client,
    rpc_url: String,
    request_timeout: Duration,
    request_id: AtomicU64,
}

impl HttpRpcClient {
    /// Creates a client with the default request timeout.
    pub fn new(rpc_url: impl Into<String>) -> Result<Self, HarnessError> {
        Self::from_config(rpc_url, &HarnessConfig::default())
    }

    /// Creates a client using `request_timeout_ms` from the harness settings.
    pub fn from_config(rpc_url: impl Into<String>, config: &HarnessConfig) -> Result<Self, HarnessError> {
        Self::with_timeout(rpc_url, config.request_timeout())
    }

    /// Creates a client with a custom request timeout.
    pub fn with_timeout(rpc_url: impl Into<String>, timeout: Duration) -> Result<Self, HarnessError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            rpc_url: rpc_url.into(),
            request_timeout: timeout,
            request_id: AtomicU64::new(1),
        })
    }

    /// Creates a client for the HTTP endpoint of a running fixture.
    pub fn from_fixture(fixture: &RunningFixture, config: &HarnessConfig) -> Result<Self, HarnessError> {
        Self::from_config(fixture.http_url()?, config)
    }

    /// Endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.rpc_url
    }

    /// Per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Sends a request; `None` when the node returned a null result.
    async fn request<P: Serialize + Send, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<Option<R>, HarnessError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };
        trace!(method, id, "rpc request");

        let response: JsonRpcResponse<R> = self
            .http_client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(HarnessError::Rpc(format!(
                "{method} failed with {}: {}",
                error.code, error.message
            )));
        }
        Ok(response.result)
    }

    /// Sends a request whose result must be present.
    async fn call_method<P: Serialize + Send, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, HarnessError> {
        self.request(method, params)
            .await?
            .ok_or_else(|| HarnessError::Rpc(format!("{method} returned no result")))
    }

    async fn quantity(&self, method: &str, params: serde_json::Value) -> Result<u64, HarnessError> {
        let result: String = self.call_method(method, params).await?;
        Ok(quantity::parse_u64(&result)?)
    }
}

#[async_trait]
impl EthRpc for HttpRpcClient {
    async fn chain_id(&self) -> Result<u64, HarnessError> {
        self.quantity("eth_chainId", json!([])).await
    }

    async fn block_number(&self) -> Result<u64, HarnessError> {
        self.quantity("eth_blockNumber", json!([])).await
    }

    async fn gas_price(&self) -> Result<U256, HarnessError> {
        self.call_method("eth_gasPrice", json!([])).await
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, HarnessError> {
        self.quantity("eth_getTransactionCount", json!([address, "pending"]))
            .await
    }

    async fn balance(&self, address: Address) -> Result<U256, HarnessError> {
        self.call_method("eth_getBalance", json!([address, "latest"]))
            .await
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, HarnessError> {
        self.call_method("eth_getCode", json!([address, "latest"]))
            .await
    }

    async fn send_raw_transaction(&self, raw: &Bytes) -> Result<Hash, HarnessError> {
        self.call_method("eth_sendRawTransaction", json!([raw]))
            .await
    }

    async fn transaction_receipt(&self, tx_hash: Hash) -> Result<Option<Receipt>, HarnessError> {
        self.request("eth_getTransactionReceipt", json!([tx_hash]))
            .await
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes, HarnessError> {
        self.call_method("eth_call", json!([request, "latest"]))
            .await
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_fixture_config, HTTP_PORT_LABEL};

    #[test]
    fn test_request_serialization() {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method: "eth_getTransactionCount",
            params: json!([Address::new([0x11; 20]), "pending"]),
            id: 7,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 7);
        assert_eq!(
            value["params"][0],
            "0x1111111111111111111111111111111111111111"
        );
    }

    #[test]
    fn test_null_result_parses_as_none() {
        let response: JsonRpcResponse<Receipt> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert!(response.result.is_none());
        assert!(response.error.is_none());
    }

    #[test]
    fn test_error_response_parses() {
        let response: JsonRpcResponse<String> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"nonce too low"}}"#,
        )
        .unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, -32000);
        assert_eq!(error.message, "nonce too low");
    }

    #[test]
    fn test_from_fixture_requires_http_mapping() {
        let fixture = RunningFixture::new(default_fixture_config(), "127.0.0.1");
        let config = HarnessConfig::default();
        assert!(matches!(
            HttpRpcClient::from_fixture(&fixture, &config),
            Err(HarnessError::UnmappedPort(_))
        ));

        let fixture = fixture.with_port(HTTP_PORT_LABEL, 8545);
        let client = HttpRpcClient::from_fixture(&fixture, &config).unwrap();
        assert_eq!(client.url(), "http://127.0.0.1:8545");
    }

    #[test]
    fn test_request_timeout_comes_from_config() {
        assert_eq!(
            HttpRpcClient::new("http://127.0.0.1:8545").unwrap().request_timeout(),
            Duration::from_secs(5)
        );

        let config = HarnessConfig {
            request_timeout_ms: 250,
            ..HarnessConfig::default()
        };
        let client = HttpRpcClient::from_config("http://127.0.0.1:8545", &config).unwrap();
        assert_eq!(client.request_timeout(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_rpc_error() {
        let client =
            HttpRpcClient::with_timeout("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        assert!(matches!(
            client.block_number().await,
            Err(HarnessError::Rpc(_))
        ));
    }
}
