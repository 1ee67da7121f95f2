//! # Harness Configuration
//!
//! Fixture description of the network instance under test, the running
//! instance's port mappings, and harness timing and gas settings.

use crate::errors::HarnessError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Deadline for inclusion and receipt checks.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Deadline for contract deployments.
pub const TX_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval between receipt polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Shortest receipt poll interval; a configured 0 is raised to this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Node configuration directory mounted into the instance.
pub const NODE_CONFIG_PATH: &str = "../polard/config/";
/// Base image the instance is built from.
pub const NODE_BASE_IMAGE: &str = "polard/base:v0.0.0";
/// Name of the running instance.
pub const CONTAINER_NAME: &str = "goodcontainer";
/// Container port label of the JSON-RPC HTTP endpoint.
pub const HTTP_PORT_LABEL: &str = "8545/tcp";
/// Container port label of the JSON-RPC WebSocket endpoint.
pub const WS_PORT_LABEL: &str = "8546/tcp";
/// Toolchain version the instance image is built with.
pub const TOOLCHAIN_VERSION: &str = "1.20.4";

// =============================================================================
// FIXTURE
// =============================================================================

/// Describes how to bring up the network instance under test.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct FixtureConfig {
    /// Node configuration directory.
    pub config_path: String,
    /// Base image tag.
    pub base_image: String,
    /// Instance name.
    pub container_name: String,
    /// Container port label of the HTTP endpoint.
    pub http_address: String,
    /// Container port label of the WebSocket endpoint.
    pub ws_address: String,
    /// Toolchain version pin.
    pub toolchain_version: String,
}

impl FixtureConfig {
    /// Assembles a fixture description.
    #[must_use]
    pub fn new(
        config_path: impl Into<String>,
        base_image: impl Into<String>,
        container_name: impl Into<String>,
        http_address: impl Into<String>,
        ws_address: impl Into<String>,
        toolchain_version: impl Into<String>,
    ) -> Self {
        Self {
            config_path: config_path.into(),
            base_image: base_image.into(),
            container_name: container_name.into(),
            http_address: http_address.into(),
            ws_address: ws_address.into(),
            toolchain_version: toolchain_version.into(),
        }
    }
}

/// Fixture description for the default node image.
#[must_use]
pub fn default_fixture_config() -> FixtureConfig {
    FixtureConfig::new(
        NODE_CONFIG_PATH,
        NODE_BASE_IMAGE,
        CONTAINER_NAME,
        HTTP_PORT_LABEL,
        WS_PORT_LABEL,
        TOOLCHAIN_VERSION,
    )
}

/// A started instance: its fixture plus where its labelled ports landed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunningFixture {
    /// Fixture the instance was started from.
    pub config: FixtureConfig,
    /// Host the mapped ports listen on.
    pub host: String,
    /// Container port label to host port.
    pub ports: BTreeMap<String, u16>,
}

impl RunningFixture {
    /// Creates a running fixture with no mapped ports.
    #[must_use]
    pub fn new(config: FixtureConfig, host: impl Into<String>) -> Self {
        Self {
            config,
            host: host.into(),
            ports: BTreeMap::new(),
        }
    }

    /// Records that `label` is reachable on `host_port`.
    #[must_use]
    pub fn with_port(mut self, label: impl Into<String>, host_port: u16) -> Self {
        self.ports.insert(label.into(), host_port);
        self
    }

    fn mapped(&self, label: &str) -> Result<u16, HarnessError> {
        self.ports
            .get(label)
            .copied()
            .ok_or_else(|| HarnessError::UnmappedPort(label.to_string()))
    }

    /// JSON-RPC HTTP endpoint.
    pub fn http_url(&self) -> Result<String, HarnessError> {
        let port = self.mapped(&self.config.http_address)?;
        Ok(format!("http://{}:{port}", self.host))
    }

    /// JSON-RPC WebSocket endpoint.
    pub fn ws_url(&self) -> Result<String, HarnessError> {
        let port = self.mapped(&self.config.ws_address)?;
        Ok(format!("ws://{}:{port}", self.host))
    }
}

// =============================================================================
// HARNESS SETTINGS
// =============================================================================

/// Timing and gas settings for harness operations.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Deadline for inclusion and receipt checks, in milliseconds.
    pub default_timeout_ms: u64,
    /// Deadline for deployments, in milliseconds.
    pub deploy_timeout_ms: u64,
    /// Receipt poll interval, in milliseconds.
    pub poll_interval_ms: u64,
    /// Per-request HTTP timeout, in milliseconds.
    pub request_timeout_ms: u64,
    /// Fixed gas price in wei; `None` asks the node (`eth_gasPrice`).
    pub gas_price_wei: Option<u64>,
    /// Gas limit for calls and transfers.
    pub gas_limit: u64,
    /// Gas limit for deployments.
    pub deploy_gas_limit: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            deploy_timeout_ms: TX_TIMEOUT.as_millis() as u64,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            request_timeout_ms: 5_000,
            gas_price_wei: None,
            gas_limit: 100_000,
            deploy_gas_limit: 3_000_000,
        }
    }
}

impl HarnessConfig {
    /// Deadline for inclusion and receipt checks.
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Deadline for deployments.
    #[must_use]
    pub fn deploy_timeout(&self) -> Duration {
        Duration::from_millis(self.deploy_timeout_ms)
    }

    /// Receipt poll interval, never shorter than [`MIN_POLL_INTERVAL`].
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms).max(MIN_POLL_INTERVAL)
    }

    /// Per-request HTTP timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

// =============================================================================
// TESTS
// =============================================================================
