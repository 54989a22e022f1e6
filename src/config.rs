//! Hub configuration
//!
//! Defaults are usable as-is; a TOML file can override any subset of them
//! and the CLI overrides the file.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Capacity of each per-connection queue.
pub const DEFAULT_LINK_CAPACITY: usize = 25;

/// Capacity of the shared request channel feeding the hub.
pub const DEFAULT_REQUEST_BUFFER: usize = 100;

/// What the hub does when a client's outbound queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backpressure {
    /// Wait for room. One slow client stalls every client.
    #[default]
    Block,
    /// Drop the response for the slow client only.
    DropNewest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HubConfig {
    /// Address the HTTP server listens on
    pub bind: SocketAddr,

    /// Route that accepts WebSocket upgrades
    pub ws_path: String,

    /// Inbound and outbound queue capacity per connection
    pub link_capacity: usize,

    /// Buffer between the per-connection forwarders and the hub loop
    pub request_buffer: usize,

    pub backpressure: Backpressure,

    /// Reject upgrades from foreign origins
    pub check_origin: bool,

    /// Extra hosts accepted by the origin check
    pub allowed_origins: Vec<String>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            ws_path: "/ws".to_string(),
            link_capacity: DEFAULT_LINK_CAPACITY,
            request_buffer: DEFAULT_REQUEST_BUFFER,
            backpressure: Backpressure::Block,
            check_origin: true,
            allowed_origins: Vec::new(),
        }
    }
}

impl HubConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("invalid hub configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.link_capacity == 0 {
            anyhow::bail!("link_capacity must be at least 1");
        }
        if self.request_buffer == 0 {
            anyhow::bail!("request_buffer must be at least 1");
        }
        if !self.ws_path.starts_with('/') {
            anyhow::bail!("ws_path must start with '/', got {:?}", self.ws_path);
        }
        if self.ws_path == "/" || self.ws_path == "/health" {
            anyhow::bail!("ws_path {:?} collides with a built-in route", self.ws_path);
        }
        Ok(())
    }
}
