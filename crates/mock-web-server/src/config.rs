//! Configuration types for mock-web-server.

use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::server::{QueueItem, DEFAULT_BROADCAST_CAPACITY};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Address to bind; loopback unless overridden
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to bind. Absent or 0 lets the OS pick one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Events buffered per request-stream subscriber before it lags
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,

    /// Responses enqueued every time the server starts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub responses: Vec<QueueItem>,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_broadcast_capacity() -> usize {
    DEFAULT_BROADCAST_CAPACITY
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: None,
            broadcast_capacity: default_broadcast_capacity(),
            responses: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML or JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: ServerConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.broadcast_capacity == 0 {
            anyhow::bail!("broadcastCapacity must be greater than 0");
        }
        Ok(())
    }
}
