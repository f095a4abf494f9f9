//! Client configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{McpError, McpResult};
use crate::protocol::{ClientInfo, PROTOCOL_VERSION};

/// Default MCP endpoint.
pub const DEFAULT_URL: &str = "http://localhost:3000/mcp";

/// Configuration for one MCP client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Endpoint URL.
    #[serde(default = "default_url")]
    pub url: String,

    /// Protocol version announced in `initialize`.
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,

    /// Client identity announced in `initialize`.
    #[serde(default)]
    pub client_info: ClientInfo,

    /// Per round-trip timeout in seconds. `None` waits indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Extra headers sent with every request.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_protocol_version() -> String {
    PROTOCOL_VERSION.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            protocol_version: default_protocol_version(),
            client_info: ClientInfo::default(),
            timeout_secs: None,
            headers: HashMap::new(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration for `url` with defaults for everything else.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> McpResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            McpError::config(format!("Invalid config file {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Bound every round-trip by `secs` seconds.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Add a header sent with every request.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Override the announced client identity.
    pub fn with_client_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.client_info = ClientInfo {
            name: name.into(),
            version: version.into(),
        };
        self
    }

    /// The configured timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Check the configuration for obvious mistakes.
    pub fn validate(&self) -> McpResult<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(McpError::config(format!(
                "URL must start with http:// or https://: {}",
                self.url
            )));
        }
        if self.timeout_secs == Some(0) {
            return Err(McpError::config("Timeout must be greater than zero"));
        }
        Ok(())
    }
}
