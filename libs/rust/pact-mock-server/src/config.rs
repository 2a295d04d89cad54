//! Mock server configuration.

use pact_common::{PactError, PactResult};
use serde_json::Value;

/// Where and how a mock server listens.
#[derive(Debug, Clone)]
pub struct MockServerConfig {
    /// Host name or address to bind
    pub host: String,
    /// Port to bind; 0 selects a free port
    pub port: u16,
    /// Transport name; only `http` is served
    pub transport: String,
    /// Transport specific options
    pub transport_config: Option<Value>,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            transport: "http".to_string(),
            transport_config: None,
        }
    }
}

impl MockServerConfig {
    /// Set the bind host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the bind port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the transport.
    #[must_use]
    pub fn with_transport(mut self, transport: impl Into<String>) -> Self {
        self.transport = transport.into();
        self
    }

    /// Set transport options from a JSON string. Blank input clears them.
    ///
    /// # Errors
    ///
    /// Returns `PactError::InvalidInput` when the string is not JSON.
    pub fn with_transport_config(mut self, config: Option<&str>) -> PactResult<Self> {
        self.transport_config = match config.map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                serde_json::from_str(raw)
                    .map_err(|e| PactError::invalid_input(format!("Invalid transport configuration: {e}")))?,
            ),
        };
        Ok(self)
    }

    /// Check that the transport is one this server provides.
    ///
    /// # Errors
    ///
    /// Returns `PactError::UnsupportedTransport` for anything but `http`.
    pub fn validate(&self) -> PactResult<()> {
        if self.transport.eq_ignore_ascii_case("http") {
            Ok(())
        } else {
            Err(PactError::UnsupportedTransport(self.transport.clone()))
        }
    }
}
