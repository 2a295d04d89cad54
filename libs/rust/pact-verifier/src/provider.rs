//! The provider under verification.

use pact_common::{PactError, PactResult};
use url::Url;

/// Where the provider listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInfo {
    /// Provider name, used to find pacts on a broker
    pub name: String,
    /// `http` or `https`
    pub protocol: String,
    /// Host name
    pub host: String,
    /// Port; the protocol default when unset
    pub port: Option<u16>,
    /// Base path prefixed to every request path
    pub path: String,
}

impl Default for ProviderInfo {
    fn default() -> Self {
        Self {
            name: "provider".to_string(),
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: Some(8080),
            path: String::new(),
        }
    }
}

impl ProviderInfo {
    /// Provider with the default location.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Take the location from a base URL such as `http://localhost:8080/api`.
    ///
    /// # Errors
    ///
    /// Returns `PactError::InvalidInput` when the URL cannot be parsed or
    /// has no host.
    pub fn with_base_url(mut self, base_url: &str) -> PactResult<Self> {
        let url = Url::parse(base_url)
            .map_err(|e| PactError::invalid_input(format!("Invalid provider URL '{base_url}': {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| PactError::invalid_input(format!("Provider URL '{base_url}' has no host")))?;
        self.protocol = url.scheme().to_string();
        self.host = host.to_string();
        self.port = url.port();
        self.path = url.path().trim_end_matches('/').to_string();
        Ok(self)
    }

    /// Set the host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the protocol.
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Set the base path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into().trim_end_matches('/').to_string();
        self
    }

    /// Base URL of the provider, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        let path = if self.path.is_empty() || self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        match self.port {
            Some(port) => format!("{}://{}:{port}{path}", self.protocol, self.host),
            None => format!("{}://{}{path}", self.protocol, self.host),
        }
    }

    /// URL of a request path on the provider.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url())
        } else {
            format!("{}/{path}", self.base_url())
        }
    }
}
