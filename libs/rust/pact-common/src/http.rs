//! HTTP clients for providers, state-change endpoints and pact brokers.

use crate::PactResult;
use reqwest::{Client, redirect};
use std::time::Duration;

/// Settings for clients built by [`build_http_client`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Whole-request timeout
    pub timeout: Duration,
    /// TCP connect timeout, never longer than `timeout`
    pub connect_timeout: Duration,
    /// `User-Agent` sent with every request
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("pact-rust/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    /// Set the request timeout, shortening the connect timeout to match.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.connect_timeout = self.connect_timeout.min(timeout);
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Build a rustls client from `config`.
///
/// Redirects are not followed: a verifier has to see exactly what the
/// provider answered.
///
/// # Errors
///
/// Returns `PactError::Http` when TLS cannot be initialised.
///
/// # Examples
///
/// ```
/// use pact_common::{HttpConfig, build_http_client};
/// use std::time::Duration;
///
/// let config = HttpConfig::default().with_timeout(Duration::from_secs(5));
/// assert!(build_http_client(&config).is_ok());
/// ```
pub fn build_http_client(config: &HttpConfig) -> PactResult<Client> {
    let client = Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(config.user_agent.as_str())
        .redirect(redirect::Policy::none())
        .use_rustls_tls()
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.user_agent.starts_with("pact-rust/"));
    }

    #[test]
    fn test_short_timeout_caps_connect_timeout() {
        let config = HttpConfig::default().with_timeout(Duration::from_millis(500));
        assert_eq!(config.timeout, Duration::from_millis(500));
        assert_eq!(config.connect_timeout, Duration::from_millis(500));

        let config = HttpConfig::default().with_timeout(Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_build_client() {
        let config = HttpConfig::default().with_user_agent("pact-tests");
        assert!(build_http_client(&config).is_ok());
    }
}
