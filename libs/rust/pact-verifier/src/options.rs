//! Verification options.

use pact_common::{PactError, PactResult, RetryConfig};
use pact_models::ProviderVersion;
use std::time::Duration;

/// How a verification run behaves.
#[derive(Debug, Clone)]
pub struct VerificationOptions {
    /// URL receiving provider state change requests
    pub state_change_url: Option<String>,
    /// Also send `teardown` requests after each interaction
    pub state_change_teardown: bool,
    /// Headers added to every replayed request, replacing the pact's values
    pub custom_headers: Vec<(String, String)>,
    /// Timeout for each request to the provider
    pub request_timeout: Duration,
    /// Publish results to the broker the pacts came from
    pub publish: bool,
    /// Provider version reported when publishing
    pub provider_version: Option<ProviderVersion>,
    /// Retries for fetching pacts
    pub retry: RetryConfig,
}

impl Default for VerificationOptions {
    fn default() -> Self {
        Self {
            state_change_url: None,
            state_change_teardown: false,
            custom_headers: Vec::new(),
            request_timeout: Duration::from_secs(5),
            publish: false,
            provider_version: None,
            retry: RetryConfig::default(),
        }
    }
}

impl VerificationOptions {
    /// Set the state change URL.
    #[must_use]
    pub fn with_state_change_url(mut self, url: impl Into<String>) -> Self {
        self.state_change_url = Some(url.into());
        self
    }

    /// Send teardown requests.
    #[must_use]
    pub const fn with_state_change_teardown(mut self, teardown: bool) -> Self {
        self.state_change_teardown = teardown;
        self
    }

    /// Add a custom header.
    #[must_use]
    pub fn with_custom_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Publish results as `provider_version`.
    #[must_use]
    pub fn with_publish(mut self, provider_version: ProviderVersion) -> Self {
        self.publish = true;
        self.provider_version = Some(provider_version);
        self
    }

    /// Set the retry configuration for fetching pacts.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Check the options are consistent.
    ///
    /// # Errors
    ///
    /// Returns `PactError::InvalidInput` when publishing without a usable
    /// provider version, or when the timeout is zero.
    pub fn validate(&self) -> PactResult<()> {
        if self.request_timeout.is_zero() {
            return Err(PactError::invalid_input("Request timeout must be greater than zero"));
        }
        if self.publish && !self.provider_version.as_ref().is_some_and(ProviderVersion::is_publishable) {
            return Err(PactError::invalid_input(
                "Publishing results requires a provider version without empty tags",
            ));
        }
        Ok(())
    }
}

/// Parse a custom header given as `Name: value` or `Name=value`.
///
/// # Errors
///
/// Returns `PactError::InvalidInput` when there is no separator or the name
/// is empty.
pub fn parse_custom_header(raw: &str) -> PactResult<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .or_else(|| raw.split_once('='))
        .ok_or_else(|| PactError::invalid_input(format!("Custom header '{raw}' must be 'Name: value'")))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(PactError::invalid_input(format!("Custom header '{raw}' has no name")));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
