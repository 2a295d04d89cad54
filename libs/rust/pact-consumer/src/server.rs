//! Handle on a mock server started from a consumer pact.

use pact_common::{PactError, PactResult};
use pact_mock_server::{MockOutcome, MockServer};
use std::path::{Path, PathBuf};
use url::Url;

/// A mock server serving the HTTP interactions of a [`crate::Pact`].
///
/// The server stops when [`PactServer::stop`] is called or the handle is
/// dropped.
#[derive(Debug)]
pub struct PactServer {
    host: String,
    transport: String,
    server: Option<MockServer>,
}

impl PactServer {
    pub(crate) fn new(host: &str, transport: &str, server: MockServer) -> Self {
        Self {
            host: host.to_string(),
            transport: transport.to_ascii_lowercase(),
            server: Some(server),
        }
    }

    /// Bound port, or `0` once stopped.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.server.as_ref().map_or(0, MockServer::port)
    }

    /// Host the server was bound to.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Transport the server speaks.
    #[must_use]
    pub fn transport(&self) -> &str {
        &self.transport
    }

    /// True until stopped.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.server.as_ref().is_some_and(MockServer::is_running)
    }

    /// Base URL, `transport://host:port`.
    ///
    /// # Errors
    ///
    /// Returns `PactError::InvalidInput` when the host does not form a URL.
    pub fn url(&self) -> PactResult<Url> {
        let raw = format!("{}://{}:{}", self.transport, self.host, self.port());
        Url::parse(&raw).map_err(|e| PactError::invalid_input(format!("Invalid server URL '{raw}': {e}")))
    }

    /// URL of `path` on this server.
    ///
    /// # Errors
    ///
    /// Returns `PactError::InvalidInput` when the result is not a URL.
    pub fn join(&self, path: &str) -> PactResult<Url> {
        self.url()?
            .join(path)
            .map_err(|e| PactError::invalid_input(format!("Cannot join '{path}' to the server URL: {e}")))
    }

    /// True when every interaction was received and nothing else was.
    #[must_use]
    pub fn matched(&self) -> bool {
        self.server.as_ref().is_some_and(MockServer::matched)
    }

    /// Requests that went wrong, and interactions never received.
    #[must_use]
    pub fn mismatches(&self) -> Vec<MockOutcome> {
        self.server.as_ref().map(MockServer::mismatches).unwrap_or_default()
    }

    /// Write the served pact into `dir`, creating it when missing.
    ///
    /// # Errors
    ///
    /// Fails when the server is not running, when `dir` exists but is not a
    /// directory, or on I/O and merge errors.
    pub fn write_file(&self, dir: &Path, overwrite: bool) -> PactResult<PathBuf> {
        let server = self
            .server
            .as_ref()
            .filter(|server| server.is_running())
            .ok_or_else(|| PactError::unavailable("The mock server is not running"))?;
        if dir.exists() && !dir.is_dir() {
            return Err(PactError::invalid_input(format!(
                "'{}' exists and is not a directory",
                dir.display()
            )));
        }
        server.write_pact(dir, overwrite)
    }

    /// Stop the server.
    ///
    /// # Errors
    ///
    /// Returns `PactError::Internal` when the server task failed.
    pub async fn stop(&mut self) -> PactResult<()> {
        if let Some(mut server) = self.server.take() {
            server.shutdown().await?;
        }
        Ok(())
    }
}
