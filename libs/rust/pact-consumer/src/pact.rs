//! The consumer-side pact: participants, interactions and output.

use crate::interaction::{AsyncMessageInteraction, HttpInteraction, SyncMessageInteraction};
use crate::server::PactServer;
use pact_common::PactResult;
use pact_mock_server::{MockServer, MockServerConfig};
use pact_models::pact_file::IMPLEMENTATION_NAMESPACE;
use pact_models::{Interaction, InteractionKind, PactSpecification};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A pact under construction.
///
/// Interactions are added with [`Pact::upon_receiving`] and friends; the
/// pact is either served by a mock server or written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pact {
    document: pact_models::Pact,
}

impl Pact {
    /// Start a pact between `consumer` and `provider`, written at V4.
    ///
    /// # Errors
    ///
    /// Returns `PactError::InvalidInput` when either name is empty.
    pub fn new(consumer: &str, provider: &str) -> PactResult<Self> {
        let mut document = pact_models::Pact::new(consumer, provider)?;
        let mut details = Map::new();
        details.insert("consumer".to_string(), Value::String(env!("CARGO_PKG_VERSION").to_string()));
        document.add_metadata(IMPLEMENTATION_NAMESPACE, details);
        Ok(Self { document })
    }

    /// Consumer name.
    #[must_use]
    pub fn consumer(&self) -> &str {
        &self.document.consumer.name
    }

    /// Provider name.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.document.provider.name
    }

    /// Specification version the pact is written against.
    #[must_use]
    pub const fn specification(&self) -> PactSpecification {
        self.document.specification
    }

    /// Set the specification version.
    #[must_use]
    pub fn with_specification(mut self, specification: PactSpecification) -> Self {
        self.document.specification = specification;
        self
    }

    /// Set the specification version from a version string such as `"V3"`
    /// or `"4.0"`.
    ///
    /// # Errors
    ///
    /// Returns `PactError::UnsupportedSpecification` for unknown versions.
    pub fn with_specification_str(self, version: &str) -> PactResult<Self> {
        let specification = PactSpecification::parse(version)?;
        Ok(self.with_specification(specification))
    }

    /// Merge values into a metadata namespace.
    #[must_use]
    pub fn with_metadata(mut self, namespace: &str, values: Map<String, Value>) -> Self {
        self.document.add_metadata(namespace, values);
        self
    }

    /// Index of the interaction called `description`, creating it if needed.
    fn open(&mut self, kind: InteractionKind, description: &str) -> usize {
        if let Some(index) = self.document.find_interaction(kind, description) {
            debug!(description, kind = %kind, "Reopening interaction");
            return index;
        }
        self.document.interactions.push(Interaction::new(kind, description));
        self.document.interactions.len() - 1
    }

    /// Describe an HTTP interaction. A description already used for an HTTP
    /// interaction reopens it.
    pub fn upon_receiving(&mut self, description: &str) -> HttpInteraction<'_> {
        let index = self.open(InteractionKind::Http, description);
        HttpInteraction::new(&mut self.document, index)
    }

    /// Describe an asynchronous message.
    pub fn upon_receiving_async(&mut self, description: &str) -> AsyncMessageInteraction<'_> {
        let index = self.open(InteractionKind::AsyncMessage, description);
        AsyncMessageInteraction::new(&mut self.document, index)
    }

    /// Describe a synchronous message exchange.
    pub fn upon_receiving_sync(&mut self, description: &str) -> SyncMessageInteraction<'_> {
        let index = self.open(InteractionKind::SyncMessage, description);
        SyncMessageInteraction::new(&mut self.document, index)
    }

    /// Interactions of one kind.
    pub fn interactions(&self, kind: InteractionKind) -> impl Iterator<Item = &Interaction> {
        self.document.interactions_of(kind)
    }

    /// Every message interaction, asynchronous and synchronous.
    pub fn messages(&self) -> impl Iterator<Item = &Interaction> {
        self.document
            .interactions
            .iter()
            .filter(|interaction| interaction.kind() != InteractionKind::Http)
    }

    /// Start a mock server for the HTTP interactions. Port `0` picks a free
    /// port.
    ///
    /// # Errors
    ///
    /// Fails for unsupported transports, malformed transport configuration
    /// or an address that cannot be bound.
    pub async fn serve(
        &self,
        addr: &str,
        port: u16,
        transport: &str,
        transport_config: Option<&str>,
    ) -> PactResult<PactServer> {
        let config = MockServerConfig::default()
            .with_host(addr)
            .with_port(port)
            .with_transport(transport)
            .with_transport_config(transport_config)?;
        let server = MockServer::start(self.document.clone(), config).await?;
        info!(url = %server.url(), consumer = self.consumer(), "Serving pact");
        Ok(PactServer::new(addr, transport, server))
    }

    /// Write the pact to `dir`, merging into an existing file unless
    /// `overwrite` is set.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors and conflicting interactions.
    pub fn write_file(&self, dir: &Path, overwrite: bool) -> PactResult<PathBuf> {
        self.document.write_file(dir, overwrite)
    }

    /// The underlying pact document.
    #[must_use]
    pub const fn document(&self) -> &pact_models::Pact {
        &self.document
    }

    /// Serialise the pact document.
    ///
    /// # Errors
    ///
    /// Fails when an interaction cannot be written at the pact's version.
    pub fn to_json(&self) -> PactResult<Value> {
        self.document.to_json()
    }
}

impl From<Pact> for pact_models::Pact {
    fn from(pact: Pact) -> Self {
        pact.document
    }
}
