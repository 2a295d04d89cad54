//! The pact: a consumer, a provider and the interactions between them.

use crate::interaction::{Interaction, InteractionKind};
use crate::specification::PactSpecification;
use pact_common::{PactError, PactResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A participant in a pact (consumer or provider).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    /// Participant name
    pub name: String,
}

impl Participant {
    /// Create a new participant.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A pact between a consumer and a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pact {
    /// Consumer participant
    pub consumer: Participant,
    /// Provider participant
    pub provider: Participant,
    /// Interactions in declaration order
    pub interactions: Vec<Interaction>,
    /// User metadata namespaces
    pub metadata: Map<String, Value>,
    /// Specification version the pact is written against
    pub specification: PactSpecification,
}

impl Pact {
    /// Create an empty pact.
    ///
    /// # Errors
    ///
    /// Returns `PactError::InvalidInput` when either name is empty.
    pub fn new(consumer: &str, provider: &str) -> PactResult<Self> {
        if consumer.trim().is_empty() {
            return Err(PactError::invalid_input("Consumer name cannot be empty"));
        }
        if provider.trim().is_empty() {
            return Err(PactError::invalid_input("Provider name cannot be empty"));
        }
        Ok(Self {
            consumer: Participant::new(consumer),
            provider: Participant::new(provider),
            interactions: Vec::new(),
            metadata: Map::new(),
            specification: PactSpecification::default(),
        })
    }

    /// Merge entries into a metadata namespace.
    pub fn add_metadata(&mut self, namespace: &str, values: Map<String, Value>) {
        let entry = self
            .metadata
            .entry(namespace.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        match entry {
            Value::Object(existing) => existing.extend(values),
            other => *other = Value::Object(values),
        }
    }

    /// Index of an interaction with the given kind and description.
    #[must_use]
    pub fn find_interaction(&self, kind: InteractionKind, description: &str) -> Option<usize> {
        self.interactions
            .iter()
            .position(|i| i.kind() == kind && i.description() == description)
    }

    /// Interactions of one kind.
    pub fn interactions_of(&self, kind: InteractionKind) -> impl Iterator<Item = &Interaction> {
        self.interactions.iter().filter(move |i| i.kind() == kind)
    }

    /// True when the pact holds any message interaction.
    #[must_use]
    pub fn has_messages(&self) -> bool {
        self.interactions.iter().any(|i| i.kind() != InteractionKind::Http)
    }

    /// Merge another pact's interactions into this one.
    ///
    /// Interactions are keyed by kind, description and provider states.
    /// Identical duplicates collapse; a duplicate key with different content
    /// is a conflict.
    ///
    /// # Errors
    ///
    /// Returns `PactError::MergeConflict` when the participants differ or two
    /// interactions conflict.
    pub fn merge(&mut self, other: &Self) -> PactResult<()> {
        if self.consumer != other.consumer || self.provider != other.provider {
            return Err(PactError::MergeConflict(format!(
                "Cannot merge pact {}-{} into {}-{}",
                other.consumer.name, other.provider.name, self.consumer.name, self.provider.name
            )));
        }

        let spec = self.specification.writable();
        let comparable = |interaction: &Interaction| {
            interaction
                .to_json(spec)
                .or_else(|_| interaction.to_json(PactSpecification::V4))
        };
        for incoming in &other.interactions {
            match self.interactions.iter().find(|i| i.same_identity(incoming)) {
                Some(existing) => {
                    let left = comparable(existing)?;
                    let right = comparable(incoming)?;
                    if left != right {
                        return Err(PactError::MergeConflict(format!(
                            "Interaction '{}' conflicts with an existing interaction of the same name",
                            incoming.description()
                        )));
                    }
                }
                None => self.interactions.push(incoming.clone()),
            }
        }

        for (namespace, values) in &other.metadata {
            if let Value::Object(values) = values {
                self.add_metadata(namespace, values.clone());
            }
        }
        Ok(())
    }
}
