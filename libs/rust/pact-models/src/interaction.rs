//! Interactions: HTTP request/response pairs and messages.

use crate::http::{HttpRequest, HttpResponse};
use crate::message::MessageContents;
use crate::provider_states::ProviderState;
use crate::specification::PactSpecification;
use pact_common::{PactError, PactResult};
use serde_json::{Map, Value};
use std::fmt;

/// The kinds of interaction a pact can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    /// HTTP request/response
    Http,
    /// One-way message
    AsyncMessage,
    /// Request message with one or more response messages
    SyncMessage,
}

impl InteractionKind {
    /// V4 `type` discriminator.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Http => "Synchronous/HTTP",
            Self::AsyncMessage => "Asynchronous/Messages",
            Self::SyncMessage => "Synchronous/Messages",
        }
    }

    /// Parse a kind from its V4 name or the short names `HTTP`, `Async`
    /// and `Sync` (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `PactError::InvalidInput` for unknown kinds.
    pub fn parse(name: &str) -> PactResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "http" | "synchronous/http" => Ok(Self::Http),
            "async" | "message" | "asynchronous/messages" => Ok(Self::AsyncMessage),
            "sync" | "synchronous/messages" => Ok(Self::SyncMessage),
            _ => Err(PactError::invalid_input(format!("Unknown interaction type '{name}'"))),
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Which side of an interaction an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionPart {
    /// The request (or the message contents for asynchronous messages)
    #[default]
    Request,
    /// The response
    Response,
}

/// An HTTP interaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SynchronousHttp {
    /// Description
    pub description: String,
    /// Provider states
    pub provider_states: Vec<ProviderState>,
    /// Expected request
    pub request: HttpRequest,
    /// Response to return
    pub response: HttpResponse,
    /// Comments (`testname`, `text`)
    pub comments: Map<String, Value>,
    /// Pending interactions do not fail verification
    pub pending: bool,
}

/// A one-way message interaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AsynchronousMessage {
    /// Description
    pub description: String,
    /// Provider states
    pub provider_states: Vec<ProviderState>,
    /// Message contents
    pub contents: MessageContents,
    /// Comments
    pub comments: Map<String, Value>,
    /// Pending flag
    pub pending: bool,
}

/// A request message with response messages.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SynchronousMessages {
    /// Description
    pub description: String,
    /// Provider states
    pub provider_states: Vec<ProviderState>,
    /// Request message
    pub request: MessageContents,
    /// Response messages
    pub response: Vec<MessageContents>,
    /// Comments
    pub comments: Map<String, Value>,
    /// Pending flag
    pub pending: bool,
}

/// An interaction of any kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    /// HTTP request/response
    SynchronousHttp(SynchronousHttp),
    /// One-way message
    AsynchronousMessage(AsynchronousMessage),
    /// Request/response messages
    SynchronousMessages(SynchronousMessages),
}

impl Interaction {
    /// A new, empty interaction of the given kind.
    #[must_use]
    pub fn new(kind: InteractionKind, description: impl Into<String>) -> Self {
        let description = description.into();
        match kind {
            InteractionKind::Http => Self::SynchronousHttp(SynchronousHttp {
                description,
                ..SynchronousHttp::default()
            }),
            InteractionKind::AsyncMessage => Self::AsynchronousMessage(AsynchronousMessage {
                description,
                ..AsynchronousMessage::default()
            }),
            InteractionKind::SyncMessage => Self::SynchronousMessages(SynchronousMessages {
                description,
                ..SynchronousMessages::default()
            }),
        }
    }

    /// Kind of the interaction.
    #[must_use]
    pub const fn kind(&self) -> InteractionKind {
        match self {
            Self::SynchronousHttp(_) => InteractionKind::Http,
            Self::AsynchronousMessage(_) => InteractionKind::AsyncMessage,
            Self::SynchronousMessages(_) => InteractionKind::SyncMessage,
        }
    }

    /// Description.
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::SynchronousHttp(i) => &i.description,
            Self::AsynchronousMessage(i) => &i.description,
            Self::SynchronousMessages(i) => &i.description,
        }
    }

    /// Provider states.
    #[must_use]
    pub fn provider_states(&self) -> &[ProviderState] {
        match self {
            Self::SynchronousHttp(i) => &i.provider_states,
            Self::AsynchronousMessage(i) => &i.provider_states,
            Self::SynchronousMessages(i) => &i.provider_states,
        }
    }

    /// Mutable provider states.
    pub fn provider_states_mut(&mut self) -> &mut Vec<ProviderState> {
        match self {
            Self::SynchronousHttp(i) => &mut i.provider_states,
            Self::AsynchronousMessage(i) => &mut i.provider_states,
            Self::SynchronousMessages(i) => &mut i.provider_states,
        }
    }

    /// Comments.
    #[must_use]
    pub const fn comments(&self) -> &Map<String, Value> {
        match self {
            Self::SynchronousHttp(i) => &i.comments,
            Self::AsynchronousMessage(i) => &i.comments,
            Self::SynchronousMessages(i) => &i.comments,
        }
    }

    /// Mutable comments.
    pub fn comments_mut(&mut self) -> &mut Map<String, Value> {
        match self {
            Self::SynchronousHttp(i) => &mut i.comments,
            Self::AsynchronousMessage(i) => &mut i.comments,
            Self::SynchronousMessages(i) => &mut i.comments,
        }
    }

    /// Record the name of the test that produced the interaction.
    pub fn set_test_name(&mut self, name: impl Into<String>) {
        self.comments_mut()
            .insert("testname".to_string(), Value::String(name.into()));
    }

    /// Pending flag.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        match self {
            Self::SynchronousHttp(i) => i.pending,
            Self::AsynchronousMessage(i) => i.pending,
            Self::SynchronousMessages(i) => i.pending,
        }
    }

    /// HTTP interaction, if this is one.
    #[must_use]
    pub const fn as_http(&self) -> Option<&SynchronousHttp> {
        match self {
            Self::SynchronousHttp(i) => Some(i),
            _ => None,
        }
    }

    /// Asynchronous message, if this is one.
    #[must_use]
    pub const fn as_async_message(&self) -> Option<&AsynchronousMessage> {
        match self {
            Self::AsynchronousMessage(i) => Some(i),
            _ => None,
        }
    }

    /// Synchronous messages, if this is one.
    #[must_use]
    pub const fn as_sync_messages(&self) -> Option<&SynchronousMessages> {
        match self {
            Self::SynchronousMessages(i) => Some(i),
            _ => None,
        }
    }

    /// True when both interactions describe the same expectation: same
    /// kind, description and provider states.
    #[must_use]
    pub fn same_identity(&self, other: &Self) -> bool {
        self.kind() == other.kind()
            && self.description() == other.description()
            && self.provider_states() == other.provider_states()
    }

    /// Serialise for a pact file at the given specification version.
    ///
    /// # Errors
    ///
    /// Returns `PactError::UnsupportedSpecification` when the interaction
    /// cannot be expressed at that version.
    pub fn to_json(&self, spec: PactSpecification) -> PactResult<Value> {
        let v4 = spec == PactSpecification::V4;
        let unsupported = || {
            PactError::UnsupportedSpecification(format!(
                "{} interactions cannot be written as {spec}",
                self.kind()
            ))
        };

        let mut out = Map::new();
        if v4 {
            out.insert("type".to_string(), Value::String(self.kind().type_name().to_string()));
        }
        out.insert("description".to_string(), Value::String(self.description().to_string()));
        write_states(&mut out, self.provider_states(), spec);

        match self {
            Self::SynchronousHttp(i) => {
                out.insert("request".to_string(), i.request.to_json(spec));
                out.insert("response".to_string(), i.response.to_json(spec));
            }
            Self::AsynchronousMessage(i) => {
                if !spec.supports_messages() {
                    return Err(unsupported());
                }
                i.contents.write_json(&mut out, spec);
            }
            Self::SynchronousMessages(i) => {
                if !v4 {
                    return Err(unsupported());
                }
                out.insert("request".to_string(), i.request.to_json(spec));
                out.insert(
                    "response".to_string(),
                    Value::Array(i.response.iter().map(|r| r.to_json(spec)).collect()),
                );
            }
        }

        if v4 {
            if !self.comments().is_empty() {
                out.insert("comments".to_string(), Value::Object(self.comments().clone()));
            }
            if self.is_pending() {
                out.insert("pending".to_string(), Value::Bool(true));
            }
        }
        Ok(Value::Object(out))
    }

    /// Read an interaction. `kind` is the kind implied by where the value was
    /// found; a V4 `type` attribute takes precedence.
    ///
    /// # Errors
    ///
    /// Returns `PactError::InvalidInput` when the value is malformed.
    pub fn from_json(value: &Value, kind: InteractionKind, spec: PactSpecification) -> PactResult<Self> {
        if !value.is_object() {
            return Err(PactError::invalid_input(format!("Interaction must be an object: {value}")));
        }
        let kind = match value.get("type").and_then(Value::as_str) {
            Some(name) => InteractionKind::parse(name)?,
            None => kind,
        };
        let description = value
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let provider_states = ProviderState::read_states(value);
        let comments = value
            .get("comments")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let pending = value.get("pending").and_then(Value::as_bool).unwrap_or(false);

        let interaction = match kind {
            InteractionKind::Http => Self::SynchronousHttp(SynchronousHttp {
                description,
                provider_states,
                request: HttpRequest::from_json(value.get("request").unwrap_or(&Value::Null), spec)?,
                response: HttpResponse::from_json(value.get("response").unwrap_or(&Value::Null), spec)?,
                comments,
                pending,
            }),
            InteractionKind::AsyncMessage => Self::AsynchronousMessage(AsynchronousMessage {
                description,
                provider_states,
                contents: MessageContents::from_json(value, spec)?,
                comments,
                pending,
            }),
            InteractionKind::SyncMessage => Self::SynchronousMessages(SynchronousMessages {
                description,
                provider_states,
                request: MessageContents::from_json(value.get("request").unwrap_or(&Value::Null), spec)?,
                response: value
                    .get("response")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .map(|item| MessageContents::from_json(item, spec))
                            .collect::<PactResult<Vec<_>>>()
                    })
                    .transpose()?
                    .unwrap_or_default(),
                comments,
                pending,
            }),
        };
        Ok(interaction)
    }
}

fn write_states(out: &mut Map<String, Value>, states: &[ProviderState], spec: PactSpecification) {
    if states.is_empty() {
        return;
    }
    match spec {
        PactSpecification::V1 | PactSpecification::V1_1 | PactSpecification::V2 => {
            out.insert("providerState".to_string(), Value::String(states[0].name.clone()));
        }
        _ => {
            out.insert(
                "providerStates".to_string(),
                Value::Array(states.iter().map(ProviderState::to_json).collect()),
            );
        }
    }
}
