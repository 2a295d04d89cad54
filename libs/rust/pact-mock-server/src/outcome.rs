//! Problems a mock server records while serving a pact.

use pact_matching::Mismatch;
use pact_models::{HttpRequest, PactSpecification};
use serde_json::{Value, json};

/// A request the mock server could not serve, or an expected request that
/// never arrived.
#[derive(Debug, Clone, PartialEq)]
pub enum MockOutcome {
    /// A request resembling an interaction, but differing from it
    RequestMismatch {
        /// Method of the received request
        method: String,
        /// Path of the received request
        path: String,
        /// Differences from the closest interaction
        mismatches: Vec<Mismatch>,
    },
    /// A request no interaction describes
    RequestNotFound(HttpRequest),
    /// An interaction whose request was never received
    MissingRequest(HttpRequest),
}

impl MockOutcome {
    /// Outcome type tag.
    #[must_use]
    pub const fn outcome_type(&self) -> &'static str {
        match self {
            Self::RequestMismatch { .. } => "request-mismatch",
            Self::RequestNotFound(_) => "request-not-found",
            Self::MissingRequest(_) => "missing-request",
        }
    }

    /// Serialise in the shape returned to FFI callers.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::RequestMismatch {
                method,
                path,
                mismatches,
            } => json!({
                "type": self.outcome_type(),
                "method": method,
                "path": path,
                "mismatches": mismatches.iter().map(Mismatch::to_json).collect::<Vec<_>>(),
            }),
            Self::RequestNotFound(request) | Self::MissingRequest(request) => json!({
                "type": self.outcome_type(),
                "method": request.method,
                "path": request.path,
                "request": request.to_json(PactSpecification::V4),
            }),
        }
    }

    /// One line summary for logs and error bodies.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::RequestMismatch {
                method,
                path,
                mismatches,
            } => format!(
                "Request did not match: {method} {path}: {}",
                mismatches
                    .iter()
                    .map(Mismatch::description)
                    .collect::<Vec<_>>()
                    .join("; ")
            ),
            Self::RequestNotFound(request) => {
                format!("Unexpected request: {} {}", request.method, request.path)
            }
            Self::MissingRequest(request) => {
                format!("Expected request was not received: {} {}", request.method, request.path)
            }
        }
    }
}
