//! Mismatch types reported by the matching engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A difference between an expected and an actual value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Mismatch {
    /// Request methods differ
    MethodMismatch {
        /// Expected method
        expected: String,
        /// Actual method
        actual: String,
    },
    /// Request paths differ
    PathMismatch {
        /// Expected path
        expected: String,
        /// Actual path
        actual: String,
        /// Description
        mismatch: String,
    },
    /// Response statuses differ
    StatusMismatch {
        /// Expected status
        expected: u16,
        /// Actual status
        actual: u16,
        /// Description
        mismatch: String,
    },
    /// A query parameter differs, is missing or is unexpected
    QueryMismatch {
        /// Parameter name
        parameter: String,
        /// Expected value(s)
        expected: String,
        /// Actual value(s)
        actual: String,
        /// Description
        mismatch: String,
    },
    /// A header differs or is missing
    HeaderMismatch {
        /// Header name
        key: String,
        /// Expected value
        expected: String,
        /// Actual value
        actual: String,
        /// Description
        mismatch: String,
    },
    /// Bodies have different content types
    BodyTypeMismatch {
        /// Expected content type
        expected: String,
        /// Actual content type
        actual: String,
        /// Description
        mismatch: String,
    },
    /// Part of a body differs
    BodyMismatch {
        /// Path expression of the differing value
        path: String,
        /// Expected value
        expected: Value,
        /// Actual value
        actual: Value,
        /// Description
        mismatch: String,
    },
    /// A message metadata entry differs or is missing
    MetadataMismatch {
        /// Metadata key
        key: String,
        /// Expected value
        expected: String,
        /// Actual value
        actual: String,
        /// Description
        mismatch: String,
    },
}

impl Mismatch {
    /// The `type` tag of the mismatch.
    #[must_use]
    pub const fn mismatch_type(&self) -> &'static str {
        match self {
            Self::MethodMismatch { .. } => "MethodMismatch",
            Self::PathMismatch { .. } => "PathMismatch",
            Self::StatusMismatch { .. } => "StatusMismatch",
            Self::QueryMismatch { .. } => "QueryMismatch",
            Self::HeaderMismatch { .. } => "HeaderMismatch",
            Self::BodyTypeMismatch { .. } => "BodyTypeMismatch",
            Self::BodyMismatch { .. } => "BodyMismatch",
            Self::MetadataMismatch { .. } => "MetadataMismatch",
        }
    }

    /// Human readable description.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::MethodMismatch { expected, actual } => {
                format!("Expected method {expected} but received {actual}")
            }
            Self::BodyMismatch { path, mismatch, .. } => format!("{path} -> {mismatch}"),
            Self::PathMismatch { mismatch, .. }
            | Self::StatusMismatch { mismatch, .. }
            | Self::QueryMismatch { mismatch, .. }
            | Self::HeaderMismatch { mismatch, .. }
            | Self::BodyTypeMismatch { mismatch, .. }
            | Self::MetadataMismatch { mismatch, .. } => mismatch.clone(),
        }
    }

    /// Serialise to JSON.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}
