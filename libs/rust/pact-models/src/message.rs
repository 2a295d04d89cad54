//! Message contents shared by asynchronous and synchronous message interactions.

use crate::body::{ContentType, OptionalBody};
use crate::matchingrules::MatchingRules;
use crate::specification::PactSpecification;
use pact_common::PactResult;
use serde_json::{Map, Value};

/// The payload and metadata of a message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageContents {
    /// Message payload
    pub contents: OptionalBody,
    /// Message metadata
    pub metadata: Map<String, Value>,
    /// Matching rules for the contents (`body`) and metadata (`metadata`)
    pub matching_rules: MatchingRules,
}

impl MessageContents {
    /// Content type from the body or the `contentType` metadata entry.
    #[must_use]
    pub fn content_type(&self) -> Option<ContentType> {
        let declared = ["contentType", "content-type", "Content-Type"]
            .iter()
            .find_map(|key| self.metadata.get(*key).and_then(Value::as_str));
        self.contents.effective_content_type(declared)
    }

    /// Write contents, metadata and rules into `out`.
    pub fn write_json(&self, out: &mut Map<String, Value>, spec: PactSpecification) {
        let content_type = self.content_type();
        let contents = self
            .contents
            .to_json(content_type.as_ref(), spec == PactSpecification::V4)
            .unwrap_or(Value::Null);
        out.insert("contents".to_string(), contents);
        if !self.metadata.is_empty() {
            out.insert("metadata".to_string(), Value::Object(self.metadata.clone()));
        }
        if let Some(rules) = self.matching_rules.to_json(spec) {
            out.insert("matchingRules".to_string(), rules);
        }
    }

    /// Serialise on its own (used for synchronous message parts).
    #[must_use]
    pub fn to_json(&self, spec: PactSpecification) -> Value {
        let mut out = Map::new();
        self.write_json(&mut out, spec);
        Value::Object(out)
    }

    /// Read contents, metadata and rules from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns `PactError::InvalidInput` for malformed matching rules.
    pub fn from_json(value: &Value, spec: PactSpecification) -> PactResult<Self> {
        let metadata = value
            .get("metadata")
            .or_else(|| value.get("metaData"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let declared = ["contentType", "content-type", "Content-Type"]
            .iter()
            .find_map(|key| metadata.get(*key).and_then(Value::as_str));
        let contents = OptionalBody::from_json(
            value.get("contents"),
            declared,
            spec == PactSpecification::V4,
        );
        Ok(Self {
            contents,
            metadata,
            matching_rules: MatchingRules::from_json(value.get("matchingRules").unwrap_or(&Value::Null))?,
        })
    }
}
