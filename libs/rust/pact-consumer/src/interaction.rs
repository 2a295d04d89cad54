//! Builders describing one interaction of a pact.

use crate::editor;
use pact_common::PactResult;
use pact_models::{Interaction, InteractionPart};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

/// Operations shared by every kind of interaction.
///
/// Methods taking a `part` apply to the builder's current part when it is
/// `None`.
pub trait InteractionBuilder {
    /// The interaction being described.
    fn interaction_mut(&mut self) -> &mut Interaction;

    /// Part targeted when none is given.
    fn current_part(&self) -> InteractionPart;

    /// Add a provider state.
    fn given(&mut self, state: &str) -> &mut Self {
        editor::given(self.interaction_mut(), state);
        self
    }

    /// Add a provider state parameter. JSON values are kept as JSON.
    fn given_with_param(&mut self, state: &str, name: &str, value: &str) -> &mut Self {
        editor::given_with_param(self.interaction_mut(), state, name, value);
        self
    }

    /// Add provider state parameters from a JSON object.
    fn given_with_params(&mut self, state: &str, params: &str) -> &mut Self {
        editor::given_with_params(self.interaction_mut(), state, params);
        self
    }

    /// Set a body, processing JSON as integration JSON.
    ///
    /// # Errors
    ///
    /// Fails for malformed matchers.
    fn with_body(&mut self, body: Option<&str>, content_type: &str, part: Option<InteractionPart>) -> PactResult<&mut Self> {
        let part = part.unwrap_or_else(|| self.current_part());
        editor::with_body(self.interaction_mut(), part, content_type, body)?;
        Ok(self)
    }

    /// Set a JSON body.
    ///
    /// # Errors
    ///
    /// Fails for malformed matchers.
    fn with_json_body(&mut self, body: &Value, part: Option<InteractionPart>) -> PactResult<&mut Self> {
        self.with_body(Some(&body.to_string()), "application/json", part)
    }

    /// Set a binary body.
    fn with_binary_file(&mut self, bytes: &[u8], content_type: Option<&str>, part: Option<InteractionPart>) -> &mut Self {
        let part = part.unwrap_or_else(|| self.current_part());
        editor::with_binary_file(
            self.interaction_mut(),
            part,
            content_type.unwrap_or("application/octet-stream"),
            Some(bytes),
        );
        self
    }

    /// Set a `multipart/form-data` body holding one file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read.
    fn with_multipart_file(
        &mut self,
        part_name: &str,
        path: &Path,
        content_type: Option<&str>,
        part: Option<InteractionPart>,
        boundary: Option<&str>,
    ) -> PactResult<&mut Self> {
        let part = part.unwrap_or_else(|| self.current_part());
        editor::with_multipart_file(
            self.interaction_mut(),
            part,
            content_type.unwrap_or("application/octet-stream"),
            Some(path),
            part_name,
            boundary,
        )?;
        Ok(self)
    }

    /// Record the name of the test describing this interaction.
    fn test_name(&mut self, name: &str) -> &mut Self {
        editor::test_name(self.interaction_mut(), name);
        self
    }
}

/// Position of the next value of each repeated header or query parameter.
#[derive(Debug, Default)]
struct ValueIndices {
    headers: HashMap<(bool, String), usize>,
    query: HashMap<String, usize>,
}

impl ValueIndices {
    fn next_header(&mut self, part: InteractionPart, name: &str) -> usize {
        let key = (part == InteractionPart::Response, name.to_ascii_lowercase());
        let slot = self.headers.entry(key).or_insert(0);
        let index = *slot;
        *slot += 1;
        index
    }

    fn next_query(&mut self, name: &str) -> usize {
        let slot = self.query.entry(name.to_string()).or_insert(0);
        let index = *slot;
        *slot += 1;
        index
    }
}

/// Describes an HTTP interaction.
///
/// Operations target the request until [`HttpInteraction::will_respond_with`]
/// switches to the response.
#[derive(Debug)]
pub struct HttpInteraction<'a> {
    pact: &'a mut pact_models::Pact,
    index: usize,
    part: InteractionPart,
    indices: ValueIndices,
}

impl<'a> HttpInteraction<'a> {
    pub(crate) fn new(pact: &'a mut pact_models::Pact, index: usize) -> Self {
        Self {
            pact,
            index,
            part: InteractionPart::Request,
            indices: ValueIndices::default(),
        }
    }

    /// Set the request method and path. The path may be a matcher.
    ///
    /// # Errors
    ///
    /// Fails for malformed matchers.
    pub fn with_request(&mut self, method: &str, path: &str) -> PactResult<&mut Self> {
        editor::with_request(self.interaction_mut(), method, path)?;
        Ok(self)
    }

    /// Add a header value. Repeating a name (in any case) adds another value.
    ///
    /// # Errors
    ///
    /// Fails for malformed matchers.
    pub fn with_header(&mut self, name: &str, value: &str, part: Option<InteractionPart>) -> PactResult<&mut Self> {
        let part = part.unwrap_or(self.part);
        let index = self.indices.next_header(part, name);
        editor::with_header(self.interaction_mut(), part, name, index, value)?;
        Ok(self)
    }

    /// Add several header values.
    ///
    /// # Errors
    ///
    /// Fails for malformed matchers.
    pub fn with_headers<'h>(
        &mut self,
        headers: impl IntoIterator<Item = (&'h str, &'h str)>,
        part: Option<InteractionPart>,
    ) -> PactResult<&mut Self> {
        for (name, value) in headers {
            self.with_header(name, value, part)?;
        }
        Ok(self)
    }

    /// Set a header verbatim, replacing its values.
    pub fn set_header(&mut self, name: &str, value: &str, part: Option<InteractionPart>) -> &mut Self {
        let part = part.unwrap_or(self.part);
        editor::set_header_value(self.interaction_mut(), part, name, 0, value);
        self
    }

    /// Set several headers verbatim.
    pub fn set_headers<'h>(
        &mut self,
        headers: impl IntoIterator<Item = (&'h str, &'h str)>,
        part: Option<InteractionPart>,
    ) -> &mut Self {
        for (name, value) in headers {
            self.set_header(name, value, part);
        }
        self
    }

    /// Add a query parameter value. Repeating a name adds another value.
    ///
    /// # Errors
    ///
    /// Fails for malformed matchers.
    pub fn with_query_parameter(&mut self, name: &str, value: &str) -> PactResult<&mut Self> {
        let index = self.indices.next_query(name);
        editor::with_query_parameter(self.interaction_mut(), name, index, value)?;
        Ok(self)
    }

    /// Add several query parameter values.
    ///
    /// # Errors
    ///
    /// Fails for malformed matchers.
    pub fn with_query_parameters<'q>(
        &mut self,
        parameters: impl IntoIterator<Item = (&'q str, &'q str)>,
    ) -> PactResult<&mut Self> {
        for (name, value) in parameters {
            self.with_query_parameter(name, value)?;
        }
        Ok(self)
    }

    /// Set the response status and describe the response from here on.
    ///
    /// # Errors
    ///
    /// Fails only if the interaction is not HTTP, which the pact prevents.
    pub fn will_respond_with(&mut self, status: u16) -> PactResult<&mut Self> {
        editor::response_status(self.interaction_mut(), status)?;
        self.part = InteractionPart::Response;
        Ok(self)
    }
}

impl InteractionBuilder for HttpInteraction<'_> {
    fn interaction_mut(&mut self) -> &mut Interaction {
        &mut self.pact.interactions[self.index]
    }

    fn current_part(&self) -> InteractionPart {
        self.part
    }
}

/// Describes an asynchronous message. Every operation targets the message
/// contents.
#[derive(Debug)]
pub struct AsyncMessageInteraction<'a> {
    pact: &'a mut pact_models::Pact,
    index: usize,
}

impl<'a> AsyncMessageInteraction<'a> {
    pub(crate) fn new(pact: &'a mut pact_models::Pact, index: usize) -> Self {
        Self { pact, index }
    }

    /// Add message metadata. Values may be matchers.
    ///
    /// # Errors
    ///
    /// Fails for malformed matchers.
    pub fn with_metadata(&mut self, metadata: &Map<String, Value>) -> PactResult<&mut Self> {
        for (key, value) in metadata {
            let raw = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            editor::with_header(self.interaction_mut(), InteractionPart::Request, key, 0, &raw)?;
        }
        Ok(self)
    }
}

impl InteractionBuilder for AsyncMessageInteraction<'_> {
    fn interaction_mut(&mut self) -> &mut Interaction {
        &mut self.pact.interactions[self.index]
    }

    fn current_part(&self) -> InteractionPart {
        InteractionPart::Request
    }
}

/// Describes a synchronous message exchange.
///
/// Operations target the request message until
/// [`SyncMessageInteraction::will_respond_with`] switches to the response.
#[derive(Debug)]
pub struct SyncMessageInteraction<'a> {
    pact: &'a mut pact_models::Pact,
    index: usize,
    part: InteractionPart,
}

impl<'a> SyncMessageInteraction<'a> {
    pub(crate) fn new(pact: &'a mut pact_models::Pact, index: usize) -> Self {
        Self {
            pact,
            index,
            part: InteractionPart::Request,
        }
    }

    /// Describe the response message from here on.
    pub fn will_respond_with(&mut self) -> &mut Self {
        self.part = InteractionPart::Response;
        self
    }

    /// Add metadata to the current message. Values may be matchers.
    ///
    /// # Errors
    ///
    /// Fails for malformed matchers.
    pub fn with_metadata(&mut self, metadata: &Map<String, Value>) -> PactResult<&mut Self> {
        let part = self.part;
        for (key, value) in metadata {
            let raw = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            editor::with_header(self.interaction_mut(), part, key, 0, &raw)?;
        }
        Ok(self)
    }
}

impl InteractionBuilder for SyncMessageInteraction<'_> {
    fn interaction_mut(&mut self) -> &mut Interaction {
        &mut self.pact.interactions[self.index]
    }

    fn current_part(&self) -> InteractionPart {
        self.part
    }
}
