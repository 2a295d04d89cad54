//! HTTP request and response parts of an interaction.

use crate::body::{ContentType, OptionalBody};
use crate::matchingrules::MatchingRules;
use crate::specification::PactSpecification;
use pact_common::{PactError, PactResult};
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Header map: name to values. Lookups ignore the case of the name.
pub type Headers = BTreeMap<String, Vec<String>>;

/// Query map: parameter name to values in order.
pub type Query = BTreeMap<String, Vec<String>>;

/// Find a header ignoring the case of its name.
#[must_use]
pub fn find_header<'a>(headers: &'a Headers, name: &str) -> Option<&'a Vec<String>> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, values)| values)
}

/// Append a header value, reusing an existing entry with the same name in
/// any case.
pub fn add_header(headers: &mut Headers, name: &str, value: impl Into<String>) {
    let key = headers
        .keys()
        .find(|key| key.eq_ignore_ascii_case(name))
        .cloned()
        .unwrap_or_else(|| name.to_string());
    headers.entry(key).or_default().push(value.into());
}

/// Replace all values of a header.
pub fn set_header(headers: &mut Headers, name: &str, values: Vec<String>) {
    headers.retain(|key, _| !key.eq_ignore_ascii_case(name));
    headers.insert(name.to_string(), values);
}

fn headers_to_json(headers: &Headers, v4: bool) -> Value {
    Value::Object(
        headers
            .iter()
            .map(|(name, values)| {
                let value = if v4 {
                    Value::Array(values.iter().cloned().map(Value::String).collect())
                } else {
                    Value::String(values.join(", "))
                };
                (name.clone(), value)
            })
            .collect(),
    )
}

fn headers_from_json(value: Option<&Value>) -> Headers {
    value
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .map(|(name, value)| (name.clone(), string_values(value)))
                .collect()
        })
        .unwrap_or_default()
}

fn string_values(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(value_to_string).collect(),
        other => vec![value_to_string(other)],
    }
}

/// Render a JSON scalar as the string it stands for.
#[must_use]
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn query_to_json(query: &Query, spec: PactSpecification) -> Value {
    if spec <= PactSpecification::V2 && spec != PactSpecification::Unknown {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (name, values) in query {
            for value in values {
                serializer.append_pair(name, value);
            }
        }
        Value::String(serializer.finish())
    } else {
        Value::Object(
            query
                .iter()
                .map(|(name, values)| {
                    (
                        name.clone(),
                        Value::Array(values.iter().cloned().map(Value::String).collect()),
                    )
                })
                .collect(),
        )
    }
}

/// Parse a query string into a query map.
#[must_use]
pub fn parse_query_string(query: &str) -> Query {
    let mut map = Query::new();
    for (name, value) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
        map.entry(name.into_owned()).or_default().push(value.into_owned());
    }
    map
}

/// Percent-decode a request path as received on the wire. Invalid UTF-8
/// sequences are replaced.
#[must_use]
pub fn decode_path(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

fn query_from_json(value: Option<&Value>) -> Query {
    match value {
        Some(Value::String(s)) => parse_query_string(s),
        Some(Value::Object(obj)) => obj
            .iter()
            .map(|(name, value)| (name.clone(), string_values(value)))
            .collect(),
        _ => Query::new(),
    }
}

fn write_body(
    out: &mut Map<String, Value>,
    body: &OptionalBody,
    headers: &Headers,
    spec: PactSpecification,
) {
    let header = find_header(headers, "Content-Type").and_then(|v| v.first()).map(String::as_str);
    let content_type = body.effective_content_type(header);
    if let Some(value) = body.to_json(content_type.as_ref(), spec == PactSpecification::V4) {
        out.insert("body".to_string(), value);
    }
}

fn write_rules(out: &mut Map<String, Value>, rules: &MatchingRules, spec: PactSpecification) {
    if let Some(value) = rules.to_json(spec) {
        out.insert("matchingRules".to_string(), value);
    }
}

/// The request half of an HTTP interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP method, upper case
    pub method: String,
    /// Request path
    pub path: String,
    /// Query parameters
    pub query: Query,
    /// Request headers
    pub headers: Headers,
    /// Request body
    pub body: OptionalBody,
    /// Matching rules for the request
    pub matching_rules: MatchingRules,
}

impl Default for HttpRequest {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            path: "/".to_string(),
            query: Query::new(),
            headers: Headers::new(),
            body: OptionalBody::Missing,
            matching_rules: MatchingRules::default(),
        }
    }
}

impl HttpRequest {
    /// Values of a header, ignoring the case of the name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&Vec<String>> {
        find_header(&self.headers, name)
    }

    /// Content type from the body or the `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> Option<ContentType> {
        let header = self.header("Content-Type").and_then(|v| v.first()).map(String::as_str);
        self.body.effective_content_type(header)
    }

    /// Serialise for a pact file.
    #[must_use]
    pub fn to_json(&self, spec: PactSpecification) -> Value {
        let mut out = Map::new();
        out.insert("method".to_string(), Value::String(self.method.clone()));
        out.insert("path".to_string(), Value::String(self.path.clone()));
        if !self.query.is_empty() {
            out.insert("query".to_string(), query_to_json(&self.query, spec));
        }
        if !self.headers.is_empty() {
            out.insert(
                "headers".to_string(),
                headers_to_json(&self.headers, spec == PactSpecification::V4),
            );
        }
        write_body(&mut out, &self.body, &self.headers, spec);
        write_rules(&mut out, &self.matching_rules, spec);
        Value::Object(out)
    }

    /// Read from a pact file.
    ///
    /// # Errors
    ///
    /// Returns `PactError::InvalidInput` for malformed matching rules.
    pub fn from_json(value: &Value, spec: PactSpecification) -> PactResult<Self> {
        let headers = headers_from_json(value.get("headers"));
        let header = find_header(&headers, "Content-Type")
            .and_then(|v| v.first())
            .cloned();
        Ok(Self {
            method: value
                .get("method")
                .and_then(Value::as_str)
                .unwrap_or("GET")
                .to_ascii_uppercase(),
            path: value.get("path").and_then(Value::as_str).unwrap_or("/").to_string(),
            query: query_from_json(value.get("query")),
            body: OptionalBody::from_json(
                value.get("body"),
                header.as_deref(),
                spec == PactSpecification::V4,
            ),
            headers,
            matching_rules: MatchingRules::from_json(value.get("matchingRules").unwrap_or(&Value::Null))?,
        })
    }
}

/// The response half of an HTTP interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Response headers
    pub headers: Headers,
    /// Response body
    pub body: OptionalBody,
    /// Matching rules for the response
    pub matching_rules: MatchingRules,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self {
            status: 200,
            headers: Headers::new(),
            body: OptionalBody::Missing,
            matching_rules: MatchingRules::default(),
        }
    }
}

impl HttpResponse {
    /// Values of a header, ignoring the case of the name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&Vec<String>> {
        find_header(&self.headers, name)
    }

    /// Content type from the body or the `Content-Type` header.
    #[must_use]
    pub fn content_type(&self) -> Option<ContentType> {
        let header = self.header("Content-Type").and_then(|v| v.first()).map(String::as_str);
        self.body.effective_content_type(header)
    }

    /// Serialise for a pact file.
    #[must_use]
    pub fn to_json(&self, spec: PactSpecification) -> Value {
        let mut out = Map::new();
        out.insert("status".to_string(), Value::from(self.status));
        if !self.headers.is_empty() {
            out.insert(
                "headers".to_string(),
                headers_to_json(&self.headers, spec == PactSpecification::V4),
            );
        }
        write_body(&mut out, &self.body, &self.headers, spec);
        write_rules(&mut out, &self.matching_rules, spec);
        Value::Object(out)
    }

    /// Read from a pact file.
    ///
    /// # Errors
    ///
    /// Returns `PactError::InvalidInput` for an out-of-range status or
    /// malformed matching rules.
    pub fn from_json(value: &Value, spec: PactSpecification) -> PactResult<Self> {
        let status = match value.get("status") {
            None => 200,
            Some(status) => status
                .as_u64()
                .and_then(|s| u16::try_from(s).ok())
                .ok_or_else(|| PactError::invalid_input(format!("Invalid response status: {status}")))?,
        };
        let headers = headers_from_json(value.get("headers"));
        let header = find_header(&headers, "Content-Type")
            .and_then(|v| v.first())
            .cloned();
        Ok(Self {
            status,
            body: OptionalBody::from_json(
                value.get("body"),
                header.as_deref(),
                spec == PactSpecification::V4,
            ),
            headers,
            matching_rules: MatchingRules::from_json(value.get("matchingRules").unwrap_or(&Value::Null))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchingrules::{Category, MatchingRule};
    use serde_json::json;

    #[test]
    fn test_header_lookup_ignores_case() {
        let mut headers = Headers::new();
        add_header(&mut headers, "Content-Type", "application/json");
        add_header(&mut headers, "content-type", "charset=utf-8");
        assert_eq!(headers.len(), 1);
        assert_eq!(
            find_header(&headers, "CONTENT-TYPE").unwrap(),
            &vec!["application/json".to_string(), "charset=utf-8".to_string()]
        );

        set_header(&mut headers, "CONTENT-TYPE", vec!["text/plain".to_string()]);
        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key("CONTENT-TYPE"));
    }

    #[test]
    fn test_decode_path() {
        assert_eq!(decode_path("/users/John%20Doe"), "/users/John Doe");
        assert_eq!(decode_path("/a%2Fb/%C3%A9"), "/a/b/\u{e9}");
        assert_eq!(decode_path("/plain"), "/plain");
    }

    #[test]
    fn test_query_v2_is_a_string() {
        let mut request = HttpRequest::default();
        request.query.insert("q".to_string(), vec!["a b".to_string(), "c".to_string()]);
        let value = request.to_json(PactSpecification::V2);
        assert_eq!(value["query"], json!("q=a+b&q=c"));

        let restored = HttpRequest::from_json(&value, PactSpecification::V2).unwrap();
        assert_eq!(restored.query, request.query);
    }

    #[test]
    fn test_request_round_trip_v4() {
        let mut request = HttpRequest {
            method: "POST".to_string(),
            path: "/users".to_string(),
            body: OptionalBody::json(&json!({"name": "Mary"})),
            ..HttpRequest::default()
        };
        add_header(&mut request.headers, "Content-Type", "application/json");
        request.query.insert("page".to_string(), vec!["1".to_string()]);
        request
            .matching_rules
            .add_rule(Category::Body, "$.name", MatchingRule::Type);

        let value = request.to_json(PactSpecification::V4);
        assert_eq!(value["headers"]["Content-Type"], json!(["application/json"]));
        assert_eq!(value["body"]["content"], json!({"name": "Mary"}));
        assert_eq!(value["query"], json!({"page": ["1"]}));

        let restored = HttpRequest::from_json(&value, PactSpecification::V4).unwrap();
        assert_eq!(restored.to_json(PactSpecification::V4), value);
    }

    #[test]
    fn test_response_defaults_and_errors() {
        let response = HttpResponse::from_json(&json!({}), PactSpecification::V3).unwrap();
        assert_eq!(response.status, 200);
        assert!(!response.body.is_specified());
        assert!(HttpResponse::from_json(&json!({"status": 70000}), PactSpecification::V3).is_err());
    }

    #[test]
    fn test_v3_headers_are_joined() {
        let mut response = HttpResponse::default();
        add_header(&mut response.headers, "Accept", "a");
        add_header(&mut response.headers, "Accept", "b");
        let value = response.to_json(PactSpecification::V3);
        assert_eq!(value["headers"]["Accept"], json!("a, b"));
    }
}
