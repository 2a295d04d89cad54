//! Pact matching engine.
//!
//! Compares what a consumer expects with what actually happened: HTTP
//! requests received by a mock server, responses returned by a provider,
//! and messages produced by a provider. Every comparison returns the full
//! list of [`Mismatch`]es; an empty list means the parts match.
//!
//! Matching rules attached to the expected side relax the comparison. Rules
//! on a body path cascade to its children only as type comparisons; array
//! rules such as `min` compare every actual element against the first
//! expected element.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod body;
pub mod http;
pub mod json;
pub mod mismatch;
pub mod rules;
pub mod time_format;

pub use json::{JsonMatchContext, compare_json};
pub use mismatch::Mismatch;
pub use rules::{match_rule, match_rules};

use pact_models::{Category, ContentType, HttpRequest, HttpResponse, MessageContents};
use serde_json::Value;
use tracing::debug;

/// Compare an actual request with the expected one.
///
/// Body keys the consumer did not expect are mismatches.
#[must_use]
pub fn match_request(expected: &HttpRequest, actual: &HttpRequest) -> Vec<Mismatch> {
    let rules = &expected.matching_rules;
    let mut mismatches = Vec::new();
    mismatches.extend(http::match_method(&expected.method, &actual.method));
    mismatches.extend(http::match_path(&expected.path, &actual.path, rules));
    mismatches.extend(http::match_query(&expected.query, &actual.query, rules));
    mismatches.extend(http::match_headers(&expected.headers, &actual.headers, rules));
    mismatches.extend(body::match_body(
        &expected.body,
        expected.content_type().as_ref(),
        &actual.body,
        actual.content_type().as_ref(),
        rules,
        false,
    ));
    debug!(
        method = %expected.method,
        path = %expected.path,
        mismatches = mismatches.len(),
        "Matched request"
    );
    mismatches
}

/// Compare an actual response with the expected one.
///
/// Extra body keys and headers returned by the provider are tolerated.
#[must_use]
pub fn match_response(expected: &HttpResponse, actual: &HttpResponse) -> Vec<Mismatch> {
    let rules = &expected.matching_rules;
    let mut mismatches = Vec::new();
    mismatches.extend(http::match_status(expected.status, actual.status));
    mismatches.extend(http::match_headers(&expected.headers, &actual.headers, rules));
    mismatches.extend(body::match_body(
        &expected.body,
        expected.content_type().as_ref(),
        &actual.body,
        actual.content_type().as_ref(),
        rules,
        true,
    ));
    debug!(
        status = expected.status,
        mismatches = mismatches.len(),
        "Matched response"
    );
    mismatches
}

/// Compare an actual message with the expected one: contents, then metadata.
#[must_use]
pub fn match_message(expected: &MessageContents, actual: &MessageContents) -> Vec<Mismatch> {
    let mut mismatches = body::match_body(
        &expected.contents,
        expected.content_type().as_ref(),
        &actual.contents,
        actual.content_type().as_ref(),
        &expected.matching_rules,
        true,
    );
    mismatches.extend(match_metadata(expected, actual));
    mismatches
}

fn is_content_type_key(key: &str) -> bool {
    key.eq_ignore_ascii_case("contentType") || key.eq_ignore_ascii_case("content-type")
}

fn metadata_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Compare message metadata. Only the expected keys are checked.
#[must_use]
pub fn match_metadata(expected: &MessageContents, actual: &MessageContents) -> Vec<Mismatch> {
    let category = expected.matching_rules.category(Category::Metadata);
    let mut mismatches = Vec::new();
    for (key, expected_value) in &expected.metadata {
        let Some(actual_value) = actual.metadata.get(key) else {
            mismatches.push(Mismatch::MetadataMismatch {
                key: key.clone(),
                expected: metadata_string(expected_value),
                actual: String::new(),
                mismatch: format!("Expected message metadata '{key}' but was missing"),
            });
            continue;
        };
        let result = match category.and_then(|c| c.for_name(key)) {
            Some(rule) => match_rules(rule, expected_value, actual_value).map_err(|failures| failures.join(", ")),
            None if is_content_type_key(key) => {
                let e = ContentType::parse(&metadata_string(expected_value));
                let a = ContentType::parse(&metadata_string(actual_value));
                if e.essence() == a.essence() {
                    Ok(())
                } else {
                    Err(format!("Expected content type '{e}' but received '{a}'"))
                }
            }
            None if expected_value == actual_value => Ok(()),
            None => Err(format!(
                "Expected message metadata '{key}' to have value '{}' but was '{}'",
                metadata_string(expected_value),
                metadata_string(actual_value)
            )),
        };
        if let Err(mismatch) = result {
            mismatches.push(Mismatch::MetadataMismatch {
                key: key.clone(),
                expected: metadata_string(expected_value),
                actual: metadata_string(actual_value),
                mismatch,
            });
        }
    }
    mismatches
}

#[cfg(test)]
mod tests {
    use super::*;
    use pact_models::http::add_header;
    use pact_models::{MatchingRule, OptionalBody};
    use serde_json::json;

    fn request(body: &Value) -> HttpRequest {
        let mut request = HttpRequest {
            method: "POST".to_string(),
            path: "/users".to_string(),
            body: OptionalBody::json(body),
            ..HttpRequest::default()
        };
        add_header(&mut request.headers, "Content-Type", "application/json");
        request
    }

    #[test]
    fn test_identical_requests_match() {
        let expected = request(&json!({"name": "Mary"}));
        assert!(match_request(&expected, &expected.clone()).is_empty());
    }

    #[test]
    fn test_request_rejects_unexpected_body_keys() {
        let expected = request(&json!({"name": "Mary"}));
        let actual = request(&json!({"name": "Mary", "admin": true}));
        let mismatches = match_request(&expected, &actual);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].mismatch_type(), "BodyMismatch");
    }

    #[test]
    fn test_request_collects_all_mismatches() {
        let expected = request(&json!({"name": "Mary"}));
        let mut actual = request(&json!({"name": "Fred"}));
        actual.method = "PUT".to_string();
        actual.path = "/people".to_string();
        let kinds: Vec<&str> = match_request(&expected, &actual)
            .iter()
            .map(Mismatch::mismatch_type)
            .collect();
        assert_eq!(kinds, vec!["MethodMismatch", "PathMismatch", "BodyMismatch"]);
    }

    #[test]
    fn test_response_allows_extra_keys_and_headers() {
        let mut expected = HttpResponse {
            body: OptionalBody::json(&json!({"id": 1})),
            ..HttpResponse::default()
        };
        expected
            .matching_rules
            .add_rule(Category::Body, "$.id", MatchingRule::Integer);
        let mut actual = HttpResponse {
            body: OptionalBody::json(&json!({"id": 42, "extra": "ok"})),
            ..HttpResponse::default()
        };
        add_header(&mut actual.headers, "X-Trace", "abc");
        assert!(match_response(&expected, &actual).is_empty());

        actual.status = 500;
        assert_eq!(match_response(&expected, &actual).len(), 1);
    }

    #[test]
    fn test_message_metadata() {
        let mut expected = MessageContents {
            contents: OptionalBody::json(&json!({"event": "created"})),
            ..MessageContents::default()
        };
        expected.metadata.insert("contentType".to_string(), json!("application/json"));
        expected.metadata.insert("topic".to_string(), json!("users"));

        let mut actual = expected.clone();
        actual
            .metadata
            .insert("contentType".to_string(), json!("application/json; charset=utf-8"));
        assert!(match_message(&expected, &actual).is_empty());

        actual.metadata.remove("topic");
        let mismatches = match_message(&expected, &actual);
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].mismatch_type(), "MetadataMismatch");
    }

    #[test]
    fn test_message_contents_rules() {
        let mut expected = MessageContents {
            contents: OptionalBody::json(&json!({"items": [{"id": 1}]})),
            ..MessageContents::default()
        };
        expected
            .matching_rules
            .add_rule(Category::Body, "$.items", MatchingRule::MinType(1));
        let actual = MessageContents {
            contents: OptionalBody::json(&json!({"items": [{"id": 5}, {"id": 6}]})),
            ..MessageContents::default()
        };
        assert!(match_message(&expected, &actual).is_empty());
    }
}
