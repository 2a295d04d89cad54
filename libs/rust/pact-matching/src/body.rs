//! Body matching, dispatched on content type.

use crate::json::{JsonMatchContext, compare_json};
use crate::mismatch::Mismatch;
use crate::rules::match_rules_str;
use pact_models::matchingrules::ROOT_KEY;
use pact_models::{Category, ContentType, MatchingRule, MatchingRules, OptionalBody, RuleList};
use serde_json::Value;
use tracing::debug;

/// Compare bodies.
///
/// An unspecified expected body matches anything. A `contentType` rule at the
/// root only checks the actual content type.
#[must_use]
pub fn match_body(
    expected: &OptionalBody,
    expected_type: Option<&ContentType>,
    actual: &OptionalBody,
    actual_type: Option<&ContentType>,
    rules: &MatchingRules,
    allow_unexpected_keys: bool,
) -> Vec<Mismatch> {
    if !expected.is_specified() {
        return Vec::new();
    }
    let category = rules.category(Category::Body).or_else(|| rules.category(Category::Content));

    let root_content_type = category
        .and_then(|c| c.for_name(ROOT_KEY))
        .and_then(|list| {
            list.rules.iter().find_map(|rule| match rule {
                MatchingRule::ContentType(ct) => Some(ct.clone()),
                _ => None,
            })
        });
    if let Some(required) = root_content_type {
        return match_declared_content_type(&required, actual, actual_type);
    }

    match (expected, actual) {
        (OptionalBody::Empty, OptionalBody::Empty | OptionalBody::Missing) => return Vec::new(),
        (OptionalBody::Empty, _) => {
            return vec![Mismatch::BodyMismatch {
                path: ROOT_KEY.to_string(),
                expected: Value::String(String::new()),
                actual: Value::String(actual.as_str_lossy()),
                mismatch: "Expected an empty body".to_string(),
            }];
        }
        (_, OptionalBody::Missing | OptionalBody::Empty) => {
            return vec![Mismatch::BodyMismatch {
                path: ROOT_KEY.to_string(),
                expected: Value::String(expected.as_str_lossy()),
                actual: Value::Null,
                mismatch: "Expected a body but none was received".to_string(),
            }];
        }
        _ => {}
    }

    let expected_type = expected_type
        .cloned()
        .or_else(|| expected.effective_content_type(None));
    let actual_type = actual_type.cloned().or_else(|| actual.effective_content_type(None));

    if let (Some(e), Some(a)) = (&expected_type, &actual_type) {
        if e.essence() != a.essence() && !(e.is_json() && a.is_json()) {
            return vec![Mismatch::BodyTypeMismatch {
                expected: e.essence(),
                actual: a.essence(),
                mismatch: format!("Expected a body of '{e}' but the actual content type was '{a}'"),
            }];
        }
    }

    let is_json = expected_type.as_ref().is_some_and(ContentType::is_json);
    let is_text = expected_type.as_ref().is_none_or(ContentType::is_text);
    debug!(
        content_type = ?expected_type.as_ref().map(ContentType::essence),
        "Comparing bodies"
    );

    if is_json {
        match (expected.as_json(), actual.as_json()) {
            (Some(e), Some(a)) => {
                let context = JsonMatchContext {
                    rules: category,
                    allow_unexpected_keys,
                };
                compare_json(&e, &a, &context)
            }
            (Some(e), None) => vec![Mismatch::BodyMismatch {
                path: ROOT_KEY.to_string(),
                expected: e,
                actual: Value::String(actual.as_str_lossy()),
                mismatch: "Failed to parse the actual body as JSON".to_string(),
            }],
            _ => compare_text(expected, actual, category.and_then(|c| c.for_name(ROOT_KEY))),
        }
    } else if is_text {
        compare_text(expected, actual, category.and_then(|c| c.for_name(ROOT_KEY)))
    } else if expected.bytes() == actual.bytes() {
        Vec::new()
    } else {
        vec![Mismatch::BodyMismatch {
            path: ROOT_KEY.to_string(),
            expected: Value::String(format!("{} byte(s)", expected.bytes().len())),
            actual: Value::String(format!("{} byte(s)", actual.bytes().len())),
            mismatch: "Actual body does not match the expected binary body".to_string(),
        }]
    }
}

fn compare_text(
    expected: &OptionalBody,
    actual: &OptionalBody,
    rule: Option<&RuleList>,
) -> Vec<Mismatch> {
    let expected_text = expected.as_str_lossy();
    let actual_text = actual.as_str_lossy();
    let result = match rule {
        Some(rule) => match_rules_str(rule, &expected_text, &actual_text).map_err(|failures| failures.join(", ")),
        None if expected_text == actual_text => Ok(()),
        None => Err(format!("Expected body '{expected_text}' but received '{actual_text}'")),
    };
    match result {
        Ok(()) => Vec::new(),
        Err(mismatch) => vec![Mismatch::BodyMismatch {
            path: ROOT_KEY.to_string(),
            expected: Value::String(expected_text),
            actual: Value::String(actual_text),
            mismatch,
        }],
    }
}

fn match_declared_content_type(
    required: &str,
    actual: &OptionalBody,
    actual_type: Option<&ContentType>,
) -> Vec<Mismatch> {
    let required = ContentType::parse(required);
    let actual_type = actual_type
        .cloned()
        .or_else(|| actual.effective_content_type(None));
    match actual_type {
        Some(ct) if ct.essence() == required.essence() => Vec::new(),
        other => vec![Mismatch::BodyTypeMismatch {
            expected: required.essence(),
            actual: other.map(|ct| ct.essence()).unwrap_or_default(),
            mismatch: format!("Expected a body with content type '{}'", required.essence()),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_type() -> ContentType {
        ContentType::parse("application/json")
    }

    #[test]
    fn test_missing_expected_body_matches_anything() {
        let actual = OptionalBody::text("hello", None);
        assert!(match_body(&OptionalBody::Missing, None, &actual, None, &MatchingRules::default(), false).is_empty());
    }

    #[test]
    fn test_json_bodies() {
        let expected = OptionalBody::json(&json!({"id": 1}));
        let same = OptionalBody::json(&json!({"id": 1}));
        let different = OptionalBody::json(&json!({"id": 2}));
        let rules = MatchingRules::default();
        let ct = json_type();
        assert!(match_body(&expected, Some(&ct), &same, Some(&ct), &rules, false).is_empty());
        assert_eq!(match_body(&expected, Some(&ct), &different, Some(&ct), &rules, false).len(), 1);
    }

    #[test]
    fn test_content_type_mismatch_reported_once() {
        let expected = OptionalBody::json(&json!({"id": 1, "name": "x"}));
        let actual = OptionalBody::text("<id>1</id>", Some("application/xml"));
        let mismatches = match_body(
            &expected,
            Some(&json_type()),
            &actual,
            Some(&ContentType::parse("application/xml")),
            &MatchingRules::default(),
            false,
        );
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].mismatch_type(), "BodyTypeMismatch");
    }

    #[test]
    fn test_missing_actual_body() {
        let expected = OptionalBody::json(&json!({"id": 1}));
        let mismatches = match_body(&expected, None, &OptionalBody::Missing, None, &MatchingRules::default(), true);
        assert_eq!(mismatches.len(), 1);
    }

    #[test]
    fn test_text_bodies_with_rule() {
        let mut rules = MatchingRules::default();
        rules.add_rule(Category::Body, ROOT_KEY, MatchingRule::Regex("hello.*".to_string()));
        let expected = OptionalBody::text("hello", Some("text/plain"));
        let ok = OptionalBody::text("hello world", Some("text/plain"));
        let bad = OptionalBody::text("goodbye", Some("text/plain"));
        assert!(match_body(&expected, None, &ok, None, &rules, false).is_empty());
        assert_eq!(match_body(&expected, None, &bad, None, &rules, false).len(), 1);
    }

    #[test]
    fn test_content_type_rule() {
        let mut rules = MatchingRules::default();
        rules.add_rule(Category::Body, ROOT_KEY, MatchingRule::ContentType("image/png".to_string()));
        let expected = OptionalBody::Present(vec![1, 2, 3], Some("image/png".to_string()));
        let ok = OptionalBody::Present(vec![9, 9], Some("image/png".to_string()));
        let bad = OptionalBody::Present(vec![9, 9], Some("image/gif".to_string()));
        assert!(match_body(&expected, None, &ok, None, &rules, false).is_empty());
        assert_eq!(match_body(&expected, None, &bad, None, &rules, false).len(), 1);
    }

    #[test]
    fn test_binary_bodies() {
        let expected = OptionalBody::Present(vec![0, 159, 146], Some("application/octet-stream".to_string()));
        let same = expected.clone();
        let other = OptionalBody::Present(vec![0, 1], Some("application/octet-stream".to_string()));
        let rules = MatchingRules::default();
        assert!(match_body(&expected, None, &same, None, &rules, false).is_empty());
        assert_eq!(match_body(&expected, None, &other, None, &rules, false).len(), 1);
    }
}
