//! Matching of the non-body parts of HTTP requests and responses.

use crate::mismatch::Mismatch;
use crate::rules::{match_rules, match_rules_str};
use pact_models::http::find_header;
use pact_models::matchingrules::ROOT_KEY;
use pact_models::{Category, ContentType, Headers, MatchingRules, Query};
use serde_json::Value;

/// Compare request methods, ignoring case.
#[must_use]
pub fn match_method(expected: &str, actual: &str) -> Option<Mismatch> {
    if expected.eq_ignore_ascii_case(actual) {
        None
    } else {
        Some(Mismatch::MethodMismatch {
            expected: expected.to_uppercase(),
            actual: actual.to_uppercase(),
        })
    }
}

/// Compare request paths, applying a path rule when one exists.
#[must_use]
pub fn match_path(expected: &str, actual: &str, rules: &MatchingRules) -> Option<Mismatch> {
    let rule = rules
        .category(Category::Path)
        .and_then(|category| category.for_name(ROOT_KEY));
    let result = match rule {
        Some(rule) => match_rules_str(rule, expected, actual).map_err(|failures| failures.join(", ")),
        None if expected == actual => Ok(()),
        None => Err(format!("Expected path '{expected}' but received '{actual}'")),
    };
    result.err().map(|mismatch| Mismatch::PathMismatch {
        expected: expected.to_string(),
        actual: actual.to_string(),
        mismatch,
    })
}

/// Compare response status codes.
#[must_use]
pub fn match_status(expected: u16, actual: u16) -> Option<Mismatch> {
    (expected != actual).then(|| Mismatch::StatusMismatch {
        expected,
        actual,
        mismatch: format!("Expected status {expected} but received {actual}"),
    })
}

/// Compare query parameters.
///
/// Expected parameters must be present with matching values. Parameters the
/// request carries beyond the expected ones are reported too.
#[must_use]
pub fn match_query(expected: &Query, actual: &Query, rules: &MatchingRules) -> Vec<Mismatch> {
    let category = rules.category(Category::Query);
    let mut mismatches = Vec::new();

    for (name, expected_values) in expected {
        let Some(actual_values) = actual.get(name) else {
            mismatches.push(Mismatch::QueryMismatch {
                parameter: name.clone(),
                expected: expected_values.join(","),
                actual: String::new(),
                mismatch: format!("Expected query parameter '{name}' but was missing"),
            });
            continue;
        };
        let rule = category.and_then(|c| c.for_name(name));
        if let Some(rule) = rule {
            let template = expected_values.first().map_or("", String::as_str);
            for value in actual_values {
                if let Err(failures) = match_rules_str(rule, template, value) {
                    mismatches.push(Mismatch::QueryMismatch {
                        parameter: name.clone(),
                        expected: expected_values.join(","),
                        actual: actual_values.join(","),
                        mismatch: format!("Query parameter '{name}': {}", failures.join(", ")),
                    });
                }
            }
            if rule.rules.iter().any(|r| r.is_length_matcher()) {
                let template = Value::Array(expected_values.iter().cloned().map(Value::String).collect());
                let received = Value::Array(actual_values.iter().cloned().map(Value::String).collect());
                if let Err(failures) = match_rules(rule, &template, &received) {
                    mismatches.push(Mismatch::QueryMismatch {
                        parameter: name.clone(),
                        expected: expected_values.join(","),
                        actual: actual_values.join(","),
                        mismatch: format!("Query parameter '{name}': {}", failures.join(", ")),
                    });
                }
            }
        } else if expected_values != actual_values {
            mismatches.push(Mismatch::QueryMismatch {
                parameter: name.clone(),
                expected: expected_values.join(","),
                actual: actual_values.join(","),
                mismatch: format!(
                    "Expected query parameter '{name}' with value(s) [{}] but received [{}]",
                    expected_values.join(", "),
                    actual_values.join(", ")
                ),
            });
        }
    }

    for (name, actual_values) in actual {
        if !expected.contains_key(name) {
            mismatches.push(Mismatch::QueryMismatch {
                parameter: name.clone(),
                expected: String::new(),
                actual: actual_values.join(","),
                mismatch: format!("Unexpected query parameter '{name}' received"),
            });
        }
    }
    mismatches
}

fn split_values(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|value| value.split(','))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

fn content_types_match(expected: &str, actual: &str) -> bool {
    let expected = ContentType::parse(expected);
    let actual = ContentType::parse(actual);
    expected.essence() == actual.essence()
        && expected
            .params
            .iter()
            .all(|(name, value)| actual.param(name).is_some_and(|v| v.eq_ignore_ascii_case(value)))
}

/// Compare headers.
///
/// Header names are case-insensitive and only expected headers are checked.
/// Values are split on commas before comparison; `Content-Type` compares the
/// media type and the expected parameters.
#[must_use]
pub fn match_headers(expected: &Headers, actual: &Headers, rules: &MatchingRules) -> Vec<Mismatch> {
    let category = rules.category(Category::Header);
    let mut mismatches = Vec::new();

    for (name, expected_values) in expected {
        let Some(actual_values) = find_header(actual, name) else {
            mismatches.push(Mismatch::HeaderMismatch {
                key: name.clone(),
                expected: expected_values.join(", "),
                actual: String::new(),
                mismatch: format!("Expected a header '{name}' but was missing"),
            });
            continue;
        };
        let expected_joined = expected_values.join(", ");
        let actual_joined = actual_values.join(", ");

        let rule = category.and_then(|c| c.for_name_ignore_case(name));
        let result = if let Some(rule) = rule {
            match_rules_str(rule, &expected_joined, &actual_joined).map_err(|failures| failures.join(", "))
        } else if name.eq_ignore_ascii_case("content-type") {
            if content_types_match(&expected_joined, &actual_joined) {
                Ok(())
            } else {
                Err(format!(
                    "Expected header '{name}' to have value '{expected_joined}' but was '{actual_joined}'"
                ))
            }
        } else if split_values(expected_values) == split_values(actual_values) {
            Ok(())
        } else {
            Err(format!(
                "Expected header '{name}' to have value '{expected_joined}' but was '{actual_joined}'"
            ))
        };

        if let Err(mismatch) = result {
            mismatches.push(Mismatch::HeaderMismatch {
                key: name.clone(),
                expected: expected_joined,
                actual: actual_joined,
                mismatch,
            });
        }
    }
    mismatches
}
