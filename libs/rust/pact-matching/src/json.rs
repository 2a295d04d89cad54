//! Structural comparison of JSON documents under matching rules.

use crate::mismatch::Mismatch;
use crate::rules::{match_rules, type_name};
use pact_models::{MatchingRule, MatchingRuleCategory, RuleList};
use serde_json::{Map, Value};

/// Options for one comparison.
#[derive(Debug, Clone, Copy)]
pub struct JsonMatchContext<'a> {
    /// Body rules keyed by path expression
    pub rules: Option<&'a MatchingRuleCategory>,
    /// Whether keys absent from the expected object are tolerated
    pub allow_unexpected_keys: bool,
}

impl<'a> JsonMatchContext<'a> {
    /// A context for request bodies, where unexpected keys are mismatches.
    #[must_use]
    pub const fn strict(rules: Option<&'a MatchingRuleCategory>) -> Self {
        Self {
            rules,
            allow_unexpected_keys: false,
        }
    }

    /// A context for response bodies and messages.
    #[must_use]
    pub const fn lenient(rules: Option<&'a MatchingRuleCategory>) -> Self {
        Self {
            rules,
            allow_unexpected_keys: true,
        }
    }

    /// Rules that apply at a location.
    ///
    /// Rules defined at the location apply as they are. Rules inherited from
    /// an ancestor only carry their type comparison down.
    fn rules_for(&self, location: &[String]) -> Option<RuleList> {
        let category = self.rules?;
        let best = category.select_best(location)?;
        if category.exact(location).is_some_and(|exact| exact == best) {
            return Some(best.clone());
        }
        let cascades = best
            .rules
            .iter()
            .any(|r| r.is_type_matcher() || *r == MatchingRule::Values);
        cascades.then(|| RuleList::new(MatchingRule::Type))
    }
}

fn path_string(location: &[String]) -> String {
    let mut out = String::from("$");
    for segment in location.iter().skip(1) {
        if segment.parse::<usize>().is_ok() {
            out.push_str(&format!("[{segment}]"));
        } else if segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            out.push('.');
            out.push_str(segment);
        } else {
            out.push_str(&format!("['{segment}']"));
        }
    }
    out
}

fn body_mismatch(location: &[String], expected: &Value, actual: &Value, mismatch: String) -> Mismatch {
    Mismatch::BodyMismatch {
        path: path_string(location),
        expected: expected.clone(),
        actual: actual.clone(),
        mismatch,
    }
}

fn child(location: &[String], segment: impl Into<String>) -> Vec<String> {
    let mut next = location.to_vec();
    next.push(segment.into());
    next
}

/// Compare two JSON documents, returning every mismatch found.
#[must_use]
pub fn compare_json(expected: &Value, actual: &Value, context: &JsonMatchContext<'_>) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();
    compare(&["$".to_string()], expected, actual, context, &mut mismatches);
    mismatches
}

fn compare(
    location: &[String],
    expected: &Value,
    actual: &Value,
    context: &JsonMatchContext<'_>,
    out: &mut Vec<Mismatch>,
) {
    if let Some(rules) = context.rules_for(location) {
        if let Err(failures) = match_rules(&rules, expected, actual) {
            out.extend(
                failures
                    .into_iter()
                    .map(|failure| body_mismatch(location, expected, actual, failure)),
            );
            return;
        }
        let descends = rules
            .rules
            .iter()
            .any(|r| r.is_type_matcher() || *r == MatchingRule::Values);
        if !descends {
            return;
        }
        let values_rule = rules.rules.contains(&MatchingRule::Values);
        match (expected, actual) {
            (Value::Array(expected_items), Value::Array(actual_items)) => {
                if let Some(template) = expected_items.first() {
                    for (index, item) in actual_items.iter().enumerate() {
                        compare(&child(location, index.to_string()), template, item, context, out);
                    }
                }
            }
            (Value::Object(expected_map), Value::Object(actual_map)) if values_rule => {
                compare_values(location, expected_map, actual_map, context, out);
            }
            (Value::Object(expected_map), Value::Object(actual_map)) => {
                compare_object(location, expected_map, actual_map, context, out);
            }
            _ => {}
        }
        return;
    }

    match (expected, actual) {
        (Value::Object(expected_map), Value::Object(actual_map)) => {
            compare_object(location, expected_map, actual_map, context, out);
        }
        (Value::Array(expected_items), Value::Array(actual_items)) => {
            if expected_items.len() != actual_items.len() {
                out.push(body_mismatch(
                    location,
                    expected,
                    actual,
                    format!(
                        "Expected an array with {} element(s) but received {} element(s)",
                        expected_items.len(),
                        actual_items.len()
                    ),
                ));
            }
            for (index, (e, a)) in expected_items.iter().zip(actual_items).enumerate() {
                compare(&child(location, index.to_string()), e, a, context, out);
            }
        }
        _ if expected == actual => {}
        _ if std::mem::discriminant(expected) != std::mem::discriminant(actual) => {
            out.push(body_mismatch(
                location,
                expected,
                actual,
                format!(
                    "Type mismatch: Expected {} ({}) but received {} ({})",
                    expected,
                    type_name(expected),
                    actual,
                    type_name(actual)
                ),
            ));
        }
        _ => out.push(body_mismatch(
            location,
            expected,
            actual,
            format!("Expected {expected} but received {actual}"),
        )),
    }
}

fn compare_object(
    location: &[String],
    expected: &Map<String, Value>,
    actual: &Map<String, Value>,
    context: &JsonMatchContext<'_>,
    out: &mut Vec<Mismatch>,
) {
    for (key, expected_value) in expected {
        match actual.get(key) {
            Some(actual_value) => compare(&child(location, key.as_str()), expected_value, actual_value, context, out),
            None => out.push(body_mismatch(
                &child(location, key.as_str()),
                expected_value,
                &Value::Null,
                format!("Expected key '{key}' but was missing"),
            )),
        }
    }
    if !context.allow_unexpected_keys {
        for (key, actual_value) in actual {
            if !expected.contains_key(key) {
                out.push(body_mismatch(
                    &child(location, key.as_str()),
                    &Value::Null,
                    actual_value,
                    format!("Unexpected key '{key}' received"),
                ));
            }
        }
    }
}

fn compare_values(
    location: &[String],
    expected: &Map<String, Value>,
    actual: &Map<String, Value>,
    context: &JsonMatchContext<'_>,
    out: &mut Vec<Mismatch>,
) {
    let Some(first) = expected.values().next() else {
        return;
    };
    for (key, actual_value) in actual {
        let template = expected.get(key).unwrap_or(first);
        compare(&child(location, key.as_str()), template, actual_value, context, out);
    }
}
