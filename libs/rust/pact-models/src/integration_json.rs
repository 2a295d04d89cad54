//! Integration JSON: values annotated with `pact:matcher:type`.
//!
//! Consumer DSL values may embed matcher definitions. Processing a value
//! strips the annotations, returning the example value, and records a
//! matching rule for every matcher found at the path where it was found.

use crate::http::value_to_string;
use crate::matchers::Matcher;
use crate::matchingrules::{MatchingRule, MatchingRuleCategory};
use crate::path::DocPath;
use pact_common::PactResult;
use serde_json::{Map, Value};

const MATCHER_TYPE: &str = "pact:matcher:type";

fn is_matcher(obj: &Map<String, Value>) -> bool {
    obj.contains_key(MATCHER_TYPE)
}

/// Process a JSON body, recording rules in `rules` keyed by path expression.
///
/// Values under a type-like matcher that are arrays have their element
/// rules recorded under `[*]`, so one example element describes them all.
///
/// # Errors
///
/// Returns `PactError::InvalidInput` for unknown or malformed matchers.
pub fn process_json(value: &Value, rules: &mut MatchingRuleCategory, path: &DocPath) -> PactResult<Value> {
    if let Some(matcher) = Matcher::from_generated(value)? {
        return process_json(&matcher.to_integration_json(), rules, path);
    }

    match value {
        Value::Object(obj) if is_matcher(obj) => {
            let rule = MatchingRule::from_integration_json(obj)?;
            let type_like = rule.is_type_matcher();
            rules.add_rule(path.to_string(), rule);
            let example = obj.get("value").cloned().unwrap_or(Value::Null);
            match example {
                Value::Array(items) if type_like => items
                    .iter()
                    .map(|item| process_json(item, rules, &path.join_star_index()))
                    .collect::<PactResult<Vec<_>>>()
                    .map(Value::Array),
                other => process_json(&other, rules, path),
            }
        }
        Value::Object(obj) => obj
            .iter()
            .map(|(key, item)| Ok((key.clone(), process_json(item, rules, &path.join(key.as_str()))?)))
            .collect::<PactResult<Map<_, _>>>()
            .map(Value::Object),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| process_json(item, rules, &path.join_index(index)))
            .collect::<PactResult<Vec<_>>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

/// Process a raw string that may hold integration JSON for a single value,
/// such as a path, a status or one header value.
///
/// Strings that are not JSON objects with a matcher are returned as is.
///
/// # Errors
///
/// Returns `PactError::InvalidInput` for malformed matchers.
pub fn process_scalar(raw: &str) -> PactResult<(String, Option<MatchingRule>)> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(obj)) if is_matcher(&obj) => {
            let rule = MatchingRule::from_integration_json(&obj)?;
            let example = obj.get("value").map(value_to_string).unwrap_or_default();
            Ok((example, Some(rule)))
        }
        Ok(value) => match Matcher::from_generated(&value)? {
            Some(matcher) => process_scalar(&matcher.to_integration_json().to_string()),
            None => Ok((raw.to_string(), None)),
        },
        Err(_) => Ok((raw.to_string(), None)),
    }
}

/// Process a header or query parameter value.
///
/// Besides plain strings and single matchers, `{"value": [..]}` expands to
/// several values, each of which may be a matcher. Rules are recorded under
/// `name`.
///
/// # Errors
///
/// Returns `PactError::InvalidInput` for malformed matchers.
pub fn process_multi_value(
    name: &str,
    raw: &str,
    rules: &mut MatchingRuleCategory,
) -> PactResult<Vec<String>> {
    let multi = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(obj)) if !is_matcher(&obj) => match obj.get("value") {
            Some(Value::Array(items)) => Some(items.clone()),
            _ => None,
        },
        _ => None,
    };
    if let Some(items) = multi {
        let mut values = Vec::with_capacity(items.len());
        for item in &items {
            let raw_item = match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            values.extend(process_multi_value(name, &raw_item, rules)?);
        }
        return Ok(values);
    }

    let (example, rule) = process_scalar(raw)?;
    if let Some(rule) = rule {
        rules.add_rule(name, rule);
    }
    Ok(vec![example])
}
