//! Applying individual matching rules to values.

use crate::time_format::{is_valid_date, is_valid_time, is_valid_timestamp};
use pact_models::matchers::matches_regex;
use pact_models::{MatchingRule, RuleList, RuleLogic};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn semver_regex() -> Option<&'static Regex> {
    static SEMVER: OnceLock<Option<Regex>> = OnceLock::new();
    SEMVER
        .get_or_init(|| Regex::new(r"^\d+\.\d+\.\d+(-[0-9A-Za-z.-]+)?(\+[0-9A-Za-z.-]+)?$").ok())
        .as_ref()
}

/// Name of a JSON value's type, as used in mismatch descriptions.
#[must_use]
pub const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "Null",
        Value::Bool(_) => "Boolean",
        Value::Number(_) => "Number",
        Value::String(_) => "String",
        Value::Array(_) => "Array",
        Value::Object(_) => "Object",
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{s}'"),
        other => other.to_string(),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn same_type(expected: &Value, actual: &Value) -> bool {
    std::mem::discriminant(expected) == std::mem::discriminant(actual)
}

fn check_length(actual: &Value, min: Option<usize>, max: Option<usize>) -> Result<(), String> {
    let Value::Array(items) = actual else {
        return Ok(());
    };
    if let Some(min) = min.filter(|min| items.len() < *min) {
        return Err(format!(
            "Expected an array with at least {min} element(s) but received {} element(s)",
            items.len()
        ));
    }
    if let Some(max) = max.filter(|max| items.len() > *max) {
        return Err(format!(
            "Expected an array with at most {max} element(s) but received {} element(s)",
            items.len()
        ));
    }
    Ok(())
}

fn check_type(expected: &Value, actual: &Value) -> Result<(), String> {
    if same_type(expected, actual) {
        Ok(())
    } else {
        Err(format!(
            "Expected {} ({}) to be the same type as {} ({})",
            display(actual),
            type_name(actual),
            display(expected),
            type_name(expected)
        ))
    }
}

fn check_string<F>(actual: &Value, what: &str, check: F) -> Result<(), String>
where
    F: FnOnce(&str) -> bool,
{
    match scalar_string(actual) {
        Some(s) if check(&s) => Ok(()),
        _ => Err(format!("Expected {} to {what}", display(actual))),
    }
}

/// Apply one rule to a JSON value.
///
/// # Errors
///
/// Returns a description of the mismatch.
pub fn match_rule(rule: &MatchingRule, expected: &Value, actual: &Value) -> Result<(), String> {
    match rule {
        MatchingRule::Equality => {
            if expected == actual {
                Ok(())
            } else {
                Err(format!("Expected {} to be equal to {}", display(actual), display(expected)))
            }
        }
        MatchingRule::Regex(regex) => check_string(actual, &format!("match '{regex}'"), |s| {
            matches_regex(regex, s).unwrap_or(false)
        }),
        MatchingRule::Type | MatchingRule::Values => check_type(expected, actual),
        MatchingRule::MinType(min) => {
            check_type(expected, actual)?;
            check_length(actual, Some(*min), None)
        }
        MatchingRule::MaxType(max) => {
            check_type(expected, actual)?;
            check_length(actual, None, Some(*max))
        }
        MatchingRule::MinMaxType(min, max) => {
            check_type(expected, actual)?;
            check_length(actual, Some(*min), Some(*max))
        }
        MatchingRule::Include(value) => {
            check_string(actual, &format!("include '{value}'"), |s| s.contains(value.as_str()))
        }
        MatchingRule::Integer => match actual {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(()),
            _ => Err(format!("Expected {} to be an integer", display(actual))),
        },
        MatchingRule::Decimal => match actual {
            Value::Number(n) if n.is_f64() => Ok(()),
            _ => Err(format!("Expected {} to be a decimal number", display(actual))),
        },
        MatchingRule::Number => match actual {
            Value::Number(_) => Ok(()),
            _ => Err(format!("Expected {} to be a number", display(actual))),
        },
        MatchingRule::Boolean => match actual {
            Value::Bool(_) => Ok(()),
            _ => Err(format!("Expected {} to be a boolean", display(actual))),
        },
        MatchingRule::Null => match actual {
            Value::Null => Ok(()),
            _ => Err(format!("Expected {} to be null", display(actual))),
        },
        MatchingRule::Date(format) => match actual {
            Value::String(s) if is_valid_date(s, format) => Ok(()),
            _ => Err(format!("Expected {} to be a date in format '{format}'", display(actual))),
        },
        MatchingRule::Time(format) => match actual {
            Value::String(s) if is_valid_time(s, format) => Ok(()),
            _ => Err(format!("Expected {} to be a time in format '{format}'", display(actual))),
        },
        MatchingRule::Timestamp(format) => match actual {
            Value::String(s) if is_valid_timestamp(s, format) => Ok(()),
            _ => Err(format!(
                "Expected {} to be a timestamp in format '{format}'",
                display(actual)
            )),
        },
        MatchingRule::Semver => match actual {
            Value::String(s) if semver_regex().is_some_and(|re| re.is_match(s)) => Ok(()),
            _ => Err(format!("Expected {} to be a semantic version", display(actual))),
        },
        MatchingRule::ContentType(_) => Ok(()),
    }
}

/// Apply one rule to a string value, such as a header or a query parameter.
///
/// # Errors
///
/// Returns a description of the mismatch.
pub fn match_rule_str(rule: &MatchingRule, expected: &str, actual: &str) -> Result<(), String> {
    match rule {
        MatchingRule::Equality => {
            if expected == actual {
                Ok(())
            } else {
                Err(format!("Expected '{actual}' to be equal to '{expected}'"))
            }
        }
        MatchingRule::Integer => actual
            .parse::<i64>()
            .map(|_| ())
            .map_err(|_| format!("Expected '{actual}' to be an integer")),
        MatchingRule::Decimal => {
            if actual.contains('.') && actual.parse::<f64>().is_ok() {
                Ok(())
            } else {
                Err(format!("Expected '{actual}' to be a decimal number"))
            }
        }
        MatchingRule::Number => actual
            .parse::<f64>()
            .map(|_| ())
            .map_err(|_| format!("Expected '{actual}' to be a number")),
        MatchingRule::Boolean => {
            if actual == "true" || actual == "false" {
                Ok(())
            } else {
                Err(format!("Expected '{actual}' to be a boolean"))
            }
        }
        MatchingRule::Null => {
            if actual.is_empty() {
                Ok(())
            } else {
                Err(format!("Expected '{actual}' to be empty"))
            }
        }
        MatchingRule::Type
        | MatchingRule::MinType(_)
        | MatchingRule::MaxType(_)
        | MatchingRule::MinMaxType(..)
        | MatchingRule::Values
        | MatchingRule::ContentType(_) => Ok(()),
        other => match_rule(
            other,
            &Value::String(expected.to_string()),
            &Value::String(actual.to_string()),
        ),
    }
}

/// Apply a rule list to a JSON value, honouring the AND/OR combination.
///
/// # Errors
///
/// Returns the descriptions of the failing rules.
pub fn match_rules(rules: &RuleList, expected: &Value, actual: &Value) -> Result<(), Vec<String>> {
    combine(rules, |rule| match_rule(rule, expected, actual))
}

/// Apply a rule list to a string value.
///
/// # Errors
///
/// Returns the descriptions of the failing rules.
pub fn match_rules_str(rules: &RuleList, expected: &str, actual: &str) -> Result<(), Vec<String>> {
    combine(rules, |rule| match_rule_str(rule, expected, actual))
}

fn combine<F>(rules: &RuleList, check: F) -> Result<(), Vec<String>>
where
    F: Fn(&MatchingRule) -> Result<(), String>,
{
    let failures: Vec<String> = rules.rules.iter().filter_map(|r| check(r).err()).collect();
    let ok = match rules.logic {
        RuleLogic::And => failures.is_empty(),
        RuleLogic::Or => failures.len() < rules.rules.len() || rules.rules.is_empty(),
    };
    if ok { Ok(()) } else { Err(failures) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_rules() {
        assert!(match_rule(&MatchingRule::Type, &json!(1), &json!(2.5)).is_ok());
        assert!(match_rule(&MatchingRule::Type, &json!("a"), &json!("b")).is_ok());
        assert!(match_rule(&MatchingRule::Type, &json!("a"), &json!(1)).is_err());
        assert!(match_rule(&MatchingRule::MinType(2), &json!([1]), &json!([1])).is_err());
        assert!(match_rule(&MatchingRule::MinType(2), &json!([1]), &json!([1, 2])).is_ok());
        assert!(match_rule(&MatchingRule::MaxType(1), &json!([1]), &json!([1, 2])).is_err());
        assert!(match_rule(&MatchingRule::MinMaxType(1, 2), &json!([1]), &json!([])).is_err());
    }

    #[test]
    fn test_value_rules() {
        assert!(match_rule(&MatchingRule::Integer, &json!(1), &json!(42)).is_ok());
        assert!(match_rule(&MatchingRule::Integer, &json!(1), &json!(4.2)).is_err());
        assert!(match_rule(&MatchingRule::Decimal, &json!(1.0), &json!(4.2)).is_ok());
        assert!(match_rule(&MatchingRule::Decimal, &json!(1.0), &json!(4)).is_err());
        assert!(match_rule(&MatchingRule::Number, &json!(1), &json!(4.2)).is_ok());
        assert!(match_rule(&MatchingRule::Boolean, &json!(true), &json!("true")).is_err());
        assert!(match_rule(&MatchingRule::Null, &json!(null), &json!(null)).is_ok());
        assert!(match_rule(&MatchingRule::Include("ar".to_string()), &json!(""), &json!("Mary")).is_ok());
        assert!(match_rule(&MatchingRule::Semver, &json!(""), &json!("1.2.3-beta.1")).is_ok());
        assert!(match_rule(&MatchingRule::Semver, &json!(""), &json!("1.2")).is_err());
    }

    #[test]
    fn test_regex_rule_uses_string_form() {
        let rule = MatchingRule::Regex(r"\d+".to_string());
        assert!(match_rule(&rule, &json!("1"), &json!("123")).is_ok());
        assert!(match_rule(&rule, &json!("1"), &json!(123)).is_ok());
        assert!(match_rule(&rule, &json!("1"), &json!("12a")).is_err());
        assert!(match_rule(&rule, &json!("1"), &json!(null)).is_err());
    }

    #[test]
    fn test_date_rules() {
        let rule = MatchingRule::Date("yyyy-MM-dd".to_string());
        assert!(match_rule(&rule, &json!(""), &json!("2020-01-31")).is_ok());
        assert!(match_rule(&rule, &json!(""), &json!("2020-31-01")).is_err());
    }

    #[test]
    fn test_string_rules() {
        assert!(match_rule_str(&MatchingRule::Integer, "1", "42").is_ok());
        assert!(match_rule_str(&MatchingRule::Integer, "1", "x").is_err());
        assert!(match_rule_str(&MatchingRule::Type, "1", "anything").is_ok());
        assert!(match_rule_str(&MatchingRule::Regex("v\\d".to_string()), "v1", "v2").is_ok());
    }

    #[test]
    fn test_or_combination() {
        let rules = RuleList {
            rules: vec![MatchingRule::Integer, MatchingRule::Null],
            logic: RuleLogic::Or,
        };
        assert!(match_rules(&rules, &json!(1), &json!(null)).is_ok());
        assert!(match_rules(&rules, &json!(1), &json!(3)).is_ok());
        assert_eq!(match_rules(&rules, &json!(1), &json!("x")).unwrap_err().len(), 2);

        let and = RuleList {
            rules: vec![MatchingRule::Integer, MatchingRule::Null],
            logic: RuleLogic::And,
        };
        assert!(match_rules(&and, &json!(1), &json!(3)).is_err());
    }
}
