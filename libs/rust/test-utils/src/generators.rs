//! Shared proptest generators.
//!
//! These produce the raw building blocks of pacts (names, HTTP parts, JSON
//! documents) so each crate can assemble its own domain types from them.

use proptest::prelude::*;
use serde_json::{Map, Value};

/// Generate consumer and provider names.
pub fn participant_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("web-frontend".to_string()),
        Just("billing-service".to_string()),
        Just("user-service".to_string()),
        "[a-z][a-z0-9-]{2,20}",
    ]
}

/// Generate interaction descriptions.
pub fn description_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z ]{4,40}"
}

/// Generate provider state names.
pub fn provider_state_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9 ]{2,30}"
}

/// Generate HTTP methods.
pub fn http_method_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("GET".to_string()),
        Just("POST".to_string()),
        Just("PUT".to_string()),
        Just("DELETE".to_string()),
        Just("PATCH".to_string()),
    ]
}

/// Generate request paths.
pub fn path_strategy() -> impl Strategy<Value = String> {
    "/[a-z][a-z0-9/-]{0,30}"
}

/// Generate header names.
pub fn header_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Accept".to_string()),
        Just("X-Request-Id".to_string()),
        Just("Authorization".to_string()),
        "X-[A-Z][a-z]{2,10}",
    ]
}

/// Generate header values without commas, so they never split.
pub fn header_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9 ;=/.-]{0,20}"
}

/// Generate query parameter names.
pub fn query_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z_]{0,10}"
}

/// Generate query parameter values, including characters that need encoding.
pub fn query_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 &=+%/]{0,15}"
}

/// Generate HTTP status codes.
pub fn http_status_code_strategy() -> impl Strategy<Value = u16> {
    prop_oneof![
        Just(200u16),
        Just(201u16),
        Just(204u16),
        Just(400u16),
        Just(401u16),
        Just(403u16),
        Just(404u16),
        Just(409u16),
        Just(500u16),
        Just(503u16),
    ]
}

/// Generate spellings of supported specification versions.
pub fn specification_version_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("1.0.0".to_string()),
        Just("1.1".to_string()),
        Just("V1_1".to_string()),
        Just("2.0.0".to_string()),
        Just("v2".to_string()),
        Just("3.0.0".to_string()),
        Just("V3".to_string()),
        Just("4.0".to_string()),
        Just("v4".to_string()),
    ]
}

/// Generate log levels.
pub fn log_level_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("trace".to_string()),
        Just("debug".to_string()),
        Just("info".to_string()),
        Just("warn".to_string()),
        Just("error".to_string()),
    ]
}

/// Generate JSON scalars.
pub fn json_leaf_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-10_000i64..10_000).prop_map(Value::from),
        (-1000.0f64..1000.0).prop_map(|f| Value::from((f * 100.0).round() / 100.0)),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
    ]
}

/// Generate JSON documents up to a few levels deep.
pub fn json_value_strategy() -> impl Strategy<Value = Value> {
    json_leaf_strategy().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..4)
                .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Generate JSON objects, the usual shape of a body.
pub fn json_object_strategy() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-z]{1,8}", json_value_strategy(), 1..5)
        .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn test_path_format() {
        let mut runner = TestRunner::default();
        for _ in 0..10 {
            let value = path_strategy().new_tree(&mut runner).unwrap().current();
            assert!(value.starts_with('/'));
            assert!(!value.contains(' '));
        }
    }

    #[test]
    fn test_header_values_have_no_commas() {
        let mut runner = TestRunner::default();
        for _ in 0..20 {
            let value = header_value_strategy().new_tree(&mut runner).unwrap().current();
            assert!(!value.contains(','));
            assert!(!value.is_empty());
        }
    }

    #[test]
    fn test_json_objects_are_objects() {
        let mut runner = TestRunner::default();
        for _ in 0..10 {
            let value = json_object_strategy().new_tree(&mut runner).unwrap().current();
            assert!(value.is_object());
        }
    }
}
