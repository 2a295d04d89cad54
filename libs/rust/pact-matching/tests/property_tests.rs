//! Property-based tests for the matching engine.
//!
//! Tests validate:
//! - Any document matches itself without rules
//! - Values produced from `Like` match any value of the same shape
//! - Values produced from `EachLike` match arrays of at least `min` elements
//! - Requests and responses match themselves

use pact_matching::{JsonMatchContext, compare_json, match_request, match_response};
use pact_models::http::add_header;
use pact_models::integration_json::process_json;
use pact_models::{DocPath, EachLike, HttpRequest, HttpResponse, Like, MatchingRuleCategory, OptionalBody};
use proptest::prelude::*;
use serde_json::{Map, Value};
use test_utils::{
    header_name_strategy, header_value_strategy, http_method_strategy, http_status_code_strategy,
    json_leaf_strategy, json_object_strategy, json_value_strategy, path_strategy,
};

fn flat_object_strategy() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-z]{1,8}", json_leaf_strategy(), 1..6)
        .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>()))
}

/// Change every leaf to another value of the same JSON type.
fn retype(value: &Value) -> Value {
    match value {
        Value::Bool(b) => Value::Bool(!b),
        Value::Number(n) => n.as_i64().map_or_else(
            || Value::from(n.as_f64().unwrap_or_default() + 1.5),
            |i| Value::from(i + 1),
        ),
        Value::String(s) => Value::String(format!("{s}x")),
        Value::Array(items) => Value::Array(items.iter().map(retype).collect()),
        Value::Object(obj) => Value::Object(obj.iter().map(|(k, v)| (k.clone(), retype(v))).collect()),
        Value::Null => Value::Null,
    }
}

fn reify(value: &Value) -> (Value, MatchingRuleCategory) {
    let mut rules = MatchingRuleCategory::default();
    let example = process_json(value, &mut rules, &DocPath::root()).unwrap();
    (example, rules)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_document_matches_itself(value in json_value_strategy()) {
        let context = JsonMatchContext::strict(None);
        prop_assert!(compare_json(&value, &value, &context).is_empty());
    }

    #[test]
    fn prop_changed_leaf_is_reported(value in json_object_strategy()) {
        let changed = retype(&value);
        prop_assume!(changed != value);
        let context = JsonMatchContext::strict(None);
        prop_assert!(!compare_json(&value, &changed, &context).is_empty());
    }

    #[test]
    fn prop_like_matches_same_shape(value in flat_object_strategy()) {
        let (example, rules) = reify(&Like::new(value.clone()).generate());
        prop_assert_eq!(&example, &value);
        let context = JsonMatchContext::strict(Some(&rules));
        prop_assert!(compare_json(&example, &retype(&value), &context).is_empty());
    }

    #[test]
    fn prop_each_like_honours_minimum(
        value in flat_object_strategy(),
        min in 1usize..4,
        extra in 0usize..3,
    ) {
        let (example, rules) = reify(&EachLike::with_minimum(value.clone(), min).unwrap().generate());
        let context = JsonMatchContext::lenient(Some(&rules));

        let enough = Value::Array(vec![retype(&value); min + extra]);
        prop_assert!(compare_json(&example, &enough, &context).is_empty());

        let too_few = Value::Array(vec![value; min - 1]);
        prop_assert!(!compare_json(&example, &too_few, &context).is_empty());
    }

    #[test]
    fn prop_request_matches_itself(
        method in http_method_strategy(),
        path in path_strategy(),
        header in (header_name_strategy(), header_value_strategy()),
        body in json_object_strategy(),
    ) {
        let mut request = HttpRequest {
            method,
            path,
            body: OptionalBody::json(&body),
            ..HttpRequest::default()
        };
        add_header(&mut request.headers, &header.0, header.1);
        prop_assert!(match_request(&request, &request.clone()).is_empty());
    }

    #[test]
    fn prop_response_status_mismatch(status in http_status_code_strategy(), other in http_status_code_strategy()) {
        let expected = HttpResponse { status, ..HttpResponse::default() };
        let actual = HttpResponse { status: other, ..HttpResponse::default() };
        prop_assert_eq!(match_response(&expected, &actual).is_empty(), status == other);
    }
}
