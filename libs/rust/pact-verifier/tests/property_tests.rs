//! Property-based tests for verifier configuration.
//!
//! Tests validate:
//! - Custom headers parse from either separator
//! - Provider URLs are built under the base URL
//! - A description filter built from a literal selects that interaction

use pact_models::Pact;
use pact_verifier::{FilterInfo, ProviderInfo, parse_custom_header};
use proptest::prelude::*;
use serde_json::json;
use test_utils::{description_strategy, header_name_strategy, header_value_strategy, path_strategy};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_custom_header_parses(
        name in header_name_strategy(),
        value in header_value_strategy(),
        colon in any::<bool>(),
    ) {
        prop_assume!(!value.contains(':'));
        let raw = if colon { format!("{name}: {value}") } else { format!("{name}={value}") };
        prop_assume!(colon || !value.contains('='));
        let (parsed_name, parsed_value) = parse_custom_header(&raw).unwrap();
        prop_assert_eq!(parsed_name, name);
        prop_assert_eq!(parsed_value, value.trim());
    }

    #[test]
    fn prop_url_for_is_under_base_url(port in 1024u16..65535, path in path_strategy()) {
        let provider = ProviderInfo::new("user-service").with_port(port).with_path("/api/");
        let url = provider.url_for(&path);
        let expected_prefix = format!("http://localhost:{port}/api/");
        prop_assert!(url.starts_with(&expected_prefix));
        prop_assert!(url.ends_with(&path));
    }

    #[test]
    fn prop_literal_description_filter_selects(description in description_strategy()) {
        let pact = Pact::from_json(&json!({
            "consumer": {"name": "web-frontend"},
            "provider": {"name": "user-service"},
            "interactions": [
                {"description": description, "request": {"method": "GET", "path": "/"}, "response": {"status": 200}},
                {"description": "0 unrelated", "request": {"method": "GET", "path": "/"}, "response": {"status": 200}}
            ],
            "metadata": {"pactSpecification": {"version": "3.0.0"}}
        }))
        .unwrap();
        let filter = FilterInfo::default()
            .with_description(&format!("^{}$", regex::escape(&description)))
            .unwrap();
        let selected: Vec<_> = pact.interactions.iter().filter(|i| filter.matches(i)).collect();
        prop_assert_eq!(selected.len(), 1);
        prop_assert_eq!(selected[0].description(), description.as_str());
    }
}
