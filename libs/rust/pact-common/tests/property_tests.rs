//! Property-based tests for the shared plumbing.
//!
//! Tests validate:
//! - Backoff delays grow monotonically and respect the cap
//! - Retry decisions depend only on attempt count and error class
//! - Log level names parse in any case

use pact_common::{PactError, RetryConfig, RetryPolicy, TracingConfig};
use proptest::prelude::*;
use std::time::Duration;
use test_utils::log_level_strategy;

fn retryable_error_strategy() -> impl Strategy<Value = PactError> {
    prop_oneof![
        "[a-z ]{1,20}".prop_map(PactError::Unavailable),
        "[a-z ]{1,20}".prop_map(PactError::Timeout),
    ]
}

fn permanent_error_strategy() -> impl Strategy<Value = PactError> {
    prop_oneof![
        "[a-z ]{1,20}".prop_map(PactError::NotFound),
        "[a-z ]{1,20}".prop_map(PactError::InvalidInput),
        "[a-z ]{1,20}".prop_map(PactError::MergeConflict),
        "[a-z ]{1,20}".prop_map(PactError::Mismatch),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Delays without jitter never shrink between attempts and never exceed the cap.
    #[test]
    fn prop_backoff_monotonic_and_capped(
        initial_ms in 1u64..500,
        max_ms in 500u64..5000,
        attempt in 0u32..10,
    ) {
        let policy = RetryPolicy::new(
            RetryConfig::default()
                .without_jitter()
                .with_initial_delay(Duration::from_millis(initial_ms))
                .with_max_delay(Duration::from_millis(max_ms)),
        );

        let current = policy.delay_for_attempt(attempt);
        let next = policy.delay_for_attempt(attempt + 1);
        prop_assert!(next >= current);
        prop_assert!(next <= Duration::from_millis(max_ms));
    }

    /// Jitter adds at most a quarter of the base delay.
    #[test]
    fn prop_jitter_is_bounded(attempt in 0u32..5) {
        let base = RetryPolicy::new(RetryConfig::default().without_jitter()).delay_for_attempt(attempt);
        let jittered = RetryPolicy::new(RetryConfig::default()).delay_for_attempt(attempt);
        prop_assert!(jittered >= base);
        prop_assert!(jittered.as_millis() <= base.as_millis() * 5 / 4 + 1);
    }

    #[test]
    fn prop_retryable_errors_retry_until_limit(
        error in retryable_error_strategy(),
        max_retries in 0u32..6,
        attempt in 0u32..10,
    ) {
        let policy = RetryPolicy::new(RetryConfig::default().with_max_retries(max_retries));
        prop_assert_eq!(policy.should_retry(&error, attempt), attempt < max_retries);
    }

    #[test]
    fn prop_permanent_errors_never_retry(
        error in permanent_error_strategy(),
        attempt in 0u32..10,
    ) {
        let policy = RetryPolicy::with_defaults();
        prop_assert!(!policy.should_retry(&error, attempt));
    }

    #[test]
    fn prop_log_levels_parse_in_any_case(level in log_level_strategy()) {
        let lower = TracingConfig::for_component("pact-verifier").with_level(&level).unwrap();
        let upper = TracingConfig::for_component("pact-verifier")
            .with_level(&format!(" {} ", level.to_ascii_uppercase()))
            .unwrap();
        prop_assert_eq!(lower.level, upper.level);
        prop_assert_eq!(lower.level.to_string().to_ascii_lowercase(), level);
    }
}
