//! Provider verification against fake providers and brokers.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pact_common::RetryConfig;
use pact_models::ProviderVersion;
use pact_verifier::{
    FilterInfo, HttpAuth, InteractionOutcome, PactSource, ProviderInfo, VerificationOptions, verify_provider,
};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use test_utils::fixtures::{v3_message_pact, v3_pact};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_pact(dir: &TempDir, pact: &Value) -> PathBuf {
    let file = dir.path().join("pact.json");
    std::fs::write(&file, pact.to_string()).unwrap();
    file
}

fn provider(server: &MockServer) -> ProviderInfo {
    ProviderInfo::new("user-service").with_base_url(&server.uri()).unwrap()
}

fn fast_retry() -> RetryConfig {
    RetryConfig::default()
        .with_max_retries(1)
        .with_initial_delay(Duration::from_millis(5))
        .without_jitter()
}

async fn mount_user_endpoints(server: &MockServer, user: Value) {
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(201))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_conforming_provider_passes() {
    let server = MockServer::start().await;
    mount_user_endpoints(&server, json!({"id": 5, "name": "Bob", "roles": ["reader", "writer"]})).await;
    Mock::given(method("POST"))
        .and(path("/_pact/state"))
        .and(body_json(json!({"state": "user exists", "params": {"id": 1}, "action": "setup"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let source = PactSource::File(write_pact(&dir, &v3_pact()));
    let options = VerificationOptions::default().with_state_change_url(format!("{}/_pact/state", server.uri()));

    let report = verify_provider(provider(&server), &[source], FilterInfo::default(), options)
        .await
        .unwrap();
    assert!(report.success(), "{}", report.render());
    assert_eq!(report.pacts[0].interactions.len(), 2);
    assert!(
        report.pacts[0]
            .interactions
            .iter()
            .all(|i| i.outcome == InteractionOutcome::Passed)
    );
}

#[tokio::test]
async fn test_non_conforming_provider_fails() {
    let server = MockServer::start().await;
    mount_user_endpoints(&server, json!({"id": "five", "name": "Bob", "roles": []})).await;

    let dir = tempfile::tempdir().unwrap();
    let source = PactSource::File(write_pact(&dir, &v3_pact()));
    let report = verify_provider(
        provider(&server),
        &[source],
        FilterInfo::default(),
        VerificationOptions::default(),
    )
    .await
    .unwrap();

    assert!(!report.success());
    let InteractionOutcome::Failed(mismatches) = &report.pacts[0].interactions[0].outcome else {
        panic!("expected a failure, got {:?}", report.pacts[0].interactions[0].outcome);
    };
    assert!(mismatches.iter().any(|m| m.mismatch_type() == "BodyMismatch"));
    assert_eq!(report.to_json()["success"], false);
}

#[tokio::test]
async fn test_failed_state_setup_is_an_error() {
    let server = MockServer::start().await;
    mount_user_endpoints(&server, json!({"id": 1, "name": "Mary", "roles": ["admin"]})).await;
    Mock::given(method("POST"))
        .and(path("/_pact/state"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let source = PactSource::File(write_pact(&dir, &v3_pact()));
    let options = VerificationOptions::default().with_state_change_url(format!("{}/_pact/state", server.uri()));
    let report = verify_provider(provider(&server), &[source], FilterInfo::default(), options)
        .await
        .unwrap();

    assert!(matches!(report.pacts[0].interactions[0].outcome, InteractionOutcome::Error(_)));
    assert_eq!(report.pacts[0].interactions[1].outcome, InteractionOutcome::Passed);
}

#[tokio::test]
async fn test_filter_selects_interactions() {
    let server = MockServer::start().await;
    mount_user_endpoints(&server, json!({"id": 1, "name": "Mary", "roles": ["admin"]})).await;

    let dir = tempfile::tempdir().unwrap();
    let source = PactSource::File(write_pact(&dir, &v3_pact()));
    let filter = FilterInfo::default().with_description("create").unwrap();
    let report = verify_provider(provider(&server), &[source], filter, VerificationOptions::default())
        .await
        .unwrap();

    assert_eq!(report.pacts[0].interactions.len(), 1);
    assert_eq!(report.pacts[0].interactions[0].description, "a request to create a user");
}

#[tokio::test]
async fn test_message_provider() {
    let server = MockServer::start().await;
    let metadata = STANDARD.encode(json!({"contentType": "application/json"}).to_string());
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_json(json!({
            "description": "a user created event",
            "providerStates": [{"name": "a user was created"}]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"event": "created", "id": 99}))
                .insert_header("Pact-Message-Metadata", metadata.as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let source = PactSource::File(write_pact(&dir, &v3_message_pact()));
    let report = verify_provider(
        provider(&server),
        &[source],
        FilterInfo::default(),
        VerificationOptions::default(),
    )
    .await
    .unwrap();
    assert!(report.success(), "{}", report.render());
}

#[tokio::test]
async fn test_broker_pacts_are_verified_and_published() {
    let broker = MockServer::start().await;
    let provider_server = MockServer::start().await;
    mount_user_endpoints(&provider_server, json!({"id": 1, "name": "Mary", "roles": ["admin"]})).await;

    let pact_url = format!("{}/pacts/provider/user-service/consumer/web-frontend/latest", broker.uri());
    Mock::given(method("GET"))
        .and(path("/pacts/provider/user-service/latest"))
        .and(header("Authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_links": {"pb:pacts": [{"href": pact_url, "name": "web-frontend"}]}
        })))
        .mount(&broker)
        .await;

    let mut pact = v3_pact();
    pact["_links"] = json!({
        "pb:publish-verification-results": {"href": format!("{}/results", broker.uri())}
    });
    Mock::given(method("GET"))
        .and(path("/pacts/provider/user-service/consumer/web-frontend/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pact))
        .mount(&broker)
        .await;
    Mock::given(method("POST"))
        .and(path("/results"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&broker)
        .await;
    Mock::given(method("PUT"))
        .and(path("/pacticipants/user-service/versions/1.0.0/tags/main"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&broker)
        .await;

    let source = PactSource::Broker {
        url: broker.uri(),
        provider_name: "user-service".to_string(),
        auth: Some(HttpAuth::Token("s3cret".to_string())),
        tags: Vec::new(),
    };
    let options = VerificationOptions::default()
        .with_publish(ProviderVersion::new("1.0.0").with_tags(vec!["main".to_string()]));
    let report = verify_provider(provider(&provider_server), &[source], FilterInfo::default(), options)
        .await
        .unwrap();

    assert!(report.success(), "{}", report.render());
    assert_eq!(report.pacts[0].origin, pact_url);
}

#[tokio::test]
async fn test_unavailable_broker_is_retried_and_reported() {
    let broker = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pacts/provider/user-service/latest"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&broker)
        .await;

    let source = PactSource::Broker {
        url: broker.uri(),
        provider_name: "user-service".to_string(),
        auth: None,
        tags: Vec::new(),
    };
    let options = VerificationOptions::default().with_retry(fast_retry());
    let report = verify_provider(
        ProviderInfo::new("user-service"),
        &[source],
        FilterInfo::default(),
        options,
    )
    .await
    .unwrap();

    assert!(!report.success());
    assert!(report.pacts.is_empty());
    assert_eq!(report.errors.len(), 1);
}

#[tokio::test]
async fn test_missing_pact_file_is_reported() {
    let report = verify_provider(
        ProviderInfo::new("user-service"),
        &[PactSource::File(PathBuf::from("/definitely/not/here.json"))],
        FilterInfo::default(),
        VerificationOptions::default(),
    )
    .await
    .unwrap();
    assert!(!report.success());
    assert!(report.render().contains("Failed to load pacts"));
}
