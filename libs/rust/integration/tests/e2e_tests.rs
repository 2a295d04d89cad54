//! End-to-end flow: a consumer records a pact against the mock server and
//! the verifier replays it against a live provider.

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use pact_common::RetryPolicy;
use pact_consumer::prelude::*;
use pact_models::Pact as PactDocument;
use pact_verifier::{
    FilterInfo, InteractionOutcome, PactLoader, PactSource, ProviderInfo, VerificationOptions, verify_provider,
};
use parking_lot::Mutex;
use proptest::prelude::*;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use test_utils::{description_strategy, participant_name_strategy};

/// Provider behaviour served by [`spawn_provider`].
#[derive(Clone)]
struct Provider {
    broken: bool,
    state_calls: Arc<Mutex<Vec<Value>>>,
}

async fn get_user(State(provider): State<Provider>, AxumPath(id): AxumPath<u64>) -> Json<Value> {
    if provider.broken {
        return Json(json!({"id": id.to_string(), "name": 5, "roles": []}));
    }
    Json(json!({"id": id, "name": "Fred", "roles": ["reader", "writer"]}))
}

async fn create_user(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    (StatusCode::CREATED, Json(json!({"id": 42, "name": body["name"]})))
}

async fn change_state(State(provider): State<Provider>, Json(body): Json<Value>) -> StatusCode {
    provider.state_calls.lock().push(body);
    StatusCode::OK
}

async fn produce_message(Json(request): Json<Value>) -> (StatusCode, Json<Value>) {
    match request["description"].as_str() {
        Some("a user created event") => (StatusCode::OK, Json(json!({"event": "created", "id": 99}))),
        _ => (StatusCode::NOT_FOUND, Json(json!({"error": "unknown message"}))),
    }
}

/// Start a provider on a free port and return its base URL.
async fn spawn_provider(provider: Provider) -> String {
    let app = Router::new()
        .route("/", post(produce_message))
        .route("/users", post(create_user))
        .route("/users/{id}", get(get_user))
        .route("/_pact/state", post(change_state))
        .with_state(provider);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{address}")
}

fn consumer_pact() -> Pact {
    let mut pact = Pact::new("web-frontend", "user-service").unwrap();
    pact.upon_receiving("a request for user 1")
        .given_with_param("a user exists", "id", "1")
        .with_request("GET", "/users/1")
        .unwrap()
        .with_header("Accept", "application/json", None)
        .unwrap()
        .will_respond_with(200)
        .unwrap()
        .with_json_body(
            &json!({
                "id": Value::from(Format::integer()),
                "name": Value::from(Like::new("Mary")),
                "roles": Value::from(EachLike::new("admin")),
            }),
            None,
        )
        .unwrap();
    pact.upon_receiving("a request to create a user")
        .with_request("POST", "/users")
        .unwrap()
        .with_json_body(&json!({"name": "Fred"}), None)
        .unwrap()
        .will_respond_with(201)
        .unwrap()
        .with_json_body(&json!({"id": Value::from(Like::new(1))}), None)
        .unwrap();
    pact.upon_receiving_async("a user created event")
        .given("a user was created")
        .with_json_body(&json!({"event": "created", "id": Value::from(Like::new(7))}), None)
        .unwrap();
    pact
}

/// Run the consumer side and return the written pact file.
async fn record_pact(dir: &Path) -> PathBuf {
    let pact = consumer_pact();
    let mut server = pact.serve("127.0.0.1", 0, "http", None).await.unwrap();
    let client = reqwest::Client::new();

    let user: Value = client
        .get(server.join("/users/1").unwrap())
        .header("Accept", "application/json")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(user, json!({"id": 1, "name": "Mary", "roles": ["admin"]}));

    let created = client
        .post(server.join("/users").unwrap())
        .json(&json!({"name": "Fred"}))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status().as_u16(), 201);

    assert!(server.matched(), "unexpected mismatches: {:?}", server.mismatches());
    let path = server.write_file(dir, false).unwrap();
    server.stop().await.unwrap();
    path
}

fn options_for(base_url: &str) -> VerificationOptions {
    VerificationOptions::default()
        .with_state_change_url(format!("{base_url}/_pact/state"))
        .with_state_change_teardown(true)
}

#[tokio::test]
async fn test_recorded_pact_verifies_against_provider() {
    let dir = tempfile::tempdir().unwrap();
    let path = record_pact(dir.path()).await;
    assert_eq!(path.file_name().unwrap(), "web-frontend-user-service.json");

    let document = PactDocument::read_file(&path).unwrap();
    assert_eq!(document.interactions.len(), 3);

    let state_calls = Arc::new(Mutex::new(Vec::new()));
    let base_url = spawn_provider(Provider {
        broken: false,
        state_calls: state_calls.clone(),
    })
    .await;
    let provider = ProviderInfo::new("user-service").with_base_url(&base_url).unwrap();

    let report = verify_provider(
        provider,
        &[PactSource::File(path)],
        FilterInfo::default(),
        options_for(&base_url),
    )
    .await
    .unwrap();

    assert!(report.success(), "{}", report.render());
    assert_eq!(report.pacts.len(), 1);
    assert!(
        report.pacts[0]
            .interactions
            .iter()
            .all(|interaction| interaction.outcome == InteractionOutcome::Passed)
    );

    let calls = state_calls.lock().clone();
    assert!(calls.contains(&json!({"state": "a user exists", "params": {"id": 1}, "action": "setup"})));
    assert!(calls.contains(&json!({"state": "a user exists", "params": {"id": 1}, "action": "teardown"})));
    assert!(calls.iter().any(|call| call["state"] == "a user was created"));
}

#[tokio::test]
async fn test_broken_provider_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    let path = record_pact(dir.path()).await;

    let base_url = spawn_provider(Provider {
        broken: true,
        state_calls: Arc::default(),
    })
    .await;
    let provider = ProviderInfo::new("user-service").with_base_url(&base_url).unwrap();
    let filter = FilterInfo::default().with_description("user 1").unwrap();

    let report = verify_provider(provider, &[PactSource::Dir(dir.path().to_path_buf())], filter, options_for(&base_url))
        .await
        .unwrap();

    assert!(!report.success());
    let interactions = &report.pacts[0].interactions;
    assert_eq!(interactions.len(), 1);
    let InteractionOutcome::Failed(mismatches) = &interactions[0].outcome else {
        panic!("expected a failure, got {:?}", interactions[0].outcome);
    };
    assert!(!mismatches.is_empty());
    assert!(report.render().contains("a request for user 1"));
}

#[tokio::test]
async fn test_state_filter_selects_message() {
    let dir = tempfile::tempdir().unwrap();
    let path = record_pact(dir.path()).await;

    let base_url = spawn_provider(Provider {
        broken: true,
        state_calls: Arc::default(),
    })
    .await;
    let provider = ProviderInfo::new("user-service").with_base_url(&base_url).unwrap();
    let filter = FilterInfo::default().with_state("user was created").unwrap();

    let report = verify_provider(provider, &[PactSource::File(path)], filter, VerificationOptions::default())
        .await
        .unwrap();

    assert!(report.success(), "{}", report.render());
    let interactions = &report.pacts[0].interactions;
    assert_eq!(interactions.len(), 1);
    assert_eq!(interactions[0].description, "a user created event");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A pact written by the consumer DSL loads back through the verifier
    /// with its participants and interactions intact.
    #[test]
    fn prop_written_pact_loads_for_verification(
        consumer in participant_name_strategy(),
        provider in participant_name_strategy(),
        description in description_strategy(),
    ) {
        prop_assume!(consumer != provider);
        let dir = tempfile::tempdir().unwrap();
        let mut pact = Pact::new(&consumer, &provider).unwrap();
        pact.upon_receiving(&description)
            .with_request("GET", "/health")
            .unwrap()
            .will_respond_with(200)
            .unwrap();
        let path = pact.write_file(dir.path(), false).unwrap();

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let loader = PactLoader::new(reqwest::Client::new(), RetryPolicy::default());
        let loaded = runtime.block_on(loader.load(&PactSource::File(path))).unwrap();

        prop_assert_eq!(loaded.len(), 1);
        let pact = &loaded[0].pact;
        prop_assert_eq!(&pact.consumer.name, &consumer);
        prop_assert_eq!(&pact.provider.name, &provider);
        prop_assert_eq!(pact.interactions.len(), 1);
        prop_assert_eq!(pact.interactions[0].description(), description.as_str());
    }
}
