//! The mock server: an axum listener answering requests from a pact.

use crate::config::MockServerConfig;
use crate::outcome::MockOutcome;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use pact_common::{Counter, PactError, PactResult, render_counters};
use pact_matching::{Mismatch, match_request};
use pact_models::http::{add_header, decode_path, find_header, parse_query_string};
use pact_models::{HttpRequest, HttpResponse, OptionalBody, Pact};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Request statistics of one mock server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MockServerMetrics {
    /// Requests received
    pub requests: u64,
    /// Requests answered from an interaction
    pub matched: u64,
    /// Requests resembling an interaction but differing from it
    pub mismatched: u64,
    /// Requests no interaction describes
    pub not_found: u64,
}

struct ServerState {
    pact: Pact,
    expectations: Vec<(HttpRequest, HttpResponse)>,
    received: Mutex<Vec<usize>>,
    problems: Mutex<Vec<MockOutcome>>,
    requests: Counter,
    matched: Counter,
    mismatched: Counter,
    not_found: Counter,
}

impl ServerState {
    fn new(pact: Pact) -> Self {
        let expectations: Vec<_> = pact
            .interactions
            .iter()
            .filter_map(|interaction| interaction.as_http())
            .map(|http| (http.request.clone(), http.response.clone()))
            .collect();
        let received = vec![0; expectations.len()];
        Self {
            pact,
            expectations,
            received: Mutex::new(received),
            problems: Mutex::new(Vec::new()),
            requests: Counter::new("mock_server_requests_total", "Requests received"),
            matched: Counter::new("mock_server_requests_matched_total", "Requests matching an interaction"),
            mismatched: Counter::new("mock_server_requests_mismatched_total", "Requests differing from an interaction"),
            not_found: Counter::new("mock_server_requests_not_found_total", "Requests matching no interaction"),
        }
    }

    /// Find the response for a request, recording the outcome.
    fn respond_to(&self, request: &HttpRequest) -> Result<HttpResponse, MockOutcome> {
        self.requests.inc();
        let mut closest: Option<Vec<Mismatch>> = None;

        for (index, (expected, response)) in self.expectations.iter().enumerate() {
            let mismatches = match_request(expected, request);
            if mismatches.is_empty() {
                self.matched.inc();
                if let Some(count) = self.received.lock().get_mut(index) {
                    *count += 1;
                }
                return Ok(response.clone());
            }
            let same_route = !mismatches
                .iter()
                .any(|m| matches!(m.mismatch_type(), "MethodMismatch" | "PathMismatch"));
            if same_route && closest.as_ref().is_none_or(|best| mismatches.len() < best.len()) {
                closest = Some(mismatches);
            }
        }

        let outcome = match closest {
            Some(mismatches) => {
                self.mismatched.inc();
                MockOutcome::RequestMismatch {
                    method: request.method.clone(),
                    path: request.path.clone(),
                    mismatches,
                }
            }
            None => {
                self.not_found.inc();
                MockOutcome::RequestNotFound(request.clone())
            }
        };
        self.problems.lock().push(outcome.clone());
        Err(outcome)
    }

    fn outcomes(&self) -> Vec<MockOutcome> {
        let mut outcomes = self.problems.lock().clone();
        let received = self.received.lock();
        outcomes.extend(
            self.expectations
                .iter()
                .zip(received.iter())
                .filter(|(_, count)| **count == 0)
                .map(|((request, _), _)| MockOutcome::MissingRequest(request.clone())),
        );
        outcomes
    }
}

/// A running mock server.
///
/// The listener stops on [`MockServer::shutdown`] or when the value is
/// dropped.
pub struct MockServer {
    address: SocketAddr,
    config: MockServerConfig,
    state: Arc<ServerState>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for MockServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockServer")
            .field("address", &self.address)
            .field("transport", &self.config.transport)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl MockServer {
    /// Bind and start serving the HTTP interactions of `pact`.
    ///
    /// # Errors
    ///
    /// Returns `PactError::UnsupportedTransport` for transports other than
    /// `http`, and `PactError::Io` when the address cannot be bound.
    pub async fn start(pact: Pact, config: MockServerConfig) -> PactResult<Self> {
        config.validate()?;
        let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
        let address = listener.local_addr()?;
        let state = Arc::new(ServerState::new(pact));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let app = Router::new().fallback(handle_request).with_state(Arc::clone(&state));
        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(error) = server.await {
                warn!(error = %error, "Mock server terminated with an error");
            }
        });

        info!(
            address = %address,
            consumer = %state.pact.consumer.name,
            provider = %state.pact.provider.name,
            interactions = state.expectations.len(),
            "Mock server started"
        );
        Ok(Self {
            address,
            config,
            state,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    /// Bound address.
    #[must_use]
    pub const fn address(&self) -> SocketAddr {
        self.address
    }

    /// Bound port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.address.port()
    }

    /// Base URL, using the configured host name.
    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "{}://{}:{}",
            self.config.transport.to_ascii_lowercase(),
            self.config.host,
            self.port()
        )
    }

    /// The pact being served.
    #[must_use]
    pub fn pact(&self) -> &Pact {
        &self.state.pact
    }

    /// True until the server is shut down.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.shutdown.is_some()
    }

    /// True when every interaction was received and nothing unexpected was.
    #[must_use]
    pub fn matched(&self) -> bool {
        self.state.outcomes().is_empty()
    }

    /// Every recorded problem, followed by the interactions never received.
    #[must_use]
    pub fn mismatches(&self) -> Vec<MockOutcome> {
        self.state.outcomes()
    }

    /// Request statistics.
    #[must_use]
    pub fn metrics(&self) -> MockServerMetrics {
        MockServerMetrics {
            requests: self.state.requests.get(),
            matched: self.state.matched.get(),
            mismatched: self.state.mismatched.get(),
            not_found: self.state.not_found.get(),
        }
    }

    /// Request statistics in Prometheus text format.
    #[must_use]
    pub fn metrics_text(&self) -> String {
        render_counters(&[
            &self.state.requests,
            &self.state.matched,
            &self.state.mismatched,
            &self.state.not_found,
        ])
    }

    /// Write the served pact to `dir`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Pact::write_file`].
    pub fn write_pact(&self, dir: &Path, overwrite: bool) -> PactResult<PathBuf> {
        self.state.pact.write_file(dir, overwrite)
    }

    /// Stop listening and wait for the server task to finish.
    ///
    /// # Errors
    ///
    /// Returns `PactError::Internal` when the server task panicked.
    pub async fn shutdown(&mut self) -> PactResult<()> {
        if let Some(sender) = self.shutdown.take() {
            let _ = sender.send(());
        }
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| PactError::internal(format!("Mock server task failed: {e}")))?;
            info!(address = %self.address, "Mock server stopped");
        }
        Ok(())
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(sender) = self.shutdown.take() {
            let _ = sender.send(());
        }
    }
}

async fn handle_request(State(state): State<Arc<ServerState>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(error) => {
            return (StatusCode::BAD_REQUEST, format!("Failed to read request body: {error}")).into_response();
        }
    };

    let mut actual = HttpRequest {
        method: parts.method.as_str().to_string(),
        path: decode_path(parts.uri.path()),
        query: parts.uri.query().map(parse_query_string).unwrap_or_default(),
        ..HttpRequest::default()
    };
    for (name, value) in &parts.headers {
        add_header(
            &mut actual.headers,
            name.as_str(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }
    if !bytes.is_empty() {
        let content_type = find_header(&actual.headers, "Content-Type").and_then(|v| v.first()).cloned();
        actual.body = OptionalBody::Present(bytes.to_vec(), content_type);
    }
    debug!(method = %actual.method, path = %actual.path, "Mock server received request");

    match state.respond_to(&actual) {
        Ok(response) => build_response(&response),
        Err(outcome) => {
            warn!(outcome = outcome.outcome_type(), "{}", outcome.description());
            let body = json!({
                "error": outcome.description(),
                "mismatches": [outcome.to_json()],
            });
            let mut response = (StatusCode::INTERNAL_SERVER_ERROR, body.to_string()).into_response();
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json; charset=utf-8"),
            );
            response
        }
    }
}

fn build_response(expected: &HttpResponse) -> Response {
    let status = StatusCode::from_u16(expected.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = axum::http::Response::builder().status(status);
    for (name, values) in &expected.headers {
        for value in values {
            builder = builder.header(name.as_str(), value.as_str());
        }
    }
    if expected.body.is_present() && find_header(&expected.headers, "Content-Type").is_none() {
        if let Some(content_type) = expected.content_type() {
            builder = builder.header(header::CONTENT_TYPE, content_type.to_string());
        }
    }
    builder
        .body(Body::from(expected.body.bytes().to_vec()))
        .unwrap_or_else(|error| {
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Invalid response in pact: {error}")).into_response()
        })
}
