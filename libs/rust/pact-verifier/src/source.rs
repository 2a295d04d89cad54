//! Where pacts come from: files, directories, URLs and pact brokers.

use pact_common::{PactError, PactResult, RetryPolicy};
use pact_models::Pact;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Link relation on a broker pact used to publish verification results.
pub const PUBLISH_RELATION: &str = "pb:publish-verification-results";

/// Credentials for URL and broker sources.
#[derive(Clone, PartialEq, Eq)]
pub enum HttpAuth {
    /// Basic authentication
    User {
        /// User name
        username: String,
        /// Password
        password: Option<String>,
    },
    /// Bearer token
    Token(String),
}

impl fmt::Debug for HttpAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User { username, .. } => f
                .debug_struct("User")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::Token(_) => f.write_str("Token(..)"),
        }
    }
}

impl HttpAuth {
    pub(crate) fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::User { username, password } => request.basic_auth(username, password.as_ref()),
            Self::Token(token) => request.bearer_auth(token),
        }
    }
}

/// A source of pacts to verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PactSource {
    /// A single pact file
    File(PathBuf),
    /// Every `.json` file in a directory
    Dir(PathBuf),
    /// A pact served over HTTP
    Url {
        /// Pact URL
        url: String,
        /// Credentials
        auth: Option<HttpAuth>,
    },
    /// The latest pacts for a provider on a pact broker
    Broker {
        /// Broker base URL
        url: String,
        /// Provider name
        provider_name: String,
        /// Credentials
        auth: Option<HttpAuth>,
        /// Consumer version tags; the latest pact per tag when non-empty
        tags: Vec<String>,
    },
}

impl fmt::Display for PactSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file {}", path.display()),
            Self::Dir(path) => write!(f, "directory {}", path.display()),
            Self::Url { url, .. } => write!(f, "URL {url}"),
            Self::Broker { url, provider_name, .. } => write!(f, "broker {url} ({provider_name})"),
        }
    }
}

/// A pact with the details of where it was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedPact {
    /// The pact
    pub pact: Pact,
    /// Human readable origin
    pub origin: String,
    /// URL to publish verification results to, for broker pacts
    pub publish_url: Option<String>,
}

/// Loads pacts from their sources.
#[derive(Debug, Clone)]
pub struct PactLoader {
    client: Client,
    retry: RetryPolicy,
}

impl PactLoader {
    /// Loader using `client`, retrying transient failures per `retry`.
    #[must_use]
    pub const fn new(client: Client, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Load every pact a source provides.
    ///
    /// # Errors
    ///
    /// Fails when a file cannot be read or parsed, a URL cannot be fetched
    /// after retries, or the broker has no pacts for the provider.
    #[instrument(skip(self), fields(source = %source))]
    pub async fn load(&self, source: &PactSource) -> PactResult<Vec<LoadedPact>> {
        let pacts = match source {
            PactSource::File(path) => vec![load_file(path)?],
            PactSource::Dir(path) => load_dir(path)?,
            PactSource::Url { url, auth } => {
                let json = self.fetch_json(url, auth.as_ref()).await?;
                vec![from_json(&json, url)?]
            }
            PactSource::Broker {
                url,
                provider_name,
                auth,
                tags,
            } => self.load_from_broker(url, provider_name, auth.as_ref(), tags).await?,
        };
        info!(pacts = pacts.len(), "Loaded pacts");
        Ok(pacts)
    }

    async fn load_from_broker(
        &self,
        broker_url: &str,
        provider_name: &str,
        auth: Option<&HttpAuth>,
        tags: &[String],
    ) -> PactResult<Vec<LoadedPact>> {
        let mut indexes = Vec::new();
        if tags.is_empty() {
            indexes.push(broker_path(broker_url, &["pacts", "provider", provider_name, "latest"])?);
        } else {
            for tag in tags {
                indexes.push(broker_path(broker_url, &["pacts", "provider", provider_name, "latest", tag.as_str()])?);
            }
        }

        let mut links = Vec::new();
        for index in &indexes {
            let json = match self.fetch_json(index.as_str(), auth).await {
                Ok(json) => json,
                Err(PactError::NotFound(_)) if !tags.is_empty() => {
                    warn!(url = %index, "No pacts for tag");
                    continue;
                }
                Err(error) => return Err(error),
            };
            for link in pact_links(&json) {
                if !links.contains(&link) {
                    links.push(link);
                }
            }
        }
        if links.is_empty() {
            return Err(PactError::not_found(format!(
                "No pacts found for provider '{provider_name}' on {broker_url}"
            )));
        }

        let mut pacts = Vec::with_capacity(links.len());
        for link in links {
            debug!(url = %link, "Fetching pact from broker");
            let json = self.fetch_json(&link, auth).await?;
            pacts.push(from_json(&json, &link)?);
        }
        Ok(pacts)
    }

    async fn fetch_json(&self, url: &str, auth: Option<&HttpAuth>) -> PactResult<Value> {
        self.retry.execute(url, || self.get_json(url, auth)).await
    }

    async fn get_json(&self, url: &str, auth: Option<&HttpAuth>) -> PactResult<Value> {
        let mut request = self.client.get(url).header("Accept", "application/hal+json, application/json");
        if let Some(auth) = auth {
            request = auth.apply(request);
        }
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PactError::not_found(format!("Nothing found at {url}")));
        }
        if status.is_server_error() {
            return Err(PactError::unavailable(format!("{url} returned {status}")));
        }
        Ok(response.error_for_status()?.json::<Value>().await?)
    }
}

pub(crate) fn broker_path(base: &str, segments: &[&str]) -> PactResult<Url> {
    let mut url = Url::parse(base).map_err(|e| PactError::invalid_input(format!("Invalid broker URL '{base}': {e}")))?;
    url.path_segments_mut()
        .map_err(|()| PactError::invalid_input(format!("Broker URL '{base}' cannot have a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Pact URLs listed by a broker index, under `pb:pacts` or `pacts`.
fn pact_links(index: &Value) -> Vec<String> {
    let links = &index["_links"];
    ["pb:pacts", "pacts"]
        .iter()
        .filter_map(|relation| links.get(*relation).and_then(Value::as_array))
        .flatten()
        .filter_map(|link| link.get("href").and_then(Value::as_str))
        .map(ToString::to_string)
        .collect()
}

fn from_json(json: &Value, origin: &str) -> PactResult<LoadedPact> {
    let pact = Pact::from_json(json)?;
    let publish_url = json["_links"][PUBLISH_RELATION]["href"].as_str().map(ToString::to_string);
    Ok(LoadedPact {
        pact,
        origin: origin.to_string(),
        publish_url,
    })
}

fn load_file(path: &Path) -> PactResult<LoadedPact> {
    let contents = std::fs::read_to_string(path)?;
    let json: Value = serde_json::from_str(&contents)?;
    from_json(&json, &path.display().to_string())
}

fn load_dir(dir: &Path) -> PactResult<Vec<LoadedPact>> {
    let mut paths = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")))
        .collect::<Vec<_>>();
    paths.sort();
    paths.iter().map(|path| load_file(path)).collect()
}
