//! Sending expected requests to the provider and reading what comes back.

use crate::provider::ProviderInfo;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pact_common::{PactError, PactResult};
use pact_models::http::{add_header, find_header};
use pact_models::{HttpRequest, HttpResponse, MessageContents, OptionalBody, ProviderState};
use reqwest::{Client, Method, Response};
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Header carrying message metadata as base64 encoded JSON.
pub const MESSAGE_METADATA_HEADER: &str = "Pact-Message-Metadata";

/// Per-request settings.
#[derive(Debug, Clone, Copy)]
pub struct ReplaySettings<'a> {
    /// Headers replacing the pact's values
    pub custom_headers: &'a [(String, String)],
    /// Request timeout
    pub timeout: Duration,
}

fn encode_query(request: &HttpRequest) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (name, values) in &request.query {
        for value in values {
            serializer.append_pair(name, value);
        }
    }
    serializer.finish()
}

fn request_url(provider: &ProviderInfo, request: &HttpRequest) -> String {
    let url = provider.url_for(&request.path);
    if request.query.is_empty() {
        url
    } else {
        format!("{url}?{}", encode_query(request))
    }
}

/// Send the expected request of an interaction to the provider.
///
/// # Errors
///
/// Fails when the method is invalid or the request cannot be sent.
#[instrument(skip_all, fields(method = %request.method, path = %request.path))]
pub async fn replay_request(
    client: &Client,
    provider: &ProviderInfo,
    request: &HttpRequest,
    settings: ReplaySettings<'_>,
) -> PactResult<HttpResponse> {
    let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
        .map_err(|e| PactError::invalid_input(format!("Invalid method '{}': {e}", request.method)))?;
    let mut builder = client
        .request(method, request_url(provider, request))
        .timeout(settings.timeout);

    for (name, values) in &request.headers {
        if settings
            .custom_headers
            .iter()
            .any(|(custom, _)| custom.eq_ignore_ascii_case(name))
        {
            continue;
        }
        for value in values {
            builder = builder.header(name.as_str(), value.as_str());
        }
    }
    for (name, value) in settings.custom_headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if request.body.is_present() {
        builder = builder.body(request.body.bytes().to_vec());
    }

    let response = builder.send().await.map_err(timeout_error)?;
    let actual = read_response(response).await?;
    debug!(status = actual.status, "Provider responded");
    Ok(actual)
}

fn timeout_error(error: reqwest::Error) -> PactError {
    if error.is_timeout() {
        PactError::Timeout(error.to_string())
    } else {
        PactError::Http(error)
    }
}

async fn read_response(response: Response) -> PactResult<HttpResponse> {
    let status = response.status().as_u16();
    let mut actual = HttpResponse {
        status,
        ..HttpResponse::default()
    };
    for (name, value) in response.headers() {
        add_header(
            &mut actual.headers,
            name.as_str(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }
    let bytes = response.bytes().await?;
    if !bytes.is_empty() {
        let content_type = find_header(&actual.headers, "Content-Type").and_then(|v| v.first()).cloned();
        actual.body = OptionalBody::Present(bytes.to_vec(), content_type);
    }
    Ok(actual)
}

/// Ask the provider for the message an interaction describes.
///
/// The provider receives a `POST` of `{"description", "providerStates"}` at
/// its base URL and answers with the message contents. Metadata comes from
/// the [`MESSAGE_METADATA_HEADER`] header.
///
/// # Errors
///
/// Fails when the request cannot be sent or the provider answers with an
/// error status.
#[instrument(skip_all, fields(description = %description))]
pub async fn request_message(
    client: &Client,
    provider: &ProviderInfo,
    description: &str,
    states: &[ProviderState],
    settings: ReplaySettings<'_>,
) -> PactResult<MessageContents> {
    let body = json!({
        "description": description,
        "providerStates": states.iter().map(ProviderState::to_json).collect::<Vec<_>>(),
    });
    let mut builder = client.post(provider.base_url()).json(&body).timeout(settings.timeout);
    for (name, value) in settings.custom_headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    let response = builder.send().await.map_err(timeout_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(PactError::invalid_input(format!(
            "Provider answered the message request for '{description}' with {status}"
        )));
    }

    let actual = read_response(response).await?;
    let mut metadata = find_header(&actual.headers, MESSAGE_METADATA_HEADER)
        .and_then(|values| values.first())
        .map(|encoded| decode_metadata(encoded))
        .unwrap_or_default();
    if let Some(content_type) = find_header(&actual.headers, "Content-Type").and_then(|v| v.first()) {
        metadata
            .entry("contentType")
            .or_insert_with(|| Value::String(content_type.clone()));
    }
    Ok(MessageContents {
        contents: actual.body,
        metadata,
        ..MessageContents::default()
    })
}

/// Decode base64 encoded JSON metadata. Anything unreadable yields no
/// metadata.
#[must_use]
pub fn decode_metadata(encoded: &str) -> Map<String, Value> {
    let decoded = STANDARD
        .decode(encoded.trim())
        .ok()
        .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok());
    match decoded {
        Some(Value::Object(map)) => map,
        _ => {
            warn!(header = MESSAGE_METADATA_HEADER, "Ignoring unreadable message metadata");
            Map::new()
        }
    }
}

/// Encode metadata for the [`MESSAGE_METADATA_HEADER`] header.
#[must_use]
pub fn encode_metadata(metadata: &Map<String, Value>) -> String {
    STANDARD.encode(Value::Object(metadata.clone()).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url_with_query() {
        let provider = ProviderInfo::new("p").with_host("localhost").with_port(8000);
        let mut request = HttpRequest {
            path: "/search".to_string(),
            ..HttpRequest::default()
        };
        request.query.insert("q".to_string(), vec!["a b".to_string()]);
        request.query.insert("tag".to_string(), vec!["x".to_string(), "y".to_string()]);
        assert_eq!(
            request_url(&provider, &request),
            "http://localhost:8000/search?q=a+b&tag=x&tag=y"
        );
    }

    #[test]
    fn test_metadata_round_trip() {
        let mut metadata = Map::new();
        metadata.insert("topic".to_string(), json!("users"));
        assert_eq!(decode_metadata(&encode_metadata(&metadata)), metadata);
        assert!(decode_metadata("not base64!").is_empty());
    }
}
