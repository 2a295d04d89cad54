//! Publishing verification results to a pact broker.

use crate::report::PactReport;
use crate::source::{HttpAuth, broker_path};
use pact_common::{PactError, PactResult};
use pact_models::ProviderVersion;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

fn authorise(request: RequestBuilder, auth: Option<&HttpAuth>) -> RequestBuilder {
    match auth {
        Some(auth) => auth.apply(request),
        None => request,
    }
}

async fn check(response: Response, what: &str) -> PactResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let text = response.text().await.unwrap_or_default();
    if status.is_server_error() {
        return Err(PactError::unavailable(format!("Broker failed to accept {what} with {status}: {text}")));
    }
    Err(PactError::invalid_input(format!("Broker rejected {what} with {status}: {text}")))
}

/// Post the results for one pact to its publish link.
///
/// Pacts that did not come from a broker have no link; their results are
/// not published and `false` is returned.
///
/// # Errors
///
/// Fails when the broker rejects the results or cannot be reached.
#[instrument(skip_all, fields(consumer = %report.consumer, version = %provider_version.version))]
pub async fn publish_results(
    client: &Client,
    report: &PactReport,
    provider_version: &ProviderVersion,
    auth: Option<&HttpAuth>,
) -> PactResult<bool> {
    let Some(url) = &report.publish_url else {
        warn!(origin = %report.origin, "Pact has no publish link, results not published");
        return Ok(false);
    };
    let result = report.to_verification_result(provider_version);
    let response = authorise(client.post(url).json(&result), auth).send().await?;
    check(response, "verification results").await?;
    info!(success = result.success, "Published verification results");
    Ok(true)
}

/// Record the provider version's branch and tags on the broker.
///
/// # Errors
///
/// Fails when the broker cannot be reached or rejects a request.
#[instrument(skip_all, fields(provider = provider_name, version = %provider_version.version))]
pub async fn tag_provider_version(
    client: &Client,
    broker_url: &str,
    provider_name: &str,
    provider_version: &ProviderVersion,
    auth: Option<&HttpAuth>,
) -> PactResult<()> {
    let version = provider_version.version.as_str();
    if let Some(branch) = &provider_version.branch {
        let url = broker_path(
            broker_url,
            &["pacticipants", provider_name, "branches", branch.as_str(), "versions", version],
        )?;
        let response = authorise(client.put(url).json(&json!({})), auth).send().await?;
        check(response, "provider branch").await?;
        debug!(branch = %branch, "Recorded provider branch");
    }
    for tag in &provider_version.tags {
        let url = broker_path(
            broker_url,
            &["pacticipants", provider_name, "versions", version, "tags", tag.as_str()],
        )?;
        let response = authorise(client.put(url).json(&json!({})), auth).send().await?;
        check(response, "provider tag").await?;
        debug!(tag = %tag, "Tagged provider version");
    }
    Ok(())
}
