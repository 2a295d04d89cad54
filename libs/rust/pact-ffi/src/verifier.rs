//! Provider verification from a JSON description of the run.

use crate::mock_server::runtime;
use crate::util::{c_str, guard};
use pact_common::{PactError, PactResult};
use pact_models::ProviderVersion;
use pact_verifier::{FilterInfo, HttpAuth, PactSource, ProviderInfo, VerificationOptions, verify_provider};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::ffi::{c_char, c_int};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderConfig {
    name: String,
    base_url: Option<String>,
    scheme: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthConfig {
    username: Option<String>,
    password: Option<String>,
    token: Option<String>,
}

impl AuthConfig {
    fn into_auth(self) -> Option<HttpAuth> {
        match (self.token, self.username) {
            (Some(token), _) => Some(HttpAuth::Token(token)),
            (None, Some(username)) => Some(HttpAuth::User {
                username,
                password: self.password,
            }),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", untagged)]
enum SourceConfig {
    File {
        file: PathBuf,
    },
    Dir {
        dir: PathBuf,
    },
    Url {
        url: String,
        #[serde(flatten)]
        auth: AuthConfig,
    },
    Broker {
        broker: String,
        #[serde(default)]
        tags: Vec<String>,
        #[serde(flatten)]
        auth: AuthConfig,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilterConfig {
    description: Option<String>,
    state: Option<String>,
    #[serde(default)]
    no_state: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishConfig {
    provider_version: String,
    branch: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// A verification run as passed to `pactffi_verify_json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyConfig {
    provider: ProviderConfig,
    sources: Vec<SourceConfig>,
    #[serde(default)]
    filter: FilterConfig,
    state_change_url: Option<String>,
    #[serde(default)]
    state_change_teardown: bool,
    #[serde(default)]
    custom_headers: BTreeMap<String, String>,
    request_timeout_ms: Option<u64>,
    publish: Option<PublishConfig>,
}

impl VerifyConfig {
    fn provider(&self) -> PactResult<ProviderInfo> {
        let config = &self.provider;
        let mut provider = ProviderInfo::new(config.name.clone());
        if let Some(base_url) = &config.base_url {
            return provider.with_base_url(base_url);
        }
        if let Some(scheme) = &config.scheme {
            provider = provider.with_protocol(scheme.clone());
        }
        if let Some(host) = &config.host {
            provider = provider.with_host(host.clone());
        }
        if let Some(port) = config.port {
            provider = provider.with_port(port);
        }
        if let Some(path) = &config.path {
            provider = provider.with_path(path.clone());
        }
        Ok(provider)
    }

    fn sources(self, provider_name: &str) -> Vec<PactSource> {
        self.sources
            .into_iter()
            .map(|source| match source {
                SourceConfig::File { file } => PactSource::File(file),
                SourceConfig::Dir { dir } => PactSource::Dir(dir),
                SourceConfig::Url { url, auth } => PactSource::Url {
                    url,
                    auth: auth.into_auth(),
                },
                SourceConfig::Broker { broker, tags, auth } => PactSource::Broker {
                    url: broker,
                    provider_name: provider_name.to_string(),
                    auth: auth.into_auth(),
                    tags,
                },
            })
            .collect()
    }

    fn filter(&self) -> PactResult<FilterInfo> {
        let mut filter = FilterInfo::default();
        if let Some(description) = &self.filter.description {
            filter = filter.with_description(description)?;
        }
        if let Some(state) = &self.filter.state {
            filter = filter.with_state(state)?;
        }
        if self.filter.no_state {
            filter = filter.with_no_state();
        }
        Ok(filter)
    }

    fn options(&self) -> VerificationOptions {
        let mut options = VerificationOptions::default().with_state_change_teardown(self.state_change_teardown);
        if let Some(url) = &self.state_change_url {
            options = options.with_state_change_url(url.clone());
        }
        for (name, value) in &self.custom_headers {
            options = options.with_custom_header(name.clone(), value.clone());
        }
        if let Some(timeout) = self.request_timeout_ms {
            options = options.with_request_timeout(Duration::from_millis(timeout));
        }
        if let Some(publish) = &self.publish {
            let mut version = ProviderVersion::new(publish.provider_version.clone()).with_tags(publish.tags.clone());
            if let Some(branch) = &publish.branch {
                version = version.with_branch(branch.clone());
            }
            options = options.with_publish(version);
        }
        options
    }
}

fn run(raw: &str) -> PactResult<bool> {
    let config: VerifyConfig = serde_json::from_str(raw)?;
    let provider = config.provider()?;
    let filter = config.filter()?;
    let options = config.options();
    let sources = config.sources(&provider.name);
    if sources.is_empty() {
        return Err(PactError::invalid_input("No pact sources given"));
    }
    let report = runtime()?.block_on(verify_provider(provider, &sources, filter, options))?;
    for line in report.render().lines().filter(|line| !line.is_empty()) {
        info!("{line}");
    }
    Ok(report.success())
}

/// Verify a provider described by a JSON document.
///
/// The document names the `provider` (`name` plus `baseUrl` or `scheme`,
/// `host`, `port` and `path`), the pact `sources` (objects with `file`,
/// `dir`, `url` or `broker`, optionally with `username`/`password` or
/// `token`, and `tags` for brokers), and optionally a `filter`,
/// `stateChangeUrl`, `stateChangeTeardown`, `customHeaders`,
/// `requestTimeoutMs` and `publish` (`providerVersion`, `branch`, `tags`).
///
/// Returns `0` when verification passed, `1` when it failed, `2` for an
/// invalid document and `3` on panic.
///
/// # Safety
///
/// `config` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pactffi_verify_json(config: *const c_char) -> c_int {
    guard("pactffi_verify_json", 3, || {
        // SAFETY: forwarded from the caller.
        let Some(raw) = (unsafe { c_str(config) }) else {
            return 2;
        };
        match run(raw) {
            Ok(true) => 0,
            Ok(false) => 1,
            Err(error) => {
                warn!(error = %error, "Verification could not run");
                2
            }
        }
    })
}
