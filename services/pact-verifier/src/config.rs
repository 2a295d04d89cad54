//! Command line options and their validation.
//!
//! Every option can also come from the environment (a `.env` file is read
//! first). [`Config::from_args`] turns the raw options into a validated
//! verification run.

use crate::error::ConfigError;
use clap::Parser;
use pact_common::{LogFormat, TracingConfig};
use pact_models::ProviderVersion;
use pact_verifier::{FilterInfo, HttpAuth, PactSource, ProviderInfo, VerificationOptions, parse_custom_header};
use std::path::PathBuf;
use std::time::Duration;

/// Raw command line options.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pact-verifier",
    version,
    about = "Verify a provider against the pacts its consumers published"
)]
pub struct Args {
    /// Name of the provider being verified
    #[arg(long, env = "PACT_PROVIDER_NAME")]
    pub provider_name: String,

    /// Base URL of the running provider; overrides the host, port, scheme
    /// and base path options
    #[arg(long, env = "PACT_PROVIDER_BASE_URL")]
    pub provider_base_url: Option<String>,

    /// Provider host name
    #[arg(long, default_value = "localhost", env = "PACT_PROVIDER_HOSTNAME")]
    pub hostname: String,

    /// Provider port [default: 8080]
    #[arg(short, long, env = "PACT_PROVIDER_PORT")]
    pub port: Option<u16>,

    /// Provider scheme
    #[arg(long, default_value = "http", env = "PACT_PROVIDER_SCHEME")]
    pub scheme: String,

    /// Path prefix of every provider request
    #[arg(long, default_value = "", env = "PACT_PROVIDER_BASE_PATH")]
    pub base_path: String,

    /// Pact file to verify (repeatable)
    #[arg(short, long)]
    pub file: Vec<PathBuf>,

    /// Directory of pact files to verify (repeatable)
    #[arg(short, long)]
    pub dir: Vec<PathBuf>,

    /// URL of a pact to verify (repeatable)
    #[arg(short, long)]
    pub url: Vec<String>,

    /// Pact broker to fetch the provider's pacts from
    #[arg(short, long, env = "PACT_BROKER_BASE_URL")]
    pub broker_url: Option<String>,

    /// User name for pact URLs and the broker
    #[arg(long, env = "PACT_BROKER_USERNAME")]
    pub user: Option<String>,

    /// Password for pact URLs and the broker
    #[arg(long, env = "PACT_BROKER_PASSWORD")]
    pub password: Option<String>,

    /// Bearer token for pact URLs and the broker
    #[arg(short, long, env = "PACT_BROKER_TOKEN")]
    pub token: Option<String>,

    /// Consumer version tags to fetch from the broker (comma separated)
    #[arg(long, value_delimiter = ',', env = "PACT_CONSUMER_VERSION_TAGS")]
    pub consumer_version_tags: Vec<String>,

    /// URL receiving provider state change requests
    #[arg(short = 's', long, env = "PACT_PROVIDER_STATES_SETUP_URL")]
    pub provider_states_setup_url: Option<String>,

    /// Also send teardown requests after each interaction
    #[arg(long, env = "PACT_STATE_CHANGE_TEARDOWN")]
    pub state_change_teardown: bool,

    /// Only verify interactions whose description matches this regex
    #[arg(long, env = "PACT_DESCRIPTION")]
    pub filter_description: Option<String>,

    /// Only verify interactions with a provider state matching this regex
    #[arg(long, env = "PACT_PROVIDER_STATE")]
    pub filter_state: Option<String>,

    /// Only verify interactions without provider states
    #[arg(long, env = "PACT_PROVIDER_NO_STATE")]
    pub filter_no_state: bool,

    /// Header added to every provider request, as `Name: value` (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Publish verification results to the broker
    #[arg(long, env = "PACT_PUBLISH_VERIFICATION_RESULTS")]
    pub publish: bool,

    /// Provider version reported with published results
    #[arg(short = 'a', long, env = "PACT_PROVIDER_APP_VERSION")]
    pub provider_app_version: Option<String>,

    /// Provider branch reported with published results
    #[arg(long, env = "PACT_PROVIDER_BRANCH")]
    pub provider_branch: Option<String>,

    /// Provider version tags (comma separated)
    #[arg(long, value_delimiter = ',', env = "PACT_PROVIDER_TAGS")]
    pub provider_tags: Vec<String>,

    /// Timeout of each provider request in milliseconds
    #[arg(long, default_value_t = 5000, env = "PACT_REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    /// Write a JSON report to this file
    #[arg(short, long)]
    pub json: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace or off)
    #[arg(long, default_value = "warn", env = "LOG_LEVEL")]
    pub log_level: String,

    /// Log as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

/// A validated verification run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Provider under test
    pub provider: ProviderInfo,
    /// Where pacts come from, in option order
    pub sources: Vec<PactSource>,
    /// Interaction selection
    pub filter: FilterInfo,
    /// Verification behaviour
    pub options: VerificationOptions,
    /// JSON report destination
    pub json_report: Option<PathBuf>,
    /// Log output
    pub tracing: TracingConfig,
}

impl Config {
    /// Validate `args`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first offending option.
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let provider = provider(&args)?;
        let auth = auth(&args)?;
        let sources = sources(&args, auth);
        if sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        if !args.consumer_version_tags.is_empty() && args.broker_url.is_none() {
            return Err(ConfigError::Missing("--consumer-version-tags", "--broker-url"));
        }
        let filter = filter(&args)?;
        let options = options(&args)?;

        let format = if args.log_json { LogFormat::Json } else { LogFormat::Pretty };
        let tracing = TracingConfig::for_component("pact-verifier")
            .with_level(&args.log_level)
            .map_err(|e| ConfigError::invalid("--log-level", e))?
            .with_format(format);

        Ok(Self {
            provider,
            sources,
            filter,
            options,
            json_report: args.json,
            tracing,
        })
    }
}

fn provider(args: &Args) -> Result<ProviderInfo, ConfigError> {
    let provider = ProviderInfo::new(args.provider_name.trim());
    if provider.name.is_empty() {
        return Err(ConfigError::invalid("--provider-name", "must not be empty"));
    }
    if let Some(base_url) = &args.provider_base_url {
        return provider
            .with_base_url(base_url)
            .map_err(|e| ConfigError::invalid("--provider-base-url", e));
    }
    let provider = provider
        .with_protocol(args.scheme.clone())
        .with_host(args.hostname.clone())
        .with_path(args.base_path.clone());
    Ok(match args.port {
        Some(port) => provider.with_port(port),
        None => provider,
    })
}

fn auth(args: &Args) -> Result<Option<HttpAuth>, ConfigError> {
    match (&args.user, &args.token) {
        (Some(_), Some(_)) => Err(ConfigError::Conflict("--user", "--token")),
        (Some(username), None) => Ok(Some(HttpAuth::User {
            username: username.clone(),
            password: args.password.clone(),
        })),
        (None, Some(token)) => Ok(Some(HttpAuth::Token(token.clone()))),
        (None, None) if args.password.is_some() => Err(ConfigError::Missing("--password", "--user")),
        (None, None) => Ok(None),
    }
}

fn sources(args: &Args, auth: Option<HttpAuth>) -> Vec<PactSource> {
    let files = args.file.iter().cloned().map(PactSource::File);
    let dirs = args.dir.iter().cloned().map(PactSource::Dir);
    let urls = args.url.iter().map(|url| PactSource::Url {
        url: url.clone(),
        auth: auth.clone(),
    });
    let broker = args.broker_url.iter().map(|url| PactSource::Broker {
        url: url.clone(),
        provider_name: args.provider_name.trim().to_string(),
        auth: auth.clone(),
        tags: args.consumer_version_tags.clone(),
    });
    files.chain(dirs).chain(urls).chain(broker).collect()
}

fn filter(args: &Args) -> Result<FilterInfo, ConfigError> {
    let mut filter = FilterInfo::default();
    if let Some(description) = &args.filter_description {
        filter = filter
            .with_description(description)
            .map_err(|e| ConfigError::invalid("--filter-description", e))?;
    }
    if let Some(state) = &args.filter_state {
        filter = filter
            .with_state(state)
            .map_err(|e| ConfigError::invalid("--filter-state", e))?;
    }
    if args.filter_no_state {
        if args.filter_state.is_some() {
            return Err(ConfigError::Conflict("--filter-state", "--filter-no-state"));
        }
        filter = filter.with_no_state();
    }
    Ok(filter)
}

fn options(args: &Args) -> Result<VerificationOptions, ConfigError> {
    if args.request_timeout == 0 {
        return Err(ConfigError::invalid("--request-timeout", "must be greater than zero"));
    }
    let mut options = VerificationOptions::default()
        .with_state_change_teardown(args.state_change_teardown)
        .with_request_timeout(Duration::from_millis(args.request_timeout));
    if let Some(url) = &args.provider_states_setup_url {
        options = options.with_state_change_url(url.clone());
    } else if args.state_change_teardown {
        return Err(ConfigError::Missing("--state-change-teardown", "--provider-states-setup-url"));
    }
    for raw in &args.headers {
        let (name, value) = parse_custom_header(raw).map_err(|e| ConfigError::invalid("--header", e))?;
        options = options.with_custom_header(name, value);
    }
    if args.publish {
        let version = args
            .provider_app_version
            .clone()
            .ok_or(ConfigError::Missing("--publish", "--provider-app-version"))?;
        let mut version = ProviderVersion::new(version).with_tags(args.provider_tags.clone());
        if let Some(branch) = &args.provider_branch {
            version = version.with_branch(branch.clone());
        }
        options = options.with_publish(version);
    }
    options
        .validate()
        .map_err(|e| ConfigError::invalid("--provider-app-version", e))?;
    Ok(options)
}
