//! The `pact-verifier` command.
//!
//! Parses options (from the command line, the environment or a `.env`
//! file), verifies the provider and maps the result to an exit code:
//! `0` passed, `1` verification failed, `2` invalid options or pacts that
//! could not be loaded.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;

pub use config::{Args, Config};
pub use error::ConfigError;

use anyhow::Context;
use pact_verifier::{VerificationReport, verify_provider};
use std::process::ExitCode;
use tracing::{info, warn};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every interaction passed
    Passed,
    /// At least one interaction failed or errored
    Failed,
    /// The run could not be set up, or pacts could not be loaded
    Invalid,
}

impl Outcome {
    /// Classify a finished run.
    #[must_use]
    pub fn of(report: &VerificationReport) -> Self {
        if !report.errors.is_empty() {
            Self::Invalid
        } else if report.success() {
            Self::Passed
        } else {
            Self::Failed
        }
    }

    /// Process exit code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Passed => 0,
            Self::Failed => 1,
            Self::Invalid => 2,
        }
    }
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        Self::from(outcome.code())
    }
}

/// Verify the provider described by `config`, print the report and write
/// the JSON report when asked to.
///
/// # Errors
///
/// Fails when the verifier cannot be created or the JSON report cannot be
/// written.
pub async fn run(config: Config) -> anyhow::Result<Outcome> {
    info!(
        provider = %config.provider.name,
        base_url = %config.provider.base_url(),
        sources = config.sources.len(),
        "Verifying provider"
    );
    let report = verify_provider(config.provider, &config.sources, config.filter, config.options)
        .await
        .context("Failed to start verification")?;

    print!("{}", report.render());

    if let Some(path) = &config.json_report {
        let json = serde_json::to_string_pretty(&report.to_json())?;
        std::fs::write(path, json).with_context(|| format!("Failed to write JSON report to {}", path.display()))?;
        info!(path = %path.display(), "JSON report written");
    }

    let outcome = Outcome::of(&report);
    if outcome != Outcome::Passed {
        warn!(outcome = ?outcome, errors = report.errors.len(), "Verification did not pass");
    }
    Ok(outcome)
}
