//! Verification results and their human and JSON renderings.

use pact_matching::Mismatch;
use pact_models::{InteractionTestResult, ProviderVersion, VerificationResult};
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt::Write as _;

/// What happened to one interaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", content = "details", rename_all = "lowercase")]
pub enum InteractionOutcome {
    /// The provider behaved as expected
    Passed,
    /// The provider answered differently
    Failed(Vec<Mismatch>),
    /// Verification could not complete
    Error(String),
    /// Not verified, with the reason
    Skipped(String),
}

impl InteractionOutcome {
    /// True unless the interaction failed or errored.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Passed | Self::Skipped(_))
    }
}

/// Result for one interaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionReport {
    /// Interaction description
    pub description: String,
    /// Provider state names
    pub states: Vec<String>,
    /// Outcome
    #[serde(flatten)]
    pub outcome: InteractionOutcome,
}

/// Results for one pact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PactReport {
    /// Consumer name
    pub consumer: String,
    /// Provider name
    pub provider: String,
    /// Where the pact came from
    pub origin: String,
    /// Per-interaction results in pact order
    pub interactions: Vec<InteractionReport>,
    /// URL results are published to
    #[serde(skip)]
    pub publish_url: Option<String>,
}

impl PactReport {
    /// True when no interaction failed or errored.
    #[must_use]
    pub fn success(&self) -> bool {
        self.interactions.iter().all(|i| i.outcome.is_success())
    }

    fn count(&self, predicate: impl Fn(&InteractionOutcome) -> bool) -> usize {
        self.interactions.iter().filter(|i| predicate(&i.outcome)).count()
    }

    /// The payload published to the broker.
    #[must_use]
    pub fn to_verification_result(&self, provider_version: &ProviderVersion) -> VerificationResult {
        let results = self
            .interactions
            .iter()
            .filter(|i| !matches!(i.outcome, InteractionOutcome::Skipped(_)))
            .map(|i| InteractionTestResult {
                interaction_description: i.description.clone(),
                success: i.outcome.is_success(),
                mismatches: match &i.outcome {
                    InteractionOutcome::Failed(mismatches) => mismatches.iter().map(Mismatch::to_json).collect(),
                    InteractionOutcome::Error(message) => vec![json!({"type": "error", "message": message})],
                    _ => Vec::new(),
                },
            })
            .collect();
        VerificationResult::new(provider_version, results)
    }
}

/// Results of a verification run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VerificationReport {
    /// Per-pact results
    pub pacts: Vec<PactReport>,
    /// Sources that could not be loaded, with the reason
    pub errors: Vec<String>,
}

impl VerificationReport {
    /// True when every pact passed and every source loaded.
    #[must_use]
    pub fn success(&self) -> bool {
        self.errors.is_empty() && self.pacts.iter().all(PactReport::success)
    }

    /// Machine readable report.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let pacts: Vec<Value> = self
            .pacts
            .iter()
            .map(|pact| {
                let mut value = serde_json::to_value(pact).unwrap_or(Value::Null);
                value["success"] = Value::Bool(pact.success());
                value
            })
            .collect();
        json!({
            "success": self.success(),
            "pacts": pacts,
            "errors": self.errors,
        })
    }

    /// Console report.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for pact in &self.pacts {
            let _ = writeln!(
                out,
                "\nVerifying a pact between {} and {} ({})",
                pact.consumer, pact.provider, pact.origin
            );
            for interaction in &pact.interactions {
                let states = if interaction.states.is_empty() {
                    String::new()
                } else {
                    format!(" given {}", interaction.states.join(", "))
                };
                let status = match &interaction.outcome {
                    InteractionOutcome::Passed => "OK".to_string(),
                    InteractionOutcome::Failed(_) => "FAILED".to_string(),
                    InteractionOutcome::Error(message) => format!("ERROR ({message})"),
                    InteractionOutcome::Skipped(reason) => format!("SKIPPED ({reason})"),
                };
                let _ = writeln!(out, "  {}{states} ... {status}", interaction.description);
                if let InteractionOutcome::Failed(mismatches) = &interaction.outcome {
                    for mismatch in mismatches {
                        let _ = writeln!(out, "      - {}: {mismatch}", mismatch.mismatch_type());
                    }
                }
            }
            let _ = writeln!(
                out,
                "  {} passed, {} failed, {} errors, {} skipped",
                pact.count(|o| matches!(o, InteractionOutcome::Passed)),
                pact.count(|o| matches!(o, InteractionOutcome::Failed(_))),
                pact.count(|o| matches!(o, InteractionOutcome::Error(_))),
                pact.count(|o| matches!(o, InteractionOutcome::Skipped(_))),
            );
        }
        for error in &self.errors {
            let _ = writeln!(out, "\nFailed to load pacts: {error}");
        }
        let verdict = if self.success() { "passed" } else { "failed" };
        let _ = writeln!(out, "\nVerification {verdict}");
        out
    }
}
