//! The verification run: load pacts, replay every interaction against the
//! provider and compare what it does with what the consumer expects.

use crate::filter::FilterInfo;
use crate::options::VerificationOptions;
use crate::provider::ProviderInfo;
use crate::publish::{publish_results, tag_provider_version};
use crate::replay::{ReplaySettings, replay_request, request_message};
use crate::report::{InteractionOutcome, InteractionReport, PactReport, VerificationReport};
use crate::source::{HttpAuth, LoadedPact, PactLoader, PactSource};
use crate::state::{StateAction, change_states};
use pact_common::{HttpConfig, PactResult, RetryPolicy, build_http_client};
use pact_matching::{match_message, match_response};
use pact_models::Interaction;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

/// Verifies a provider against pacts.
#[derive(Debug, Clone)]
pub struct Verifier {
    client: Client,
    loader: PactLoader,
    provider: ProviderInfo,
    filter: FilterInfo,
    options: VerificationOptions,
}

impl Verifier {
    /// Create a verifier.
    ///
    /// # Errors
    ///
    /// Fails when the options are inconsistent or the HTTP client cannot be
    /// built.
    pub fn new(provider: ProviderInfo, filter: FilterInfo, options: VerificationOptions) -> PactResult<Self> {
        options.validate()?;
        let client = build_http_client(&HttpConfig::default().with_timeout(options.request_timeout))?;
        let loader = PactLoader::new(client.clone(), RetryPolicy::new(options.retry.clone()));
        Ok(Self {
            client,
            loader,
            provider,
            filter,
            options,
        })
    }

    /// The provider being verified.
    #[must_use]
    pub const fn provider(&self) -> &ProviderInfo {
        &self.provider
    }

    /// Verify every pact from every source.
    ///
    /// Sources that fail to load are recorded in the report and fail the
    /// run; the remaining sources are still verified.
    pub async fn verify(&self, sources: &[PactSource]) -> VerificationReport {
        let mut report = VerificationReport::default();
        for source in sources {
            let pacts = match self.loader.load(source).await {
                Ok(pacts) => pacts,
                Err(error) => {
                    warn!(source = %source, error = %error, "Failed to load pacts");
                    report.errors.push(format!("{source}: {error}"));
                    continue;
                }
            };
            let auth = source_auth(source);
            for loaded in &pacts {
                let pact_report = self.verify_pact(loaded).await;
                if self.options.publish {
                    if let Err(error) = self.publish(&pact_report, auth).await {
                        report
                            .errors
                            .push(format!("Publishing results for {}: {error}", pact_report.consumer));
                    }
                }
                report.pacts.push(pact_report);
            }
            if self.options.publish {
                if let PactSource::Broker { url, .. } = source {
                    if let Some(version) = &self.options.provider_version {
                        if let Err(error) = tag_provider_version(&self.client, url, &self.provider.name, version, auth).await {
                            report.errors.push(format!("Tagging provider version: {error}"));
                        }
                    }
                }
            }
        }
        info!(
            pacts = report.pacts.len(),
            errors = report.errors.len(),
            success = report.success(),
            "Verification finished"
        );
        report
    }

    async fn publish(&self, report: &PactReport, auth: Option<&HttpAuth>) -> PactResult<()> {
        if let Some(version) = &self.options.provider_version {
            publish_results(&self.client, report, version, auth).await?;
        }
        Ok(())
    }

    /// Verify the interactions of one pact that pass the filter.
    #[instrument(skip_all, fields(consumer = %loaded.pact.consumer.name, origin = %loaded.origin))]
    pub async fn verify_pact(&self, loaded: &LoadedPact) -> PactReport {
        let pact = &loaded.pact;
        if pact.provider.name != self.provider.name {
            warn!(
                pact_provider = %pact.provider.name,
                provider = %self.provider.name,
                "Pact was written for a different provider"
            );
        }
        let mut interactions = Vec::new();
        for interaction in pact.interactions.iter().filter(|i| self.filter.matches(i)) {
            let outcome = self.verify_interaction(interaction).await;
            debug!(description = interaction.description(), outcome = ?outcome, "Verified interaction");
            interactions.push(InteractionReport {
                description: interaction.description().to_string(),
                states: interaction.provider_states().iter().map(|s| s.name.clone()).collect(),
                outcome,
            });
        }
        PactReport {
            consumer: pact.consumer.name.clone(),
            provider: pact.provider.name.clone(),
            origin: loaded.origin.clone(),
            interactions,
            publish_url: loaded.publish_url.clone(),
        }
    }

    /// Verify one interaction: set up its states, exercise the provider,
    /// then tear the states down when configured to.
    pub async fn verify_interaction(&self, interaction: &Interaction) -> InteractionOutcome {
        if matches!(interaction, Interaction::SynchronousMessages(_)) {
            return InteractionOutcome::Skipped("synchronous message interactions are not verified".to_string());
        }

        let states = interaction.provider_states();
        if let Some(url) = &self.options.state_change_url {
            if let Err(error) = change_states(&self.client, url, states, StateAction::Setup).await {
                return InteractionOutcome::Error(format!("Provider state setup failed: {error}"));
            }
        } else if !states.is_empty() {
            debug!(states = states.len(), "No state change URL, provider states are not set up");
        }

        let outcome = match self.exercise(interaction).await {
            Ok(mismatches) if mismatches.is_empty() => InteractionOutcome::Passed,
            Ok(mismatches) => InteractionOutcome::Failed(mismatches),
            Err(error) => InteractionOutcome::Error(error.to_string()),
        };

        if self.options.state_change_teardown {
            if let Some(url) = &self.options.state_change_url {
                if let Err(error) = change_states(&self.client, url, states, StateAction::Teardown).await {
                    warn!(error = %error, "Provider state teardown failed");
                }
            }
        }
        outcome
    }

    async fn exercise(&self, interaction: &Interaction) -> PactResult<Vec<pact_matching::Mismatch>> {
        let settings = ReplaySettings {
            custom_headers: &self.options.custom_headers,
            timeout: self.options.request_timeout,
        };
        match interaction {
            Interaction::SynchronousHttp(http) => {
                let actual = replay_request(&self.client, &self.provider, &http.request, settings).await?;
                Ok(match_response(&http.response, &actual))
            }
            Interaction::AsynchronousMessage(message) => {
                let actual = request_message(
                    &self.client,
                    &self.provider,
                    &message.description,
                    &message.provider_states,
                    settings,
                )
                .await?;
                Ok(match_message(&message.contents, &actual))
            }
            Interaction::SynchronousMessages(_) => Ok(Vec::new()),
        }
    }
}

const fn source_auth(source: &PactSource) -> Option<&HttpAuth> {
    match source {
        PactSource::Url { auth, .. } | PactSource::Broker { auth, .. } => auth.as_ref(),
        PactSource::File(_) | PactSource::Dir(_) => None,
    }
}
