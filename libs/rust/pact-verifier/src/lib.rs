//! Provider verification.
//!
//! Loads the pacts a provider's consumers wrote, replays each interaction
//! against the running provider and reports whether it behaves as the
//! consumers expect:
//! - HTTP interactions replay the expected request and match the response
//! - Asynchronous messages are requested from the provider and matched
//! - Provider states are set up (and optionally torn down) through a state
//!   change URL
//! - Results can be published back to the pact broker

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod filter;
pub mod options;
pub mod provider;
pub mod publish;
pub mod replay;
pub mod report;
pub mod source;
pub mod state;
pub mod verifier;

pub use filter::FilterInfo;
pub use options::{VerificationOptions, parse_custom_header};
pub use provider::ProviderInfo;
pub use report::{InteractionOutcome, InteractionReport, PactReport, VerificationReport};
pub use source::{HttpAuth, LoadedPact, PactLoader, PactSource};
pub use verifier::Verifier;

use pact_common::PactResult;

/// Verify `provider` against every pact from `sources`.
///
/// # Errors
///
/// Fails only when the verifier cannot be created; loading and verification
/// problems are part of the report.
pub async fn verify_provider(
    provider: ProviderInfo,
    sources: &[PactSource],
    filter: FilterInfo,
    options: VerificationOptions,
) -> PactResult<VerificationReport> {
    let verifier = Verifier::new(provider, filter, options)?;
    Ok(verifier.verify(sources).await)
}
