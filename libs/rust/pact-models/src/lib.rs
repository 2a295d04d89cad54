//! Pact models.
//!
//! The matcher model (`EachLike`, `Like`, `Term`, `Format`) and the pact
//! document model: pacts, interactions, bodies, provider states, matching
//! rules and the pact file format for specification versions 1 to 4.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod body;
pub mod contract;
pub mod http;
pub mod integration_json;
pub mod interaction;
pub mod matchers;
pub mod matchingrules;
pub mod message;
pub mod pact_file;
pub mod path;
pub mod provider_states;
pub mod specification;
pub mod verification;

pub use body::{ContentType, OptionalBody};
pub use contract::{Pact, Participant};
pub use http::{Headers, HttpRequest, HttpResponse, Query};
pub use interaction::{
    AsynchronousMessage, Interaction, InteractionKind, InteractionPart, SynchronousHttp, SynchronousMessages,
};
pub use matchers::{EachLike, Format, Like, MAX_EACH_LIKE_MIN, Matcher, Term, from_term, get_generated_values};
pub use matchingrules::{Category, MatchingRule, MatchingRuleCategory, MatchingRules, RuleList, RuleLogic};
pub use message::MessageContents;
pub use path::DocPath;
pub use provider_states::ProviderState;
pub use specification::PactSpecification;
pub use verification::{InteractionTestResult, ProviderVersion, VerificationResult, VerifiedBy};
