//! Provider state change requests.

use pact_common::{PactError, PactResult};
use pact_models::ProviderState;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, instrument};

/// Whether a state is being set up or torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    /// Before the interaction
    Setup,
    /// After the interaction
    Teardown,
}

impl StateAction {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Teardown => "teardown",
        }
    }
}

/// Ask the provider to set up or tear down a state.
///
/// The request is a `POST` of `{"state", "params", "action"}` to
/// `state_change_url`.
///
/// # Errors
///
/// Fails when the request cannot be sent or the provider answers with an
/// error status.
#[instrument(skip(client, state), fields(state = %state.name, action = action.as_str()))]
pub async fn change_state(
    client: &Client,
    state_change_url: &str,
    state: &ProviderState,
    action: StateAction,
) -> PactResult<()> {
    let body = json!({
        "state": state.name,
        "params": state.params,
        "action": action.as_str(),
    });
    let response = client.post(state_change_url).json(&body).send().await?;
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(PactError::invalid_input(format!(
            "State change for '{}' failed with {status}: {text}",
            state.name
        )));
    }
    debug!(status = status.as_u16(), "Provider state changed");
    Ok(())
}

/// Run `action` for every state, stopping at the first failure.
///
/// # Errors
///
/// Returns the first state change failure.
pub async fn change_states(
    client: &Client,
    state_change_url: &str,
    states: &[ProviderState],
    action: StateAction,
) -> PactResult<()> {
    for state in states {
        change_state(client, state_change_url, state, action).await?;
    }
    Ok(())
}
