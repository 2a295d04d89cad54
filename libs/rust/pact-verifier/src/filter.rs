//! Selecting which interactions to verify.

use pact_common::{PactError, PactResult};
use pact_models::Interaction;
use regex::Regex;

/// Interaction filter. An empty filter selects everything.
#[derive(Debug, Clone, Default)]
pub struct FilterInfo {
    description: Option<Regex>,
    state: Option<Regex>,
    no_state: bool,
}

fn compile(pattern: &str, what: &str) -> PactResult<Regex> {
    Regex::new(pattern).map_err(|e| PactError::invalid_input(format!("Invalid {what} filter '{pattern}': {e}")))
}

impl FilterInfo {
    /// Only interactions whose description matches `pattern`.
    ///
    /// # Errors
    ///
    /// Returns `PactError::InvalidInput` for an invalid regex.
    pub fn with_description(mut self, pattern: &str) -> PactResult<Self> {
        self.description = Some(compile(pattern, "description")?);
        Ok(self)
    }

    /// Only interactions with a provider state matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns `PactError::InvalidInput` for an invalid regex.
    pub fn with_state(mut self, pattern: &str) -> PactResult<Self> {
        self.state = Some(compile(pattern, "state")?);
        Ok(self)
    }

    /// Only interactions without provider states.
    #[must_use]
    pub const fn with_no_state(mut self) -> Self {
        self.no_state = true;
        self
    }

    /// True when no criteria are set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.description.is_none() && self.state.is_none() && !self.no_state
    }

    /// Whether `interaction` is selected.
    ///
    /// An empty state pattern also selects interactions without states.
    #[must_use]
    pub fn matches(&self, interaction: &Interaction) -> bool {
        let description_ok = self
            .description
            .as_ref()
            .is_none_or(|regex| regex.is_match(interaction.description()));
        let states = interaction.provider_states();
        let state_ok = self.state.as_ref().is_none_or(|regex| {
            if regex.as_str().is_empty() {
                states.is_empty()
            } else {
                states.iter().any(|state| regex.is_match(&state.name))
            }
        });
        let no_state_ok = !self.no_state || states.is_empty();
        description_ok && state_ok && no_state_ok
    }
}
