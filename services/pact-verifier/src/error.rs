//! Command line configuration errors.

use thiserror::Error;

/// Why the command line could not be turned into a verification run.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No pact file, directory, URL or broker was given
    #[error("No pacts to verify: pass --file, --dir, --url or --broker-url")]
    NoSources,

    /// Two options exclude each other
    #[error("{0} and {1} cannot be used together")]
    Conflict(&'static str, &'static str),

    /// An option needs another one
    #[error("{0} requires {1}")]
    Missing(&'static str, &'static str),

    /// An option value is malformed
    #[error("Invalid {option}: {reason}")]
    Invalid {
        /// Option name
        option: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

impl ConfigError {
    /// Invalid value for `option`.
    pub fn invalid(option: &'static str, reason: impl ToString) -> Self {
        Self::Invalid {
            option,
            reason: reason.to_string(),
        }
    }
}
