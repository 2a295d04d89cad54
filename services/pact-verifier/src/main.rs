//! Entry point of the `pact-verifier` command.

use clap::Parser;
use pact_common::init_tracing;
use pact_verifier_cli::{Args, Config, Outcome, run};
use std::process::ExitCode;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = match Config::from_args(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return Outcome::Invalid.into();
        }
    };
    init_tracing(&config.tracing);

    match run(config).await {
        Ok(outcome) => outcome.into(),
        Err(e) => {
            error!(error = %e, "Verification aborted");
            eprintln!("error: {e:#}");
            Outcome::Invalid.into()
        }
    }
}
