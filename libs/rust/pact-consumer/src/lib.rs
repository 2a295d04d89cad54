//! Consumer DSL.
//!
//! Declares the interactions a consumer expects from a provider, serves them
//! from a mock server for the consumer's tests and writes the resulting pact
//! file.
//!
//! ```no_run
//! use pact_consumer::prelude::*;
//! use serde_json::{Value, json};
//!
//! # async fn run() -> pact_common::PactResult<()> {
//! let mut pact = Pact::new("web-frontend", "user-service")?;
//! pact.upon_receiving("a request for user 1")
//!     .given("user 1 exists")
//!     .with_request("GET", "/users/1")?
//!     .will_respond_with(200)?
//!     .with_json_body(&json!({"id": 1, "name": Value::from(Like::new("Mary"))}), None)?;
//!
//! let server = pact.serve("127.0.0.1", 0, "http", None).await?;
//! let url = server.join("/users/1")?;
//! # let _ = url;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod editor;
pub mod interaction;
pub mod pact;
pub mod server;

pub use interaction::{AsyncMessageInteraction, HttpInteraction, InteractionBuilder, SyncMessageInteraction};
pub use pact::Pact;
pub use server::PactServer;

/// Everything needed to write consumer tests.
pub mod prelude {
    pub use crate::interaction::{AsyncMessageInteraction, HttpInteraction, InteractionBuilder, SyncMessageInteraction};
    pub use crate::pact::Pact;
    pub use crate::server::PactServer;
    pub use pact_models::{EachLike, Format, InteractionKind, InteractionPart, Like, PactSpecification, Term};
}
