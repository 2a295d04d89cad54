//! Pact mock server.
//!
//! Serves the HTTP interactions of a pact so a consumer can be tested
//! against it:
//! - A request matching an interaction is answered with its response
//! - A request resembling an interaction is answered with `500` and recorded
//!   as a `request-mismatch`
//! - Any other request is answered with `500` and recorded as a
//!   `request-not-found`
//! - Interactions never requested are reported as `missing-request`

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod outcome;
pub mod server;

pub use config::MockServerConfig;
pub use outcome::MockOutcome;
pub use server::{MockServer, MockServerMetrics};
