//! Shared plumbing for the pact contract-testing crates.
//!
//! This crate provides centralized implementations for:
//! - The `PactError` type with retryability classification
//! - HTTP client configuration and building
//! - Retry policies with exponential backoff
//! - Tracing subscriber initialisation
//! - In-process counters used by the mock server

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod http;
pub mod metrics;
pub mod retry;
pub mod tracing_config;

pub use error::{PactError, PactResult};
pub use http::{HttpConfig, build_http_client};
pub use metrics::{Counter, render_counters};
pub use retry::{RetryConfig, RetryPolicy};
pub use tracing_config::{LogFormat, TracingConfig, init_tracing};
