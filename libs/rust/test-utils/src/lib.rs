//! Shared test utilities for the pact crates.
//!
//! This crate provides:
//! - Proptest generators for names, HTTP parts and JSON documents
//! - Sample pact files for every specification version

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

pub use generators::*;
