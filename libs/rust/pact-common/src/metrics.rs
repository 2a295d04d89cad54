//! Request counters.
//!
//! Each mock server keeps its own set; [`render_counters`] prints a set in
//! Prometheus text format for logs and debugging.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing counter.
#[derive(Debug)]
pub struct Counter {
    name: &'static str,
    help: &'static str,
    value: AtomicU64,
}

impl Counter {
    /// A counter at zero.
    #[must_use]
    pub const fn new(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            value: AtomicU64::new(0),
        }
    }

    /// Add one.
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Metric name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

/// Render `counters`, in order, as one Prometheus text block.
#[must_use]
pub fn render_counters(counters: &[&Counter]) -> String {
    counters.iter().fold(String::new(), |mut out, counter| {
        let _ = writeln!(out, "# HELP {} {}", counter.name, counter.help);
        let _ = writeln!(out, "# TYPE {} counter", counter.name);
        let _ = writeln!(out, "{} {}", counter.name, counter.get());
        out
    })
}
