//! Metrics emitted through the `metrics` facade.
//!
//! The crate never installs a recorder; applications that want these numbers
//! install one (Prometheus, statsd, ...) before acquiring clients.

pub mod counters;
pub mod histograms;
pub mod labels;
