//! Asynchronous producers for the bleach dashboard.
//!
//! Each producer does its blocking work on a tokio runtime and reports back
//! through an unbounded channel whose item type converts `From` the
//! producer's output:
//!
//! - [`AuthGate`] - one [`AuthOutcome`] per credential check
//! - [`ProcessRunner`] - a paced sequence of [`StreamEvent`]s per operation
//! - [`MetricsSampler`] - one [`MetricsSnapshot`] per interval, forever

pub mod auth;
pub mod metrics;
pub mod runner;

pub use auth::{AuthGate, AuthOutcome};
pub use metrics::{MetricsProbe, MetricsSampler, MetricsSnapshot, ResourceUsage, SystemProbe};
pub use runner::{ProcessRunner, StreamEvent, StreamHandle, StreamStatus};
