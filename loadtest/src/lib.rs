//! Attendance API load test
//!
//! Drives ramping virtual users through the six-call attendance workload,
//! records k6-style metrics and evaluates pass/fail thresholds at the end.
//! A stub of the target API is included for local runs and tests.

pub mod cli;
pub mod config;
pub mod error;
pub mod metrics;
pub mod runner;
pub mod schedule;
pub mod stub;
pub mod summary;
pub mod thresholds;
pub mod workload;

// Re-export commonly used types
pub use config::Config;
pub use error::LoadTestError;
pub use metrics::{MetricsSnapshot, RunMetrics};
pub use runner::LoadTest;
pub use schedule::{RampSchedule, Stage};
pub use stub::{StubConfig, StubState, spawn_stub, stub_routes};
pub use summary::RunSummary;
pub use thresholds::Threshold;
pub use workload::{CheckResult, Endpoint, IterationOutcome, IterationRunner};
