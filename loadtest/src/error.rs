//! Error types for load test setup
//!
//! Nothing in here is produced by a running iteration: failed requests are
//! recorded as failed checks, never surfaced as errors.

use thiserror::Error;

/// Errors that can occur while configuring or starting a load test
#[derive(Debug, Error)]
pub enum LoadTestError {
    #[error("Invalid duration: {0:?}")]
    InvalidDuration(String),

    #[error("Invalid stage {0:?} (expected <duration>:<target>, e.g. 30s:10)")]
    InvalidStage(String),

    #[error("Ramp schedule has no stages")]
    EmptySchedule,

    #[error("Ramp schedule is too long")]
    ScheduleTooLong,

    #[error("Invalid threshold {expression:?}: {reason}")]
    InvalidThreshold { expression: String, reason: String },

    #[error("Unknown endpoint tag: {0}")]
    UnknownEndpoint(String),

    #[error("Invalid failure override {0:?} (expected <endpoint>=<status>, e.g. check-out=500)")]
    InvalidFailureOverride(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LoadTestError {
    pub(crate) fn threshold(expression: &str, reason: impl Into<String>) -> Self {
        Self::InvalidThreshold {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}
