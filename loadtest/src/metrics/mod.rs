//! Run metrics: request latency, failure rate, checks and iteration counts

mod latency;
mod recorder;

pub use latency::{DurationSummary, LatencyStats};
pub use recorder::{CheckTally, MetricsSnapshot, RunMetrics, is_expected_status};
