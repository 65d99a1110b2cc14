//! Shared metrics sink for all virtual users
//!
//! Counters are atomics; latency samples and check tallies sit behind async
//! mutexes. Every update is mirrored to the `metrics` facade so an installed
//! exporter (Prometheus) sees the same numbers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::latency::LatencyStats;
use crate::workload::Endpoint;

/// Whether a response counts as successful for `http_req_failed`.
///
/// Anything in 200..=399 is expected; a missing status (transport error) is not.
pub fn is_expected_status(status: Option<u16>) -> bool {
    matches!(status, Some(200..=399))
}

/// Pass/fail counts for one named check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckTally {
    pub passes: u64,
    pub fails: u64,
}

impl CheckTally {
    pub fn total(&self) -> u64 {
        self.passes + self.fails
    }
}

/// Metrics collected over one run
#[derive(Debug, Default)]
pub struct RunMetrics {
    http_reqs: AtomicU64,
    http_req_failed: AtomicU64,
    iterations: AtomicU64,
    interrupted_iterations: AtomicU64,
    vus_max: AtomicU64,
    durations: Mutex<LatencyStats>,
    checks: Mutex<IndexMap<&'static str, CheckTally>>,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished request (or a transport failure when `status` is None)
    pub async fn record_request(&self, endpoint: Endpoint, status: Option<u16>, latency: Duration) {
        self.http_reqs.fetch_add(1, Ordering::SeqCst);
        let expected = is_expected_status(status);
        if !expected {
            self.http_req_failed.fetch_add(1, Ordering::SeqCst);
        }
        self.durations.lock().await.record(latency);

        metrics::counter!(
            "loadtest_http_reqs_total",
            "endpoint" => endpoint.tag(),
            "expected" => if expected { "true" } else { "false" }
        )
        .increment(1);
        metrics::histogram!("loadtest_http_req_duration_ms", "endpoint" => endpoint.tag())
            .record(latency.as_secs_f64() * 1000.0);
    }

    /// Record the outcome of a named check
    pub async fn record_check(&self, name: &'static str, passed: bool) {
        {
            let mut checks = self.checks.lock().await;
            let tally = checks.entry(name).or_default();
            if passed {
                tally.passes += 1;
            } else {
                tally.fails += 1;
            }
        }

        metrics::counter!(
            "loadtest_checks_total",
            "check" => name,
            "result" => if passed { "pass" } else { "fail" }
        )
        .increment(1);
    }

    pub fn record_iteration(&self) {
        self.iterations.fetch_add(1, Ordering::SeqCst);
        metrics::counter!("loadtest_iterations_total").increment(1);
    }

    pub fn record_interrupted(&self, count: u64) {
        self.interrupted_iterations.fetch_add(count, Ordering::SeqCst);
    }

    /// Update the active VU gauge and the high-water mark
    pub fn observe_vus(&self, active: u64) {
        self.vus_max.fetch_max(active, Ordering::SeqCst);
        metrics::gauge!("loadtest_vus").set(active as f64);
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::SeqCst)
    }

    pub fn http_reqs(&self) -> u64 {
        self.http_reqs.load(Ordering::SeqCst)
    }

    /// Take a consistent-enough copy of everything collected so far
    pub async fn snapshot(&self, elapsed: Duration) -> MetricsSnapshot {
        let durations = self.durations.lock().await.clone();
        let checks = self.checks.lock().await.clone();

        MetricsSnapshot {
            elapsed,
            http_reqs: self.http_reqs.load(Ordering::SeqCst),
            http_req_failed: self.http_req_failed.load(Ordering::SeqCst),
            iterations: self.iterations.load(Ordering::SeqCst),
            interrupted_iterations: self.interrupted_iterations.load(Ordering::SeqCst),
            vus_max: self.vus_max.load(Ordering::SeqCst),
            durations,
            checks,
        }
    }
}

/// Point-in-time copy of `RunMetrics`, used for thresholds and the summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub elapsed: Duration,
    pub http_reqs: u64,
    pub http_req_failed: u64,
    pub iterations: u64,
    pub interrupted_iterations: u64,
    pub vus_max: u64,
    pub durations: LatencyStats,
    pub checks: IndexMap<&'static str, CheckTally>,
}

impl MetricsSnapshot {
    /// Fraction of requests that failed, or None when no request was made
    pub fn http_req_failed_rate(&self) -> Option<f64> {
        (self.http_reqs > 0).then(|| self.http_req_failed as f64 / self.http_reqs as f64)
    }

    /// Fraction of all checks that passed, or None when no check ran
    pub fn checks_rate(&self) -> Option<f64> {
        let (passes, total) = self
            .checks
            .values()
            .fold((0u64, 0u64), |(p, t), tally| (p + tally.passes, t + tally.total()));
        (total > 0).then(|| passes as f64 / total as f64)
    }

    pub fn checks_passed(&self) -> u64 {
        self.checks.values().map(|t| t.passes).sum()
    }

    pub fn checks_failed(&self) -> u64 {
        self.checks.values().map(|t| t.fails).sum()
    }
}
