//! End-of-run summary: console rendering and JSON export

use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metrics::{CheckTally, DurationSummary, MetricsSnapshot};
use crate::schedule::format_duration;
use crate::thresholds::{Threshold, ThresholdResult};

/// Per-check totals in the order checks were first seen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSummary {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

/// Aggregated results of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub vus_max: u64,
    pub iterations: u64,
    pub interrupted_iterations: u64,
    pub http_reqs: u64,
    pub http_req_failed: u64,
    pub http_req_failed_rate: f64,
    pub http_req_duration: DurationSummary,
    pub checks_passed: u64,
    pub checks_failed: u64,
    pub checks: Vec<CheckSummary>,
    pub thresholds: Vec<ThresholdResult>,
    /// True when every threshold passed
    pub passed: bool,
}

impl RunSummary {
    /// Build the summary and evaluate thresholds against the snapshot
    pub fn new(
        started_at: DateTime<Utc>,
        snapshot: &MetricsSnapshot,
        thresholds: &[Threshold],
    ) -> Self {
        let thresholds: Vec<ThresholdResult> =
            thresholds.iter().map(|t| t.evaluate(snapshot)).collect();
        let passed = thresholds.iter().all(|t| t.passed);

        Self {
            run_id: Uuid::new_v4(),
            started_at,
            duration_secs: snapshot.elapsed.as_secs_f64(),
            vus_max: snapshot.vus_max,
            iterations: snapshot.iterations,
            interrupted_iterations: snapshot.interrupted_iterations,
            http_reqs: snapshot.http_reqs,
            http_req_failed: snapshot.http_req_failed,
            http_req_failed_rate: snapshot.http_req_failed_rate().unwrap_or(0.0),
            http_req_duration: snapshot.durations.summary(),
            checks_passed: snapshot.checks_passed(),
            checks_failed: snapshot.checks_failed(),
            checks: snapshot
                .checks
                .iter()
                .map(|(name, CheckTally { passes, fails })| CheckSummary {
                    name: name.to_string(),
                    passes: *passes,
                    fails: *fails,
                })
                .collect(),
            thresholds,
            passed,
        }
    }

    /// Console report
    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = "═══════════════════════════════════════════════════════════════";
        let d = &self.http_req_duration;
        let elapsed = format_duration(Duration::from_millis((self.duration_secs * 1000.0) as u64));

        let _ = writeln!(out);
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, " RESULTS: run {} ({})", self.run_id, elapsed);
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out);

        let _ = writeln!(out, " ─── Checks ──────────────────────────────────────────────────");
        let _ = writeln!(out);
        for check in &self.checks {
            let mark = if check.fails == 0 { "✓" } else { "✗" };
            let _ = write!(out, "   {} {}", mark, check.name);
            if check.fails > 0 {
                let total = check.passes + check.fails;
                let _ = write!(
                    out,
                    "  ({:.0}%, ✓ {} / ✗ {})",
                    check.passes as f64 / total as f64 * 100.0,
                    check.passes,
                    check.fails
                );
            }
            let _ = writeln!(out);
        }
        let _ = writeln!(out);

        let checks_total = self.checks_passed + self.checks_failed;
        let checks_pct = if checks_total > 0 {
            self.checks_passed as f64 / checks_total as f64 * 100.0
        } else {
            0.0
        };
        let _ = writeln!(out, " ─── Metrics ─────────────────────────────────────────────────");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "   checks.............: {:.2}%  ✓ {}  ✗ {}",
            checks_pct, self.checks_passed, self.checks_failed
        );
        let _ = writeln!(
            out,
            "   http_req_duration..: avg={:.1}ms min={:.1}ms med={:.1}ms max={:.1}ms p(90)={:.1}ms p(95)={:.1}ms",
            d.avg_ms, d.min_ms, d.med_ms, d.max_ms, d.p90_ms, d.p95_ms
        );
        let _ = writeln!(
            out,
            "   http_req_failed....: {:.2}%  ({} of {})",
            self.http_req_failed_rate * 100.0,
            self.http_req_failed,
            self.http_reqs
        );
        let rps = if self.duration_secs > 0.0 {
            self.http_reqs as f64 / self.duration_secs
        } else {
            0.0
        };
        let _ = writeln!(out, "   http_reqs..........: {}  ({:.1}/s)", self.http_reqs, rps);
        let _ = writeln!(
            out,
            "   iterations.........: {}  (interrupted: {})",
            self.iterations, self.interrupted_iterations
        );
        let _ = writeln!(out, "   vus_max............: {}", self.vus_max);
        let _ = writeln!(out);

        if !self.thresholds.is_empty() {
            let _ = writeln!(out, " ─── Thresholds ──────────────────────────────────────────────");
            let _ = writeln!(out);
            for t in &self.thresholds {
                let observed = t
                    .observed
                    .map(|v| format!("{:.3}", v))
                    .unwrap_or_else(|| "n/a".to_string());
                let status = if t.passed { "[OK]" } else { "[FAIL]" };
                let _ = writeln!(
                    out,
                    "   {:18} {:>14}   observed {:>10}   {}",
                    t.metric.as_str(),
                    t.expression,
                    observed,
                    status
                );
            }
            let _ = writeln!(out);
        }

        let _ = writeln!(out, "{}", rule);
        let overall = if self.passed {
            "PASS"
        } else {
            "FAIL (threshold crossed)"
        };
        let _ = writeln!(out, " OVERALL: {}", overall);
        let _ = writeln!(out, "{}", rule);
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the summary as pretty JSON
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
