//! Load test configuration
//!
//! Defaults reproduce the reference test plan (10 VUs, 1s pacing, p95 < 500ms,
//! < 10% failed requests). Environment variables override the defaults and
//! CLI flags override both.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::LoadTestError;
use crate::schedule::RampSchedule;
use crate::thresholds::Threshold;
use crate::workload::WorkloadParams;

/// Main load test configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the attendance API, including the `/api` prefix
    pub base_url: String,
    /// Values substituted into request paths and queries
    pub workload: WorkloadParams,
    /// Fixed pause between consecutive calls of an iteration
    pub think_time: Duration,
    /// Per-request timeout applied by the HTTP client
    pub request_timeout: Duration,
    /// Time in-flight iterations get to finish once the schedule ends
    pub graceful_stop: Duration,
    /// Target VU levels over time
    pub stages: RampSchedule,
    /// Pass/fail criteria evaluated at the end of the run
    pub thresholds: Vec<Threshold>,
    /// Write the JSON summary here when set
    pub summary_export: Option<PathBuf>,
    /// Serve Prometheus metrics on this address when set
    pub prometheus_listen: Option<SocketAddr>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            workload: WorkloadParams::default(),
            think_time: Duration::from_secs(1),
            request_timeout: Duration::from_secs(60),
            graceful_stop: Duration::from_secs(30),
            stages: RampSchedule::default(),
            thresholds: Threshold::defaults(),
            summary_export: None,
            prometheus_listen: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, LoadTestError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Malformed numbers are ignored and keep their default; malformed stages
    /// or thresholds are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LoadTestError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("LOADTEST_BASE_URL")
            && !url.is_empty()
        {
            config.base_url = url;
        }
        if let Some(val) = lookup("LOADTEST_EMPLOYEE_ID")
            && let Ok(id) = val.parse()
        {
            config.workload.employee_id = id;
        }
        if let Some(val) = lookup("LOADTEST_THINK_TIME_MS")
            && let Ok(ms) = val.parse::<u64>()
        {
            config.think_time = Duration::from_millis(ms);
        }
        if let Some(val) = lookup("LOADTEST_REQUEST_TIMEOUT_SECS")
            && let Ok(secs) = val.parse::<u64>()
            && secs > 0
        {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(val) = lookup("LOADTEST_GRACEFUL_STOP_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            config.graceful_stop = Duration::from_secs(secs);
        }

        if let Some(val) = lookup("LOADTEST_STAGES")
            && !val.trim().is_empty()
        {
            config.stages = RampSchedule::parse_list(&val)?;
        }
        if let Some(val) = lookup("LOADTEST_THRESHOLDS")
            && !val.trim().is_empty()
        {
            config.thresholds = Threshold::parse_list(&val)?;
        }

        if let Some(path) = lookup("LOADTEST_SUMMARY_EXPORT")
            && !path.is_empty()
        {
            config.summary_export = Some(PathBuf::from(path));
        }
        if let Some(val) = lookup("LOADTEST_PROMETHEUS_LISTEN")
            && let Ok(addr) = val.parse()
        {
            config.prometheus_listen = Some(addr);
        }

        Ok(config)
    }
}
