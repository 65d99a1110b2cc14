//! Execution of one iteration: six sequential calls with fixed pacing

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use reqwest::Client;
use tracing::debug;

use super::requests::{Endpoint, TimeWindow, WorkloadParams, plan_request};
use crate::config::Config;
use crate::error::LoadTestError;
use crate::metrics::RunMetrics;

/// Outcome of a single named check
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub endpoint: Endpoint,
    pub name: &'static str,
    /// Response status, None if the request never got a response
    pub status: Option<u16>,
    pub passed: bool,
    pub latency: Duration,
}

/// All checks from one iteration, in call order
#[derive(Debug, Clone, Default)]
pub struct IterationOutcome {
    pub checks: Vec<CheckResult>,
}

impl IterationOutcome {
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.checks.len() - self.passed_count()
    }

    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }
}

/// Runs the fixed call sequence against one base URL
pub struct IterationRunner {
    client: Client,
    base_url: String,
    params: WorkloadParams,
    think_time: Duration,
    metrics: Arc<RunMetrics>,
}

impl IterationRunner {
    /// Build a runner with its own pooled HTTP client
    pub fn new(config: &Config, metrics: Arc<RunMetrics>) -> Result<Self, LoadTestError> {
        let client = Client::builder()
            .pool_max_idle_per_host(256)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config, metrics))
    }

    pub fn with_client(client: Client, config: &Config, metrics: Arc<RunMetrics>) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            params: config.workload.clone(),
            think_time: config.think_time,
            metrics,
        }
    }

    /// Issue all six calls in order.
    ///
    /// Failed checks are recorded and the sequence continues; this never
    /// returns early.
    pub async fn run_once(&self) -> IterationOutcome {
        let mut outcome = IterationOutcome {
            checks: Vec::with_capacity(Endpoint::SEQUENCE.len()),
        };
        // Computed right before the first call that needs it, then shared
        let mut window: Option<TimeWindow> = None;

        for (idx, endpoint) in Endpoint::SEQUENCE.into_iter().enumerate() {
            if idx > 0 && !self.think_time.is_zero() {
                tokio::time::sleep(self.think_time).await;
            }

            if endpoint.uses_window() && window.is_none() {
                window = Some(TimeWindow::ending_at(Utc::now()));
            }
            let check = self.call(endpoint, window.as_ref()).await;
            outcome.checks.push(check);
        }

        self.metrics.record_iteration();
        outcome
    }

    async fn call(&self, endpoint: Endpoint, window: Option<&TimeWindow>) -> CheckResult {
        let request = plan_request(endpoint, &self.params, window);
        let url = request.url(&self.base_url);

        let started = Instant::now();
        let response = self
            .client
            .request(request.method.clone(), &url)
            .query(&request.query)
            .send()
            .await;

        let status = match response {
            Ok(resp) => {
                let status = resp.status().as_u16();
                // Body is unused but still part of the measured duration
                if let Err(e) = resp.bytes().await {
                    debug!(endpoint = %endpoint, "Failed to read response body: {}", e);
                }
                Some(status)
            }
            Err(e) => {
                debug!(endpoint = %endpoint, "Request to {} failed: {}", url, e);
                None
            }
        };
        let latency = started.elapsed();

        let passed = status == Some(200);
        self.metrics.record_request(endpoint, status, latency).await;
        self.metrics.record_check(endpoint.check_name(), passed).await;

        CheckResult {
            endpoint,
            name: endpoint.check_name(),
            status,
            passed,
            latency,
        }
    }
}
