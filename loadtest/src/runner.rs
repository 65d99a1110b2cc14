//! Ramping virtual-user executor
//!
//! A controller loop follows the `RampSchedule`, publishing the current target
//! on a watch channel and spawning VU tasks for ids below it. Each VU runs
//! iterations back to back and exits once its id is at or above the target,
//! always finishing the iteration it is in.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::LoadTestError;
use crate::metrics::RunMetrics;
use crate::schedule::format_duration;
use crate::summary::RunSummary;
use crate::workload::{IterationOutcome, IterationRunner};

/// How often the controller re-evaluates the target VU count
const CONTROL_TICK: Duration = Duration::from_millis(100);

/// How often progress is logged
const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

/// A configured load test run
pub struct LoadTest {
    config: Config,
    runner: Arc<IterationRunner>,
    metrics: Arc<RunMetrics>,
}

impl LoadTest {
    pub fn new(config: Config) -> Result<Self, LoadTestError> {
        let metrics = Arc::new(RunMetrics::new());
        let runner = Arc::new(IterationRunner::new(&config, metrics.clone())?);
        Ok(Self {
            config,
            runner,
            metrics,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<RunMetrics> {
        &self.metrics
    }

    /// Run a single iteration on one VU
    pub async fn run_once(&self) -> IterationOutcome {
        self.metrics.observe_vus(1);
        let outcome = self.runner.run_once().await;
        self.metrics.observe_vus(0);
        outcome
    }

    /// Run the full ramp schedule
    pub async fn run(&self) -> RunSummary {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Run the ramp schedule, ending early when `shutdown` completes.
    ///
    /// Either way in-flight iterations get `graceful_stop` to finish before
    /// they are aborted, and the summary covers everything recorded.
    pub async fn run_with_shutdown<F>(&self, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        let schedule = &self.config.stages;
        let total = schedule.total_duration();
        info!(
            "Starting load test against {}: up to {} VUs over {}",
            self.config.base_url,
            schedule.max_target(),
            format_duration(total)
        );

        let started_at = Utc::now();
        let start = Instant::now();
        let (target_tx, target_rx) = watch::channel(0u32);
        let mut vus: Vec<Option<JoinHandle<()>>> = Vec::new();

        let mut ticker = tokio::time::interval(CONTROL_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_progress = Instant::now();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut shutdown => {
                    warn!("Shutdown requested, stopping after {}", format_duration(start.elapsed()));
                    break;
                }
            }

            let elapsed = start.elapsed();
            if elapsed >= total {
                break;
            }

            let target = schedule.target_at(elapsed);
            target_tx.send_replace(target);

            for id in 0..target as usize {
                if vus.len() <= id {
                    vus.push(None);
                }
                let running = vus[id].as_ref().is_some_and(|h| !h.is_finished());
                if !running {
                    vus[id] = Some(spawn_vu(id as u32, self.runner.clone(), target_rx.clone()));
                }
            }

            let active = vus.iter().flatten().filter(|h| !h.is_finished()).count();
            self.metrics.observe_vus(active as u64);

            if last_progress.elapsed() >= PROGRESS_INTERVAL {
                info!(
                    elapsed = %format_duration(elapsed),
                    target,
                    active,
                    iterations = self.metrics.iterations(),
                    http_reqs = self.metrics.http_reqs(),
                    "Load test progress"
                );
                last_progress = Instant::now();
            }
        }

        // Schedule over: VUs exit after their current iteration
        target_tx.send_replace(0);
        let mut handles: Vec<JoinHandle<()>> = vus.into_iter().flatten().collect();
        let in_flight = handles.iter().filter(|h| !h.is_finished()).count();
        if in_flight > 0 {
            info!(
                "Waiting up to {} for {} in-flight iterations",
                format_duration(self.config.graceful_stop),
                in_flight
            );
        }

        let drained =
            tokio::time::timeout(self.config.graceful_stop, join_all(handles.iter_mut())).await;
        if drained.is_err() {
            let interrupted = handles.iter().filter(|h| !h.is_finished()).count() as u64;
            for handle in &handles {
                handle.abort();
            }
            warn!("Graceful stop expired, interrupted {} iterations", interrupted);
            self.metrics.record_interrupted(interrupted);
        }
        self.metrics.observe_vus(0);

        let snapshot = self.metrics.snapshot(start.elapsed()).await;
        info!(
            "Load test finished: {} iterations, {} requests in {}",
            snapshot.iterations,
            snapshot.http_reqs,
            format_duration(snapshot.elapsed)
        );
        RunSummary::new(started_at, &snapshot, &self.config.thresholds)
    }
}

/// Spawn one virtual user
fn spawn_vu(
    id: u32,
    runner: Arc<IterationRunner>,
    target: watch::Receiver<u32>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(vu = id, "VU started");
        loop {
            let current = *target.borrow();
            if id >= current {
                break;
            }
            runner.run_once().await;
        }
        debug!(vu = id, "VU stopped");
    })
}
