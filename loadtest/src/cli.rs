//! Command line arguments

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::Config;
use crate::error::LoadTestError;
use crate::schedule::{RampSchedule, Stage};
use crate::stub::{StubConfig, parse_failure_override};
use crate::thresholds::Threshold;

/// Attendance API load test
#[derive(Parser, Debug)]
#[command(name = "attendance-loadtest")]
#[command(about = "Ramping load test for the attendance API")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the full ramp schedule and evaluate thresholds
    Run(TargetArgs),

    /// Run a single iteration on one VU and print each check
    Once(TargetArgs),

    /// Serve a stub of the attendance API (runs until Ctrl+C)
    Stub(StubArgs),
}

/// Overrides applied on top of the environment configuration
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Base URL of the API, including the /api prefix
    #[arg(long)]
    pub base_url: Option<String>,

    /// Employee id used in attendance paths
    #[arg(long)]
    pub employee_id: Option<u64>,

    /// Pause between consecutive calls, in milliseconds
    #[arg(long)]
    pub think_time_ms: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: Option<u64>,

    /// Time in-flight iterations get to finish, in seconds
    #[arg(long)]
    pub graceful_stop_secs: Option<u64>,

    /// Ramp stage as <duration>:<target>, repeatable (e.g. --stage 30s:10)
    #[arg(long = "stage", value_name = "STAGE")]
    pub stages: Vec<Stage>,

    /// Threshold as <metric>:<expression>, repeatable (e.g. http_req_duration:p(95)<500)
    #[arg(long = "threshold", value_name = "THRESHOLD")]
    pub thresholds: Vec<Threshold>,

    /// Write the JSON summary to this file
    #[arg(long)]
    pub summary_export: Option<PathBuf>,

    /// Serve Prometheus metrics on this address
    #[arg(long)]
    pub prometheus_listen: Option<SocketAddr>,
}

impl TargetArgs {
    /// Apply the flags that were given onto `config`
    pub fn apply(&self, mut config: Config) -> Result<Config, LoadTestError> {
        if let Some(ref base_url) = self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(id) = self.employee_id {
            config.workload.employee_id = id;
        }
        if let Some(ms) = self.think_time_ms {
            config.think_time = Duration::from_millis(ms);
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.graceful_stop_secs {
            config.graceful_stop = Duration::from_secs(secs);
        }
        if !self.stages.is_empty() {
            config.stages = RampSchedule::new(self.stages.clone())?;
        }
        if !self.thresholds.is_empty() {
            config.thresholds = self.thresholds.clone();
        }
        if self.summary_export.is_some() {
            config.summary_export = self.summary_export.clone();
        }
        if self.prometheus_listen.is_some() {
            config.prometheus_listen = self.prometheus_listen;
        }
        Ok(config)
    }
}

#[derive(Args, Debug, Clone)]
pub struct StubArgs {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Answer an endpoint with a fixed status, repeatable (e.g. --fail check-out=500)
    #[arg(long = "fail", value_name = "TAG=STATUS", value_parser = parse_failure_override)]
    pub failures: Vec<(crate::workload::Endpoint, u16)>,

    /// Delay added before every response, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub latency_ms: u64,
}

impl StubArgs {
    pub fn stub_config(&self) -> StubConfig {
        StubConfig {
            failures: self.failures.iter().copied().collect(),
            latency: Duration::from_millis(self.latency_ms),
        }
    }
}
