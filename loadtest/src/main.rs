use std::net::SocketAddr;
use std::process::ExitCode;

use anyhow::Context;
use attendance_loadtest::cli::{Cli, Command, StubArgs, TargetArgs};
use attendance_loadtest::{Config, LoadTest, spawn_stub};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit code when a threshold is crossed
const THRESHOLDS_FAILED: u8 = 99;

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "attendance_loadtest=debug,tower_http=debug"
    } else {
        "attendance_loadtest=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Serve the Prometheus scrape endpoint when configured
fn setup_prometheus(config: &Config) -> anyhow::Result<()> {
    if let Some(addr) = config.prometheus_listen {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Prometheus metrics available at http://{}/metrics", addr);
    }
    Ok(())
}

fn load_config(args: &TargetArgs) -> anyhow::Result<Config> {
    let config = Config::from_env().context("Invalid environment configuration")?;
    Ok(args.apply(config)?)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn run(args: TargetArgs) -> anyhow::Result<ExitCode> {
    let config = load_config(&args)?;
    setup_prometheus(&config)?;

    let test = LoadTest::new(config)?;
    let summary = test.run_with_shutdown(shutdown_signal()).await;
    println!("{}", summary.render());

    if let Some(path) = &test.config().summary_export {
        summary
            .save(path)
            .with_context(|| format!("Failed to write summary to {:?}", path))?;
        info!("Summary written to {:?}", path);
    }

    if summary.passed {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(THRESHOLDS_FAILED))
    }
}

async fn once(args: TargetArgs) -> anyhow::Result<ExitCode> {
    let config = load_config(&args)?;
    info!("Running a single iteration against {}", config.base_url);

    let test = LoadTest::new(config)?;
    let outcome = test.run_once().await;
    for check in &outcome.checks {
        let mark = if check.passed { "✓" } else { "✗" };
        let status = check
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "no response".to_string());
        println!(
            "  {} {:<32} {:>12} {:>8.1}ms",
            mark,
            check.name,
            status,
            check.latency.as_secs_f64() * 1000.0
        );
    }
    println!(
        "  {} passed, {} failed",
        outcome.passed_count(),
        outcome.failed_count()
    );

    if outcome.all_passed() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

async fn stub(args: StubArgs) -> anyhow::Result<ExitCode> {
    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid stub address {}:{}", args.host, args.port))?;
    let config = args.stub_config();
    for (endpoint, status) in &config.failures {
        info!("Stub will answer {} with {}", endpoint, status);
    }

    let (bound, state) = spawn_stub(config, addr).await?;
    info!("Serving stub attendance API at http://{}/api", bound);

    shutdown_signal().await;
    info!(
        "Stub shutting down after {} requests",
        state.requests().await.len()
    );
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Once(args) => once(args).await,
        Command::Stub(args) => stub(args).await,
    }
}
