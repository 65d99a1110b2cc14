//! Common Test Utilities for Integration Tests
//!
//! Shared helpers used across integration test modules.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use attendance_loadtest::{Config, StubConfig, StubState, spawn_stub};

/// Start a stub on an ephemeral port
pub async fn start_stub(config: StubConfig) -> (SocketAddr, StubState) {
    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    spawn_stub(config, addr).await.expect("stub should bind")
}

/// Base URL for a stub bound at `addr`
pub fn base_url(addr: SocketAddr) -> String {
    format!("http://{}/api", addr)
}

/// Config pointed at `addr` with no think time and short timeouts
pub fn test_config(addr: SocketAddr) -> Config {
    Config {
        base_url: base_url(addr),
        think_time: Duration::ZERO,
        request_timeout: Duration::from_secs(5),
        graceful_stop: Duration::from_secs(5),
        ..Config::default()
    }
}
