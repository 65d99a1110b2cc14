//! Single-iteration behaviour against the stub attendance API

mod common;

use std::time::{Duration, Instant};

use attendance_loadtest::{Config, Endpoint, LoadTest, StubConfig};
use chrono::DateTime;
use common::{start_stub, test_config};

#[tokio::test]
async fn test_healthy_target_passes_all_checks() {
    let (addr, stub) = start_stub(StubConfig::default()).await;
    let test = LoadTest::new(test_config(addr)).unwrap();

    let outcome = test.run_once().await;

    assert_eq!(outcome.checks.len(), 6);
    assert_eq!(outcome.passed_count(), 6);
    assert_eq!(outcome.failed_count(), 0);
    assert!(outcome.checks.iter().all(|c| c.status == Some(200)));
    assert_eq!(stub.endpoints().await, Endpoint::SEQUENCE.to_vec());
}

#[tokio::test]
async fn test_requests_carry_expected_parameters() {
    let (addr, stub) = start_stub(StubConfig::default()).await;
    let mut config = test_config(addr);
    config.workload.employee_id = 42;
    let test = LoadTest::new(config).unwrap();

    test.run_once().await;
    let requests = stub.requests().await;
    assert_eq!(requests.len(), 6);

    for request in &requests[..4] {
        assert_eq!(request.employee_id, Some(42));
    }
    assert_eq!(requests[2].query["notes"], "Working from home");
    assert_eq!(
        requests[5].query["question"],
        "Who was absent the most this month?"
    );

    let start = DateTime::parse_from_rfc3339(&requests[3].query["start"]).unwrap();
    let end = DateTime::parse_from_rfc3339(&requests[3].query["end"]).unwrap();
    assert_eq!(end - start, chrono::Duration::hours(24));
    assert!(requests[3].query["end"].ends_with('Z'));

    // Summary date is the same instant as the attendance window end
    assert_eq!(requests[4].query["date"], requests[3].query["end"]);
}

#[tokio::test]
async fn test_failed_check_does_not_stop_iteration() {
    let (addr, stub) =
        start_stub(StubConfig::default().failing(Endpoint::CheckOut, 500)).await;
    let test = LoadTest::new(test_config(addr)).unwrap();

    let outcome = test.run_once().await;

    assert_eq!(outcome.checks.len(), 6);
    assert_eq!(outcome.passed_count(), 5);
    assert_eq!(outcome.failed_count(), 1);
    let failed: Vec<_> = outcome.checks.iter().filter(|c| !c.passed).collect();
    assert_eq!(failed[0].endpoint, Endpoint::CheckOut);
    assert_eq!(failed[0].status, Some(500));
    assert_eq!(stub.requests().await.len(), 6);

    let snapshot = test.metrics().snapshot(Duration::from_secs(1)).await;
    assert_eq!(snapshot.http_reqs, 6);
    assert_eq!(snapshot.http_req_failed, 1);
    assert_eq!(snapshot.checks_failed(), 1);
    assert_eq!(snapshot.checks["check-out status is 200"].fails, 1);
}

#[tokio::test]
async fn test_non_200_success_fails_check_only() {
    let (addr, _stub) =
        start_stub(StubConfig::default().failing(Endpoint::AiSummary, 204)).await;
    let test = LoadTest::new(test_config(addr)).unwrap();

    let outcome = test.run_once().await;
    assert_eq!(outcome.failed_count(), 1);

    // 204 is still an expected status for the request failure rate
    let snapshot = test.metrics().snapshot(Duration::from_secs(1)).await;
    assert_eq!(snapshot.http_req_failed, 0);
    assert_eq!(snapshot.checks_failed(), 1);
}

#[tokio::test]
async fn test_unreachable_target_records_six_failures() {
    let config = Config {
        base_url: "http://127.0.0.1:1/api".to_string(),
        think_time: Duration::ZERO,
        request_timeout: Duration::from_secs(2),
        ..Config::default()
    };
    let test = LoadTest::new(config).unwrap();

    let outcome = test.run_once().await;

    assert_eq!(outcome.checks.len(), 6);
    assert_eq!(outcome.failed_count(), 6);
    assert!(outcome.checks.iter().all(|c| c.status.is_none()));

    let snapshot = test.metrics().snapshot(Duration::from_secs(1)).await;
    assert_eq!(snapshot.http_reqs, 6);
    assert_eq!(snapshot.http_req_failed, 6);
    assert_eq!(snapshot.iterations, 1);
}

#[tokio::test]
async fn test_think_time_paces_calls() {
    let (addr, _stub) = start_stub(StubConfig::default()).await;
    let mut config = test_config(addr);
    config.think_time = Duration::from_millis(50);
    let test = LoadTest::new(config).unwrap();

    let started = Instant::now();
    test.run_once().await;

    // Five pauses between six calls, none after the last
    assert!(started.elapsed() >= Duration::from_millis(250));
}

#[tokio::test]
async fn test_think_time_ignores_response_latency() {
    let latency = Duration::from_millis(40);
    let think = Duration::from_millis(30);
    let (addr, _stub) = start_stub(StubConfig::default().with_latency(latency)).await;
    let mut config = test_config(addr);
    config.think_time = think;
    let test = LoadTest::new(config).unwrap();

    let started = Instant::now();
    let outcome = test.run_once().await;
    let elapsed = started.elapsed();

    assert_eq!(outcome.passed_count(), 6);
    assert!(outcome.checks.iter().all(|c| c.latency >= latency));

    // Full pauses are still slept after slow responses
    let expected = think * 5 + latency * 6;
    assert!(elapsed >= expected, "{:?} < {:?}", elapsed, expected);
    assert!(
        elapsed < expected + Duration::from_millis(800),
        "{:?} too far above {:?}",
        elapsed,
        expected
    );
}
