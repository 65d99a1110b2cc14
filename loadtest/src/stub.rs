//! Stub of the attendance API endpoints exercised by the workload
//!
//! Serves the six routes under `/api`, validates their required query
//! parameters, records every request in arrival order, and can be told to
//! answer specific endpoints with a fixed error status or after a delay.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::LoadTestError;
use crate::workload::Endpoint;

/// Behaviour of the stub
#[derive(Debug, Clone, Default)]
pub struct StubConfig {
    /// Status returned instead of 200 for these endpoints
    pub failures: HashMap<Endpoint, u16>,
    /// Added before every response
    pub latency: Duration,
}

impl StubConfig {
    pub fn failing(mut self, endpoint: Endpoint, status: u16) -> Self {
        self.failures.insert(endpoint, status);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

/// Parse an `<endpoint>=<status>` override, e.g. `check-out=500`
pub fn parse_failure_override(s: &str) -> Result<(Endpoint, u16), LoadTestError> {
    let (tag, status) = s
        .split_once('=')
        .ok_or_else(|| LoadTestError::InvalidFailureOverride(s.to_string()))?;
    let endpoint = Endpoint::from_str(tag)?;
    let status: u16 = status
        .trim()
        .parse()
        .map_err(|_| LoadTestError::InvalidFailureOverride(s.to_string()))?;
    if StatusCode::from_u16(status).is_err() {
        return Err(LoadTestError::InvalidFailureOverride(s.to_string()));
    }
    Ok((endpoint, status))
}

/// A request as seen by the stub
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub endpoint: Endpoint,
    pub employee_id: Option<u64>,
    pub query: HashMap<String, String>,
}

/// Shared stub state
#[derive(Clone, Default)]
pub struct StubState {
    config: Arc<StubConfig>,
    log: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubState {
    pub fn new(config: StubConfig) -> Self {
        Self {
            config: Arc::new(config),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every request received so far, in arrival order
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.log.lock().await.clone()
    }

    /// Endpoints hit so far, in arrival order
    pub async fn endpoints(&self) -> Vec<Endpoint> {
        self.log.lock().await.iter().map(|r| r.endpoint).collect()
    }
}

#[derive(Debug, Serialize)]
struct StubResponse {
    endpoint: Endpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    employee_id: Option<u64>,
}

#[derive(Debug, Serialize)]
struct StubError {
    error: String,
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(StubError {
            error: message.into(),
        }),
    )
        .into_response()
}

fn parse_timestamp(
    query: &HashMap<String, String>,
    key: &str,
) -> Result<DateTime<FixedOffset>, Response> {
    let raw = query
        .get(key)
        .ok_or_else(|| bad_request(format!("missing query parameter: {}", key)))?;
    DateTime::parse_from_rfc3339(raw)
        .map_err(|e| bad_request(format!("invalid {} timestamp {:?}: {}", key, raw, e)))
}

fn require(query: &HashMap<String, String>, key: &str) -> Result<(), Response> {
    match query.get(key) {
        Some(v) if !v.is_empty() => Ok(()),
        _ => Err(bad_request(format!("missing query parameter: {}", key))),
    }
}

/// Check the query parameters an endpoint requires
fn validate(endpoint: Endpoint, query: &HashMap<String, String>) -> Result<(), Response> {
    match endpoint {
        Endpoint::CheckIn | Endpoint::CheckOut => Ok(()),
        Endpoint::WorkFromHome => require(query, "notes"),
        Endpoint::EmployeeAttendance => {
            let start = parse_timestamp(query, "start")?;
            let end = parse_timestamp(query, "end")?;
            if start > end {
                return Err(bad_request("start must not be after end"));
            }
            Ok(())
        }
        Endpoint::AiSummary => parse_timestamp(query, "date").map(|_| ()),
        Endpoint::AiQuestion => require(query, "question"),
    }
}

async fn respond(
    state: StubState,
    endpoint: Endpoint,
    employee_id: Option<u64>,
    query: HashMap<String, String>,
) -> Response {
    state.log.lock().await.push(RecordedRequest {
        endpoint,
        employee_id,
        query: query.clone(),
    });

    if !state.config.latency.is_zero() {
        tokio::time::sleep(state.config.latency).await;
    }

    if let Some(status) = state.config.failures.get(&endpoint) {
        let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (
            status,
            Json(StubError {
                error: format!("injected failure for {}", endpoint),
            }),
        )
            .into_response();
    }

    if let Err(response) = validate(endpoint, &query) {
        return response;
    }

    Json(StubResponse {
        endpoint,
        employee_id,
    })
    .into_response()
}

/// POST /api/attendance/check-in/:id
async fn check_in(
    State(state): State<StubState>,
    Path(id): Path<u64>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    respond(state, Endpoint::CheckIn, Some(id), query).await
}

/// POST /api/attendance/check-out/:id
async fn check_out(
    State(state): State<StubState>,
    Path(id): Path<u64>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    respond(state, Endpoint::CheckOut, Some(id), query).await
}

/// POST /api/attendance/work-from-home/:id
async fn work_from_home(
    State(state): State<StubState>,
    Path(id): Path<u64>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    respond(state, Endpoint::WorkFromHome, Some(id), query).await
}

/// GET /api/attendance/employee/:id
async fn employee_attendance(
    State(state): State<StubState>,
    Path(id): Path<u64>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    respond(state, Endpoint::EmployeeAttendance, Some(id), query).await
}

/// GET /api/ai/attendance/summary
async fn ai_summary(
    State(state): State<StubState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    respond(state, Endpoint::AiSummary, None, query).await
}

/// GET /api/ai/attendance/question
async fn ai_question(
    State(state): State<StubState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    respond(state, Endpoint::AiQuestion, None, query).await
}

/// Build the stub router
pub fn stub_routes(state: StubState) -> Router {
    Router::new()
        .route("/api/attendance/check-in/:id", post(check_in))
        .route("/api/attendance/check-out/:id", post(check_out))
        .route("/api/attendance/work-from-home/:id", post(work_from_home))
        .route("/api/attendance/employee/:id", get(employee_attendance))
        .route("/api/ai/attendance/summary", get(ai_summary))
        .route("/api/ai/attendance/question", get(ai_question))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve the stub in the background.
///
/// Returns the bound address (useful with port 0) and the shared state.
pub async fn spawn_stub(
    config: StubConfig,
    addr: SocketAddr,
) -> Result<(SocketAddr, StubState), LoadTestError> {
    let state = StubState::new(config);
    let app = stub_routes(state.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!("Stub attendance API listening on {}", local_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Stub server stopped: {}", e);
        }
    });

    Ok((local_addr, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    async fn send(app: Router, method: &str, uri: &str) -> StatusCode {
        app.oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
    }

    #[tokio::test]
    async fn test_check_in_returns_ok_and_records() {
        let state = StubState::new(StubConfig::default());
        let status = send(
            stub_routes(state.clone()),
            "POST",
            "/api/attendance/check-in/1",
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let requests = state.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].endpoint, Endpoint::CheckIn);
        assert_eq!(requests[0].employee_id, Some(1));
    }

    #[tokio::test]
    async fn test_wrong_method_is_rejected() {
        let state = StubState::new(StubConfig::default());
        let status = send(stub_routes(state), "GET", "/api/attendance/check-in/1").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_attendance_requires_valid_window() {
        let state = StubState::new(StubConfig::default());

        let ok = send(
            stub_routes(state.clone()),
            "GET",
            "/api/attendance/employee/1?start=2025-03-13T09:30:00.000Z&end=2025-03-14T09:30:00.000Z",
        )
        .await;
        assert_eq!(ok, StatusCode::OK);

        let missing = send(
            stub_routes(state.clone()),
            "GET",
            "/api/attendance/employee/1?start=2025-03-13T09:30:00.000Z",
        )
        .await;
        assert_eq!(missing, StatusCode::BAD_REQUEST);

        let reversed = send(
            stub_routes(state.clone()),
            "GET",
            "/api/attendance/employee/1?start=2025-03-14T09:30:00.000Z&end=2025-03-13T09:30:00.000Z",
        )
        .await;
        assert_eq!(reversed, StatusCode::BAD_REQUEST);

        let garbage = send(
            stub_routes(state),
            "GET",
            "/api/attendance/employee/1?start=yesterday&end=today",
        )
        .await;
        assert_eq!(garbage, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_question_and_notes_are_required() {
        let state = StubState::new(StubConfig::default());
        assert_eq!(
            send(stub_routes(state.clone()), "GET", "/api/ai/attendance/question").await,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            send(
                stub_routes(state.clone()),
                "GET",
                "/api/ai/attendance/question?question=Who%20was%20late%3F"
            )
            .await,
            StatusCode::OK
        );
        assert_eq!(
            send(
                stub_routes(state.clone()),
                "POST",
                "/api/attendance/work-from-home/1"
            )
            .await,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            send(
                stub_routes(state),
                "POST",
                "/api/attendance/work-from-home/1?notes=Working+from+home"
            )
            .await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let state = StubState::new(StubConfig::default().failing(Endpoint::CheckOut, 500));
        assert_eq!(
            send(stub_routes(state.clone()), "POST", "/api/attendance/check-out/1").await,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            send(stub_routes(state.clone()), "POST", "/api/attendance/check-in/1").await,
            StatusCode::OK
        );
        assert_eq!(
            state.endpoints().await,
            vec![Endpoint::CheckOut, Endpoint::CheckIn]
        );
    }

    #[test]
    fn test_parse_failure_override() {
        assert_eq!(
            parse_failure_override("check-out=500").unwrap(),
            (Endpoint::CheckOut, 500)
        );
        assert!(matches!(
            parse_failure_override("check-out"),
            Err(LoadTestError::InvalidFailureOverride(_))
        ));
        assert!(matches!(
            parse_failure_override("lunch=500"),
            Err(LoadTestError::UnknownEndpoint(_))
        ));
        assert!(matches!(
            parse_failure_override("check-in=abc"),
            Err(LoadTestError::InvalidFailureOverride(_))
        ));
        assert!(matches!(
            parse_failure_override("check-in=42"),
            Err(LoadTestError::InvalidFailureOverride(_))
        ));
    }
}
