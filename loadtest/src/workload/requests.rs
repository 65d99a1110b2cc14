//! Endpoint table and request planning

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::error::LoadTestError;

/// One of the six calls issued per iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Endpoint {
    CheckIn,
    CheckOut,
    WorkFromHome,
    EmployeeAttendance,
    AiSummary,
    AiQuestion,
}

impl Endpoint {
    /// Order in which an iteration issues the calls
    pub const SEQUENCE: [Endpoint; 6] = [
        Endpoint::CheckIn,
        Endpoint::CheckOut,
        Endpoint::WorkFromHome,
        Endpoint::EmployeeAttendance,
        Endpoint::AiSummary,
        Endpoint::AiQuestion,
    ];

    pub fn method(&self) -> Method {
        match self {
            Endpoint::CheckIn | Endpoint::CheckOut | Endpoint::WorkFromHome => Method::POST,
            Endpoint::EmployeeAttendance | Endpoint::AiSummary | Endpoint::AiQuestion => {
                Method::GET
            }
        }
    }

    /// Name of the status check reported in the summary
    pub fn check_name(&self) -> &'static str {
        match self {
            Endpoint::CheckIn => "check-in status is 200",
            Endpoint::CheckOut => "check-out status is 200",
            Endpoint::WorkFromHome => "work-from-home status is 200",
            Endpoint::EmployeeAttendance => "get attendance status is 200",
            Endpoint::AiSummary => "AI summary status is 200",
            Endpoint::AiQuestion => "AI question status is 200",
        }
    }

    /// Short tag used for metric labels and failure overrides
    pub fn tag(&self) -> &'static str {
        match self {
            Endpoint::CheckIn => "check-in",
            Endpoint::CheckOut => "check-out",
            Endpoint::WorkFromHome => "work-from-home",
            Endpoint::EmployeeAttendance => "employee-attendance",
            Endpoint::AiSummary => "ai-summary",
            Endpoint::AiQuestion => "ai-question",
        }
    }

    /// Whether the call's query depends on the reporting window
    pub fn uses_window(&self) -> bool {
        matches!(self, Endpoint::EmployeeAttendance | Endpoint::AiSummary)
    }

    /// Path relative to the base URL
    pub fn path(&self, employee_id: u64) -> String {
        match self {
            Endpoint::CheckIn => format!("/attendance/check-in/{}", employee_id),
            Endpoint::CheckOut => format!("/attendance/check-out/{}", employee_id),
            Endpoint::WorkFromHome => format!("/attendance/work-from-home/{}", employee_id),
            Endpoint::EmployeeAttendance => format!("/attendance/employee/{}", employee_id),
            Endpoint::AiSummary => "/ai/attendance/summary".to_string(),
            Endpoint::AiQuestion => "/ai/attendance/question".to_string(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Endpoint {
    type Err = LoadTestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Endpoint::SEQUENCE
            .into_iter()
            .find(|e| e.tag() == s.trim())
            .ok_or_else(|| LoadTestError::UnknownEndpoint(s.to_string()))
    }
}

/// Values substituted into the request paths and query strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadParams {
    pub employee_id: u64,
    pub work_from_home_notes: String,
    pub ai_question: String,
}

impl Default for WorkloadParams {
    fn default() -> Self {
        Self {
            employee_id: 1,
            work_from_home_notes: "Working from home".to_string(),
            ai_question: "Who was absent the most this month?".to_string(),
        }
    }
}

/// Reporting window for the attendance query: the 24 hours ending at `now`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

impl TimeWindow {
    pub fn ending_at(now: DateTime<Utc>) -> Self {
        Self {
            start: now - chrono::Duration::hours(24),
            now,
        }
    }
}

/// Render a timestamp as ISO-8601 UTC with millisecond precision
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A fully resolved call, minus the base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRequest {
    pub endpoint: Endpoint,
    pub method: Method,
    pub path: String,
    pub query: Vec<(&'static str, String)>,
}

impl PlannedRequest {
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.path)
    }
}

/// Build the request for `endpoint`.
///
/// `window` is only consulted by the attendance and summary calls; when it is
/// None those calls use a window ending now.
pub fn plan_request(
    endpoint: Endpoint,
    params: &WorkloadParams,
    window: Option<&TimeWindow>,
) -> PlannedRequest {
    let resolve_window = || {
        window
            .copied()
            .unwrap_or_else(|| TimeWindow::ending_at(Utc::now()))
    };
    let query = match endpoint {
        Endpoint::CheckIn | Endpoint::CheckOut => Vec::new(),
        Endpoint::WorkFromHome => vec![("notes", params.work_from_home_notes.clone())],
        Endpoint::EmployeeAttendance => {
            let window = resolve_window();
            vec![
                ("start", format_timestamp(window.start)),
                ("end", format_timestamp(window.now)),
            ]
        }
        Endpoint::AiSummary => vec![("date", format_timestamp(resolve_window().now))],
        Endpoint::AiQuestion => vec![("question", params.ai_question.clone())],
    };

    PlannedRequest {
        endpoint,
        method: endpoint.method(),
        path: endpoint.path(params.employee_id),
        query,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_sequence_order_and_methods() {
        let methods: Vec<Method> = Endpoint::SEQUENCE.iter().map(|e| e.method()).collect();
        assert_eq!(
            methods,
            vec![
                Method::POST,
                Method::POST,
                Method::POST,
                Method::GET,
                Method::GET,
                Method::GET
            ]
        );
        assert_eq!(Endpoint::SEQUENCE[0], Endpoint::CheckIn);
        assert_eq!(Endpoint::SEQUENCE[5], Endpoint::AiQuestion);
    }

    #[test]
    fn test_tags_round_trip_through_from_str() {
        for endpoint in Endpoint::SEQUENCE {
            assert_eq!(endpoint.tag().parse::<Endpoint>().unwrap(), endpoint);
        }
        assert!("check_in".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_serde_uses_tags() {
        let json = serde_json::to_string(&Endpoint::EmployeeAttendance).unwrap();
        assert_eq!(json, "\"employee-attendance\"");
    }

    #[test]
    fn test_window_spans_exactly_24_hours() {
        let window = TimeWindow::ending_at(fixed_now());
        assert_eq!(window.now - window.start, chrono::Duration::hours(24));
        assert!(window.start < window.now);
    }

    #[test]
    fn test_timestamp_format() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap()
            + chrono::Duration::milliseconds(42);
        assert_eq!(format_timestamp(ts), "2025-03-14T09:30:00.042Z");
        assert!(DateTime::parse_from_rfc3339(&format_timestamp(ts)).is_ok());
    }

    #[test]
    fn test_plan_attendance_query() {
        let window = TimeWindow::ending_at(fixed_now());
        let plan = plan_request(
            Endpoint::EmployeeAttendance,
            &WorkloadParams::default(),
            Some(&window),
        );
        assert_eq!(plan.method, Method::GET);
        assert_eq!(plan.path, "/attendance/employee/1");
        assert_eq!(
            plan.query,
            vec![
                ("start", "2025-03-13T09:30:00.000Z".to_string()),
                ("end", "2025-03-14T09:30:00.000Z".to_string()),
            ]
        );
    }

    #[test]
    fn test_plan_summary_reuses_window_now() {
        let window = TimeWindow::ending_at(fixed_now());
        let plan = plan_request(Endpoint::AiSummary, &WorkloadParams::default(), Some(&window));
        assert_eq!(plan.path, "/ai/attendance/summary");
        assert_eq!(plan.query, vec![("date", format_timestamp(window.now))]);
    }

    #[test]
    fn test_plan_uses_params() {
        let params = WorkloadParams {
            employee_id: 42,
            work_from_home_notes: "Remote".to_string(),
            ai_question: "Who checked in late?".to_string(),
        };
        let window = TimeWindow::ending_at(fixed_now());

        let wfh = plan_request(Endpoint::WorkFromHome, &params, Some(&window));
        assert_eq!(wfh.path, "/attendance/work-from-home/42");
        assert_eq!(wfh.query, vec![("notes", "Remote".to_string())]);

        let question = plan_request(Endpoint::AiQuestion, &params, None);
        assert_eq!(
            question.query,
            vec![("question", "Who checked in late?".to_string())]
        );

        let check_in = plan_request(Endpoint::CheckIn, &params, None);
        assert!(check_in.query.is_empty());
    }

    #[test]
    fn test_url_joins_base() {
        let plan = plan_request(Endpoint::CheckOut, &WorkloadParams::default(), None);
        assert_eq!(
            plan.url("http://localhost:8080/api/"),
            "http://localhost:8080/api/attendance/check-out/1"
        );
        assert_eq!(
            plan.url("http://localhost:8080/api"),
            "http://localhost:8080/api/attendance/check-out/1"
        );
    }
}
