//! Pass/fail criteria evaluated against aggregated run metrics
//!
//! Syntax is `<metric>:<aggregation><op><value>`, e.g.
//! `http_req_duration:p(95)<500` or `http_req_failed:rate<0.1`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LoadTestError;
use crate::metrics::MetricsSnapshot;

/// Metrics a threshold can refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    /// Trend, milliseconds
    HttpReqDuration,
    /// Rate of failed requests
    HttpReqFailed,
    /// Rate of passing checks
    Checks,
    /// Counter
    HttpReqs,
    /// Counter
    Iterations,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::HttpReqDuration => "http_req_duration",
            MetricName::HttpReqFailed => "http_req_failed",
            MetricName::Checks => "checks",
            MetricName::HttpReqs => "http_reqs",
            MetricName::Iterations => "iterations",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "http_req_duration" => Some(MetricName::HttpReqDuration),
            "http_req_failed" => Some(MetricName::HttpReqFailed),
            "checks" => Some(MetricName::Checks),
            "http_reqs" => Some(MetricName::HttpReqs),
            "iterations" => Some(MetricName::Iterations),
            _ => None,
        }
    }

    fn supports(&self, aggregation: Aggregation) -> bool {
        match self {
            MetricName::HttpReqDuration => matches!(
                aggregation,
                Aggregation::Avg
                    | Aggregation::Min
                    | Aggregation::Max
                    | Aggregation::Med
                    | Aggregation::Percentile(_)
            ),
            MetricName::HttpReqFailed | MetricName::Checks => aggregation == Aggregation::Rate,
            MetricName::HttpReqs | MetricName::Iterations => {
                matches!(aggregation, Aggregation::Count | Aggregation::Rate)
            }
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How samples are reduced to a single value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregation {
    Avg,
    Min,
    Max,
    Med,
    Percentile(f64),
    Rate,
    Count,
}

impl Aggregation {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "avg" => Some(Aggregation::Avg),
            "min" => Some(Aggregation::Min),
            "max" => Some(Aggregation::Max),
            "med" => Some(Aggregation::Med),
            "rate" => Some(Aggregation::Rate),
            "count" => Some(Aggregation::Count),
            _ => {
                let inner = s.strip_prefix("p(")?.strip_suffix(')')?;
                let p: f64 = inner.trim().parse().ok()?;
                (0.0..=100.0).contains(&p).then_some(Aggregation::Percentile(p))
            }
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Avg => f.write_str("avg"),
            Aggregation::Min => f.write_str("min"),
            Aggregation::Max => f.write_str("max"),
            Aggregation::Med => f.write_str("med"),
            Aggregation::Percentile(p) => write!(f, "p({})", p),
            Aggregation::Rate => f.write_str("rate"),
            Aggregation::Count => f.write_str("count"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Operator {
    fn as_str(&self) -> &'static str {
        match self {
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
        }
    }

    fn holds(&self, observed: f64, bound: f64) -> bool {
        match self {
            Operator::Lt => observed < bound,
            Operator::Le => observed <= bound,
            Operator::Gt => observed > bound,
            Operator::Ge => observed >= bound,
            Operator::Eq => observed == bound,
            Operator::Ne => observed != bound,
        }
    }
}

/// A parsed threshold expression
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    pub metric: MetricName,
    pub aggregation: Aggregation,
    pub operator: Operator,
    pub value: f64,
}

impl Threshold {
    /// Default criteria: p95 latency under 500ms and under 10% failed requests
    pub fn defaults() -> Vec<Threshold> {
        vec![
            Threshold {
                metric: MetricName::HttpReqDuration,
                aggregation: Aggregation::Percentile(95.0),
                operator: Operator::Lt,
                value: 500.0,
            },
            Threshold {
                metric: MetricName::HttpReqFailed,
                aggregation: Aggregation::Rate,
                operator: Operator::Lt,
                value: 0.1,
            },
        ]
    }

    /// Parse a comma separated list of thresholds
    pub fn parse_list(s: &str) -> Result<Vec<Threshold>, LoadTestError> {
        s.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect()
    }

    /// Reduce the snapshot to the value this threshold compares against.
    ///
    /// Returns None when the metric has no data yet.
    pub fn observe(&self, snapshot: &MetricsSnapshot) -> Option<f64> {
        let ms = |d: std::time::Duration| d.as_secs_f64() * 1000.0;
        let per_second = |count: u64| {
            let secs = snapshot.elapsed.as_secs_f64();
            (secs > 0.0).then(|| count as f64 / secs)
        };

        match (self.metric, self.aggregation) {
            (MetricName::HttpReqDuration, Aggregation::Avg) => snapshot.durations.mean().map(ms),
            (MetricName::HttpReqDuration, Aggregation::Min) => snapshot.durations.min().map(ms),
            (MetricName::HttpReqDuration, Aggregation::Max) => snapshot.durations.max().map(ms),
            (MetricName::HttpReqDuration, Aggregation::Med) => snapshot.durations.median().map(ms),
            (MetricName::HttpReqDuration, Aggregation::Percentile(p)) => {
                snapshot.durations.percentile(p).map(ms)
            }
            (MetricName::HttpReqFailed, Aggregation::Rate) => snapshot.http_req_failed_rate(),
            (MetricName::Checks, Aggregation::Rate) => snapshot.checks_rate(),
            (MetricName::HttpReqs, Aggregation::Count) => Some(snapshot.http_reqs as f64),
            (MetricName::HttpReqs, Aggregation::Rate) => per_second(snapshot.http_reqs),
            (MetricName::Iterations, Aggregation::Count) => Some(snapshot.iterations as f64),
            (MetricName::Iterations, Aggregation::Rate) => per_second(snapshot.iterations),
            _ => None,
        }
    }

    /// Evaluate against a snapshot. A threshold without data passes.
    pub fn evaluate(&self, snapshot: &MetricsSnapshot) -> ThresholdResult {
        let observed = self.observe(snapshot);
        let passed = observed
            .map(|v| self.operator.holds(v, self.value))
            .unwrap_or(true);
        ThresholdResult {
            metric: self.metric,
            expression: self.expression(),
            observed,
            passed,
        }
    }

    /// Right-hand part of the threshold, e.g. `p(95)<500`
    pub fn expression(&self) -> String {
        format!("{}{}{}", self.aggregation, self.operator.as_str(), self.value)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.metric, self.expression())
    }
}

impl FromStr for Threshold {
    type Err = LoadTestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (metric, expr) = s
            .split_once(':')
            .ok_or_else(|| LoadTestError::threshold(s, "expected <metric>:<expression>"))?;
        let metric = MetricName::parse(metric.trim())
            .ok_or_else(|| LoadTestError::threshold(s, format!("unknown metric {:?}", metric)))?;

        let expr: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
        let op_start = expr
            .find(['<', '>', '=', '!'])
            .ok_or_else(|| LoadTestError::threshold(s, "missing comparison operator"))?;
        let (agg, rest) = expr.split_at(op_start);

        let (operator, value) = if let Some(v) = rest.strip_prefix("<=") {
            (Operator::Le, v)
        } else if let Some(v) = rest.strip_prefix(">=") {
            (Operator::Ge, v)
        } else if let Some(v) = rest.strip_prefix("==") {
            (Operator::Eq, v)
        } else if let Some(v) = rest.strip_prefix("!=") {
            (Operator::Ne, v)
        } else if let Some(v) = rest.strip_prefix('<') {
            (Operator::Lt, v)
        } else if let Some(v) = rest.strip_prefix('>') {
            (Operator::Gt, v)
        } else {
            return Err(LoadTestError::threshold(s, "invalid comparison operator"));
        };

        let aggregation = Aggregation::parse(agg)
            .ok_or_else(|| LoadTestError::threshold(s, format!("unknown aggregation {:?}", agg)))?;
        if !metric.supports(aggregation) {
            return Err(LoadTestError::threshold(
                s,
                format!("{} does not support {}", metric, aggregation),
            ));
        }
        let value: f64 = value
            .parse()
            .map_err(|_| LoadTestError::threshold(s, format!("invalid value {:?}", value)))?;

        Ok(Threshold {
            metric,
            aggregation,
            operator,
            value,
        })
    }
}

/// Outcome of one threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdResult {
    pub metric: MetricName,
    pub expression: String,
    /// None when the metric had no data
    pub observed: Option<f64>,
    pub passed: bool,
}
