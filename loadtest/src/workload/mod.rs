//! Per-iteration workload against the attendance API
//!
//! This module provides:
//! - `Endpoint` describing the six calls and their checks
//! - `plan_request` for building a call's path and query
//! - `IterationRunner` for executing the full sequence once

mod iteration;
mod requests;

pub use iteration::{CheckResult, IterationOutcome, IterationRunner};
pub use requests::{Endpoint, PlannedRequest, TimeWindow, WorkloadParams, format_timestamp, plan_request};
