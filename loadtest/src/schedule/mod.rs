//! Ramp schedule for virtual users
//!
//! This module provides:
//! - `parse_duration` for k6-style duration strings (`30s`, `1m30s`, `250ms`)
//! - `Stage` and `RampSchedule` for the time-boxed target VU levels

mod duration;
mod stages;

pub use duration::{format_duration, parse_duration};
pub use stages::{RampSchedule, Stage};
