//! Duration strings as used in stage definitions

use std::time::Duration;

use crate::error::LoadTestError;

/// Parse a duration such as `30s`, `1m`, `1m30s`, `250ms` or `2h`.
///
/// Components may be concatenated. A bare `0` is accepted as a zero
/// duration; any other number needs a unit.
pub fn parse_duration(input: &str) -> Result<Duration, LoadTestError> {
    let s = input.trim();
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    humantime::parse_duration(s).map_err(|_| LoadTestError::InvalidDuration(input.to_string()))
}

/// Format a duration in the same notation `parse_duration` accepts
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    if total_ms == 0 {
        return "0s".to_string();
    }

    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    if seconds > 0 {
        out.push_str(&format!("{}s", seconds));
    }
    if millis > 0 {
        out.push_str(&format!("{}ms", millis));
    }
    out
}
