//! Ramp stages and target VU interpolation

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::duration::{format_duration, parse_duration};
use crate::error::LoadTestError;

/// A time-boxed target concurrency level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    /// How long it takes to move from the previous target to this one
    pub duration: Duration,
    /// VU count reached at the end of the stage
    pub target: u32,
}

impl Stage {
    pub fn new(duration: Duration, target: u32) -> Self {
        Self { duration, target }
    }
}

impl FromStr for Stage {
    type Err = LoadTestError;

    /// Parse `<duration>:<target>`, e.g. `30s:10`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (duration, target) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| LoadTestError::InvalidStage(s.to_string()))?;
        let duration =
            parse_duration(duration).map_err(|_| LoadTestError::InvalidStage(s.to_string()))?;
        let target = target
            .trim()
            .parse()
            .map_err(|_| LoadTestError::InvalidStage(s.to_string()))?;
        Ok(Self { duration, target })
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", format_duration(self.duration), self.target)
    }
}

/// Ordered list of stages, starting from zero VUs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RampSchedule {
    stages: Vec<Stage>,
}

impl Default for RampSchedule {
    /// 0 → 10 VUs over 30s, hold for 1m, back to 0 over 30s
    fn default() -> Self {
        Self {
            stages: vec![
                Stage::new(Duration::from_secs(30), 10),
                Stage::new(Duration::from_secs(60), 10),
                Stage::new(Duration::from_secs(30), 0),
            ],
        }
    }
}

impl RampSchedule {
    pub fn new(stages: Vec<Stage>) -> Result<Self, LoadTestError> {
        if stages.is_empty() {
            return Err(LoadTestError::EmptySchedule);
        }
        // Stage boundaries are summed while running, so the total must fit
        stages
            .iter()
            .try_fold(Duration::ZERO, |total, stage| total.checked_add(stage.duration))
            .ok_or(LoadTestError::ScheduleTooLong)?;
        Ok(Self { stages })
    }

    /// Parse a comma separated list of stages, e.g. `30s:10,1m:10,30s:0`
    pub fn parse_list(s: &str) -> Result<Self, LoadTestError> {
        let stages = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Stage>, _>>()?;
        Self::new(stages)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Sum of all stage durations
    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    /// Highest target across all stages
    pub fn max_target(&self) -> u32 {
        self.stages.iter().map(|s| s.target).max().unwrap_or(0)
    }

    /// Target VU count at `elapsed` since the start of the run.
    ///
    /// Linearly interpolates between the previous stage's target and the
    /// current stage's target, rounded to the nearest VU. Past the end of the
    /// schedule the last target holds.
    pub fn target_at(&self, elapsed: Duration) -> u32 {
        let mut from = 0u32;
        let mut stage_start = Duration::ZERO;

        for stage in &self.stages {
            let stage_end = stage_start + stage.duration;
            if elapsed < stage_end {
                let progress = (elapsed - stage_start).as_secs_f64() / stage.duration.as_secs_f64();
                let value = from as f64 + (stage.target as f64 - from as f64) * progress;
                return value.round().max(0.0) as u32;
            }
            from = stage.target;
            stage_start = stage_end;
        }

        from
    }
}
