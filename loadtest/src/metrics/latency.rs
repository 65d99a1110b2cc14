//! Latency sample collection and percentile calculation

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Latency samples collected during a run
#[derive(Debug, Clone, Default)]
pub struct LatencyStats {
    pub samples: Vec<Duration>,
}

impl LatencyStats {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    pub fn record(&mut self, latency: Duration) {
        self.samples.push(latency);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Calculate percentile (0-100) using nearest rank
    pub fn percentile(&self, p: f64) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }

        let mut sorted = self.samples.clone();
        sorted.sort();

        let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
        Some(sorted[idx.min(sorted.len() - 1)])
    }

    pub fn min(&self) -> Option<Duration> {
        self.samples.iter().min().copied()
    }

    pub fn max(&self) -> Option<Duration> {
        self.samples.iter().max().copied()
    }

    pub fn median(&self) -> Option<Duration> {
        self.percentile(50.0)
    }

    pub fn mean(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().sum();
        Some(total / self.samples.len() as u32)
    }

    pub fn p95(&self) -> Option<Duration> {
        self.percentile(95.0)
    }

    /// Summarize in milliseconds
    pub fn summary(&self) -> DurationSummary {
        let ms = |d: Option<Duration>| d.map(|d| d.as_secs_f64() * 1000.0).unwrap_or(0.0);
        DurationSummary {
            count: self.samples.len() as u64,
            avg_ms: ms(self.mean()),
            min_ms: ms(self.min()),
            med_ms: ms(self.median()),
            max_ms: ms(self.max()),
            p90_ms: ms(self.percentile(90.0)),
            p95_ms: ms(self.p95()),
        }
    }
}

/// Aggregated request duration, all values in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationSummary {
    pub count: u64,
    pub avg_ms: f64,
    pub min_ms: f64,
    pub med_ms: f64,
    pub max_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats_from_millis(values: &[u64]) -> LatencyStats {
        let mut stats = LatencyStats::new();
        for v in values {
            stats.record(Duration::from_millis(*v));
        }
        stats
    }

    #[test]
    fn test_empty_stats() {
        let stats = LatencyStats::new();
        assert!(stats.is_empty());
        assert_eq!(stats.p95(), None);
        assert_eq!(stats.mean(), None);
        assert_eq!(stats.summary(), DurationSummary::default());
    }

    #[test]
    fn test_percentiles_over_hundred_samples() {
        let values: Vec<u64> = (1..=100).collect();
        let stats = stats_from_millis(&values);

        assert_eq!(stats.min(), Some(Duration::from_millis(1)));
        assert_eq!(stats.max(), Some(Duration::from_millis(100)));
        // idx = round(0.95 * 99) = 94 → 95ms
        assert_eq!(stats.p95(), Some(Duration::from_millis(95)));
        // idx = round(0.5 * 99) = 50 → 51ms
        assert_eq!(stats.median(), Some(Duration::from_millis(51)));
    }

    #[test]
    fn test_percentile_ignores_insertion_order() {
        let stats = stats_from_millis(&[300, 10, 200, 20, 100]);
        assert_eq!(stats.percentile(0.0), Some(Duration::from_millis(10)));
        assert_eq!(stats.percentile(100.0), Some(Duration::from_millis(300)));
        assert_eq!(stats.median(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_summary_in_millis() {
        let stats = stats_from_millis(&[10, 20, 30]);
        let summary = stats.summary();
        assert_eq!(summary.count, 3);
        assert!((summary.avg_ms - 20.0).abs() < 1e-9);
        assert!((summary.min_ms - 10.0).abs() < 1e-9);
        assert!((summary.max_ms - 30.0).abs() < 1e-9);
        assert!((summary.med_ms - 20.0).abs() < 1e-9);
    }
}
