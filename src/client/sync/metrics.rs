//! # Sync Metrics
//!
//! Counters for drains and replayed operations, kept by the sync driver.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncMetrics {
    pub total_drains: u64,
    /// Drains that emptied the queue
    pub completed_drains: u64,
    /// Drains stopped by an operation that must be retried
    pub blocked_drains: u64,
    /// Drains that hit a queue error
    pub failed_drains: u64,
    pub operations_replayed: u64,
    pub operations_retried: u64,
    pub operations_failed: u64,
    pub average_drain_duration: Duration,
    pub last_drain_duration: Option<Duration>,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start timing a drain
    pub fn record_drain_start(&mut self) -> Instant {
        self.total_drains += 1;
        Instant::now()
    }

    pub fn record_drain_finished(&mut self, started: Instant, blocked: bool) {
        let duration = started.elapsed();
        self.last_drain_duration = Some(duration);
        if blocked {
            self.blocked_drains += 1;
        } else {
            self.completed_drains += 1;
        }

        // Rolling average over finished drains
        let finished = self.completed_drains + self.blocked_drains;
        let total = self.average_drain_duration * (finished - 1) as u32 + duration;
        self.average_drain_duration = total / finished as u32;
    }

    pub fn record_drain_failure(&mut self) {
        self.failed_drains += 1;
    }

    pub fn record_replayed(&mut self) {
        self.operations_replayed += 1;
    }

    pub fn record_retried(&mut self) {
        self.operations_retried += 1;
    }

    pub fn record_failed(&mut self) {
        self.operations_failed += 1;
    }

    /// Share of replay attempts that succeeded
    pub fn success_rate(&self) -> f64 {
        let attempts = self.operations_replayed + self.operations_retried + self.operations_failed;
        if attempts == 0 {
            0.0
        } else {
            self.operations_replayed as f64 / attempts as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_counters() {
        let mut metrics = SyncMetrics::new();

        let started = metrics.record_drain_start();
        metrics.record_drain_finished(started, false);
        let started = metrics.record_drain_start();
        metrics.record_drain_finished(started, true);
        metrics.record_drain_start();
        metrics.record_drain_failure();

        assert_eq!(metrics.total_drains, 3);
        assert_eq!(metrics.completed_drains, 1);
        assert_eq!(metrics.blocked_drains, 1);
        assert_eq!(metrics.failed_drains, 1);
        assert!(metrics.last_drain_duration.is_some());
    }

    #[test]
    fn test_success_rate() {
        let mut metrics = SyncMetrics::new();
        assert_eq!(metrics.success_rate(), 0.0);

        metrics.record_replayed();
        metrics.record_replayed();
        metrics.record_replayed();
        metrics.record_retried();
        assert_eq!(metrics.success_rate(), 0.75);
    }
}
