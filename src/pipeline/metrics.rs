// src/pipeline/metrics.rs
//
// Batch counters. Cloned into every rayon worker; all clones share
// the same atomics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct BatchMetrics {
    pub scenarios_processed: Arc<AtomicU64>,
    pub scenarios_failed: Arc<AtomicU64>,
    pub rows_scored: Arc<AtomicU64>,
    pub collisions: Arc<AtomicU64>,
    pub envelope_violations: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl Default for BatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchMetrics {
    pub fn new() -> Self {
        Self {
            scenarios_processed: Arc::new(AtomicU64::new(0)),
            scenarios_failed: Arc::new(AtomicU64::new(0)),
            rows_scored: Arc::new(AtomicU64::new(0)),
            collisions: Arc::new(AtomicU64::new(0)),
            envelope_violations: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, counter: &AtomicU64, amount: u64) {
        counter.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn rows_per_sec(&self) -> f64 {
        let rows = self.rows_scored.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            rows as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            scenarios_processed: self.scenarios_processed.load(Ordering::Relaxed),
            scenarios_failed: self.scenarios_failed.load(Ordering::Relaxed),
            rows_scored: self.rows_scored.load(Ordering::Relaxed),
            collisions: self.collisions.load(Ordering::Relaxed),
            envelope_violations: self.envelope_violations.load(Ordering::Relaxed),
            rows_per_sec: self.rows_per_sec(),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BatchSummary {
    pub scenarios_processed: u64,
    pub scenarios_failed: u64,
    pub rows_scored: u64,
    pub collisions: u64,
    pub envelope_violations: u64,
    pub rows_per_sec: f64,
    pub elapsed_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_clones_share_counters() {
        let metrics = BatchMetrics::new();
        let worker = metrics.clone();
        worker.inc(&worker.scenarios_processed);
        worker.add(&worker.rows_scored, 40);
        let summary = metrics.summary();
        assert_eq!(summary.scenarios_processed, 1);
        assert_eq!(summary.rows_scored, 40);
        assert_eq!(summary.scenarios_failed, 0);
    }

    #[test]
    fn test_parallel_increments() {
        let metrics = BatchMetrics::new();
        (0..1000).into_par_iter().for_each(|_| {
            metrics.inc(&metrics.collisions);
        });
        assert_eq!(metrics.summary().collisions, 1000);
    }
}
