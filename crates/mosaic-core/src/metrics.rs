//! Running counters for fusion activity.
//!
//! Counters use atomics so concurrent fusions never lose increments; the
//! rolling averages and per-key maps sit behind one lock taken briefly at
//! fusion completion.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

#[derive(Debug, Default)]
struct RollingState {
    average_confidence: f64,
    average_duration_ms: f64,
    source_utilization: BTreeMap<String, u64>,
    error_counts: BTreeMap<String, u64>,
}

/// Collector of running fusion statistics.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    fusions_attempted: AtomicU64,
    fusions_succeeded: AtomicU64,
    conflicts_detected: AtomicU64,
    conflicts_resolved: AtomicU64,
    cache_hits: AtomicU64,
    rolling: RwLock<RollingState>,
}

/// Read-only snapshot of collected metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub fusions_attempted: u64,
    pub fusions_succeeded: u64,
    pub conflicts_detected: u64,
    pub conflicts_resolved: u64,
    pub cache_hits: u64,
    /// Rolling mean confidence across successful fusions.
    pub average_confidence: f64,
    /// Rolling mean fusion duration in milliseconds.
    pub average_duration_ms: f64,
    /// Successful fetches per source id.
    pub source_utilization: BTreeMap<String, u64>,
    /// Failures per error kind.
    pub error_counts: BTreeMap<String, u64>,
}

impl MetricsCollector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of a fusion attempt.
    pub fn record_attempt(&self) {
        self.fusions_attempted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed fusion with its confidence, duration, and conflict
    /// counts. Updates the rolling averages.
    pub fn record_success(
        &self,
        confidence: f64,
        duration_ms: u64,
        conflicts_detected: usize,
        conflicts_resolved: usize,
    ) {
        let n = self.fusions_succeeded.fetch_add(1, Ordering::Relaxed) + 1;
        self.conflicts_detected
            .fetch_add(conflicts_detected as u64, Ordering::Relaxed);
        self.conflicts_resolved
            .fetch_add(conflicts_resolved as u64, Ordering::Relaxed);

        let mut rolling = self.rolling.write().unwrap();
        let n = n as f64;
        rolling.average_confidence += (confidence - rolling.average_confidence) / n;
        rolling.average_duration_ms += (duration_ms as f64 - rolling.average_duration_ms) / n;
    }

    /// Record one successful fetch from a source.
    pub fn record_source_use(&self, source_id: &str) {
        let mut rolling = self.rolling.write().unwrap();
        *rolling
            .source_utilization
            .entry(source_id.to_string())
            .or_insert(0) += 1;
    }

    /// Record a failure by error kind.
    pub fn record_error(&self, kind: &str) {
        let mut rolling = self.rolling.write().unwrap();
        *rolling.error_counts.entry(kind.to_string()).or_insert(0) += 1;
    }

    /// Record a cache hit.
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot current values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let rolling = self.rolling.read().unwrap();
        MetricsSnapshot {
            fusions_attempted: self.fusions_attempted.load(Ordering::Relaxed),
            fusions_succeeded: self.fusions_succeeded.load(Ordering::Relaxed),
            conflicts_detected: self.conflicts_detected.load(Ordering::Relaxed),
            conflicts_resolved: self.conflicts_resolved.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            average_confidence: rolling.average_confidence,
            average_duration_ms: rolling.average_duration_ms,
            source_utilization: rolling.source_utilization.clone(),
            error_counts: rolling.error_counts.clone(),
        }
    }

    /// Reset every counter and average to zero.
    pub fn reset(&self) {
        self.fusions_attempted.store(0, Ordering::Relaxed);
        self.fusions_succeeded.store(0, Ordering::Relaxed);
        self.conflicts_detected.store(0, Ordering::Relaxed);
        self.conflicts_resolved.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        *self.rolling.write().unwrap() = RollingState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_average_confidence() {
        let metrics = MetricsCollector::new();
        metrics.record_success(0.8, 100, 0, 0);
        metrics.record_success(0.4, 300, 0, 0);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.fusions_succeeded, 2);
        assert!((snapshot.average_confidence - 0.6).abs() < 1e-9);
        assert!((snapshot.average_duration_ms - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_utilization_and_errors() {
        let metrics = MetricsCollector::new();
        metrics.record_source_use("s1");
        metrics.record_source_use("s1");
        metrics.record_error("timeout");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.source_utilization["s1"], 2);
        assert_eq!(snapshot.error_counts["timeout"], 1);
    }

    #[test]
    fn test_reset() {
        let metrics = MetricsCollector::new();
        metrics.record_attempt();
        metrics.record_success(0.9, 50, 2, 2);
        metrics.record_cache_hit();
        metrics.reset();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.fusions_attempted, 0);
        assert_eq!(snapshot.fusions_succeeded, 0);
        assert_eq!(snapshot.cache_hits, 0);
        assert_eq!(snapshot.average_confidence, 0.0);
        assert!(snapshot.source_utilization.is_empty());
    }

    #[test]
    fn test_concurrent_attempts_not_lost() {
        use std::sync::Arc;
        let metrics = Arc::new(MetricsCollector::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        metrics.record_attempt();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().fusions_attempted, 800);
    }
}
