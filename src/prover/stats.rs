//! Per-orchestrator proof statistics

use parking_lot::Mutex;
use serde::Serialize;
use std::time::Duration;

#[derive(Default)]
struct Counters {
    total: u64,
    succeeded: u64,
    failed: u64,
    total_time: Duration,
}

/// Counters shared by every caller of one orchestrator
#[derive(Default)]
pub struct ProofStats {
    inner: Mutex<Counters>,
}

/// A point-in-time copy of [`ProofStats`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub total_proofs: u64,
    pub successful_proofs: u64,
    pub failed_proofs: u64,
    pub total_time_ms: f64,
    /// Mean over successful proofs
    pub avg_time_ms: f64,
    /// Percentage of attempts that succeeded
    pub success_rate: f64,
}

impl ProofStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_success(&self, elapsed: Duration) {
        let mut c = self.inner.lock();
        c.total += 1;
        c.succeeded += 1;
        c.total_time += elapsed;
    }

    pub(crate) fn record_failure(&self) {
        let mut c = self.inner.lock();
        c.total += 1;
        c.failed += 1;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let c = self.inner.lock();
        let total_time_ms = c.total_time.as_secs_f64() * 1000.0;
        StatsSnapshot {
            total_proofs: c.total,
            successful_proofs: c.succeeded,
            failed_proofs: c.failed,
            total_time_ms,
            avg_time_ms: if c.succeeded > 0 {
                total_time_ms / c.succeeded as f64
            } else {
                0.0
            },
            success_rate: if c.total > 0 {
                c.succeeded as f64 * 100.0 / c.total as f64
            } else {
                0.0
            },
        }
    }

    pub fn reset(&self) {
        *self.inner.lock() = Counters::default();
    }
}
