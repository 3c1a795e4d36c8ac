//! Fault counters incremented from ISR-equivalent context and drained by
//! the planner task for logging.
//!
//! Core 0 must never call into `tracing` directly — formatting and writing
//! a log line is not bounded real-time work. Instead it increments a
//! plain atomic counter here; Core 1 periodically reads the deltas and
//! emits structured log events.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct FaultCounters {
    sync_loss: AtomicU64,
    queue_full: AtomicU64,
    skip_dwell_guard: AtomicU64,
    skip_over_ceiling: AtomicU64,
    tooth_noise_rejected: AtomicU64,
}

/// Point-in-time copy of [`FaultCounters`], safe to log or serialize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultCountersSnapshot {
    pub sync_loss: u64,
    pub queue_full: u64,
    pub skip_dwell_guard: u64,
    pub skip_over_ceiling: u64,
    pub tooth_noise_rejected: u64,
}

impl FaultCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sync_loss(&self) {
        self.sync_loss.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_queue_full(&self) {
        self.queue_full.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skip_dwell_guard(&self) {
        self.skip_dwell_guard.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skip_over_ceiling(&self) {
        self.skip_over_ceiling.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tooth_noise_rejected(&self) {
        self.tooth_noise_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FaultCountersSnapshot {
        FaultCountersSnapshot {
            sync_loss: self.sync_loss.load(Ordering::Relaxed),
            queue_full: self.queue_full.load(Ordering::Relaxed),
            skip_dwell_guard: self.skip_dwell_guard.load(Ordering::Relaxed),
            skip_over_ceiling: self.skip_over_ceiling.load(Ordering::Relaxed),
            tooth_noise_rejected: self.tooth_noise_rejected.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let c = FaultCounters::new();
        assert_eq!(c.snapshot(), FaultCountersSnapshot::default());
    }

    #[test]
    fn each_counter_increments_independently() {
        let c = FaultCounters::new();
        c.record_sync_loss();
        c.record_sync_loss();
        c.record_queue_full();
        let snap = c.snapshot();
        assert_eq!(snap.sync_loss, 2);
        assert_eq!(snap.queue_full, 1);
        assert_eq!(snap.skip_dwell_guard, 0);
    }
}
