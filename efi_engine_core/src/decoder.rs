//! Crank decoder & synchronizer.
//!
//! Converts a stream of crank-tooth edge timestamps into
//! `(tooth_index, revolution_index, tooth_period, rpm)` and tracks
//! `sync_acquired`. Runs once per tooth edge in ISR context: no
//! allocation, no blocking, no logging — rejected/noisy edges only
//! increment a [`FaultCounters`] field for Core 1 to drain later.

use efi_common::config::SyncConfig;
use efi_shared_state::counters::FaultCounters;

/// Exponential-smoothing factor for the running tooth-period estimate used
/// for gap detection. Not spec-mandated precisely, chosen for a few-tooth
/// settling time without excessive sensitivity to a single noisy edge.
const GAP_EMA_ALPHA: f64 = 0.25;

/// Multiplier applied to the running period estimate to declare a gap.
const GAP_MULTIPLIER: f64 = 1.5;

/// Shortest plausible inter-tooth spacing; anything tighter is a double
/// trigger on the same edge, not a second tooth.
const DOUBLE_EDGE_REJECT_US: u64 = 10;

/// One accepted tooth, ready to hand to the scheduler's `on_tooth` scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToothEvent {
    pub tooth_time_us: u64,
    pub tooth_period_us: u64,
    pub tooth_index: u32,
    pub revolution_index: u8,
    pub rpm: u32,
    pub sync_acquired: bool,
}

/// Crank-tooth decoder and sync-state machine.
pub struct CrankDecoder {
    config: SyncConfig,
    teeth: u32,
    tooth_index: u32,
    revolution_index: u8,
    last_tooth_time_us: Option<u64>,
    last_period_us: u64,
    ema_period_us: f64,
    cam_seen_this_rev: bool,
    sync_acquired: bool,
    rpm: u32,
}

impl CrankDecoder {
    pub fn new(config: SyncConfig) -> Self {
        let teeth = config.tooth_count as u32;
        Self {
            config,
            teeth,
            tooth_index: 0,
            revolution_index: 0,
            last_tooth_time_us: None,
            last_period_us: 0,
            ema_period_us: 0.0,
            cam_seen_this_rev: false,
            sync_acquired: false,
            rpm: 0,
        }
    }

    /// Degrees spanned by one tooth position on the trigger wheel.
    pub fn deg_per_tooth(&self) -> f64 {
        360.0 / self.teeth as f64
    }

    pub fn sync_acquired(&self) -> bool {
        self.sync_acquired
    }

    pub fn rpm(&self) -> u32 {
        self.rpm
    }

    /// Most recently measured inter-tooth period, for snapshot publishing.
    pub fn tooth_period_us(&self) -> u64 {
        self.last_period_us
    }

    pub fn revolution_index(&self) -> u8 {
        self.revolution_index
    }

    /// Running period estimate used to detect the trigger-wheel gap, i.e.
    /// the baseline a period must exceed `GAP_MULTIPLIER`-fold to be
    /// classified as the gap rather than a normal tooth.
    pub fn gap_period_us(&self) -> u64 {
        self.ema_period_us.round() as u64
    }

    pub fn cam_seen(&self) -> bool {
        self.cam_seen_this_rev
    }

    /// Latch a cam-sensor edge. Must be called before the next gap edge for
    /// sync to be (re-)acquired on that gap.
    pub fn on_cam_edge(&mut self) {
        self.cam_seen_this_rev = true;
    }

    fn min_plausible_period_us(&self) -> u64 {
        if self.config.max_rpm == 0 {
            return 0;
        }
        (60_000_000.0 / (self.config.max_rpm as f64 * self.teeth as f64)).floor() as u64
    }

    /// Process one crank-tooth rising edge. Returns `Some(ToothEvent)` for
    /// every edge accepted as real (including the one that re-detects a
    /// gap); returns `None` for the very first edge ever seen (no period
    /// yet) and for edges rejected as noise.
    pub fn on_tooth_edge(&mut self, now_us: u64, counters: &FaultCounters) -> Option<ToothEvent> {
        let Some(last) = self.last_tooth_time_us else {
            self.last_tooth_time_us = Some(now_us);
            return None;
        };

        let period = now_us.wrapping_sub(last);

        if period < DOUBLE_EDGE_REJECT_US {
            return None;
        }
        if period < self.min_plausible_period_us() {
            counters.record_tooth_noise_rejected();
            return None;
        }

        self.last_tooth_time_us = Some(now_us);

        let is_gap = self.ema_period_us > 0.0 && (period as f64) > GAP_MULTIPLIER * self.ema_period_us;

        if is_gap {
            self.tooth_index = 0;
            self.revolution_index = (self.revolution_index + 1) % 2;
            if self.config.enable_cam_phase {
                if self.cam_seen_this_rev {
                    self.sync_acquired = true;
                }
                self.cam_seen_this_rev = false;
            } else {
                self.sync_acquired = true;
            }
        } else {
            self.tooth_index += 1;
            if self.tooth_index >= self.teeth {
                self.sync_acquired = false;
                self.tooth_index = 0;
                counters.record_sync_loss();
            }
            if self.ema_period_us <= 0.0 {
                self.ema_period_us = period as f64;
            } else {
                self.ema_period_us = GAP_EMA_ALPHA * period as f64 + (1.0 - GAP_EMA_ALPHA) * self.ema_period_us;
            }
        }

        self.rpm = (60_000_000.0 / (period as f64 * self.teeth as f64)).round() as u32;
        self.last_period_us = period;

        Some(ToothEvent {
            tooth_time_us: now_us,
            tooth_period_us: period,
            tooth_index: self.tooth_index,
            revolution_index: self.revolution_index,
            rpm: self.rpm,
            sync_acquired: self.sync_acquired,
        })
    }

    /// `sync_valid` per the escalation rule: acquired, fresh relative to the
    /// predictor's current estimate, and within the configured RPM band.
    pub fn sync_valid(&self, now_us: u64, predicted_period_us: u64) -> bool {
        if !self.sync_acquired {
            return false;
        }
        let Some(last) = self.last_tooth_time_us else {
            return false;
        };
        let age = now_us.wrapping_sub(last);
        if age > predicted_period_us.saturating_mul(2) {
            return false;
        }
        self.rpm >= self.config.min_rpm && self.rpm <= self.config.max_rpm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder() -> CrankDecoder {
        CrankDecoder::new(SyncConfig {
            tooth_count: 60,
            gap_teeth: 2,
            enable_cam_phase: true,
            min_rpm: 100,
            max_rpm: 9000,
            tdc_offset_deg: 0.0,
        })
    }

    #[test]
    fn cold_start_acquires_sync_after_gap_and_cam() {
        let mut d = decoder();
        let counters = FaultCounters::new();
        let mut t = 0u64;

        d.on_tooth_edge(t, &counters); // seed last_tooth_time
        for _ in 0..5 {
            t += 6000;
            d.on_tooth_edge(t, &counters);
        }
        d.on_cam_edge();
        t += 12_000; // gap
        let ev = d.on_tooth_edge(t, &counters).unwrap();
        assert!(ev.sync_acquired);
        assert!(d.sync_acquired());

        t += 6000;
        let ev2 = d.on_tooth_edge(t, &counters).unwrap();
        assert_eq!((ev2.rpm as i64 - 166).abs() <= 2, true);
    }

    #[test]
    fn double_edge_within_10us_is_ignored() {
        let mut d = decoder();
        let counters = FaultCounters::new();
        d.on_tooth_edge(0, &counters);
        let result = d.on_tooth_edge(5, &counters);
        assert!(result.is_none());
    }

    #[test]
    fn impossible_short_period_is_rejected_as_noise() {
        let mut d = decoder();
        let counters = FaultCounters::new();
        d.on_tooth_edge(0, &counters);
        // 9000 RPM max at 60 teeth -> min period ~185us; 50us is impossible.
        let result = d.on_tooth_edge(50, &counters);
        assert!(result.is_none());
        assert_eq!(counters.snapshot().tooth_noise_rejected, 1);
    }

    #[test]
    fn missed_gap_clears_sync_and_counts_loss() {
        let mut d = decoder();
        let counters = FaultCounters::new();
        let mut t = 0u64;
        d.on_tooth_edge(t, &counters);
        for _ in 0..61 {
            t += 6000;
            d.on_tooth_edge(t, &counters);
        }
        assert!(!d.sync_acquired());
        assert_eq!(counters.snapshot().sync_loss, 1);
    }

    #[test]
    fn sync_valid_requires_fresh_edge_and_rpm_band() {
        let mut d = decoder();
        let counters = FaultCounters::new();
        let mut t = 0u64;
        d.on_tooth_edge(t, &counters);
        for _ in 0..5 {
            t += 6000;
            d.on_tooth_edge(t, &counters);
        }
        d.on_cam_edge();
        t += 12_000;
        d.on_tooth_edge(t, &counters);
        t += 6000;
        d.on_tooth_edge(t, &counters);

        assert!(d.sync_valid(t, 6000));
        assert!(!d.sync_valid(t + 100_000, 6000));
    }

    #[test]
    fn snapshot_getters_reflect_last_accepted_edge() {
        let mut d = decoder();
        let counters = FaultCounters::new();
        let mut t = 0u64;
        d.on_tooth_edge(t, &counters);
        for _ in 0..5 {
            t += 6000;
            d.on_tooth_edge(t, &counters);
        }
        d.on_cam_edge();
        t += 12_000;
        d.on_tooth_edge(t, &counters);
        assert!(d.cam_seen() == false); // cleared on the gap edge that consumed it
        assert_eq!(d.tooth_period_us(), 12_000);
        assert_eq!(d.revolution_index(), 1);

        t += 6000;
        d.on_tooth_edge(t, &counters);
        assert_eq!(d.tooth_period_us(), 6000);
        assert!(d.gap_period_us() > 0);
    }
}
