//! Phase predictor and jitter meter.
//!
//! The predictor tracks a dynamic-α EMA of the tooth period so the
//! scheduler's `sync_valid` freshness check and the angle→µs conversion
//! can use a stable period estimate instead of the raw last-measured
//! value. The jitter meter records `|expected - actual|` per fired event
//! for diagnostics; it never influences scheduling decisions.

use efi_common::consts::{PREDICTOR_ALPHA_MAX, PREDICTOR_ALPHA_MIN, PREDICTOR_MAX_DT_US};

/// α-EMA predictor over tooth period, with acceleration-adaptive α.
#[derive(Debug, Clone, Copy)]
pub struct PhasePredictor {
    predicted_period_us: f64,
    last_period_us: f64,
    acceleration: f64,
    last_timestamp_us: Option<u64>,
    tooth_count: u64,
}

impl PhasePredictor {
    pub fn new() -> Self {
        Self {
            predicted_period_us: 0.0,
            last_period_us: 0.0,
            acceleration: 0.0,
            last_timestamp_us: None,
            tooth_count: 0,
        }
    }

    pub fn predicted_period_us(&self) -> u64 {
        self.predicted_period_us.max(0.0) as u64
    }

    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    fn alpha(&self) -> f64 {
        (PREDICTOR_ALPHA_MIN + 0.2 / (1.0 + self.acceleration.abs() * 0.001))
            .clamp(PREDICTOR_ALPHA_MIN, PREDICTOR_ALPHA_MAX)
    }

    /// Feed a newly measured tooth period at absolute timestamp `now_us`.
    /// Samples whose `dt` since the last update falls outside
    /// `[0, PREDICTOR_MAX_DT_US]` are treated as stale and dropped.
    pub fn update(&mut self, period_us: u64, now_us: u64) {
        if let Some(last_ts) = self.last_timestamp_us {
            let dt = now_us.wrapping_sub(last_ts);
            if dt > PREDICTOR_MAX_DT_US {
                self.last_timestamp_us = Some(now_us);
                return;
            }
        }

        let period = period_us as f64;
        if self.tooth_count == 0 {
            self.predicted_period_us = period;
            self.last_period_us = period;
        } else {
            if self.last_period_us > 0.0 {
                self.acceleration = period - self.last_period_us;
            }
            let alpha = self.alpha();
            self.predicted_period_us = alpha * period + (1.0 - alpha) * self.predicted_period_us;
            self.last_period_us = period;
        }

        self.tooth_count += 1;
        self.last_timestamp_us = Some(now_us);
    }
}

impl Default for PhasePredictor {
    fn default() -> Self {
        Self::new()
    }
}

/// Running min/max/mean of `|expected - actual|` fire-time error, in µs.
#[derive(Debug, Clone, Copy, Default)]
pub struct JitterMeter {
    sample_count: u64,
    sum_us: u64,
    min_us: u64,
    max_us: u64,
    first_sample: bool,
}

impl JitterMeter {
    pub fn new() -> Self {
        Self {
            sample_count: 0,
            sum_us: 0,
            min_us: u64::MAX,
            max_us: 0,
            first_sample: true,
        }
    }

    pub fn record(&mut self, expected_us: u64, actual_us: u64) {
        let err = expected_us.abs_diff(actual_us);
        self.sample_count += 1;
        self.sum_us = self.sum_us.saturating_add(err);
        if self.first_sample || err < self.min_us {
            self.min_us = err;
        }
        if err > self.max_us {
            self.max_us = err;
        }
        self.first_sample = false;
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn min_us(&self) -> u64 {
        if self.sample_count == 0 { 0 } else { self.min_us }
    }

    pub fn max_us(&self) -> u64 {
        self.max_us
    }

    pub fn mean_us(&self) -> f64 {
        if self.sample_count == 0 {
            0.0
        } else {
            self.sum_us as f64 / self.sample_count as f64
        }
    }
}
