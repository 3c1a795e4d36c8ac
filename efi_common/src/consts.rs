//! System-wide constants for the EFI workspace.
//!
//! Single source of truth for all numeric limits and default paths.
//! Imported by all crates — no duplication permitted.

/// Number of physical teeth on the trigger wheel, missing teeth included
/// (a "60-2" wheel reports 60 here even though only 58 edges occur per rev).
pub const TOOTH_COUNT_DEFAULT: u8 = 60;

/// Number of teeth removed at the trigger gap.
pub const GAP_TEETH_DEFAULT: u8 = 2;

/// Number of cylinders supported by the output stage.
pub const CYLINDER_COUNT: usize = 4;

/// Fixed capacity of the angle-addressed event queue.
pub const EVENT_QUEUE_CAPACITY: usize = 16;

/// Minimum plausible engine RPM for sync validity.
pub const RPM_MIN_DEFAULT: u32 = 150;

/// Maximum plausible engine RPM for sync validity.
pub const RPM_MAX_DEFAULT: u32 = 9_000;

/// Minimum ignition dwell [µs], below which the output stage must clamp.
pub const IGN_DWELL_US_MIN: u32 = 1_500;

/// Maximum ignition dwell [µs], above which the output stage must clamp.
pub const IGN_DWELL_US_MAX: u32 = 5_000;

/// Minimum time-to-spark [µs] below which a scheduled spark must be skipped
/// rather than truncated, to protect the coil.
pub const IGN_MIN_LEAD_US: u32 = 200;

/// Hard ceiling on injector pulsewidth [µs]; exceeding this stops the channel.
pub const INJECTOR_PULSEWIDTH_CEILING_US: u32 = 25_000;

/// Free-running output timer tick rate [Hz].
pub const OUTPUT_TIMER_HZ: u32 = 1_000_000;

/// Free-running output timer period [ticks] — long enough that no event's
/// rising-to-falling span ever wraps during a single schedule.
pub const OUTPUT_TIMER_PERIOD_TICKS: u32 = 30_000_000;

/// Number of precision tiers (RPM bands with independent timer resolution
/// and angular tolerance).
pub const PRECISION_TIER_COUNT: usize = 4;

/// Hysteresis band [RPM] applied around each precision-tier boundary.
pub const PRECISION_TIER_HYSTERESIS_RPM: u32 = 100;

/// Default precision-tier RPM boundaries (upper bound of each tier).
pub const PRECISION_TIER_BOUNDS_RPM: [u32; PRECISION_TIER_COUNT] = [1_000, 2_500, 4_500, 8_000];

/// Default per-tier timer resolutions [Hz], indices matching
/// [`PRECISION_TIER_BOUNDS_RPM`].
pub const PRECISION_TIER_RESOLUTIONS_HZ: [u32; PRECISION_TIER_COUNT] =
    [10_000_000, 5_000_000, 2_000_000, 1_000_000];

/// Default per-tier angular tolerances [millidegrees], same index scheme.
pub const PRECISION_TIER_TOLERANCE_MDEG: [u32; PRECISION_TIER_COUNT] = [200, 300, 500, 800];

/// Minimum adaptation factor for the phase predictor's dynamic alpha.
pub const PREDICTOR_ALPHA_MIN: f64 = 0.05;

/// Maximum adaptation factor for the phase predictor's dynamic alpha.
pub const PREDICTOR_ALPHA_MAX: f64 = 0.5;

/// Largest accepted gap between predictor updates [µs] before the sample
/// is treated as stale and dropped.
pub const PREDICTOR_MAX_DT_US: u64 = 100_000;

/// Seconds continuously in limp mode required before a recovery attempt.
pub const LIMP_MODE_MIN_DURATION_S: f64 = 5.0;

/// Seconds continuously all-safe required before clearing limp mode.
pub const LIMP_MODE_RECOVERY_HOLDOFF_S: f64 = 2.0;

/// Default planner task period [µs] (Core 1 cadence).
pub const PLANNER_PERIOD_US_DEFAULT: u64 = 5_000;

/// Default CPU core the Core-0 tooth-edge thread is pinned to under the
/// `rt` feature (an isolated core, kept free of the kernel scheduler's
/// other workloads).
pub const CORE0_CPU_AFFINITY_DEFAULT: usize = 2;

/// Default `SCHED_FIFO` priority for the Core-0 tooth-edge thread under the
/// `rt` feature. Below the kernel's watchdog threads, above everything else.
pub const CORE0_RT_PRIORITY_DEFAULT: i32 = 80;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/efi/engine.toml";

/// Default persisted-tuning-state file name.
pub const DEFAULT_STATE_FILE: &str = "efi_state.toml";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_consistent() {
        assert!(TOOTH_COUNT_DEFAULT > GAP_TEETH_DEFAULT);
        assert!(CYLINDER_COUNT > 0 && CYLINDER_COUNT <= 12);
        assert!(RPM_MIN_DEFAULT < RPM_MAX_DEFAULT);
        assert!(IGN_DWELL_US_MIN < IGN_DWELL_US_MAX);
        assert!(PREDICTOR_ALPHA_MIN < PREDICTOR_ALPHA_MAX);
    }

    #[test]
    fn precision_tier_tables_are_monotonic() {
        for w in PRECISION_TIER_BOUNDS_RPM.windows(2) {
            assert!(w[0] < w[1], "tier RPM bounds must strictly increase");
        }
        for w in PRECISION_TIER_RESOLUTIONS_HZ.windows(2) {
            assert!(w[0] > w[1], "tier resolution must strictly decrease with RPM");
        }
        for w in PRECISION_TIER_TOLERANCE_MDEG.windows(2) {
            assert!(w[0] < w[1], "tier tolerance must strictly increase with RPM");
        }
    }

    #[test]
    fn event_queue_capacity_fits_cylinder_fanout() {
        // Two armed event types per cylinder must always fit with headroom.
        assert!(EVENT_QUEUE_CAPACITY >= CYLINDER_COUNT * 2);
    }
}
