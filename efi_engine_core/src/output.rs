//! High-precision output stage.
//!
//! Drives four injector channels and four ignition channels through
//! [`OutputChannelDriver`], converting a requested absolute fire time plus
//! pulsewidth/dwell into rising/falling compare writes, with latency
//! compensation and the hard safety ceilings from §4.2 applied before any
//! hardware write happens.

use efi_common::config::{IgnitionConfig, InjectionConfig};
use efi_common::consts::{CYLINDER_COUNT, IGN_MIN_LEAD_US};
use efi_hal::{HalError, OutputChannelDriver};
use efi_shared_state::counters::FaultCounters;

use crate::latency::HardwareLatency;

/// What happened when the scheduler asked the output stage to fire an
/// event. Distinguishes a deliberate protective skip from an actual
/// hardware write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    Fired,
    SkippedDwellGuard,
    SkippedOverCeiling,
}

fn dwell_base_us(vbat_mv: u32) -> f64 {
    let v = vbat_mv as f64 / 1000.0;
    if v <= 11.0 {
        4_500.0
    } else if v <= 12.5 {
        3_500.0
    } else if v <= 14.0 {
        3_000.0
    } else {
        2_800.0
    }
}

fn dwell_rpm_scale(rpm: u32) -> f64 {
    if rpm < 1_000 {
        1.15
    } else if rpm > 8_000 {
        0.85
    } else {
        1.0
    }
}

/// Resolve ignition dwell (µs) from battery voltage and RPM, clamped to the
/// configured range *after* RPM scaling, since scaling can push the base
/// value over the configured cap.
pub fn resolve_dwell_us(vbat_mv: u32, rpm: u32, cfg: &IgnitionConfig) -> u32 {
    let scaled = dwell_base_us(vbat_mv) * dwell_rpm_scale(rpm);
    (scaled.round() as u32).clamp(cfg.dwell_us_min, cfg.dwell_us_max)
}

/// One logical channel kind, for indexing the per-cylinder channel arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Injector,
    Ignition,
}

/// Owns all eight hardware output channels (one injector + one ignition per
/// cylinder) and the pure latency/dwell models that compensate their
/// timing. The scheduler is the sole caller.
pub struct OutputStage {
    injector_channels: [Box<dyn OutputChannelDriver>; CYLINDER_COUNT],
    ignition_channels: [Box<dyn OutputChannelDriver>; CYLINDER_COUNT],
    latency: HardwareLatency,
    ignition_cfg: IgnitionConfig,
    injection_cfg: InjectionConfig,
}

impl OutputStage {
    pub fn new(
        injector_channels: [Box<dyn OutputChannelDriver>; CYLINDER_COUNT],
        ignition_channels: [Box<dyn OutputChannelDriver>; CYLINDER_COUNT],
        latency: HardwareLatency,
        ignition_cfg: IgnitionConfig,
        injection_cfg: InjectionConfig,
    ) -> Self {
        Self {
            injector_channels,
            ignition_channels,
            latency,
            ignition_cfg,
            injection_cfg,
        }
    }

    fn channel_mut(&mut self, kind: ChannelKind, cylinder: usize) -> &mut Box<dyn OutputChannelDriver> {
        match kind {
            ChannelKind::Injector => &mut self.injector_channels[cylinder],
            ChannelKind::Ignition => &mut self.ignition_channels[cylinder],
        }
    }

    pub fn counter(&self, kind: ChannelKind, cylinder: usize) -> u32 {
        match kind {
            ChannelKind::Injector => self.injector_channels[cylinder].read_counter(),
            ChannelKind::Ignition => self.ignition_channels[cylinder].read_counter(),
        }
    }

    /// Schedule an injector-open event: rising edge `pulsewidth_us` (plus
    /// latency) before `target_us`, falling edge at `target_us`.
    pub fn fire_injector_open(
        &mut self,
        cylinder: usize,
        target_us: u64,
        pulsewidth_us: u32,
        vbat_mv: u32,
        clt_c: i32,
        counters: &FaultCounters,
    ) -> Result<FireOutcome, HalError> {
        let clamped = pulsewidth_us.clamp(
            self.injection_cfg.pulsewidth_us_min,
            self.injection_cfg.pulsewidth_us_ceiling,
        );
        if pulsewidth_us > self.injection_cfg.pulsewidth_us_ceiling {
            self.channel_mut(ChannelKind::Injector, cylinder).force_low();
            counters.record_skip_over_ceiling();
            return Ok(FireOutcome::SkippedOverCeiling);
        }

        let latency = self.latency.get_injector(vbat_mv, clt_c);
        let pulse = clamped.saturating_add(latency);
        let falling = target_us as u32;
        let rising = falling.wrapping_sub(pulse);

        self.channel_mut(ChannelKind::Injector, cylinder)
            .set_compare(rising, falling)?;
        Ok(FireOutcome::Fired)
    }

    /// Explicit safety stop for a cylinder's injector channel, the
    /// `InjectorClose` event's sole behavior per §4.3 (redundant with the
    /// single absolute-compare call used by `fire_injector_open`).
    pub fn close_injector(&mut self, cylinder: usize) {
        self.channel_mut(ChannelKind::Injector, cylinder).force_low();
    }

    /// Schedule an ignition-dwell event. The output stage resolves dwell
    /// internally from the RPM/voltage snapshots handed to it by the
    /// scheduler, per §4.3 step 4.
    pub fn fire_ignition_dwell(
        &mut self,
        cylinder: usize,
        target_us: u64,
        rpm_snapshot: u32,
        vbat_snapshot_mv: u32,
        clt_c: i32,
        now_us: u64,
        counters: &FaultCounters,
    ) -> Result<FireOutcome, HalError> {
        let dwell = resolve_dwell_us(vbat_snapshot_mv, rpm_snapshot, &self.ignition_cfg);

        let lead_us = target_us.saturating_sub(now_us);
        if lead_us < (dwell as u64).saturating_add(IGN_MIN_LEAD_US as u64) {
            counters.record_skip_dwell_guard();
            return Ok(FireOutcome::SkippedDwellGuard);
        }

        let latency = self.latency.get_coil(vbat_snapshot_mv, clt_c);
        let total_dwell = dwell.saturating_add(latency);
        let falling = target_us as u32;
        let rising = falling.wrapping_sub(total_dwell);

        self.channel_mut(ChannelKind::Ignition, cylinder)
            .set_compare(rising, falling)?;
        Ok(FireOutcome::Fired)
    }

    /// `IgnitionSpark` is a no-op per §4.3: the falling edge armed by
    /// `fire_ignition_dwell` already produces the spark.
    pub fn ignition_spark_noop(&self) {}

    /// Force every channel low. Used on engine shutdown and limp-mode entry.
    pub fn force_all_low(&mut self) {
        for ch in self.injector_channels.iter_mut().chain(self.ignition_channels.iter_mut()) {
            ch.force_low();
        }
    }
}
