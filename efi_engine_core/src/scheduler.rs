//! Angle-based event scheduler.
//!
//! Decouples *when to decide* an event should happen (the planner, on a
//! coarse Core 1 cadence) from *when it fires* (the decoder's per-tooth
//! ISR, at the exact crank angle). Insertion normalizes the target angle
//! and arms a queue slot; the per-tooth scan computes the current crank
//! angle, finds armed slots within the next-tooth firing window, converts
//! their angular distance to a microsecond delay, and hands off to the
//! output stage.

use efi_common::angle::{angle_distance_to_delay_us, Angle};
use efi_hal::HalError;
use efi_shared_state::counters::FaultCounters;
use efi_shared_state::queue::{EventQueue, EventType};

use crate::decoder::ToothEvent;
use crate::output::OutputStage;

/// Margin multiplier on `deg_per_tooth` for the next-tooth firing window;
/// see §4.3 — using exactly one tooth-width would miss events whose angle
/// equals the next tooth due to floating-point rounding.
const FIRING_WINDOW_TOOTH_MULTIPLIER: f64 = 1.5;

/// Snapshot inputs the per-tooth scan needs beyond the tooth event itself.
#[derive(Debug, Clone, Copy)]
pub struct ScanContext {
    pub tdc_offset_deg: f64,
    pub vbat_mv: u32,
    pub clt_c: i32,
}

/// Angle-addressed event scheduler: owns the fixed-capacity queue and the
/// `sync_valid` flag the per-tooth scan quiesces on.
pub struct EventScheduler {
    queue: EventQueue,
    sync_valid: bool,
}

impl EventScheduler {
    pub fn new() -> Self {
        Self {
            queue: EventQueue::new(),
            sync_valid: false,
        }
    }

    pub fn sync_valid(&self) -> bool {
        self.sync_valid
    }

    pub fn pending_count(&self) -> usize {
        self.queue.pending_count()
    }

    /// Arm an event at `angle_deg` (normalized into `[0, 720)`, NaN/±Inf
    /// reducing to 0). Returns `Err(())` if the queue is full.
    pub fn schedule(
        &self,
        event_type: EventType,
        cylinder: u8,
        angle_deg: f64,
        param_us: u32,
        rpm_snapshot: u32,
        vbat_snapshot_mv: u32,
        counters: &FaultCounters,
    ) -> Result<(), ()> {
        let angle = Angle::from_degrees(angle_deg);
        let result = self
            .queue
            .schedule(event_type, cylinder, angle, param_us, rpm_snapshot, vbat_snapshot_mv);
        if result.is_err() {
            counters.record_queue_full();
        }
        result
    }

    pub fn cancel_all(&self) {
        self.queue.cancel_all();
    }

    pub fn cancel_cylinder(&self, cylinder: u8) {
        self.queue.cancel_cylinder(cylinder);
    }

    pub fn cancel_type(&self, event_type: EventType) {
        self.queue.cancel_type(event_type);
    }

    /// Per-tooth scan, called once per accepted tooth from ISR context.
    /// Fires every armed event within the next-tooth window and clears it;
    /// no-op entirely when sync is not valid or the tooth period is zero.
    pub fn on_tooth(
        &mut self,
        tooth: &ToothEvent,
        deg_per_tooth: f64,
        ctx: &ScanContext,
        output: &mut OutputStage,
        counters: &FaultCounters,
    ) {
        self.sync_valid = tooth.sync_acquired;

        if !self.sync_valid || tooth.tooth_period_us == 0 {
            return;
        }

        let current_angle = Angle::from_degrees(
            tooth.revolution_index as f64 * 360.0 + tooth.tooth_index as f64 * deg_per_tooth + ctx.tdc_offset_deg,
        );
        let window_deg = FIRING_WINDOW_TOOTH_MULTIPLIER * deg_per_tooth;

        self.queue.scan_and_clear(|_, slot| {
            let dist = current_angle.forward_distance_to(slot.angle);
            if dist.to_degrees() > window_deg {
                return false;
            }

            let delay_us = angle_distance_to_delay_us(dist, tooth.tooth_period_us, deg_per_tooth);
            let absolute_target = tooth.tooth_time_us + delay_us;
            let cyl = slot.cylinder as usize;

            let result: Result<_, HalError> = match slot.event_type {
                EventType::InjectorOpen => output
                    .fire_injector_open(cyl, absolute_target, slot.param_us, ctx.vbat_mv, ctx.clt_c, counters)
                    .map(|_| ()),
                EventType::InjectorClose => {
                    output.close_injector(cyl);
                    Ok(())
                }
                EventType::IgnitionDwell => output
                    .fire_ignition_dwell(
                        cyl,
                        absolute_target,
                        slot.rpm_snapshot,
                        slot.vbat_snapshot_mv,
                        ctx.clt_c,
                        tooth.tooth_time_us,
                        counters,
                    )
                    .map(|_| ()),
                EventType::IgnitionSpark => {
                    output.ignition_spark_noop();
                    Ok(())
                }
            };

            // `TargetInPast` means set_compare refused to touch hardware;
            // nothing to unwind. Slot still clears — a stale angle target
            // is not retried on the next tooth.
            let _ = result;
            true
        });
    }
}

impl Default for EventScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tooth(time_us: u64, period_us: u64, index: u32, rev: u8) -> ToothEvent {
        ToothEvent {
            tooth_time_us: time_us,
            tooth_period_us: period_us,
            tooth_index: index,
            revolution_index: rev,
            rpm: 800,
            sync_acquired: true,
        }
    }

    fn ctx() -> ScanContext {
        ScanContext {
            tdc_offset_deg: 0.0,
            vbat_mv: 13_800,
            clt_c: 80,
        }
    }

    fn stage() -> OutputStage {
        use efi_common::config::{IgnitionConfig, InjectionConfig};
        use efi_common::consts::CYLINDER_COUNT;
        use efi_hal::{OutputChannelDriver, SimulationChannel};

        let injectors: [Box<dyn OutputChannelDriver>; CYLINDER_COUNT] =
            std::array::from_fn(|_| Box::new(SimulationChannel::new()) as Box<dyn OutputChannelDriver>);
        let ignition: [Box<dyn OutputChannelDriver>; CYLINDER_COUNT] =
            std::array::from_fn(|_| Box::new(SimulationChannel::new()) as Box<dyn OutputChannelDriver>);
        OutputStage::new(
            injectors,
            ignition,
            crate::latency::HardwareLatency::defaults(),
            IgnitionConfig::default(),
            InjectionConfig::default(),
        )
    }

    #[test]
    fn no_writes_when_sync_invalid() {
        let mut sched = EventScheduler::new();
        let counters = FaultCounters::new();
        sched
            .schedule(EventType::IgnitionDwell, 0, 10.0, 0, 800, 13_800, &counters)
            .unwrap();
        let mut out = stage();
        let mut t = tooth(0, 6000, 0, 0);
        t.sync_acquired = false;
        sched.on_tooth(&t, 6.0, &ctx(), &mut out, &counters);
        assert_eq!(sched.pending_count(), 1); // untouched, still armed
    }

    #[test]
    fn event_within_window_fires_and_clears() {
        let mut sched = EventScheduler::new();
        let counters = FaultCounters::new();
        // deg_per_tooth = 6 -> window = 9 degrees; schedule just inside it.
        sched
            .schedule(EventType::InjectorOpen, 0, 5.0, 2000, 800, 13_800, &counters)
            .unwrap();
        let mut out = stage();
        let t = tooth(100_000, 6000, 0, 0);
        sched.on_tooth(&t, 6.0, &ctx(), &mut out, &counters);
        assert_eq!(sched.pending_count(), 0);
    }

    #[test]
    fn event_outside_window_is_not_fired_yet() {
        let mut sched = EventScheduler::new();
        let counters = FaultCounters::new();
        sched
            .schedule(EventType::InjectorOpen, 0, 45.0, 2000, 800, 13_800, &counters)
            .unwrap();
        let mut out = stage();
        let t = tooth(100_000, 6000, 0, 0);
        sched.on_tooth(&t, 6.0, &ctx(), &mut out, &counters);
        assert_eq!(sched.pending_count(), 1);
    }

    #[test]
    fn cancel_all_is_idempotent() {
        let sched = EventScheduler::new();
        let counters = FaultCounters::new();
        sched
            .schedule(EventType::IgnitionDwell, 0, 90.0, 0, 800, 13_800, &counters)
            .unwrap();
        sched.cancel_all();
        assert_eq!(sched.pending_count(), 0);
        sched.cancel_all();
        assert_eq!(sched.pending_count(), 0);
    }

    #[test]
    fn queue_saturation_reports_failure_and_counts_it() {
        let sched = EventScheduler::new();
        let counters = FaultCounters::new();
        for _ in 0..16 {
            sched
                .schedule(EventType::InjectorOpen, 0, 1.0, 0, 800, 13_800, &counters)
                .unwrap();
        }
        let result = sched.schedule(EventType::InjectorOpen, 0, 1.0, 0, 800, 13_800, &counters);
        assert!(result.is_err());
        assert_eq!(sched.pending_count(), 16);
        assert_eq!(counters.snapshot().queue_full, 1);
    }
}
