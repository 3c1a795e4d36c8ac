//! # EFI Engine Core
//!
//! Crank decoding, angle-based event scheduling, and high-precision output
//! generation for a four-cylinder, sequential-injection engine-control
//! unit. This crate is the entire Core-0 real-time surface: decoder and
//! scheduler run inline in tooth-edge ISR context; everything else
//! (planner, telemetry, tuning, CAN, CLI) is a Core-1 collaborator that
//! only ever touches the engine through [`EngineCore::schedule`] and
//! read-only snapshots.
//!
//! ## Module Structure
//!
//! - [`decoder`] — crank-tooth decoding and sync acquisition (§4.1)
//! - [`predictor`] — phase-period prediction and jitter measurement (§4.5)
//! - [`precision`] — RPM-banded precision tier selection (§4.7)
//! - [`latency`] — coil/injector hardware latency compensation
//! - [`output`] — high-precision output stage (§4.2)
//! - [`scheduler`] — angle-addressed event scheduler (§4.3/§4.4)
//! - [`safety`] — limp-mode escalation and recovery (§4.8)
//! - [`cycle`] — RT setup and Core-0 host-thread pacing
//!
//! ## Zero-Allocation Real-Time Path
//!
//! [`EngineCore::on_tooth_edge`] never allocates and never blocks: the
//! event queue, output channels, and predictor state are all pre-sized at
//! construction.

pub mod cycle;
pub mod decoder;
pub mod latency;
pub mod output;
pub mod precision;
pub mod predictor;
pub mod safety;
pub mod scheduler;

use efi_common::config::EngineConfig;
use efi_common::consts::CYLINDER_COUNT;
use efi_shared_state::counters::{FaultCounters, FaultCountersSnapshot};
use efi_shared_state::queue::EventType;
use efi_shared_state::{SnapshotCell, SyncSnapshot};

use decoder::{CrankDecoder, ToothEvent};
use latency::HardwareLatency;
use output::OutputStage;
use precision::PrecisionTierSelector;
use predictor::{JitterMeter, PhasePredictor};
use safety::{LimpModeState, SafetyFlags};
use scheduler::{EventScheduler, ScanContext};

/// Process-wide engine state: the single owner of the decoder, predictor,
/// precision selector, scheduler, output stage, and safety state. Built
/// once at startup; Core 0 drives [`EngineCore::on_tooth_edge`], Core 1
/// drives [`EngineCore::schedule`] and reads snapshots.
pub struct EngineCore {
    decoder: CrankDecoder,
    predictor: PhasePredictor,
    precision: PrecisionTierSelector,
    scheduler: EventScheduler,
    output: OutputStage,
    safety: LimpModeState,
    jitter: JitterMeter,
    counters: FaultCounters,
    config: EngineConfig,
    sync_snapshot: SnapshotCell<SyncSnapshot>,
}

impl EngineCore {
    pub fn new(config: EngineConfig, output: OutputStage) -> Self {
        let decoder = CrankDecoder::new(config.sync);
        Self {
            decoder,
            predictor: PhasePredictor::new(),
            precision: PrecisionTierSelector::new(),
            scheduler: EventScheduler::new(),
            output,
            safety: LimpModeState::new(2000, 10.0, 2000),
            jitter: JitterMeter::new(),
            counters: FaultCounters::new(),
            config,
            sync_snapshot: SnapshotCell::new(),
        }
    }

    /// Most recently published decoder sync state (§3 `SyncSnapshot`).
    /// Safe to call from any reader — Core 1, telemetry, a diagnostic CLI
    /// dump — without touching the tooth-edge critical section.
    pub fn sync_snapshot(&self) -> SyncSnapshot {
        self.sync_snapshot.read()
    }

    pub fn counters(&self) -> FaultCountersSnapshot {
        self.counters.snapshot()
    }

    pub fn rpm(&self) -> u32 {
        self.decoder.rpm()
    }

    pub fn sync_acquired(&self) -> bool {
        self.decoder.sync_acquired()
    }

    pub fn sync_valid(&self) -> bool {
        self.scheduler.sync_valid()
    }

    pub fn precision_tier(&self) -> precision::PrecisionTier {
        self.precision.current()
    }

    pub fn limp_mode_active(&self) -> bool {
        self.safety.active()
    }

    /// Latch a cam-sensor edge, required once per revolution for sync
    /// (re-)acquisition when `enable_cam_phase` is set.
    pub fn on_cam_edge(&mut self) {
        self.decoder.on_cam_edge();
    }

    /// Process one crank-tooth rising edge: decode, update the predictor
    /// and precision tier, propagate `sync_valid` into the scheduler, and
    /// run the per-tooth firing scan. Runs once per tooth in ISR context.
    pub fn on_tooth_edge(&mut self, now_us: u64, vbat_mv: u32, clt_c: i32) -> Option<ToothEvent> {
        let tooth = self.decoder.on_tooth_edge(now_us, &self.counters)?;

        self.predictor.update(tooth.tooth_period_us, now_us);
        self.precision.observe(tooth.rpm);

        let sync_valid = self
            .decoder
            .sync_valid(now_us, self.predictor.predicted_period_us());
        let mut gated = tooth;
        gated.sync_acquired = sync_valid;

        if !sync_valid {
            self.scheduler.cancel_all();
            self.output.force_all_low();
        }

        let ctx = ScanContext {
            tdc_offset_deg: self.config.sync.tdc_offset_deg,
            vbat_mv,
            clt_c,
        };
        self.scheduler
            .on_tooth(&gated, self.decoder.deg_per_tooth(), &ctx, &mut self.output, &self.counters);

        self.sync_snapshot.publish(SyncSnapshot {
            tooth_period_us: self.decoder.tooth_period_us(),
            revolution_index: self.decoder.revolution_index(),
            gap_period_us: self.decoder.gap_period_us(),
            cam_seen: self.decoder.cam_seen(),
            latency_estimate_us: self.jitter.mean_us().round() as u32,
        });

        Some(tooth)
    }

    /// Watchdog entry point for a collaborator with its own independently
    /// advancing clock (Core 1's planner cadence, not a tooth edge). The
    /// revolution/gap bookkeeping in [`on_tooth_edge`](Self::on_tooth_edge)
    /// only ever runs when a new edge arrives, so it can never notice a
    /// crank that has stopped turning entirely; this lets the freshness
    /// conjunct of `sync_valid` (§4.1) go false against a `now_us` the
    /// decoder did not just stamp itself. Cancels pending events and forces
    /// outputs low the same way a tooth-edge sync loss does.
    pub fn check_staleness(&mut self, now_us: u64) -> bool {
        let valid = self
            .decoder
            .sync_valid(now_us, self.predictor.predicted_period_us());
        if !valid {
            self.scheduler.cancel_all();
            self.output.force_all_low();
        }
        valid
    }

    /// Record a realized fire-time jitter sample (expected vs. actual,
    /// both in µs). Called by callers with visibility into real firing
    /// timestamps; the scheduler itself only issues compare writes.
    pub fn record_jitter(&mut self, expected_us: u64, actual_us: u64) {
        self.jitter.record(expected_us, actual_us);
    }

    pub fn jitter(&self) -> &JitterMeter {
        &self.jitter
    }

    /// Arm one event on the angle-addressed queue. See
    /// [`scheduler::EventScheduler::schedule`].
    #[allow(clippy::too_many_arguments)]
    pub fn schedule(
        &self,
        event_type: EventType,
        cylinder: u8,
        angle_deg: f64,
        param_us: u32,
        rpm_snapshot: u32,
        vbat_snapshot_mv: u32,
    ) -> Result<(), ()> {
        self.scheduler.schedule(
            event_type,
            cylinder,
            angle_deg,
            param_us,
            rpm_snapshot,
            vbat_snapshot_mv,
            &self.counters,
        )
    }

    pub fn cancel_cylinder(&self, cylinder: u8) {
        self.scheduler.cancel_cylinder(cylinder);
    }

    pub fn cancel_type(&self, event_type: EventType) {
        self.scheduler.cancel_type(event_type);
    }

    /// Report externally observed safety conditions and run the limp-mode
    /// escalation/recovery state machine. On entry, cancels every armed
    /// event and forces every output channel low.
    pub fn observe_safety(&mut self, now_s: f64, conditions: SafetyFlags) {
        let transitioned = self.safety.observe(now_s, conditions);
        if transitioned && self.safety.active() {
            self.scheduler.cancel_all();
            self.output.force_all_low();
        }
    }

    /// Engine shutdown sequence (§5): cancel every armed event, then force
    /// every output channel low. Tooth-callback unregistration is the
    /// caller's responsibility (it owns the edge source).
    pub fn shutdown(&mut self) {
        self.scheduler.cancel_all();
        self.output.force_all_low();
    }
}

pub fn default_latency_model() -> HardwareLatency {
    HardwareLatency::defaults()
}

pub const ALL_CYLINDERS: usize = CYLINDER_COUNT;
