//! # EFI engine-control supervisor
//!
//! Owns the one [`EngineCore`] value for the process and drives it from two
//! host threads standing in for the two physical cores: a Core-0 thread
//! feeding synthetic crank-tooth edges through [`EngineCore::on_tooth_edge`],
//! and a Core-1 thread running the [`Planner`] on its periodic cadence.
//! Both threads talk to the same core through a short-held
//! [`parking_lot::Mutex`], the same discipline [`efi_shared_state`] uses for
//! its event queue.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use efi_common::config::EngineConfig;
use efi_common::consts::{CYLINDER_COUNT, PLANNER_PERIOD_US_DEFAULT};
use efi_engine_core::cycle::RtSetupConfig;
use efi_engine_core::output::OutputStage;
use efi_engine_core::safety::SafetyFlags;
use efi_engine_core::EngineCore;
use efi_hal::{OutputChannelDriver, SimulationChannel};
use efi_planner::{Planner, SensorSnapshot, SensorSource, StaticFuelTables};
use efi_shared_state::counters::FaultCountersSnapshot;
use efi_shared_state::SyncSnapshot;
use parking_lot::Mutex;
use tracing::info;

/// Deterministic synthetic crank-tooth feed for simulation-mode operation
/// (no physical trigger wheel attached): `present_teeth` evenly spaced
/// edges per revolution, then one combined gap period, repeating forever.
/// One cam edge is due at the start of every revolution.
pub struct SyntheticCrankFeed {
    present_teeth: u32,
    gap_teeth: u32,
    base_period_us: u64,
    position: u32,
}

impl SyntheticCrankFeed {
    pub fn new(tooth_count: u8, gap_teeth: u8, base_period_us: u64) -> Self {
        Self {
            present_teeth: (tooth_count - gap_teeth) as u32,
            gap_teeth: gap_teeth as u32,
            base_period_us,
            position: 0,
        }
    }

    /// Advance one tooth edge. Returns `(dt_us since the previous edge, cam
    /// edge due before this one)`.
    pub fn tick(&mut self) -> (u64, bool) {
        let cam_due = self.position == 0;
        let dt_us = if cam_due {
            self.base_period_us * (self.gap_teeth as u64 + 1)
        } else {
            self.base_period_us
        };
        self.position = (self.position + 1) % self.present_teeth;
        (dt_us, cam_due)
    }
}

/// Fixed sensor readings stood in for a real sensor bridge (out of scope).
pub struct IdleSensors;

impl SensorSource for IdleSensors {
    fn read(&self) -> SensorSnapshot {
        SensorSnapshot {
            map_kpa: 40.0,
            clt_c: 85,
            iat_c: 25,
            tps_pct: 0.0,
            vbat_mv: 13_800,
            lambda_measured: 1.0,
        }
    }
}

/// Build the process-wide engine core against the simulation output
/// backend. On real hardware only this construction changes (a `hw`
/// feature swapping in register-level channels); the rest of the
/// supervisor is identical.
pub fn build_engine(config: &EngineConfig) -> EngineCore {
    let injectors: [Box<dyn OutputChannelDriver>; CYLINDER_COUNT] =
        std::array::from_fn(|_| Box::new(SimulationChannel::new()) as Box<dyn OutputChannelDriver>);
    let ignition: [Box<dyn OutputChannelDriver>; CYLINDER_COUNT] =
        std::array::from_fn(|_| Box::new(SimulationChannel::new()) as Box<dyn OutputChannelDriver>);
    let output = OutputStage::new(
        injectors,
        ignition,
        efi_engine_core::default_latency_model(),
        config.ignition,
        config.injection,
    );
    EngineCore::new(config.clone(), output)
}

/// Point-in-time health summary logged on the supervisor's heartbeat.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorStats {
    pub rpm: u32,
    pub sync_acquired: bool,
    pub limp_mode: bool,
    pub counters: FaultCountersSnapshot,
    pub sync_snapshot: SyncSnapshot,
}

pub fn snapshot_stats(engine: &EngineCore) -> SupervisorStats {
    SupervisorStats {
        rpm: engine.rpm(),
        sync_acquired: engine.sync_acquired(),
        limp_mode: engine.limp_mode_active(),
        counters: engine.counters(),
        sync_snapshot: engine.sync_snapshot(),
    }
}

/// Derive the safety flags observed this cycle from current sensor and
/// sync state. A real implementation would also fold in sensor-fault
/// detection from the collaborator that owns the ADC reads.
fn observed_safety_flags(rpm: u32, config: &EngineConfig, clt_c: i32) -> SafetyFlags {
    let mut flags = SafetyFlags::empty();
    if rpm > config.sync.max_rpm {
        flags |= SafetyFlags::OVER_REV;
    }
    if clt_c > 115 {
        flags |= SafetyFlags::COOLANT_OVER;
    }
    flags
}

/// Coordinates the Core-0 tooth-feed thread and the Core-1 planner thread
/// against one shared [`EngineCore`], and stops both on request.
pub struct EfiSupervisor {
    engine: Arc<Mutex<EngineCore>>,
    config: EngineConfig,
    shutdown: Arc<AtomicBool>,
    /// Core 0's tooth-feed clock, published so Core 1's watchdog poll can
    /// read "now" without ever being the timestamp the decoder just
    /// stamped — see [`EngineCore::check_staleness`].
    tooth_clock_us: Arc<AtomicU64>,
    core0: Option<JoinHandle<()>>,
    core1: Option<JoinHandle<()>>,
}

impl EfiSupervisor {
    pub fn new(config: EngineConfig) -> Self {
        let engine = Arc::new(Mutex::new(build_engine(&config)));
        Self {
            engine,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
            tooth_clock_us: Arc::new(AtomicU64::new(0)),
            core0: None,
            core1: None,
        }
    }

    /// Spawn the Core-0 (tooth feed + scheduler scan) and Core-1 (planner)
    /// threads. Idempotent only in the sense that a second call replaces
    /// the stored handles — callers are expected to call this once.
    pub fn spawn_cores(&mut self) {
        self.core0 = Some(self.spawn_core0());
        self.core1 = Some(self.spawn_core1());
    }

    fn spawn_core0(&self) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        let shutdown = Arc::clone(&self.shutdown);
        let tooth_clock_us = Arc::clone(&self.tooth_clock_us);
        let config = self.config.clone();
        std::thread::spawn(move || {
            if let Err(e) = efi_engine_core::cycle::rt_setup(&RtSetupConfig::default()) {
                tracing::warn!("core 0 RT setup failed, continuing unprivileged: {e}");
            }

            let mut feed = SyntheticCrankFeed::new(config.sync.tooth_count, config.sync.gap_teeth, 6_000);
            let mut now_us = 0u64;
            while !shutdown.load(Ordering::Relaxed) {
                let (dt_us, cam_due) = feed.tick();
                now_us += dt_us;
                std::thread::sleep(Duration::from_micros(dt_us.min(2_000)));
                tooth_clock_us.store(now_us, Ordering::Relaxed);

                let mut engine = engine.lock();
                if cam_due {
                    engine.on_cam_edge();
                }
                let rpm = engine.rpm();
                let safety = observed_safety_flags(rpm, &config, 85);
                engine.observe_safety(now_us as f64 / 1_000_000.0, safety);
                engine.on_tooth_edge(now_us, 13_800, 85);
            }
        })
    }

    /// Planner cadence, decoupled from tooth-edge arrival: each cycle also
    /// runs the staleness watchdog against Core 0's published clock, so a
    /// crank that stops turning entirely invalidates sync even between
    /// edges.
    fn spawn_core1(&self) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        let shutdown = Arc::clone(&self.shutdown);
        let tooth_clock_us = Arc::clone(&self.tooth_clock_us);
        let config = self.config.clone();
        std::thread::spawn(move || {
            let mut planner = Planner::new(
                config.cylinder_tdc_deg,
                config.injection.eoi_angle_deg,
                config.injection.pulsewidth_us_min,
                config.injection.pulsewidth_us_ceiling,
            );
            let sensors = IdleSensors;
            let tables = StaticFuelTables::default();
            while !shutdown.load(Ordering::Relaxed) {
                {
                    let mut engine = engine.lock();
                    engine.check_staleness(tooth_clock_us.load(Ordering::Relaxed));
                    planner.run_once(&engine, &sensors, &tables);
                }
                std::thread::sleep(Duration::from_micros(PLANNER_PERIOD_US_DEFAULT));
            }
        })
    }

    pub fn engine_stats(&self) -> SupervisorStats {
        snapshot_stats(&self.engine.lock())
    }

    pub fn graceful_shutdown(self) {
        info!("supervisor shutting down gracefully...");
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(h) = self.core0 {
            let _ = h.join();
        }
        if let Some(h) = self.core1 {
            let _ = h.join();
        }
        self.engine.lock().shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_feed_emits_one_cam_edge_per_revolution() {
        let mut feed = SyntheticCrankFeed::new(60, 2, 6_000);
        let present_teeth = 58;
        let mut cam_edges = 0;
        for _ in 0..present_teeth * 3 {
            let (_, cam_due) = feed.tick();
            if cam_due {
                cam_edges += 1;
            }
        }
        assert_eq!(cam_edges, 3);
    }

    #[test]
    fn synthetic_feed_gap_period_is_multiple_of_base() {
        let mut feed = SyntheticCrankFeed::new(60, 2, 6_000);
        let (first_dt, first_cam) = feed.tick();
        assert!(first_cam);
        assert_eq!(first_dt, 6_000 * 3); // gap_teeth=2 -> (2+1) base periods

        let (second_dt, second_cam) = feed.tick();
        assert!(!second_cam);
        assert_eq!(second_dt, 6_000);
    }

    #[test]
    fn build_engine_starts_without_sync() {
        let config = EngineConfig::default();
        let engine = build_engine(&config);
        assert!(!engine.sync_acquired());
        assert_eq!(engine.rpm(), 0);
    }

    #[test]
    fn observed_safety_flags_flags_over_rev() {
        let config = EngineConfig::default();
        let flags = observed_safety_flags(config.sync.max_rpm + 100, &config, 85);
        assert!(flags.contains(SafetyFlags::OVER_REV));
    }

    #[test]
    fn observed_safety_flags_clear_under_limits() {
        let config = EngineConfig::default();
        let flags = observed_safety_flags(3000, &config, 85);
        assert!(flags.is_empty());
    }
}
