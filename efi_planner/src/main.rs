//! # EFI Planner
//!
//! Loads engine configuration, builds an [`EngineCore`] against the
//! simulation output backend, and drives [`Planner::run_once`] on the
//! configured Core 1 cadence via [`efi_engine_core::cycle::CycleRunner`].
//!
//! On real hardware this binary's output-channel construction would swap
//! the simulation driver for a `hw`-feature register-level one; the
//! planning logic itself is identical either way.

use std::path::Path;

use efi_common::config::{ConfigLoader, EngineConfig};
use efi_common::consts::{CYLINDER_COUNT, DEFAULT_CONFIG_PATH, PLANNER_PERIOD_US_DEFAULT};
use efi_engine_core::cycle::{CycleRunner, TickHandler};
use efi_engine_core::output::OutputStage;
use efi_engine_core::EngineCore;
use efi_hal::{OutputChannelDriver, SimulationChannel};
use efi_planner::{Planner, SensorSnapshot, SensorSource, StaticFuelTables};
use tracing::info;

struct IdleSensors;

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

struct PlannerTick {
    engine: EngineCore,
    planner: Planner,
    sensors: IdleSensors,
    tables: StaticFuelTables,
}

impl TickHandler for PlannerTick {
    fn tick(&mut self, _now_us: u64) {
        self.planner.run_once(&self.engine, &self.sensors, &self.tables);
    }
}

fn main() {
    tracing_subscriber::fmt().compact().init();
    info!("EFI Planner starting...");

    let config = EngineConfig::load(Path::new(DEFAULT_CONFIG_PATH)).unwrap_or_else(|e| {
        info!("falling back to default engine configuration: {e}");
        EngineConfig::default()
    });
    if let Err(e) = config.validate() {
        info!("configuration invalid, using defaults instead: {e}");
    }

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
    let engine = EngineCore::new(config.clone(), output);
    let planner = Planner::new(
        config.cylinder_tdc_deg,
        config.injection.eoi_angle_deg,
        config.injection.pulsewidth_us_min,
        config.injection.pulsewidth_us_ceiling,
    );

    let handler = PlannerTick {
        engine,
        planner,
        sensors: IdleSensors,
        tables: StaticFuelTables::default(),
    };

    info!("planner task cadence: {PLANNER_PERIOD_US_DEFAULT}us");
    let mut runner = CycleRunner::new(handler, PLANNER_PERIOD_US_DEFAULT);
    runner
        .run_sim_loop(10, efi_common::timing::now_us)
        .expect("planner cycle loop should not overrun in simulation");
    info!(
        "planner loop completed, avg cycle {:.1}us, overruns={}",
        runner.stats.avg_us(),
        runner.overruns()
    );
}
