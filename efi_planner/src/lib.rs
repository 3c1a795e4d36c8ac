//! # EFI Planner
//!
//! The Core 1 planning task: on a periodic cadence, look up fuel/ignition
//! targets, apply closed-loop lambda correction, compute per-cylinder
//! pulsewidth and advance, and enqueue the resulting events on
//! [`efi_engine_core::EngineCore`]'s angle-addressed queue. Never touches
//! hardware directly — it speaks only through `schedule`/`cancel_cylinder`.

use efi_common::consts::CYLINDER_COUNT;
use efi_shared_state::queue::EventType;
use efi_engine_core::EngineCore;

/// Snapshot of sensor readings the planner consumes each cycle. Published
/// by the sensor collaborator — interface only, not implemented here.
#[derive(Debug, Clone, Copy, Default)]
pub struct SensorSnapshot {
    pub map_kpa: f64,
    pub clt_c: i32,
    pub iat_c: i32,
    pub tps_pct: f64,
    pub vbat_mv: u32,
    pub lambda_measured: f64,
}

/// Supplies the current sensor snapshot. A stub or a real sensor bridge
/// can implement this without the planner caring which.
pub trait SensorSource {
    fn read(&self) -> SensorSnapshot;
}

/// Two-dimensional (RPM, load) fuel/ignition table lookups. The table
/// content itself (calibration) is out of scope; the planner only needs
/// the trait so a stub table can stand in for the real one in tests.
pub trait FuelTables {
    fn volumetric_efficiency(&self, rpm: u32, map_kpa: f64) -> f64;
    fn ignition_advance_deg(&self, rpm: u32, map_kpa: f64) -> f64;
    fn lambda_target(&self, rpm: u32, map_kpa: f64) -> f64;
}

/// Flat-value stand-in table for tests and early bring-up.
pub struct StaticFuelTables {
    pub ve: f64,
    pub advance_deg: f64,
    pub lambda_target: f64,
}

impl Default for StaticFuelTables {
    fn default() -> Self {
        Self {
            ve: 0.85,
            advance_deg: 20.0,
            lambda_target: 1.0,
        }
    }
}

impl FuelTables for StaticFuelTables {
    fn volumetric_efficiency(&self, _rpm: u32, _map_kpa: f64) -> f64 {
        self.ve
    }

    fn ignition_advance_deg(&self, _rpm: u32, _map_kpa: f64) -> f64 {
        self.advance_deg
    }

    fn lambda_target(&self, _rpm: u32, _map_kpa: f64) -> f64 {
        self.lambda_target
    }
}

/// Closed-loop short/long-term fuel trim, clamped to a configured limit.
pub struct LambdaCorrection {
    stft: f64,
    ltft: f64,
    limit: f64,
    gain: f64,
}

impl LambdaCorrection {
    pub fn new(limit: f64, gain: f64) -> Self {
        Self {
            stft: 0.0,
            ltft: 0.0,
            limit,
            gain,
        }
    }

    pub fn stft(&self) -> f64 {
        self.stft
    }

    pub fn ltft(&self) -> f64 {
        self.ltft
    }

    /// Update trims from a measured-vs-target lambda error and return the
    /// combined multiplicative correction factor applied to pulsewidth.
    pub fn update(&mut self, measured: f64, target: f64) -> f64 {
        if target <= 0.0 || measured <= 0.0 {
            return 1.0 + self.stft + self.ltft;
        }
        let error = (target - measured) / target;
        self.stft = (self.stft + error * self.gain).clamp(-self.limit, self.limit);
        // Long-term trim slowly absorbs persistent short-term trim.
        self.ltft = (self.ltft + self.stft * 0.001).clamp(-self.limit, self.limit);
        1.0 + self.stft + self.ltft
    }
}

/// Base injector flow constant converting VE × load into a pulsewidth
/// before lambda correction, calibrated for a mid-size port-injected
/// engine; real calibration belongs in `FuelTables`, not here.
const BASE_PULSEWIDTH_US_AT_FULL_VE: f64 = 12_000.0;

/// The Core 1 periodic planning task.
pub struct Planner {
    lambda: [LambdaCorrection; CYLINDER_COUNT],
    cylinder_tdc_deg: [f64; CYLINDER_COUNT],
    eoi_angle_deg: f64,
    pulsewidth_min_us: u32,
    pulsewidth_ceiling_us: u32,
}

impl Planner {
    pub fn new(cylinder_tdc_deg: [f64; CYLINDER_COUNT], eoi_angle_deg: f64, pulsewidth_min_us: u32, pulsewidth_ceiling_us: u32) -> Self {
        Self {
            lambda: std::array::from_fn(|_| LambdaCorrection::new(0.25, 0.1)),
            cylinder_tdc_deg,
            eoi_angle_deg,
            pulsewidth_min_us,
            pulsewidth_ceiling_us,
        }
    }

    fn end_of_injection_angle(&self, cylinder: usize) -> f64 {
        (self.cylinder_tdc_deg[cylinder] + self.eoi_angle_deg).rem_euclid(720.0)
    }

    fn ignition_angle(&self, cylinder: usize, advance_deg: f64) -> f64 {
        (self.cylinder_tdc_deg[cylinder] - advance_deg).rem_euclid(720.0)
    }

    /// Run one planning cycle against `engine`, the live angle-addressed
    /// scheduler, using `sensors` and `tables` for this cycle's inputs.
    /// Cancels any still-armed events for each cylinder before re-enqueuing,
    /// so a late-running previous cycle's stale targets never linger.
    pub fn run_once(&mut self, engine: &EngineCore, sensors: &dyn SensorSource, tables: &dyn FuelTables) {
        if !engine.sync_acquired() {
            return;
        }

        let snapshot = sensors.read();
        let rpm = engine.rpm();

        for cylinder in 0..CYLINDER_COUNT {
            let ve = tables.volumetric_efficiency(rpm, snapshot.map_kpa);
            let advance = tables.ignition_advance_deg(rpm, snapshot.map_kpa);
            let target_lambda = tables.lambda_target(rpm, snapshot.map_kpa);

            let correction = self.lambda[cylinder].update(snapshot.lambda_measured, target_lambda);
            let pulsewidth_us = ((BASE_PULSEWIDTH_US_AT_FULL_VE * ve * correction).round() as u32)
                .clamp(self.pulsewidth_min_us, self.pulsewidth_ceiling_us);

            engine.cancel_cylinder(cylinder as u8);

            let _ = engine.schedule(
                EventType::InjectorOpen,
                cylinder as u8,
                self.end_of_injection_angle(cylinder),
                pulsewidth_us,
                rpm,
                snapshot.vbat_mv,
            );
            let _ = engine.schedule(
                EventType::IgnitionDwell,
                cylinder as u8,
                self.ignition_angle(cylinder, advance),
                0,
                rpm,
                snapshot.vbat_mv,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSensors(SensorSnapshot);

    impl SensorSource for FixedSensors {
        fn read(&self) -> SensorSnapshot {
            self.0
        }
    }

    #[test]
    fn lambda_correction_pulls_toward_target() {
        let mut lc = LambdaCorrection::new(0.25, 0.1);
        let factor_lean = lc.update(1.1, 1.0); // measured lean vs target -> enrich
        assert!(factor_lean > 1.0);
    }

    #[test]
    fn lambda_correction_clamped_to_limit() {
        let mut lc = LambdaCorrection::new(0.1, 1.0);
        for _ in 0..100 {
            lc.update(2.0, 1.0);
        }
        assert!(lc.stft() <= 0.1 + 1e-9);
    }

    #[test]
    fn ignition_angle_wraps_around_cycle() {
        let planner = Planner::new([0.0, 180.0, 360.0, 540.0], 280.0, 500, 25_000);
        let angle = planner.ignition_angle(0, 30.0);
        assert!((angle - 690.0).abs() < 1e-9); // 0 - 30 wraps to 690
    }

    #[test]
    fn end_of_injection_angle_offsets_from_tdc() {
        let planner = Planner::new([0.0, 180.0, 360.0, 540.0], 280.0, 500, 25_000);
        assert!((planner.end_of_injection_angle(1) - 460.0).abs() < 1e-9);
    }

    #[test]
    fn static_fuel_tables_return_configured_values() {
        let tables = StaticFuelTables::default();
        assert!((tables.volumetric_efficiency(3000, 60.0) - 0.85).abs() < 1e-9);
        assert!((tables.lambda_target(3000, 60.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn run_once_is_noop_without_sync() {
        use efi_common::config::EngineConfig;
        use efi_engine_core::output::OutputStage;
        use efi_hal::{OutputChannelDriver, SimulationChannel};

        let injectors: [Box<dyn OutputChannelDriver>; CYLINDER_COUNT] =
            std::array::from_fn(|_| Box::new(SimulationChannel::new()) as Box<dyn OutputChannelDriver>);
        let ignition: [Box<dyn OutputChannelDriver>; CYLINDER_COUNT] =
            std::array::from_fn(|_| Box::new(SimulationChannel::new()) as Box<dyn OutputChannelDriver>);
        let cfg = EngineConfig::default();
        let output = OutputStage::new(
            injectors,
            ignition,
            efi_engine_core::default_latency_model(),
            cfg.ignition,
            cfg.injection,
        );
        let engine = EngineCore::new(cfg, output);
        let mut planner = Planner::new([0.0, 180.0, 360.0, 540.0], 280.0, 500, 25_000);
        let sensors = FixedSensors(SensorSnapshot {
            map_kpa: 60.0,
            clt_c: 80,
            iat_c: 25,
            tps_pct: 10.0,
            vbat_mv: 13_800,
            lambda_measured: 1.0,
        });
        let tables = StaticFuelTables::default();
        planner.run_once(&engine, &sensors, &tables);
        assert_eq!(engine.counters().queue_full, 0);
    }
}
