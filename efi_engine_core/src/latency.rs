//! Hardware latency compensation.
//!
//! Coil and injector opening both lag the electrical command by an amount
//! that grows as battery voltage drops and (mildly) as temperature moves
//! away from a reference point. Pure function of voltage and temperature —
//! no mutable state once configured, so it is safe to call from ISR context.

const VOLTAGE_REFERENCE_MV: f64 = 12_000.0;

/// Compensation model for one output path (coil or injector).
#[derive(Debug, Clone, Copy)]
pub struct LatencyModel {
    base_us: f64,
    voltage_factor: f64,
    temp_factor: f64,
    temp_reference_c: f64,
}

impl LatencyModel {
    pub const fn new(base_us: f64, voltage_factor: f64, temp_factor: f64, temp_reference_c: f64) -> Self {
        Self {
            base_us,
            voltage_factor,
            temp_factor,
            temp_reference_c,
        }
    }

    /// Latency in µs at the given battery voltage (mV) and coolant
    /// temperature (°C).
    pub fn latency_us(&self, vbat_mv: u32, temp_c: i32) -> u32 {
        let v = vbat_mv as f64 / 1000.0;
        let t = temp_c as f64;
        let latency = self.base_us
            * (1.0 + (VOLTAGE_REFERENCE_MV / 1000.0 - v) * self.voltage_factor)
            * (1.0 + (t - self.temp_reference_c) * self.temp_factor);
        latency.max(0.0).round() as u32
    }
}

/// Process-wide, read-only latency compensation for both output paths.
#[derive(Debug, Clone, Copy)]
pub struct HardwareLatency {
    coil: LatencyModel,
    injector: LatencyModel,
}

impl HardwareLatency {
    pub const fn new(coil: LatencyModel, injector: LatencyModel) -> Self {
        Self { coil, injector }
    }

    /// Reasonable defaults for a generic inductive coil / saturated
    /// low-impedance injector pair.
    pub const fn defaults() -> Self {
        Self {
            coil: LatencyModel::new(80.0, 0.08, 0.002, 20.0),
            injector: LatencyModel::new(350.0, 0.05, 0.004, 20.0),
        }
    }

    pub fn get_coil(&self, vbat_mv: u32, clt_c: i32) -> u32 {
        self.coil.latency_us(vbat_mv, clt_c)
    }

    pub fn get_injector(&self, vbat_mv: u32, clt_c: i32) -> u32 {
        self.injector.latency_us(vbat_mv, clt_c)
    }
}

impl Default for HardwareLatency {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_increases_as_voltage_drops() {
        let hw = HardwareLatency::defaults();
        let at_12v = hw.get_coil(12_000, 20);
        let at_9v = hw.get_coil(9_000, 20);
        assert!(at_9v > at_12v);
    }

    #[test]
    fn latency_at_reference_conditions_equals_base() {
        let model = LatencyModel::new(100.0, 0.1, 0.01, 20.0);
        let latency = model.latency_us(12_000, 20);
        assert_eq!(latency, 100);
    }

    #[test]
    fn latency_never_negative() {
        let model = LatencyModel::new(10.0, 5.0, 5.0, 20.0);
        let latency = model.latency_us(30_000, 20);
        assert!(latency <= i32::MAX as u32);
    }

    #[test]
    fn injector_and_coil_are_independent() {
        let hw = HardwareLatency::defaults();
        assert_ne!(hw.get_coil(12_000, 20), hw.get_injector(12_000, 20));
    }
}
