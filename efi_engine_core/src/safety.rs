//! Limp-mode / safety escalation.
//!
//! A small status-flags word plus a hysteresis timer: once any condition
//! in [`SafetyFlags`] is raised, the engine enters limp mode and stays
//! there for at least [`LIMP_MODE_MIN_DURATION_S`]; recovery additionally
//! requires [`LIMP_MODE_RECOVERY_HOLDOFF_S`] of continuously all-safe
//! conditions before limp mode clears. Limp mode never inspects hardware
//! directly — callers report conditions and drain the queue/output stage
//! themselves on entry.

use bitflags::bitflags;

use efi_common::consts::{LIMP_MODE_MIN_DURATION_S, LIMP_MODE_RECOVERY_HOLDOFF_S};

bitflags! {
    /// Conditions that can force the engine into limp mode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SafetyFlags: u8 {
        const OVER_REV        = 0b0000_0001;
        const COOLANT_OVER    = 0b0000_0010;
        const BATTERY_RANGE   = 0b0000_0100;
        const SENSOR_FAULT    = 0b0000_1000;
        const SYNC_LOST       = 0b0001_0000;
    }
}

/// Entry/recovery state machine for limp mode.
#[derive(Debug, Clone, Copy)]
pub struct LimpModeState {
    active: bool,
    flags: SafetyFlags,
    entered_at_s: Option<f64>,
    safe_since_s: Option<f64>,
    pub reduced_rpm_cap: u32,
    pub fixed_advance_deg: f64,
    pub fixed_pulsewidth_us: u32,
}

impl LimpModeState {
    pub fn new(reduced_rpm_cap: u32, fixed_advance_deg: f64, fixed_pulsewidth_us: u32) -> Self {
        Self {
            active: false,
            flags: SafetyFlags::empty(),
            entered_at_s: None,
            safe_since_s: None,
            reduced_rpm_cap,
            fixed_advance_deg,
            fixed_pulsewidth_us,
        }
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn flags(&self) -> SafetyFlags {
        self.flags
    }

    /// Report the current set of unsafe conditions at time `now_s` (seconds
    /// since an arbitrary monotonic epoch). Returns `true` if this call
    /// transitioned limp mode (entered or cleared).
    pub fn observe(&mut self, now_s: f64, conditions: SafetyFlags) -> bool {
        self.flags = conditions;

        if !conditions.is_empty() {
            self.safe_since_s = None;
            if !self.active {
                self.active = true;
                self.entered_at_s = Some(now_s);
                return true;
            }
            return false;
        }

        // All-safe this call.
        if !self.active {
            return false;
        }

        let entered_at = self.entered_at_s.unwrap_or(now_s);
        if now_s - entered_at < LIMP_MODE_MIN_DURATION_S {
            return false;
        }

        let safe_since = *self.safe_since_s.get_or_insert(now_s);
        if now_s - safe_since >= LIMP_MODE_RECOVERY_HOLDOFF_S {
            self.active = false;
            self.entered_at_s = None;
            self.safe_since_s = None;
            return true;
        }
        false
    }
}
