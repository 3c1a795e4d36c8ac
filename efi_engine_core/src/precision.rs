//! Precision tier selector.
//!
//! Four static RPM-banded tiers trade timer resolution for CPU headroom:
//! low RPM gets the finest timer resolution because there is plenty of
//! time between teeth to act on it, high RPM gets the coarsest. Hysteresis
//! around each boundary prevents tier thrashing when RPM dithers near a
//! threshold.

use efi_common::consts::{
    PRECISION_TIER_BOUNDS_RPM, PRECISION_TIER_HYSTERESIS_RPM, PRECISION_TIER_RESOLUTIONS_HZ,
    PRECISION_TIER_TOLERANCE_MDEG,
};

/// One static precision tier's parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrecisionTier {
    pub rpm_threshold: u32,
    pub timer_resolution_hz: u32,
    pub angular_tolerance_mdeg: u32,
}

fn tier_table() -> [PrecisionTier; PRECISION_TIER_BOUNDS_RPM.len()] {
    std::array::from_fn(|i| PrecisionTier {
        rpm_threshold: PRECISION_TIER_BOUNDS_RPM[i],
        timer_resolution_hz: PRECISION_TIER_RESOLUTIONS_HZ[i],
        angular_tolerance_mdeg: PRECISION_TIER_TOLERANCE_MDEG[i],
    })
}

/// Tracks the current precision tier across RPM observations, with
/// hysteresis and a running transition counter.
pub struct PrecisionTierSelector {
    tiers: [PrecisionTier; PRECISION_TIER_BOUNDS_RPM.len()],
    current: usize,
    transitions: u64,
}

impl PrecisionTierSelector {
    pub fn new() -> Self {
        Self {
            tiers: tier_table(),
            current: 0,
            transitions: 0,
        }
    }

    pub fn current(&self) -> PrecisionTier {
        self.tiers[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Precision gain relative to the coarsest (highest-RPM) tier's
    /// angular tolerance: larger is better.
    pub fn precision_gain(&self) -> f64 {
        let baseline = self.tiers[self.tiers.len() - 1].angular_tolerance_mdeg as f64;
        let current = self.tiers[self.current].angular_tolerance_mdeg as f64;
        baseline / current
    }

    /// Recompute the tier for a new RPM observation, applying hysteresis so
    /// a tier boundary crossed by less than
    /// [`PRECISION_TIER_HYSTERESIS_RPM`] does not cause a transition.
    pub fn observe(&mut self, rpm: u32) {
        let mut candidate = self.tiers.len() - 1;
        for (i, tier) in self.tiers.iter().enumerate() {
            if rpm <= tier.rpm_threshold {
                candidate = i;
                break;
            }
        }

        if candidate == self.current {
            return;
        }

        let boundary = if candidate > self.current {
            self.tiers[self.current].rpm_threshold
        } else {
            self.tiers[candidate].rpm_threshold
        };

        let distance = rpm.abs_diff(boundary);
        if distance < PRECISION_TIER_HYSTERESIS_RPM {
            return;
        }

        self.current = candidate;
        self.transitions += 1;
    }
}

impl Default for PrecisionTierSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_tier_zero() {
        let sel = PrecisionTierSelector::new();
        assert_eq!(sel.current_index(), 0);
        assert_eq!(sel.transitions(), 0);
    }

    #[test]
    fn crossing_a_boundary_with_margin_transitions() {
        let mut sel = PrecisionTierSelector::new();
        sel.observe(1500); // clears tier-0 threshold (1000) by 500
        assert_eq!(sel.current_index(), 1);
        assert_eq!(sel.transitions(), 1);
    }

    #[test]
    fn dither_within_hysteresis_band_does_not_thrash() {
        let mut sel = PrecisionTierSelector::new();
        sel.observe(1500);
        let transitions_before = sel.transitions();
        for rpm in [1050, 950, 1030, 970] {
            sel.observe(rpm);
        }
        assert_eq!(sel.transitions(), transitions_before);
    }

    #[test]
    fn precision_gain_is_highest_at_lowest_tier() {
        let sel = PrecisionTierSelector::new();
        assert!((sel.precision_gain() - 4.0).abs() < 1e-9); // 800/200 mdeg
    }

    #[test]
    fn top_tier_caps_at_last_entry() {
        let mut sel = PrecisionTierSelector::new();
        sel.observe(20_000);
        assert_eq!(sel.current_index(), PRECISION_TIER_BOUNDS_RPM.len() - 1);
    }
}
