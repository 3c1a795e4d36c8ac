//! Fixed-point crank-angle arithmetic.
//!
//! All crank angles are represented in Q16.16 fixed point (16 integer bits,
//! 16 fractional bits, signed) and are defined modulo 720° — one full
//! four-stroke engine cycle. Using fixed point instead of raw `f64` keeps
//! angle comparisons and forward-distance computations free of the rounding
//! surprises that accumulate when floats are repeatedly wrapped.
//!
//! No arithmetic on crank angles should happen outside this module.

use std::ops::{Add, Sub};

const FRAC_BITS: i32 = 16;
const ONE: i64 = 1 << FRAC_BITS;

/// Full engine cycle, in degrees.
pub const CYCLE_DEG: f64 = 720.0;

/// A crank angle in Q16.16 fixed point, always normalized to `[0, 720)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Angle(i64);

impl Angle {
    /// Build an `Angle` from a degree value, normalizing into `[0, 720)`.
    ///
    /// Non-finite input (`NaN`, `±Inf`) normalizes to zero rather than
    /// looping or panicking — the decoder ISR must never be able to hang
    /// on a bad angle.
    pub fn from_degrees(deg: f64) -> Self {
        if !deg.is_finite() {
            return Angle(0);
        }
        let wrapped = deg.rem_euclid(CYCLE_DEG);
        Angle((wrapped * ONE as f64).round() as i64)
    }

    /// Zero angle.
    pub const fn zero() -> Self {
        Angle(0)
    }

    /// Value in degrees as `f64`.
    pub fn to_degrees(self) -> f64 {
        self.0 as f64 / ONE as f64
    }

    /// Raw Q16.16 representation.
    pub const fn raw(self) -> i64 {
        self.0
    }

    fn normalize(raw: i64) -> Self {
        let cycle_raw = (CYCLE_DEG * ONE as f64) as i64;
        Angle(raw.rem_euclid(cycle_raw))
    }

    /// Forward angular distance traveling from `self` to `other`, always in
    /// `[0, 720)`. This is the distance the crank must still rotate to reach
    /// `other`, never the signed difference.
    pub fn forward_distance_to(self, other: Angle) -> Angle {
        Angle::normalize(other.0 - self.0)
    }
}

impl Default for Angle {
    fn default() -> Self {
        Angle::zero()
    }
}

impl Add for Angle {
    type Output = Angle;
    fn add(self, rhs: Angle) -> Angle {
        Angle::normalize(self.0 + rhs.0)
    }
}

impl Sub for Angle {
    type Output = Angle;
    fn sub(self, rhs: Angle) -> Angle {
        Angle::normalize(self.0 - rhs.0)
    }
}

/// Convert an angular distance to a microsecond delay at the given tooth
/// period and degrees-per-tooth, via straight division (no LUT).
///
/// Returns `0` if `deg_per_tooth` is non-positive — callers must treat that
/// as "sync not established" and not schedule anything in that state.
pub fn angle_distance_to_delay_us(distance: Angle, tooth_period_us: u64, deg_per_tooth: f64) -> u64 {
    if deg_per_tooth <= 0.0 {
        return 0;
    }
    let ratio = distance.to_degrees() / deg_per_tooth;
    (ratio * tooth_period_us as f64).round().max(0.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_degrees_wraps_into_range() {
        assert!((Angle::from_degrees(720.0).to_degrees() - 0.0).abs() < 1e-9);
        assert!((Angle::from_degrees(721.5).to_degrees() - 1.5).abs() < 1e-3);
        assert!((Angle::from_degrees(-10.0).to_degrees() - 710.0).abs() < 1e-3);
    }

    #[test]
    fn non_finite_normalizes_to_zero() {
        assert_eq!(Angle::from_degrees(f64::NAN), Angle::zero());
        assert_eq!(Angle::from_degrees(f64::INFINITY), Angle::zero());
        assert_eq!(Angle::from_degrees(f64::NEG_INFINITY), Angle::zero());
    }

    #[test]
    fn round_trip_within_one_over_65536_degree() {
        for deg in [0.0, 12.34, 359.999, 719.9999, 200.5] {
            let a = Angle::from_degrees(deg);
            let back = a.to_degrees();
            let expected = deg.rem_euclid(CYCLE_DEG);
            assert!((back - expected).abs() <= 1.0 / 65536.0);
        }
    }

    #[test]
    fn forward_distance_always_nonnegative_and_lands_on_target() {
        let cases = [(10.0, 20.0), (700.0, 10.0), (5.0, 5.0), (0.0, 719.9)];
        for (from, to) in cases {
            let f = Angle::from_degrees(from);
            let t = Angle::from_degrees(to);
            let dist = f.forward_distance_to(t);
            assert!(dist.to_degrees() >= 0.0 && dist.to_degrees() < CYCLE_DEG);
            let landed = f + dist;
            assert!((landed.to_degrees() - t.to_degrees()).abs() < 1e-3);
        }
    }

    #[test]
    fn angle_distance_to_delay_matches_simple_ratio() {
        // 180 deg window, tooth period 1000us, 6 deg/tooth -> 30 teeth to cover 180deg
        let dist = Angle::from_degrees(180.0) - Angle::zero();
        let us = angle_distance_to_delay_us(dist, 1000, 6.0);
        assert_eq!(us, 30_000);
    }

    #[test]
    fn angle_distance_with_zero_deg_per_tooth_is_zero() {
        let dist = Angle::from_degrees(10.0);
        assert_eq!(angle_distance_to_delay_us(dist, 1000, 0.0), 0);
    }

    proptest::proptest! {
        /// Any finite degree value normalizes into [0, 720), never outside it.
        #[test]
        fn from_degrees_always_lands_in_cycle(deg in -1.0e6_f64..1.0e6_f64) {
            let a = Angle::from_degrees(deg);
            proptest::prop_assert!(a.to_degrees() >= 0.0 && a.to_degrees() < CYCLE_DEG);
        }

        /// Forward distance between any two angles is always non-negative and
        /// strictly less than one full cycle, regardless of ordering.
        #[test]
        fn forward_distance_is_always_in_cycle_range(from in -1.0e6_f64..1.0e6_f64, to in -1.0e6_f64..1.0e6_f64) {
            let f = Angle::from_degrees(from);
            let t = Angle::from_degrees(to);
            let dist = f.forward_distance_to(t);
            proptest::prop_assert!(dist.to_degrees() >= 0.0 && dist.to_degrees() < CYCLE_DEG);
        }

        /// Stepping forward by the computed distance always lands back on
        /// the target angle, within fixed-point rounding tolerance.
        #[test]
        fn forward_distance_lands_on_target(from in -1.0e6_f64..1.0e6_f64, to in -1.0e6_f64..1.0e6_f64) {
            let f = Angle::from_degrees(from);
            let t = Angle::from_degrees(to);
            let landed = f + f.forward_distance_to(t);
            proptest::prop_assert!((landed.to_degrees() - t.to_degrees()).abs() < 1e-3);
        }
    }
}
