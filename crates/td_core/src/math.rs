//! Angle and tolerance helpers for the continuous movement model.
//!
//! Positions are expressed in tile units (a cell's centre sits at
//! `integer + 0.5`) and angles in radians. Facing angles are kept in
//! `[0, 2π)`; rotation deltas use the shortest signed form in `[-π, π]`.

use std::f64::consts::{PI, TAU};

/// Two positions closer than this (in tiles) are the same location.
pub const DISTANCE_EPSILON: f64 = 0.01;

/// Completion times (in milliseconds) below this are already satisfied.
pub const TIME_EPSILON: f64 = 0.001;

/// Trigonometric factors below this magnitude count as exactly zero.
///
/// `cos(π/2)` evaluates to ~6e-17 rather than 0; without this threshold a
/// vertical move would divide float noise by float noise on the x axis.
pub const TRIG_ZERO: f64 = 1e-12;

/// Convert degrees to radians.
#[inline]
#[must_use]
pub fn deg_to_rad(degrees: f64) -> f64 {
    degrees * TAU / 360.0
}

/// Convert radians to degrees.
#[inline]
#[must_use]
pub fn rad_to_deg(radians: f64) -> f64 {
    radians * 360.0 / TAU
}

/// Wrap an angle into `[0, 2π)`.
#[must_use]
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Signed shortest rotation taking `from` onto `to`, in `[-π, π]`.
#[must_use]
pub fn shortest_delta(to: f64, from: f64) -> f64 {
    let mut delta = to - from;
    if delta < -PI {
        delta += TAU;
    }
    if delta > PI {
        delta -= TAU;
    }
    delta
}

/// Sign of a value with zero mapped to zero.
///
/// `f64::signum` returns `1.0` for `+0.0`, which would spin a unit that is
/// already aligned.
#[inline]
#[must_use]
pub fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degree_conversion() {
        assert!((deg_to_rad(180.0) - PI).abs() < 1e-12);
        assert!((rad_to_deg(PI / 2.0) - 90.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_angle_wraps_both_directions() {
        assert!((normalize_angle(-PI / 2.0) - 3.0 * PI / 2.0).abs() < 1e-12);
        assert!((normalize_angle(5.0 * PI) - PI).abs() < 1e-12);
        assert_eq!(normalize_angle(0.0), 0.0);
        assert_eq!(normalize_angle(TAU), 0.0);
        assert!(normalize_angle(-1e-20) < TAU);
    }

    #[test]
    fn test_shortest_delta_picks_short_way() {
        // From 350 degrees to 10 degrees is +20, not -340
        let delta = shortest_delta(deg_to_rad(10.0), deg_to_rad(350.0));
        assert!((delta - deg_to_rad(20.0)).abs() < 1e-12);

        let delta = shortest_delta(deg_to_rad(350.0), deg_to_rad(10.0));
        assert!((delta + deg_to_rad(20.0)).abs() < 1e-12);
    }

    #[test]
    fn test_sign_of_zero_is_zero() {
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-0.0), 0.0);
        assert_eq!(sign(2.5), 1.0);
        assert_eq!(sign(-0.1), -1.0);
    }
}
