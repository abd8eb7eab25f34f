//! Unit pose and the continuous-time kinematic solver.
//!
//! A [`Pose`] is a position in tile units plus a facing angle. [`Pose::advance`]
//! spends a millisecond budget moving toward a target point:
//!
//! 1. If the heading error is at least the profile's free-turn tolerance the
//!    unit first turns in place. When the budget runs out mid-turn the unit
//!    only rotates.
//! 2. The unit then translates along the straight line to the target while
//!    easing any residual heading error away at its rotation speed.
//!
//! The returned remaining budget is positive when the target was reached
//! early; the caller re-invokes with the next hop so a fast unit can cross
//! several cells in one tick.

use serde::{Deserialize, Serialize};

use crate::grid::CellCoord;
use crate::math::{normalize_angle, shortest_delta, sign, DISTANCE_EPSILON, TIME_EPSILON, TRIG_ZERO};
use crate::movement::MovementProfile;

/// Continuous position and facing of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    x: f64,
    y: f64,
    /// Radians, always in `[0, 2π)`.
    facing: f64,
}

/// Result of one [`Pose::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveOutcome {
    /// Pose after spending the budget.
    pub pose: Pose,
    /// Budget left over, in milliseconds.
    pub remaining: f64,
}

impl Pose {
    /// Create a pose, normalising the facing angle.
    #[must_use]
    pub fn new(x: f64, y: f64, facing: f64) -> Self {
        Self {
            x,
            y,
            facing: normalize_angle(facing),
        }
    }

    /// Pose at the centre of `cell`.
    #[must_use]
    pub fn at_cell_center(cell: CellCoord, facing: f64) -> Self {
        let (x, y) = cell.center();
        Self::new(x, y, facing)
    }

    /// Horizontal position in tiles.
    #[must_use]
    pub const fn x(&self) -> f64 {
        self.x
    }

    /// Vertical position in tiles.
    #[must_use]
    pub const fn y(&self) -> f64 {
        self.y
    }

    /// Facing in radians, in `[0, 2π)`.
    #[must_use]
    pub const fn facing(&self) -> f64 {
        self.facing
    }

    /// Set the facing, normalising it.
    pub fn set_facing(&mut self, facing: f64) {
        self.facing = normalize_angle(facing);
    }

    /// Move to a new location and facing.
    pub fn teleport(&mut self, to: Self) {
        *self = to;
    }

    /// Cell containing this pose.
    ///
    /// Computed as `round(coord - 0.5)` with halves rounding up, which is
    /// `floor(coord)`. Only meaningful for poses at or near a cell centre.
    #[must_use]
    pub fn cell(&self) -> CellCoord {
        CellCoord::new(self.x.floor() as i32, self.y.floor() as i32)
    }

    /// Euclidean distance in tiles.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Arrival test: within [`DISTANCE_EPSILON`] of `other`.
    #[must_use]
    pub fn same_location(&self, other: &Self) -> bool {
        self.distance_to(other) <= DISTANCE_EPSILON
    }

    /// Whether every component is a finite number.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.facing.is_finite()
    }

    /// Advance toward `to` for at most `duration` milliseconds.
    ///
    /// `to`'s facing is ignored. A non-finite result is discarded: the
    /// starting pose is returned with no remaining time and the violation is
    /// logged at error level.
    ///
    /// # Example
    ///
    /// ```
    /// use td_core::movement::{MovementClass, MovementProfile};
    /// use td_core::pose::Pose;
    ///
    /// let profile = MovementProfile::new(MovementClass::Ground, 0.002, 1.0, 0.1);
    /// let from = Pose::new(0.5, 0.5, 0.0);
    /// let to = Pose::new(1.5, 0.5, 0.0);
    ///
    /// let outcome = from.advance(&to, &profile, 600.0);
    /// assert!(outcome.pose.same_location(&to));
    /// assert!((outcome.remaining - 100.0).abs() < 1e-6);
    /// ```
    #[must_use]
    pub fn advance(&self, to: &Self, profile: &MovementProfile, duration: f64) -> MoveOutcome {
        let mut result = *self;
        let mut budget = duration;

        let movement_angle = normalize_angle((to.y - self.y).atan2(to.x - self.x));
        let rotation_delta = shortest_delta(movement_angle, self.facing);

        // Pre-turn in place until the heading error is tolerable.
        if rotation_delta.abs() >= profile.max_free_turn_angle() {
            let excess = rotation_delta.abs() - profile.max_free_turn_angle();
            let needed = if excess > 0.0 {
                excess / profile.rotation_speed()
            } else {
                0.0
            };

            if needed > budget {
                result.set_facing(result.facing + rotation_delta * budget / needed);
                tracing::trace!(
                    facing = result.facing,
                    needed_ms = needed,
                    "Frame spent rotating in place"
                );
                return MoveOutcome {
                    pose: result,
                    remaining: 0.0,
                };
            }

            result.set_facing(result.facing + rotation_delta);
            budget -= needed;
        }

        let residual = shortest_delta(result.facing, movement_angle);
        let rotation_direction = sign(residual);

        let (sin, cos) = movement_angle.sin_cos();
        let speed = profile.speed();

        let mut time_x = if cos.abs() < TRIG_ZERO {
            f64::INFINITY
        } else {
            settled((to.x - result.x) / (cos * speed))
        };
        let mut time_y = if sin.abs() < TRIG_ZERO {
            f64::INFINITY
        } else {
            settled((to.y - result.y) / (sin * speed))
        };
        let mut time_rotation = settled(residual.abs() / profile.rotation_speed());

        while budget > 0.0 && (pending(time_x) || pending(time_y) || pending(time_rotation)) {
            let step = budget.min(time_x).min(time_y).min(time_rotation);

            if pending(time_x) {
                result.x += cos * speed * step;
            }
            if pending(time_y) {
                result.y += sin * speed * step;
            }
            if pending(time_rotation) {
                result.set_facing(
                    result.facing - profile.rotation_speed() * rotation_direction * step,
                );
            }

            budget -= step;
            time_x = settled(time_x - step);
            time_y = settled(time_y - step);
            time_rotation = settled(time_rotation - step);
        }

        if !result.is_finite() || !budget.is_finite() {
            tracing::error!(
                from = ?self,
                to = ?to,
                result = ?result,
                "Movement produced non-finite values; keeping starting pose"
            );
            return MoveOutcome {
                pose: *self,
                remaining: 0.0,
            };
        }

        MoveOutcome {
            pose: result,
            remaining: budget.max(0.0),
        }
    }
}

/// A completion time at or below [`TIME_EPSILON`] is done.
///
/// NaN is kept so that it reaches the non-finite guard.
#[inline]
fn settled(time: f64) -> f64 {
    if time.abs() < TIME_EPSILON || time < 0.0 {
        f64::INFINITY
    } else {
        time
    }
}

#[inline]
fn pending(time: f64) -> bool {
    time != f64::INFINITY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::MovementClass;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn profile(speed: f64, rotation_speed: f64, max_free_turn: f64) -> MovementProfile {
        MovementProfile::new(MovementClass::Ground, speed, rotation_speed, max_free_turn)
    }

    #[test]
    fn test_new_normalizes_facing() {
        let pose = Pose::new(0.0, 0.0, -FRAC_PI_2);
        assert!((pose.facing() - 3.0 * FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_cell_of_center_pose() {
        assert_eq!(Pose::new(0.5, 0.5, 0.0).cell(), CellCoord::new(0, 0));
        assert_eq!(Pose::new(3.5, 2.5, 0.0).cell(), CellCoord::new(3, 2));
        // Slight drift around a centre stays in the same cell
        assert_eq!(Pose::new(3.499_999, 2.500_001, 0.0).cell(), CellCoord::new(3, 2));
    }

    #[test]
    fn test_same_location_epsilon() {
        let a = Pose::new(1.5, 1.5, 0.0);
        assert!(a.same_location(&Pose::new(1.505, 1.5, 2.0)));
        assert!(!a.same_location(&Pose::new(1.52, 1.5, 0.0)));
    }

    #[test]
    fn test_exact_duration_lands_on_target() {
        let p = profile(1.0, 1e9, PI);
        let from = Pose::new(0.5, 0.5, 0.0);
        let to = Pose::new(1.5, 0.5, 0.0);

        let outcome = from.advance(&to, &p, 1.0);
        assert!(outcome.pose.distance_to(&to) <= DISTANCE_EPSILON);
        assert!(outcome.remaining.abs() < 1e-9);
    }

    #[test]
    fn test_surplus_duration_is_returned() {
        let p = profile(0.01, 1.0, 0.5);
        let from = Pose::new(0.5, 0.5, FRAC_PI_2);
        let to = Pose::new(0.5, 1.5, 0.0);

        // 1 tile at 0.01 tiles/ms = 100ms
        let outcome = from.advance(&to, &p, 250.0);
        assert!(outcome.pose.same_location(&to));
        assert!((outcome.remaining - 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_partial_duration_moves_partway() {
        let p = profile(0.01, 1.0, 0.5);
        let from = Pose::new(0.5, 0.5, 0.0);
        let to = Pose::new(1.5, 0.5, 0.0);

        let outcome = from.advance(&to, &p, 40.0);
        assert!((outcome.pose.x() - 0.9).abs() < 1e-9);
        assert!((outcome.pose.y() - 0.5).abs() < 1e-12);
        assert_eq!(outcome.remaining, 0.0);
    }

    #[test]
    fn test_insufficient_time_only_rotates() {
        // Facing west, target east: heading error is pi
        let p = profile(0.01, 0.001, 0.5);
        let from = Pose::new(0.5, 0.5, PI);
        let to = Pose::new(1.5, 0.5, 0.0);

        let outcome = from.advance(&to, &p, 100.0);
        assert_eq!(outcome.pose.x(), from.x());
        assert_eq!(outcome.pose.y(), from.y());
        assert_ne!(outcome.pose.facing(), from.facing());
        assert_eq!(outcome.remaining, 0.0);
    }

    #[test]
    fn test_partial_rotation_is_proportional() {
        // Error of pi/2, tolerance 0: needs (pi/2)/0.001 ms
        let p = profile(0.01, 0.001, 0.0);
        let from = Pose::new(0.5, 0.5, 0.0);
        let to = Pose::new(0.5, 1.5, 0.0);
        let needed = FRAC_PI_2 / 0.001;

        let outcome = from.advance(&to, &p, needed / 2.0);
        assert!((outcome.pose.facing() - FRAC_PI_2 / 2.0).abs() < 1e-9);
        assert_eq!(outcome.remaining, 0.0);
    }

    #[test]
    fn test_pre_turn_then_translate() {
        // Error pi/2, tolerance pi/4, rotation 0.01 rad/ms: pre-turn takes ~78.5ms
        let p = profile(0.01, 0.01, PI / 4.0);
        let from = Pose::new(0.5, 0.5, 0.0);
        let to = Pose::new(0.5, 1.5, 0.0);
        let pre_turn = (PI / 4.0) / 0.01;

        let outcome = from.advance(&to, &p, pre_turn + 100.0 + 20.0);
        assert!(outcome.pose.same_location(&to));
        assert!((outcome.pose.facing() - FRAC_PI_2).abs() < 1e-9);
        assert!((outcome.remaining - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_small_heading_error_eases_while_moving() {
        // Error below tolerance: no pre-turn, facing converges during translation
        let p = profile(0.01, 0.001, FRAC_PI_2);
        let from = Pose::new(0.5, 0.5, 0.05);
        let to = Pose::new(1.5, 0.5, 0.0);

        let outcome = from.advance(&to, &p, 20.0);
        assert!((outcome.pose.x() - 0.7).abs() < 1e-9);
        assert!((outcome.pose.facing() - 0.03).abs() < 1e-9);

        let outcome = outcome.pose.advance(&to, &p, 80.0);
        assert!(outcome.pose.same_location(&to));
        assert!(outcome.pose.facing() < 1e-9 || outcome.pose.facing() > 2.0 * PI - 1e-9);
    }

    #[test]
    fn test_rotation_never_goes_the_long_way() {
        // Facing just above zero, target slightly clockwise past zero
        let p = profile(0.01, 0.001, 1.0);
        let from = Pose::new(0.5, 0.5, 0.02);
        let to = Pose::new(1.5, 0.49, 0.0);

        let outcome = from.advance(&to, &p, 10.0);
        let error = shortest_delta(outcome.pose.facing(), normalize_angle((-0.01f64).atan2(1.0)));
        assert!(error.abs() < 0.025);
    }

    #[test]
    fn test_vertical_move_after_horizontal_drift_returns_surplus() {
        let p = profile(0.003, 1e9, PI);
        let from = Pose::new(1.500_000_000_000_001, 0.5, FRAC_PI_2);
        let to = Pose::new(1.5, 1.5, 0.0);

        let outcome = from.advance(&to, &p, 1000.0);
        assert!(outcome.pose.same_location(&to));
        assert!(outcome.remaining > 600.0);
    }

    #[test]
    fn test_non_finite_input_keeps_starting_pose() {
        let p = profile(f64::NAN, 1.0, 0.5);
        let from = Pose::new(0.5, 0.5, 0.0);
        let to = Pose::new(1.5, 0.5, 0.0);

        let outcome = from.advance(&to, &p, 10.0);
        assert_eq!(outcome.pose, from);
        assert_eq!(outcome.remaining, 0.0);
    }

    #[test]
    fn test_zero_duration_is_a_no_op() {
        let p = profile(0.01, 1.0, 0.5);
        let from = Pose::new(0.5, 0.5, 0.0);
        let outcome = from.advance(&Pose::new(1.5, 0.5, 0.0), &p, 0.0);
        assert_eq!(outcome.pose, from);
        assert_eq!(outcome.remaining, 0.0);
    }
}
