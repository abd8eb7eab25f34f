//! Movement classes and per-class movement profiles.

use serde::{Deserialize, Serialize};

use crate::grid::TileFlags;
use crate::math::deg_to_rad;

/// Navigation surface a unit moves over.
///
/// Each class gets its own flood field in the
/// [`Pathfinder`](crate::pathfinding::Pathfinder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MovementClass {
    /// Ignores tile flags and buildings. Also the fallback field for units
    /// stranded off their own surface.
    Unconstrained,
    /// Needs walkable tiles and is blocked by buildings.
    Ground,
    /// Needs flyable tiles; passes over buildings.
    Air,
}

impl MovementClass {
    /// Every class, in recalculation order.
    pub const ALL: [Self; 3] = [Self::Unconstrained, Self::Ground, Self::Air];

    /// Tile flag a cell must carry for this class to enter it.
    #[must_use]
    pub const fn required_flags(self) -> TileFlags {
        match self {
            Self::Unconstrained => TileFlags::empty(),
            Self::Ground => TileFlags::WALKABLE,
            Self::Air => TileFlags::FLYABLE,
        }
    }

    /// Whether placed buildings block this class.
    #[must_use]
    pub const fn blocked_by_buildings(self) -> bool {
        matches!(self, Self::Ground)
    }

    /// Dense index for per-class storage.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Unconstrained => 0,
            Self::Ground => 1,
            Self::Air => 2,
        }
    }

    /// Lowercase name used in logs and reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unconstrained => "unconstrained",
            Self::Ground => "ground",
            Self::Air => "air",
        }
    }
}

impl std::fmt::Display for MovementClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable movement constants shared by every unit of one kind.
///
/// Simulation units: tiles per millisecond, radians per millisecond,
/// radians. Use [`MovementProfile::from_authoring`] to build one from the
/// per-second/degree values found in data files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementProfile {
    class: MovementClass,
    speed: f64,
    rotation_speed: f64,
    max_free_turn_angle: f64,
}

impl MovementProfile {
    /// Create a profile from simulation units.
    #[must_use]
    pub const fn new(
        class: MovementClass,
        speed: f64,
        rotation_speed: f64,
        max_free_turn_angle: f64,
    ) -> Self {
        Self {
            class,
            speed,
            rotation_speed,
            max_free_turn_angle,
        }
    }

    /// Create a profile from tiles/second, degrees/second and degrees.
    ///
    /// # Example
    ///
    /// ```
    /// use td_core::movement::{MovementClass, MovementProfile};
    ///
    /// let footman = MovementProfile::from_authoring(MovementClass::Ground, 2.0, 3600.0, 360.0);
    /// assert!((footman.speed() - 0.002).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn from_authoring(
        class: MovementClass,
        tiles_per_second: f64,
        degrees_per_second: f64,
        max_turn_degrees: f64,
    ) -> Self {
        Self::new(
            class,
            tiles_per_second / 1000.0,
            deg_to_rad(degrees_per_second) / 1000.0,
            deg_to_rad(max_turn_degrees),
        )
    }

    /// Movement class.
    #[must_use]
    pub const fn class(&self) -> MovementClass {
        self.class
    }

    /// Translation speed in tiles per millisecond.
    #[must_use]
    pub const fn speed(&self) -> f64 {
        self.speed
    }

    /// Rotation speed in radians per millisecond.
    #[must_use]
    pub const fn rotation_speed(&self) -> f64 {
        self.rotation_speed
    }

    /// Largest heading error tolerated while translating, in radians.
    #[must_use]
    pub const fn max_free_turn_angle(&self) -> f64 {
        self.max_free_turn_angle
    }

    /// Milliseconds needed to cross `tiles` in a straight line.
    #[must_use]
    pub fn travel_time(&self, tiles: f64) -> f64 {
        tiles / self.speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_required_flags() {
        assert_eq!(MovementClass::Unconstrained.required_flags(), TileFlags::empty());
        assert_eq!(MovementClass::Ground.required_flags(), TileFlags::WALKABLE);
        assert_eq!(MovementClass::Air.required_flags(), TileFlags::FLYABLE);
    }

    #[test]
    fn test_only_ground_is_blocked_by_buildings() {
        assert!(MovementClass::Ground.blocked_by_buildings());
        assert!(!MovementClass::Air.blocked_by_buildings());
        assert!(!MovementClass::Unconstrained.blocked_by_buildings());
    }

    #[test]
    fn test_indices_are_dense() {
        for (i, class) in MovementClass::ALL.iter().enumerate() {
            assert_eq!(class.index(), i);
        }
    }

    #[test]
    fn test_authoring_conversion() {
        let profile = MovementProfile::from_authoring(MovementClass::Air, 5.0, 180.0, 90.0);
        assert_eq!(profile.class(), MovementClass::Air);
        assert!((profile.speed() - 0.005).abs() < 1e-12);
        assert!((profile.rotation_speed() - PI / 1000.0).abs() < 1e-12);
        assert!((profile.max_free_turn_angle() - PI / 2.0).abs() < 1e-12);
        assert!((profile.travel_time(1.0) - 200.0).abs() < 1e-9);
    }
}
