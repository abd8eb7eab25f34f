//! Unit definitions in authoring units.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::movement::{MovementClass, MovementProfile};

/// Movement constants as written in data files.
///
/// # Example RON
///
/// ```ron
/// MovementData(
///     class: Ground,
///     speed: 2.0,            // tiles per second
///     rotation_speed: 3600.0, // degrees per second
///     max_turn_angle: 360.0,  // degrees
/// )
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementData {
    /// Navigation surface.
    pub class: MovementClass,
    /// Tiles per second.
    pub speed: f64,
    /// Degrees per second.
    pub rotation_speed: f64,
    /// Largest heading error, in degrees, tolerated while translating.
    pub max_turn_angle: f64,
}

impl MovementData {
    /// Convert to simulation units.
    #[must_use]
    pub fn to_profile(&self) -> MovementProfile {
        MovementProfile::from_authoring(
            self.class,
            self.speed,
            self.rotation_speed,
            self.max_turn_angle,
        )
    }

    fn validate(&self, id: &str) -> Result<()> {
        let invalid = |message: String| GameError::InvalidUnitData {
            id: id.to_string(),
            message,
        };

        if !(self.speed.is_finite() && self.speed > 0.0) {
            return Err(invalid(format!("speed must be positive, got {}", self.speed)));
        }
        if !(self.rotation_speed.is_finite() && self.rotation_speed > 0.0) {
            return Err(invalid(format!(
                "rotation_speed must be positive, got {}",
                self.rotation_speed
            )));
        }
        if !(0.0..=360.0).contains(&self.max_turn_angle) {
            return Err(invalid(format!(
                "max_turn_angle must be within [0, 360], got {}",
                self.max_turn_angle
            )));
        }
        Ok(())
    }
}

/// Data-driven unit definition.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     id: "footman",
///     name: "Footman",
///     movement: MovementData(class: Ground, speed: 2.0, rotation_speed: 3600.0, max_turn_angle: 360.0),
///     tags: ["infantry"],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitData {
    /// Unique string identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Movement constants.
    pub movement: MovementData,

    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl UnitData {
    /// Check identifiers and movement constants.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidUnitData`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(GameError::InvalidUnitData {
                id: self.id.clone(),
                message: "id must not be empty".into(),
            });
        }
        self.movement.validate(&self.id)
    }

    /// Check if this unit has the specified tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Roster used when no unit file is supplied.
#[must_use]
pub fn default_roster() -> Vec<UnitData> {
    let unit = |id: &str, name: &str, movement: MovementData, tag: &str| UnitData {
        id: id.to_string(),
        name: name.to_string(),
        movement,
        tags: vec![tag.to_string()],
    };
    let movement = |class, speed, rotation_speed, max_turn_angle| MovementData {
        class,
        speed,
        rotation_speed,
        max_turn_angle,
    };

    vec![
        unit("footman", "Footman", movement(MovementClass::Ground, 2.0, 3600.0, 360.0), "infantry"),
        unit("knight", "Knight", movement(MovementClass::Ground, 5.0, 3600.0, 360.0), "cavalry"),
        unit("wyvern", "Wyvern", movement(MovementClass::Air, 3.0, 180.0, 45.0), "flying"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roster_is_valid() {
        let roster = default_roster();
        assert_eq!(roster.len(), 3);
        for unit in &roster {
            unit.validate().unwrap();
        }
        assert!(roster[2].has_tag("flying"));
    }

    #[test]
    fn test_rejects_non_positive_speed() {
        let mut unit = default_roster().remove(0);
        unit.movement.speed = 0.0;
        assert!(matches!(unit.validate(), Err(GameError::InvalidUnitData { .. })));

        unit.movement.speed = f64::NAN;
        assert!(unit.validate().is_err());
    }

    #[test]
    fn test_rejects_turn_angle_out_of_range() {
        let mut unit = default_roster().remove(0);
        unit.movement.max_turn_angle = 400.0;
        assert!(unit.validate().is_err());
    }

    #[test]
    fn test_parse_from_ron() {
        let text = r#"UnitData(
            id: "scout",
            name: "Scout",
            movement: MovementData(class: Air, speed: 4.0, rotation_speed: 720.0, max_turn_angle: 30.0),
        )"#;
        let unit: UnitData = ron::from_str(text).unwrap();
        assert_eq!(unit.movement.class, MovementClass::Air);
        assert!(unit.tags.is_empty());
        assert!((unit.movement.to_profile().speed() - 0.004).abs() < 1e-12);
    }
}
