//! Data-driven unit kinds.
//!
//! - [`UnitKindId`]: numeric ID used at runtime
//! - [`UnitKindRegistry`]: maps string IDs from data files to numeric IDs
//!   and holds each kind's movement profile

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::data::UnitData;
use crate::error::{GameError, Result};
use crate::movement::{MovementClass, MovementProfile};

/// Numeric identifier for a unit kind.
///
/// Assigned in registration order, so the same roster always yields the
/// same IDs.
///
/// # Example
///
/// ```
/// use td_core::unit_kind::UnitKindId;
///
/// let id = UnitKindId::new(3);
/// assert_eq!(id.as_u16(), 3);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct UnitKindId(u16);

impl UnitKindId {
    /// Create a new unit kind ID.
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

/// Metadata about a unit kind, stored in the registry.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitKindInfo {
    /// Numeric ID (index in registry).
    pub id: UnitKindId,
    /// String ID from data (e.g. "footman").
    pub key: String,
    /// Display name.
    pub name: String,
    /// Movement constants in simulation units.
    pub movement: MovementProfile,
}

/// Central registry of unit kinds.
#[derive(Default, Debug, Clone)]
pub struct UnitKindRegistry {
    by_id: Vec<UnitKindInfo>,
    by_key: HashMap<String, UnitKindId>,
}

impl UnitKindRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from unit definitions, validating each one.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidUnitData`] for an invalid definition or a
    /// duplicate ID.
    pub fn from_data(units: &[UnitData]) -> Result<Self> {
        let mut registry = Self::new();
        for unit in units {
            unit.validate()?;
            registry.register(&unit.id, &unit.name, unit.movement.to_profile())?;
        }
        tracing::debug!(kinds = registry.len(), "Unit registry built");
        Ok(registry)
    }

    /// Register a unit kind and return its numeric ID.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidUnitData`] if `key` is already registered
    /// or the registry is full.
    pub fn register(&mut self, key: &str, name: &str, movement: MovementProfile) -> Result<UnitKindId> {
        if self.by_key.contains_key(key) {
            return Err(GameError::InvalidUnitData {
                id: key.to_string(),
                message: "duplicate unit id".into(),
            });
        }
        let index = u16::try_from(self.by_id.len()).map_err(|_| GameError::InvalidUnitData {
            id: key.to_string(),
            message: "too many unit kinds".into(),
        })?;

        let id = UnitKindId::new(index);
        self.by_id.push(UnitKindInfo {
            id,
            key: key.to_string(),
            name: name.to_string(),
            movement,
        });
        self.by_key.insert(key.to_string(), id);
        Ok(id)
    }

    /// Get unit info by numeric ID.
    #[inline]
    #[must_use]
    pub fn get(&self, id: UnitKindId) -> Option<&UnitKindInfo> {
        self.by_id.get(id.0 as usize)
    }

    /// Find a kind's numeric ID by string ID.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<UnitKindId> {
        self.by_key.get(key).copied()
    }

    /// Resolve a string ID, failing for unknown kinds.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownUnitKind`].
    pub fn resolve(&self, key: &str) -> Result<UnitKindId> {
        self.find(key)
            .ok_or_else(|| GameError::UnknownUnitKind(key.to_string()))
    }

    /// Movement profile of a kind.
    #[must_use]
    pub fn movement(&self, id: UnitKindId) -> Option<&MovementProfile> {
        self.get(id).map(|info| &info.movement)
    }

    /// All kinds in ID order.
    pub fn all(&self) -> impl Iterator<Item = &UnitKindInfo> {
        self.by_id.iter()
    }

    /// Kinds that move over `class`.
    pub fn by_class(&self, class: MovementClass) -> impl Iterator<Item = &UnitKindInfo> {
        self.by_id
            .iter()
            .filter(move |info| info.movement.class() == class)
    }

    /// Total number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Check if registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
