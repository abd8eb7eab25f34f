//! Simulation context tying the grid, flow fields, buildings and units
//! together.
//!
//! # Tick order
//!
//! Each [`Simulation::tick`] steers every unit once, in ascending id order,
//! against the flow fields as they stand at the start of the tick. Building
//! changes happen between ticks.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::buildings::{self, BuildingLayout};
use crate::error::{GameError, Result};
use crate::grid::{CellCoord, Grid};
use crate::movement::MovementClass;
use crate::pathfinding::Pathfinder;
use crate::pose::Pose;
use crate::systems::{steering_system, SteerStatus};
use crate::unit_kind::{UnitKindId, UnitKindRegistry};

/// Unique identifier for a unit.
pub type UnitId = u32;

/// What happens to a unit that reaches a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakPolicy {
    /// Teleport back to the first spawn and keep walking.
    #[default]
    ReturnToSpawn,
    /// Despawn the unit.
    Remove,
}

/// Tunables for a [`Simulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Handling of units that reach a target.
    #[serde(default)]
    pub leak_policy: LeakPolicy,
}

/// A mobile unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique identifier.
    pub id: UnitId,
    /// Unit kind.
    pub kind: UnitKindId,
    /// Position and facing.
    pub pose: Pose,
    /// Cell currently being walked to, if any.
    pub waypoint: Option<CellCoord>,
    /// Number of times this unit has reached a target.
    pub leaks: u32,
}

impl Unit {
    /// Create a unit with no waypoint.
    #[must_use]
    pub fn new(id: UnitId, kind: UnitKindId, pose: Pose) -> Self {
        Self {
            id,
            kind,
            pose,
            waypoint: None,
            leaks: 0,
        }
    }
}

/// Events generated during a simulation tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Units that reached a target (once per arrival).
    pub leaked: Vec<UnitId>,
    /// Units despawned after leaking.
    pub removed: Vec<UnitId>,
    /// Units left without a route.
    pub stalled: Vec<UnitId>,
}

/// The tower-defense navigation simulation.
#[derive(Debug, Clone)]
pub struct Simulation {
    tick: u64,
    elapsed_ms: f64,
    config: SimulationConfig,
    pathfinder: Pathfinder,
    layout: BuildingLayout,
    registry: UnitKindRegistry,
    units: BTreeMap<UnitId, Unit>,
    next_id: UnitId,
}

impl Simulation {
    /// Create a simulation on `grid` with no buildings.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Unreachable`] if some movement class cannot reach
    /// every spawn on the bare grid.
    pub fn new(grid: Grid, registry: UnitKindRegistry, config: SimulationConfig) -> Result<Self> {
        let layout = BuildingLayout::new();
        let mut pathfinder = Pathfinder::new(grid);

        let failed: Vec<&str> = MovementClass::ALL
            .iter()
            .filter(|&&class| !pathfinder.recalculate(class, &layout))
            .map(|class| class.name())
            .collect();
        pathfinder.commit_all();

        if !failed.is_empty() {
            return Err(GameError::Unreachable(failed.join(", ")));
        }

        tracing::info!(
            width = pathfinder.grid().width(),
            height = pathfinder.grid().height(),
            kinds = registry.len(),
            "Simulation created"
        );

        Ok(Self {
            tick: 0,
            elapsed_ms: 0.0,
            config,
            pathfinder,
            layout,
            registry,
            units: BTreeMap::new(),
            next_id: 1,
        })
    }

    /// Current simulation tick.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// Simulated time in milliseconds.
    #[must_use]
    pub const fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The grid being played on.
    #[must_use]
    pub const fn grid(&self) -> &Grid {
        self.pathfinder.grid()
    }

    /// Flow fields.
    #[must_use]
    pub const fn pathfinder(&self) -> &Pathfinder {
        &self.pathfinder
    }

    /// Placed buildings.
    #[must_use]
    pub const fn buildings(&self) -> &BuildingLayout {
        &self.layout
    }

    /// Unit kinds.
    #[must_use]
    pub const fn registry(&self) -> &UnitKindRegistry {
        &self.registry
    }

    /// Units in ascending id order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Number of live units.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Get a unit by id.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Spawn a unit at the centre of spawn `spawn_index`, facing 0.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownUnitKind`] or [`GameError::InvalidSpawn`].
    pub fn spawn_unit(&mut self, kind: UnitKindId, spawn_index: usize) -> Result<UnitId> {
        if self.registry.get(kind).is_none() {
            return Err(GameError::UnknownUnitKind(kind.as_u16().to_string()));
        }
        let spawns = self.grid().spawns();
        let spawn = *spawns.get(spawn_index).ok_or(GameError::InvalidSpawn {
            index: spawn_index,
            available: spawns.len(),
        })?;

        let id = self.next_id;
        self.next_id += 1;
        self.units
            .insert(id, Unit::new(id, kind, Pose::at_cell_center(spawn, 0.0)));

        tracing::debug!(unit = id, kind = kind.as_u16(), spawn = %spawn, "Unit spawned");
        Ok(id)
    }

    /// Spawn a unit by its string kind id.
    ///
    /// # Errors
    ///
    /// See [`spawn_unit`](Self::spawn_unit).
    pub fn spawn_unit_by_key(&mut self, key: &str, spawn_index: usize) -> Result<UnitId> {
        let kind = self.registry.resolve(key)?;
        self.spawn_unit(kind, spawn_index)
    }

    /// Remove a unit. Returns `false` if it did not exist.
    pub fn despawn_unit(&mut self, id: UnitId) -> bool {
        self.units.remove(&id).is_some()
    }

    /// Place a building, keeping it only if every spawn stays reachable.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PlacementRejected`] with the reason.
    pub fn place_building(&mut self, cell: CellCoord) -> Result<()> {
        buildings::place_building(&mut self.pathfinder, &mut self.layout, cell)
            .map_err(|reason| GameError::PlacementRejected { cell, reason })
    }

    /// Check whether a building could be placed, leaving everything unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PlacementRejected`] with the reason.
    pub fn preview_building(&mut self, cell: CellCoord) -> Result<()> {
        buildings::preview_building(&mut self.pathfinder, &self.layout, cell)
            .map_err(|reason| GameError::PlacementRejected { cell, reason })
    }

    /// Remove a building. Returns `false` if none stood on `cell`.
    pub fn remove_building(&mut self, cell: CellCoord) -> bool {
        buildings::remove_building(&mut self.pathfinder, &mut self.layout, cell)
    }

    /// Advance the simulation by `dt_ms` milliseconds.
    pub fn tick(&mut self, dt_ms: f64) -> TickEvents {
        let mut events = TickEvents::default();
        let ids: Vec<UnitId> = self.units.keys().copied().collect();

        for id in ids {
            let Some(unit) = self.units.get_mut(&id) else {
                continue;
            };
            let Some(profile) = self.registry.movement(unit.kind) else {
                tracing::warn!(unit = id, kind = unit.kind.as_u16(), "Unit kind missing from registry");
                events.stalled.push(id);
                continue;
            };

            let report = steering_system(
                unit,
                profile,
                &self.pathfinder,
                self.config.leak_policy,
                dt_ms,
            );

            unit.leaks += report.leaks;
            events
                .leaked
                .extend(std::iter::repeat(id).take(report.leaks as usize));

            match report.status {
                SteerStatus::Moving => {}
                SteerStatus::Stalled => events.stalled.push(id),
                SteerStatus::Removed => {
                    self.units.remove(&id);
                    events.removed.push(id);
                }
            }
        }

        self.tick += 1;
        self.elapsed_ms += dt_ms;

        if !events.leaked.is_empty() {
            tracing::debug!(tick = self.tick, leaked = events.leaked.len(), "Units reached a target");
        }
        events
    }

    /// Deterministic hash of the simulation state.
    ///
    /// Covers the tick, buildings, and every unit's kind, pose, waypoint and
    /// leak count. Two runs fed the same inputs produce the same hash.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.elapsed_ms.to_bits().hash(&mut hasher);

        self.layout.len().hash(&mut hasher);
        for cell in self.layout.iter() {
            cell.hash(&mut hasher);
        }

        self.units.len().hash(&mut hasher);
        for unit in self.units.values() {
            unit.id.hash(&mut hasher);
            unit.kind.hash(&mut hasher);
            unit.pose.x().to_bits().hash(&mut hasher);
            unit.pose.y().to_bits().hash(&mut hasher);
            unit.pose.facing().to_bits().hash(&mut hasher);
            unit.waypoint.hash(&mut hasher);
            unit.leaks.hash(&mut hasher);
        }

        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::PlacementError;
    use crate::data::{builtin_map, default_roster};
    use crate::grid::{TileFlags, TileLegend};

    fn registry() -> UnitKindRegistry {
        UnitKindRegistry::from_data(&default_roster()).unwrap()
    }

    fn corridor(config: SimulationConfig) -> Simulation {
        let grid = Grid::from_template(&["SgggT", "ggggg"], &TileLegend::default()).unwrap();
        Simulation::new(grid, registry(), config).unwrap()
    }

    #[test]
    fn test_simulation_new() {
        let sim = corridor(SimulationConfig::default());
        assert_eq!(sim.get_tick(), 0);
        assert_eq!(sim.unit_count(), 0);
        assert!(sim.pathfinder().field(MovementClass::Ground).is_some());
        assert!(!sim.pathfinder().has_pending(MovementClass::Ground));
    }

    #[test]
    fn test_unreachable_layout_rejected() {
        let grid = Grid::from_template(&["SAT"], &TileLegend::default()).unwrap();
        let err = Simulation::new(grid, registry(), SimulationConfig::default()).unwrap_err();
        assert_eq!(err, GameError::Unreachable("ground".into()));
    }

    #[test]
    fn test_spawn_unit() {
        let mut sim = corridor(SimulationConfig::default());
        let id = sim.spawn_unit_by_key("footman", 0).unwrap();

        let unit = sim.unit(id).unwrap();
        assert_eq!(unit.pose, Pose::new(0.5, 0.5, 0.0));
        assert!(unit.waypoint.is_none());

        assert!(matches!(
            sim.spawn_unit_by_key("footman", 3),
            Err(GameError::InvalidSpawn { index: 3, available: 1 })
        ));
        assert!(matches!(
            sim.spawn_unit(UnitKindId::new(40), 0),
            Err(GameError::UnknownUnitKind(_))
        ));
    }

    #[test]
    fn test_footman_walks_the_corridor() {
        let mut sim = corridor(SimulationConfig::default());
        let id = sim.spawn_unit_by_key("footman", 0).unwrap();

        // 2 tiles/s: 1 s covers two cells
        for _ in 0..10 {
            sim.tick(100.0);
        }
        let unit = sim.unit(id).unwrap();
        assert!((unit.pose.x() - 2.5).abs() < 0.02);
        assert!((unit.pose.y() - 0.5).abs() < 1e-9);
        assert_eq!(sim.get_tick(), 10);
        assert!((sim.elapsed_ms() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_leak_events() {
        let config = SimulationConfig {
            leak_policy: LeakPolicy::Remove,
        };
        let mut sim = corridor(config);
        let id = sim.spawn_unit_by_key("knight", 0).unwrap();

        // 5 tiles/s: four cells take 800 ms
        let events = sim.tick(900.0);
        assert_eq!(events.leaked, vec![id]);
        assert_eq!(events.removed, vec![id]);
        assert_eq!(sim.unit_count(), 0);
    }

    #[test]
    fn test_return_to_spawn_keeps_unit() {
        let mut sim = corridor(SimulationConfig::default());
        let id = sim.spawn_unit_by_key("knight", 0).unwrap();

        let events = sim.tick(900.0);
        assert_eq!(events.leaked, vec![id]);
        assert!(events.removed.is_empty());

        let unit = sim.unit(id).unwrap();
        assert_eq!(unit.leaks, 1);
        assert!((unit.pose.x() - 1.0).abs() < 0.02);
    }

    #[test]
    fn test_placement_through_simulation() {
        let mut sim = corridor(SimulationConfig::default());

        sim.place_building(CellCoord::new(2, 0)).unwrap();
        assert_eq!(
            sim.place_building(CellCoord::new(2, 1)),
            Err(GameError::PlacementRejected {
                cell: CellCoord::new(2, 1),
                reason: PlacementError::BlocksPath,
            })
        );
        assert_eq!(sim.buildings().len(), 1);

        assert!(sim.preview_building(CellCoord::new(0, 1)).is_ok());
        assert_eq!(sim.buildings().len(), 1);
        assert!(sim.remove_building(CellCoord::new(2, 0)));
    }

    #[test]
    fn test_units_detour_around_new_building() {
        let mut sim = corridor(SimulationConfig::default());
        let id = sim.spawn_unit_by_key("footman", 0).unwrap();
        sim.place_building(CellCoord::new(1, 0)).unwrap();

        sim.tick(500.0);
        let unit = sim.unit(id).unwrap();
        assert_eq!(unit.pose.cell(), CellCoord::new(0, 1));
    }

    #[test]
    fn test_deterministic_hash() {
        let run = || {
            let mut sim = corridor(SimulationConfig::default());
            sim.spawn_unit_by_key("footman", 0).unwrap();
            sim.spawn_unit_by_key("wyvern", 0).unwrap();
            sim.place_building(CellCoord::new(2, 1)).unwrap();
            for _ in 0..25 {
                sim.tick(33.0);
            }
            sim.state_hash()
        };
        assert_eq!(run(), run());

        let mut sim = corridor(SimulationConfig::default());
        let before = sim.state_hash();
        sim.tick(16.0);
        assert_ne!(before, sim.state_hash());
    }

    #[test]
    fn test_classic_map_builds() {
        let grid = builtin_map("classic").unwrap().to_grid().unwrap();
        let mut sim = Simulation::new(grid, registry(), SimulationConfig::default()).unwrap();

        // The dirt strip next to the spawn is the only way in
        assert!(matches!(
            sim.place_building(CellCoord::new(1, 5)),
            Err(GameError::PlacementRejected {
                reason: PlacementError::BlocksPath,
                ..
            })
        ));
        assert!(sim.place_building(CellCoord::new(5, 5)).is_ok());
    }

    #[test]
    fn test_leak_policy_ron_spelling() {
        let config: SimulationConfig = ron::from_str("SimulationConfig(leak_policy: remove)").unwrap();
        assert_eq!(config.leak_policy, LeakPolicy::Remove);

        let config: SimulationConfig =
            ron::from_str("SimulationConfig(leak_policy: return_to_spawn)").unwrap();
        assert_eq!(config.leak_policy, LeakPolicy::ReturnToSpawn);

        assert!(ron::from_str::<SimulationConfig>("SimulationConfig(leak_policy: Remove)").is_err());
    }

    #[test]
    fn test_tick_ends_when_spawn_is_a_target() {
        let spawn = CellCoord::new(0, 0);
        let grid = Grid::new(
            2,
            1,
            vec![TileFlags::ALL; 2],
            vec![spawn],
            vec![spawn, CellCoord::new(1, 0)],
        )
        .unwrap();
        let mut sim = Simulation::new(grid, registry(), SimulationConfig::default()).unwrap();
        let id = sim.spawn_unit_by_key("footman", 0).unwrap();

        let events = sim.tick(16.0);
        assert_eq!(events.leaked, vec![id]);
        assert_eq!(events.stalled, vec![id]);
        assert_eq!(sim.unit(id).unwrap().pose.cell(), spawn);
    }
}
