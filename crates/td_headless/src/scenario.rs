//! Scenario loading and configuration.
//!
//! A scenario names a map, an optional unit roster, buildings placed before
//! the first tick, and a schedule of unit spawns. Scenarios are RON files;
//! two are embedded in the binary.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use td_core::data::{builtin_map, default_roster, MapData, UnitData};
use td_core::error::GameError;
use td_core::grid::{CellCoord, Grid};
use td_core::simulation::{Simulation, SimulationConfig};
use td_core::unit_kind::UnitKindRegistry;

/// Names accepted by [`Scenario::builtin`].
pub const BUILTIN_SCENARIOS: [&str; 2] = ["classic", "test"];

const CLASSIC_RON: &str = include_str!("../scenarios/classic.ron");
const TEST_RON: &str = include_str!("../scenarios/test.ron");

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The scenario refers to a map that is not built in.
    #[error("Unknown built-in map: {0}")]
    UnknownMap(String),
    /// No built-in scenario has this name.
    #[error("Unknown built-in scenario: {0}")]
    UnknownScenario(String),
    /// Timing values are unusable.
    #[error("Invalid scenario timing: {0}")]
    InvalidTiming(String),
    /// The core rejected the map, roster or a building.
    #[error(transparent)]
    Core(#[from] GameError),
}

/// Where a scenario's map comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapSource {
    /// One of [`td_core::data::BUILTIN_MAP_NAMES`].
    Builtin(String),
    /// A map written out in the scenario file.
    Inline(MapData),
}

/// A batch of units entering the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnEvent {
    /// Simulated time in milliseconds at which the units appear.
    pub at_ms: f64,
    /// Unit kind string ID.
    pub kind: String,
    /// Index into the map's spawn list.
    #[serde(default)]
    pub spawn: usize,
    /// Number of units.
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_count() -> u32 {
    1
}

fn default_tick_ms() -> f64 {
    50.0
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Map to play on.
    pub map: MapSource,
    /// Unit roster; the built-in roster when absent.
    #[serde(default)]
    pub units: Option<Vec<UnitData>>,
    /// Buildings placed, in order, before the first tick.
    #[serde(default)]
    pub buildings: Vec<(i32, i32)>,
    /// Spawn schedule.
    #[serde(default)]
    pub spawns: Vec<SpawnEvent>,
    /// Length of one tick in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: f64,
    /// Total simulated time in milliseconds.
    pub duration_ms: f64,
    /// Simulation tunables.
    #[serde(default)]
    pub config: SimulationConfig,
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario = Self::from_ron_str(&contents)?;
        tracing::debug!(path = %path.display(), name = %scenario.name, "Scenario loaded");
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// One of the scenarios embedded in the binary.
    pub fn builtin(name: &str) -> Result<Self, ScenarioError> {
        let text = match name {
            "classic" => CLASSIC_RON,
            "test" => TEST_RON,
            _ => return Err(ScenarioError::UnknownScenario(name.to_string())),
        };
        Self::from_ron_str(text)
    }

    /// A built-in scenario by name, otherwise a RON file at that path.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        if BUILTIN_SCENARIOS.contains(&name_or_path) {
            Self::builtin(name_or_path)
        } else {
            Self::load(name_or_path)
        }
    }

    /// Number of ticks needed to cover [`duration_ms`](Self::duration_ms).
    #[must_use]
    pub fn total_ticks(&self) -> u64 {
        (self.duration_ms / self.tick_ms).ceil() as u64
    }

    /// Check timing values.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if !(self.tick_ms.is_finite() && self.tick_ms > 0.0) {
            return Err(ScenarioError::InvalidTiming(format!(
                "tick_ms must be positive, got {}",
                self.tick_ms
            )));
        }
        if !(self.duration_ms.is_finite() && self.duration_ms >= 0.0) {
            return Err(ScenarioError::InvalidTiming(format!(
                "duration_ms must be non-negative, got {}",
                self.duration_ms
            )));
        }
        if let Some(event) = self.spawns.iter().find(|e| !(e.at_ms.is_finite() && e.at_ms >= 0.0)) {
            return Err(ScenarioError::InvalidTiming(format!(
                "spawn of '{}' at {} ms",
                event.kind, event.at_ms
            )));
        }
        Ok(())
    }

    /// The map definition this scenario plays on.
    pub fn map_data(&self) -> Result<MapData, ScenarioError> {
        match &self.map {
            MapSource::Builtin(name) => {
                builtin_map(name).ok_or_else(|| ScenarioError::UnknownMap(name.clone()))
            }
            MapSource::Inline(map) => Ok(map.clone()),
        }
    }

    /// Build the grid.
    pub fn grid(&self) -> Result<Grid, ScenarioError> {
        Ok(self.map_data()?.to_grid()?)
    }

    /// Build the unit registry from the roster.
    pub fn registry(&self) -> Result<UnitKindRegistry, ScenarioError> {
        let registry = match &self.units {
            Some(units) => UnitKindRegistry::from_data(units)?,
            None => UnitKindRegistry::from_data(&default_roster())?,
        };
        Ok(registry)
    }

    /// Create the simulation with every initial building placed.
    ///
    /// A building that would block every path fails the whole scenario.
    pub fn build(&self) -> Result<Simulation, ScenarioError> {
        self.validate()?;
        let mut sim = Simulation::new(self.grid()?, self.registry()?, self.config)?;
        for &(x, y) in &self.buildings {
            sim.place_building(CellCoord::new(x, y))?;
        }
        tracing::info!(
            scenario = %self.name,
            buildings = sim.buildings().len(),
            spawn_events = self.spawns.len(),
            "Scenario ready"
        );
        Ok(sim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use td_core::buildings::PlacementError;
    use td_core::simulation::LeakPolicy;

    #[test]
    fn test_builtin_scenarios_build() {
        for name in BUILTIN_SCENARIOS {
            let scenario = Scenario::builtin(name).unwrap();
            assert_eq!(scenario.name, name);
            let sim = scenario.build().unwrap();
            assert_eq!(sim.buildings().len(), scenario.buildings.len());
        }
    }

    #[test]
    fn test_unknown_builtin() {
        assert!(matches!(
            Scenario::builtin("siege"),
            Err(ScenarioError::UnknownScenario(ref name)) if name == "siege"
        ));
    }

    #[test]
    fn test_parse_minimal_ron() {
        let ron = r#"
            Scenario(
                name: "Minimal",
                map: Builtin("test"),
                duration_ms: 1000.0,
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.tick_ms, 50.0);
        assert_eq!(scenario.total_ticks(), 20);
        assert!(scenario.units.is_none());
        assert_eq!(scenario.config.leak_policy, LeakPolicy::ReturnToSpawn);
    }

    #[test]
    fn test_parse_inline_map_and_roster() {
        let ron = r#"
            Scenario(
                name: "Inline",
                map: Inline(MapData(name: "lane", rows: ["SddT"], legend: {'d': Grass})),
                units: Some([
                    UnitData(
                        id: "runner",
                        name: "Runner",
                        movement: MovementData(
                            class: Ground,
                            speed: 4.0,
                            rotation_speed: 720.0,
                            max_turn_angle: 90.0,
                        ),
                    ),
                ]),
                spawns: [SpawnEvent(at_ms: 0.0, kind: "runner", count: 2)],
                tick_ms: 20.0,
                duration_ms: 1000.0,
                config: SimulationConfig(leak_policy: remove),
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.spawns[0].count, 2);
        assert_eq!(scenario.spawns[0].spawn, 0);

        let sim = scenario.build().unwrap();
        assert_eq!(sim.grid().width(), 4);
        assert!(sim.registry().find("runner").is_some());
        assert!(sim.registry().find("footman").is_none());
    }

    #[test]
    fn test_blocking_building_fails_build() {
        let mut scenario = Scenario::builtin("test").unwrap();
        scenario.map = MapSource::Inline(MapData {
            name: "lane".into(),
            rows: vec!["SgggT".into()],
            legend: td_core::grid::TileLegend::empty(),
        });
        scenario.buildings = vec![(2, 0)];

        assert!(matches!(
            scenario.build(),
            Err(ScenarioError::Core(GameError::PlacementRejected {
                reason: PlacementError::BlocksPath,
                ..
            }))
        ));
    }

    #[test]
    fn test_unknown_map() {
        let mut scenario = Scenario::builtin("test").unwrap();
        scenario.map = MapSource::Builtin("atlantis".into());
        assert!(matches!(scenario.build(), Err(ScenarioError::UnknownMap(_))));
    }

    #[test]
    fn test_invalid_timing() {
        let mut scenario = Scenario::builtin("test").unwrap();
        scenario.tick_ms = 0.0;
        assert!(matches!(scenario.validate(), Err(ScenarioError::InvalidTiming(_))));

        let mut scenario = Scenario::builtin("test").unwrap();
        scenario.duration_ms = f64::NAN;
        assert!(matches!(scenario.build(), Err(ScenarioError::InvalidTiming(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Scenario::load("/definitely/not/here.ron"),
            Err(ScenarioError::FileNotFound(_))
        ));
    }
}
