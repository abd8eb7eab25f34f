//! Scenario runner.
//!
//! Drives a [`Simulation`] through a scenario's spawn schedule with fixed
//! ticks and summarises the outcome as a serializable [`RunReport`].

use serde::{Deserialize, Serialize};

use td_core::grid::CellCoord;
use td_core::simulation::{Simulation, TickEvents, UnitId};
use td_core::unit_kind::UnitKindId;

use crate::scenario::{Scenario, ScenarioError};

/// A spawn event with its kind resolved.
#[derive(Debug, Clone, Copy)]
struct ScheduledSpawn {
    at_ms: f64,
    kind: UnitKindId,
    spawn: usize,
    count: u32,
}

/// Final state of one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitReport {
    /// Unit ID.
    pub id: UnitId,
    /// Kind string ID.
    pub kind: String,
    /// Position in tiles.
    pub x: f64,
    /// Position in tiles.
    pub y: f64,
    /// Facing in radians.
    pub facing: f64,
    /// Containing cell.
    pub cell: CellCoord,
    /// Times this unit reached a target.
    pub leaks: u32,
}

impl UnitReport {
    /// Snapshot every live unit of `sim`.
    #[must_use]
    pub fn collect(sim: &Simulation) -> Vec<Self> {
        sim.units()
            .map(|unit| Self {
                id: unit.id,
                kind: sim
                    .registry()
                    .get(unit.kind)
                    .map_or_else(|| unit.kind.as_u16().to_string(), |info| info.key.clone()),
                x: unit.pose.x(),
                y: unit.pose.y(),
                facing: unit.pose.facing(),
                cell: unit.pose.cell(),
                leaks: unit.leaks,
            })
            .collect()
    }
}

/// Outcome of a scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Scenario name.
    pub scenario: String,
    /// Ticks simulated.
    pub ticks: u64,
    /// Simulated time in milliseconds.
    pub elapsed_ms: f64,
    /// Units spawned.
    pub spawned: u32,
    /// Target arrivals.
    pub leaks: u32,
    /// Units despawned after leaking.
    pub removed: u32,
    /// Unit-ticks spent without a route.
    pub stalls: u32,
    /// Building cells.
    pub buildings: Vec<CellCoord>,
    /// Units alive at the end.
    pub units: Vec<UnitReport>,
    /// Final state hash.
    pub hash: u64,
}

/// Steps a scenario tick by tick.
pub struct ScenarioRunner {
    name: String,
    sim: Simulation,
    schedule: Vec<ScheduledSpawn>,
    next_spawn: usize,
    tick_ms: f64,
    total_ticks: u64,
    spawned: u32,
    leaks: u32,
    removed: u32,
    stalls: u32,
}

impl ScenarioRunner {
    /// Build the scenario's simulation and resolve its spawn schedule.
    ///
    /// Unknown unit kinds and spawn indices are reported here rather than
    /// mid-run.
    pub fn new(scenario: &Scenario) -> Result<Self, ScenarioError> {
        let sim = scenario.build()?;
        let available = sim.grid().spawns().len();

        let mut schedule = scenario
            .spawns
            .iter()
            .map(|event| {
                let kind = sim.registry().resolve(&event.kind)?;
                if event.spawn >= available {
                    return Err(td_core::error::GameError::InvalidSpawn {
                        index: event.spawn,
                        available,
                    });
                }
                Ok(ScheduledSpawn {
                    at_ms: event.at_ms,
                    kind,
                    spawn: event.spawn,
                    count: event.count,
                })
            })
            .collect::<td_core::error::Result<Vec<_>>>()?;
        // stable, so same-time events keep file order
        schedule.sort_by(|a, b| a.at_ms.total_cmp(&b.at_ms));

        Ok(Self {
            name: scenario.name.clone(),
            sim,
            schedule,
            next_spawn: 0,
            tick_ms: scenario.tick_ms,
            total_ticks: scenario.total_ticks(),
            spawned: 0,
            leaks: 0,
            removed: 0,
            stalls: 0,
        })
    }

    /// The simulation being driven.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Whether the scenario's duration has been covered.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.sim.get_tick() >= self.total_ticks
    }

    /// Spawn everything that is due, then advance one tick.
    pub fn step(&mut self) -> Result<TickEvents, ScenarioError> {
        let now = self.sim.elapsed_ms();
        while let Some(event) = self.schedule.get(self.next_spawn).copied() {
            if event.at_ms > now {
                break;
            }
            for _ in 0..event.count {
                self.sim.spawn_unit(event.kind, event.spawn)?;
                self.spawned += 1;
            }
            self.next_spawn += 1;
        }

        let events = self.sim.tick(self.tick_ms);
        self.leaks += events.leaked.len() as u32;
        self.removed += events.removed.len() as u32;
        self.stalls += events.stalled.len() as u32;
        Ok(events)
    }

    /// Run to the end and report.
    pub fn run(mut self) -> Result<RunReport, ScenarioError> {
        while !self.is_finished() {
            self.step()?;
        }
        tracing::info!(
            scenario = %self.name,
            ticks = self.sim.get_tick(),
            spawned = self.spawned,
            leaks = self.leaks,
            "Scenario finished"
        );
        Ok(self.report())
    }

    /// Summary of the run so far.
    #[must_use]
    pub fn report(&self) -> RunReport {
        RunReport {
            scenario: self.name.clone(),
            ticks: self.sim.get_tick(),
            elapsed_ms: self.sim.elapsed_ms(),
            spawned: self.spawned,
            leaks: self.leaks,
            removed: self.removed,
            stalls: self.stalls,
            buildings: self.sim.buildings().iter().collect(),
            units: UnitReport::collect(&self.sim),
            hash: self.sim.state_hash(),
        }
    }
}

/// Run a scenario from start to finish.
pub fn run_scenario(scenario: &Scenario) -> Result<RunReport, ScenarioError> {
    ScenarioRunner::new(scenario)?.run()
}

/// Hashes from repeated runs of one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Scenario name.
    pub scenario: String,
    /// Final hash of each run.
    pub hashes: Vec<u64>,
    /// Whether every run ended in the same state.
    pub is_deterministic: bool,
}

/// Run a scenario `runs` times and compare the final state hashes.
pub fn verify_scenario(scenario: &Scenario, runs: usize) -> Result<VerifyReport, ScenarioError> {
    let hashes = (0..runs)
        .map(|_| run_scenario(scenario).map(|report| report.hash))
        .collect::<Result<Vec<_>, _>>()?;
    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    if is_deterministic {
        tracing::info!(scenario = %scenario.name, runs, "Determinism verified");
    } else {
        tracing::error!(scenario = %scenario.name, ?hashes, "Scenario runs diverged");
    }

    Ok(VerifyReport {
        scenario: scenario.name.clone(),
        hashes,
        is_deterministic,
    })
}
