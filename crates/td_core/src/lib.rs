//! # TD Core
//!
//! Navigation core for a tower-defense simulation.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No IO
//! - No system randomness
//!
//! Two algorithms carry the weight: a multi-source flood fill that gives
//! every cell a next hop toward the nearest target, recomputed with rollback
//! whenever the building layout changes, and a continuous-time solver that
//! turns and moves a unit toward its next hop under rotation limits.
//!
//! ## Crate Structure
//!
//! - [`grid`] - Static tile grid, capability flags, map templates
//! - [`movement`] - Movement classes and profiles
//! - [`pose`] - Unit pose and the kinematic solver
//! - [`pathfinding`] - Flood-fill flow fields with per-class rollback
//! - [`buildings`] - Building layout and placement orchestration
//! - [`simulation`] - Units, ticks and determinism hashing

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod buildings;
pub mod data;
pub mod error;
pub mod grid;
pub mod math;
pub mod movement;
pub mod pathfinding;
pub mod pose;
pub mod simulation;
pub mod systems;
pub mod unit_kind;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::buildings::{BuildingLayout, PlacementError};
    pub use crate::error::{GameError, Result};
    pub use crate::grid::{CellCoord, Grid, TileFlags, TileKind, TileLegend};
    pub use crate::movement::{MovementClass, MovementProfile};
    pub use crate::pathfinding::{BuildingOccupancy, FlowField, PathRecord, Pathfinder};
    pub use crate::pose::{MoveOutcome, Pose};
    pub use crate::simulation::{LeakPolicy, Simulation, SimulationConfig, TickEvents, Unit, UnitId};
    pub use crate::unit_kind::{UnitKindId, UnitKindRegistry};
}
