//! Building layout and placement orchestration.
//!
//! Buildings occupy single cells. They are tracked here, outside the grid,
//! and only the Ground flood fill looks at them. Every layout change goes
//! through the pathfinder so that a placement which would cut a spawn off
//! from every target is rolled back.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::{CellCoord, TileFlags};
use crate::pathfinding::{BuildingOccupancy, Pathfinder};

// ============================================================================
// Layout
// ============================================================================

/// Set of cells currently occupied by buildings.
///
/// Ordered so that iteration and hashing are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingLayout {
    cells: BTreeSet<CellCoord>,
}

impl BuildingLayout {
    /// Create an empty layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a building stands on `cell`.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.cells.contains(&cell)
    }

    /// Number of buildings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if there are no buildings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Occupied cells in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.cells.iter().copied()
    }

    fn insert(&mut self, cell: CellCoord) -> bool {
        self.cells.insert(cell)
    }

    fn remove(&mut self, cell: CellCoord) -> bool {
        self.cells.remove(&cell)
    }
}

impl BuildingOccupancy for BuildingLayout {
    fn is_occupied(&self, cell: CellCoord) -> bool {
        self.contains(cell)
    }
}

/// A layout plus one hypothetical extra building.
struct WithGhost<'a> {
    layout: &'a BuildingLayout,
    ghost: CellCoord,
}

impl BuildingOccupancy for WithGhost<'_> {
    fn is_occupied(&self, cell: CellCoord) -> bool {
        cell == self.ghost || self.layout.contains(cell)
    }
}

// ============================================================================
// Placement
// ============================================================================

/// Why a building cannot go on a cell.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementError {
    /// The cell is outside the grid.
    #[error("cell is outside the map")]
    OutOfBounds,
    /// The tile does not allow buildings.
    #[error("tile is not buildable")]
    NotBuildable,
    /// Another building already stands there.
    #[error("cell is already occupied")]
    Occupied,
    /// The building would leave a spawn without a route to any target.
    #[error("building would block every path")]
    BlocksPath,
}

/// Static checks that do not need a flood fill.
///
/// # Errors
///
/// Returns [`PlacementError::OutOfBounds`], [`PlacementError::NotBuildable`]
/// or [`PlacementError::Occupied`].
pub fn validate_placement(
    pathfinder: &Pathfinder,
    layout: &BuildingLayout,
    cell: CellCoord,
) -> Result<(), PlacementError> {
    let flags = pathfinder
        .grid()
        .cell_flags(cell)
        .ok_or(PlacementError::OutOfBounds)?;
    if !flags.contains(TileFlags::BUILDABLE) {
        return Err(PlacementError::NotBuildable);
    }
    if layout.contains(cell) {
        return Err(PlacementError::Occupied);
    }
    Ok(())
}

/// Place a building and keep the new flow fields.
///
/// The building is inserted and every class recalculated. If any spawn
/// loses its route the building is removed again and every class reverted.
///
/// # Errors
///
/// Any [`validate_placement`] error, or [`PlacementError::BlocksPath`].
///
/// # Example
///
/// ```
/// use td_core::buildings::{place_building, BuildingLayout, PlacementError};
/// use td_core::grid::{CellCoord, Grid, TileLegend};
/// use td_core::pathfinding::Pathfinder;
///
/// let grid = Grid::from_template(&["SgggT"], &TileLegend::default()).unwrap();
/// let mut pathfinder = Pathfinder::new(grid);
/// let mut layout = BuildingLayout::new();
/// pathfinder.recalculate_all(&layout);
/// pathfinder.commit_all();
///
/// let result = place_building(&mut pathfinder, &mut layout, CellCoord::new(2, 0));
/// assert_eq!(result, Err(PlacementError::BlocksPath));
/// assert!(layout.is_empty());
/// ```
pub fn place_building(
    pathfinder: &mut Pathfinder,
    layout: &mut BuildingLayout,
    cell: CellCoord,
) -> Result<(), PlacementError> {
    if let Err(reason) = validate_placement(pathfinder, layout, cell) {
        tracing::warn!(cell = %cell, reason = %reason, "Building placement rejected");
        return Err(reason);
    }

    layout.insert(cell);
    let speculation = pathfinder.speculate_all(&*layout);
    if speculation.is_connected() {
        speculation.commit();
        tracing::info!(cell = %cell, buildings = layout.len(), "Building placed");
        Ok(())
    } else {
        speculation.revert();
        layout.remove(cell);
        let reason = PlacementError::BlocksPath;
        tracing::warn!(cell = %cell, reason = %reason, "Building placement rejected");
        Err(reason)
    }
}

/// Check whether a building could be placed, without placing it.
///
/// Runs the same speculative recalculation as [`place_building`] and always
/// reverts it, so the flow fields are unchanged afterwards.
///
/// # Errors
///
/// The error [`place_building`] would return.
pub fn preview_building(
    pathfinder: &mut Pathfinder,
    layout: &BuildingLayout,
    cell: CellCoord,
) -> Result<(), PlacementError> {
    validate_placement(pathfinder, layout, cell)?;

    let ghost = WithGhost { layout, ghost: cell };
    let speculation = pathfinder.speculate_all(&ghost);
    let connected = speculation.is_connected();
    speculation.revert();

    tracing::debug!(cell = %cell, valid = connected, "Building preview");
    if connected {
        Ok(())
    } else {
        Err(PlacementError::BlocksPath)
    }
}

/// Remove the building on `cell` and recalculate.
///
/// Returns `false` if no building stood there.
pub fn remove_building(
    pathfinder: &mut Pathfinder,
    layout: &mut BuildingLayout,
    cell: CellCoord,
) -> bool {
    if !layout.remove(cell) {
        return false;
    }

    // Removing an obstacle can only add routes.
    let connected = pathfinder.recalculate_all(&*layout);
    pathfinder.commit_all();
    if !connected {
        tracing::warn!(cell = %cell, "Spawns still unreachable after building removal");
    }
    tracing::info!(cell = %cell, buildings = layout.len(), "Building removed");
    true
}
