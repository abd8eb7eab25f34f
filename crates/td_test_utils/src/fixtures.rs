//! Test fixtures and helpers.
//!
//! Pre-built grids, movement profiles and simulations for consistent
//! testing. Everything here panics on bad input.

use td_core::data::default_roster;
use td_core::grid::{CellCoord, Grid, TileLegend};
use td_core::movement::{MovementClass, MovementProfile};
use td_core::pathfinding::{NoBuildings, Pathfinder};
use td_core::simulation::{Simulation, SimulationConfig};
use td_core::unit_kind::UnitKindRegistry;

/// Parse a grid with the default legend.
///
/// # Panics
///
/// Panics if the template is invalid.
#[must_use]
pub fn grid(rows: &[&str]) -> Grid {
    Grid::from_template(rows, &TileLegend::default()).expect("fixture template is valid")
}

/// One-row corridor `S g … g T` of `length` cells.
///
/// # Panics
///
/// Panics if `length < 2`.
#[must_use]
pub fn corridor(length: usize) -> Grid {
    assert!(length >= 2, "a corridor needs room for a spawn and a target");
    let row = format!("S{}T", "g".repeat(length - 2));
    grid(&[row.as_str()])
}

/// All-grass grid with a spawn at the top-left and a target at the
/// bottom-right corner.
///
/// # Panics
///
/// Panics if the grid would be a single cell.
#[must_use]
pub fn open_field(width: usize, height: usize) -> Grid {
    assert!(width * height >= 2, "an open field needs at least two cells");
    let rows: Vec<String> = (0..height)
        .map(|y| {
            (0..width)
                .map(|x| match (x, y) {
                    (0, 0) => 'S',
                    _ if x == width - 1 && y == height - 1 => 'T',
                    _ => 'g',
                })
                .collect()
        })
        .collect();
    Grid::from_template(&rows, &TileLegend::default()).expect("open field is valid")
}

/// Pathfinder with every class calculated and committed, no buildings.
#[must_use]
pub fn settled_pathfinder(grid: Grid) -> Pathfinder {
    let mut pathfinder = Pathfinder::new(grid);
    pathfinder.recalculate_all(&NoBuildings);
    pathfinder.commit_all();
    pathfinder
}

/// Ground profile turning 3600°/s with no pre-turn.
#[must_use]
pub fn walker(tiles_per_second: f64) -> MovementProfile {
    MovementProfile::from_authoring(MovementClass::Ground, tiles_per_second, 3600.0, 360.0)
}

/// Air profile that must pre-turn beyond 45°.
#[must_use]
pub fn flyer(tiles_per_second: f64) -> MovementProfile {
    MovementProfile::from_authoring(MovementClass::Air, tiles_per_second, 180.0, 45.0)
}

/// Registry built from the default roster.
///
/// # Panics
///
/// Panics if the default roster is invalid.
#[must_use]
pub fn default_registry() -> UnitKindRegistry {
    UnitKindRegistry::from_data(&default_roster()).expect("default roster is valid")
}

/// Simulation on `grid` with the default roster.
///
/// # Panics
///
/// Panics if a spawn is unreachable.
#[must_use]
pub fn simulation(grid: Grid, config: SimulationConfig) -> Simulation {
    Simulation::new(grid, default_registry(), config).expect("fixture grid is connected")
}

/// Shorthand for [`CellCoord::new`].
#[must_use]
pub const fn cell(x: i32, y: i32) -> CellCoord {
    CellCoord::new(x, y)
}
