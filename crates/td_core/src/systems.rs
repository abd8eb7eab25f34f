//! Simulation systems.
//!
//! Systems are plain functions over unit state. They read the pathfinder but
//! never recalculate it.

use crate::grid::Grid;
use crate::movement::MovementProfile;
use crate::pathfinding::Pathfinder;
use crate::pose::Pose;
use crate::simulation::{LeakPolicy, Unit};

/// How a unit ended its tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteerStatus {
    /// Still on its way (or idle with no time left).
    Moving,
    /// Reached a target under [`LeakPolicy::Remove`]; the caller despawns it.
    Removed,
    /// No route from its cell, or no progress possible. Holds position for
    /// the rest of the tick.
    Stalled,
}

/// Per-unit result of [`steering_system`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SteerReport {
    /// Waypoints reached this tick.
    pub hops: u32,
    /// Targets reached this tick.
    pub leaks: u32,
    /// Final state.
    pub status: SteerStatus,
}

impl SteerReport {
    const fn new() -> Self {
        Self {
            hops: 0,
            leaks: 0,
            status: SteerStatus::Moving,
        }
    }

    const fn finish(mut self, status: SteerStatus) -> Self {
        self.status = status;
        self
    }
}

/// Ask the pathfinder for the unit's next waypoint.
fn refresh_waypoint(unit: &mut Unit, profile: &MovementProfile, pathfinder: &Pathfinder) -> bool {
    unit.waypoint = pathfinder
        .next_target(&unit.pose, profile.class())
        .map(|record| record.next_hop);
    unit.waypoint.is_some()
}

/// Spawn a leaked unit again at the first spawn.
fn return_to_spawn(unit: &mut Unit, grid: &Grid) {
    if let Some(&spawn) = grid.spawns().first() {
        unit.pose
            .teleport(Pose::at_cell_center(spawn, unit.pose.facing()));
    }
}

/// Steers one unit along the flow field for `duration` milliseconds.
///
/// The unit moves toward its waypoint (the centre of the next-hop cell).
/// Whenever it arrives with budget left it either leaks (waypoint is a
/// target) or fetches the next hop, so a fast unit can cross several cells
/// in one call. A unit the pathfinder has no route for keeps its pose.
///
/// # Arguments
/// * `unit` - Unit to move; its pose and waypoint are updated in place
/// * `profile` - Movement constants of the unit's kind
/// * `pathfinder` - Current flow fields
/// * `leak_policy` - What happens when a target is reached
/// * `duration` - Time budget in milliseconds
pub fn steering_system(
    unit: &mut Unit,
    profile: &MovementProfile,
    pathfinder: &Pathfinder,
    leak_policy: LeakPolicy,
    duration: f64,
) -> SteerReport {
    let grid = pathfinder.grid();
    let mut report = SteerReport::new();

    if unit.waypoint.is_none() && !refresh_waypoint(unit, profile, pathfinder) {
        tracing::warn!(unit = unit.id, cell = %unit.pose.cell(), "No route for unit");
        return report.finish(SteerStatus::Stalled);
    }

    let mut budget = duration;
    while budget > 0.0 {
        let Some(waypoint) = unit.waypoint else {
            break;
        };
        let goal = Pose::at_cell_center(waypoint, unit.pose.facing());
        let outcome = unit.pose.advance(&goal, profile, budget);
        let spent = budget - outcome.remaining;
        unit.pose = outcome.pose;
        budget = outcome.remaining;

        if !unit.pose.same_location(&goal) {
            if budget > 0.0 {
                tracing::warn!(unit = unit.id, waypoint = %waypoint, "Unit cannot reach waypoint");
                return report.finish(SteerStatus::Stalled);
            }
            break;
        }

        report.hops += 1;
        tracing::trace!(unit = unit.id, waypoint = %waypoint, budget, "Waypoint reached");

        let leaked = grid.is_target(waypoint);
        if leaked {
            report.leaks += 1;
            match leak_policy {
                LeakPolicy::Remove => {
                    unit.waypoint = None;
                    return report.finish(SteerStatus::Removed);
                }
                LeakPolicy::ReturnToSpawn => return_to_spawn(unit, grid),
            }
        }

        if !refresh_waypoint(unit, profile, pathfinder) {
            tracing::warn!(unit = unit.id, cell = %unit.pose.cell(), "No route for unit");
            return report.finish(SteerStatus::Stalled);
        }

        // Only a target points at itself, and a spawn that is also a target
        // sends a leaked unit straight back onto it.
        if spent <= 0.0 && unit.waypoint == Some(waypoint) && unit.pose.cell() == waypoint {
            tracing::warn!(unit = unit.id, waypoint = %waypoint, "Unit made no progress");
            return report.finish(SteerStatus::Stalled);
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{CellCoord, TileFlags, TileLegend};
    use crate::movement::MovementClass;
    use crate::pathfinding::NoBuildings;
    use crate::unit_kind::UnitKindId;

    fn corridor() -> Pathfinder {
        let grid = Grid::from_template(&["SgggT"], &TileLegend::default()).unwrap();
        let mut pathfinder = Pathfinder::new(grid);
        pathfinder.recalculate_all(&NoBuildings);
        pathfinder.commit_all();
        pathfinder
    }

    fn unit_at(cell: CellCoord) -> Unit {
        Unit::new(1, UnitKindId::new(0), Pose::at_cell_center(cell, 0.0))
    }

    fn walker(tiles_per_second: f64) -> MovementProfile {
        MovementProfile::from_authoring(MovementClass::Ground, tiles_per_second, 3600.0, 360.0)
    }

    #[test]
    fn test_crosses_several_cells_in_one_tick() {
        let pathfinder = corridor();
        let mut unit = unit_at(CellCoord::new(0, 0));

        // 2 tiles/s for 1.25 s: two full hops then a quarter of the third
        let report = steering_system(&mut unit, &walker(2.0), &pathfinder, LeakPolicy::Remove, 1250.0);

        assert_eq!(report.hops, 2);
        assert_eq!(report.status, SteerStatus::Moving);
        assert!((unit.pose.x() - 3.0).abs() < 0.02);
        assert_eq!(unit.waypoint, Some(CellCoord::new(3, 0)));
    }

    #[test]
    fn test_leak_returns_to_spawn() {
        let pathfinder = corridor();
        let mut unit = unit_at(CellCoord::new(3, 0));

        // One hop reaches the target with 100 ms left, spent walking from the spawn
        let report = steering_system(&mut unit, &walker(2.0), &pathfinder, LeakPolicy::ReturnToSpawn, 600.0);

        assert_eq!(report.leaks, 1);
        assert_eq!(report.status, SteerStatus::Moving);
        assert!((unit.pose.x() - 0.7).abs() < 0.02);
        assert_eq!(unit.waypoint, Some(CellCoord::new(1, 0)));
    }

    #[test]
    fn test_leak_with_remove_policy() {
        let pathfinder = corridor();
        let mut unit = unit_at(CellCoord::new(3, 0));

        let report = steering_system(&mut unit, &walker(2.0), &pathfinder, LeakPolicy::Remove, 600.0);

        assert_eq!(report.status, SteerStatus::Removed);
        assert_eq!(report.leaks, 1);
    }

    #[test]
    fn test_no_route_stalls_in_place() {
        let pathfinder = corridor();
        let mut unit = Unit::new(1, UnitKindId::new(0), Pose::new(-4.5, 0.5, 0.0));
        let before = unit.pose;

        let report = steering_system(&mut unit, &walker(2.0), &pathfinder, LeakPolicy::Remove, 100.0);

        assert_eq!(report.status, SteerStatus::Stalled);
        assert_eq!(unit.pose, before);
    }

    #[test]
    fn test_waypoint_persists_between_ticks() {
        let pathfinder = corridor();
        let mut unit = unit_at(CellCoord::new(0, 0));

        steering_system(&mut unit, &walker(2.0), &pathfinder, LeakPolicy::Remove, 100.0);
        assert_eq!(unit.waypoint, Some(CellCoord::new(1, 0)));
        assert!((unit.pose.x() - 0.7).abs() < 0.02);

        steering_system(&mut unit, &walker(2.0), &pathfinder, LeakPolicy::Remove, 400.0);
        assert_eq!(unit.waypoint, Some(CellCoord::new(2, 0)));
        assert!((unit.pose.x() - 1.5).abs() < 0.02);
    }

    fn spawn_on_target() -> Pathfinder {
        let spawn = CellCoord::new(0, 0);
        let grid = Grid::new(
            2,
            1,
            vec![TileFlags::ALL; 2],
            vec![spawn],
            vec![spawn, CellCoord::new(1, 0)],
        )
        .unwrap();
        let mut pathfinder = Pathfinder::new(grid);
        pathfinder.recalculate_all(&NoBuildings);
        pathfinder.commit_all();
        pathfinder
    }

    #[test]
    fn test_spawn_that_is_a_target_stalls_after_one_leak() {
        let pathfinder = spawn_on_target();
        let mut unit = unit_at(CellCoord::new(0, 0));

        let report = steering_system(&mut unit, &walker(2.0), &pathfinder, LeakPolicy::ReturnToSpawn, 16.0);

        assert_eq!(report.leaks, 1);
        assert_eq!(report.status, SteerStatus::Stalled);
        assert_eq!(unit.pose.cell(), CellCoord::new(0, 0));
    }

    #[test]
    fn test_returned_unit_walks_again_from_a_standing_leak() {
        // spawn (0,0) feeds straight into target (1,0)
        let grid = Grid::from_template(&["ST"], &TileLegend::default()).unwrap();
        let mut pathfinder = Pathfinder::new(grid);
        pathfinder.recalculate_all(&NoBuildings);
        pathfinder.commit_all();
        let mut unit = unit_at(CellCoord::new(1, 0));

        let report = steering_system(&mut unit, &walker(2.0), &pathfinder, LeakPolicy::ReturnToSpawn, 100.0);

        assert_eq!(report.leaks, 1);
        assert_eq!(report.status, SteerStatus::Moving);
        assert_eq!(unit.waypoint, Some(CellCoord::new(1, 0)));
        assert!((unit.pose.x() - 0.7).abs() < 0.02);
    }
}
