//! Multi-source flood-fill pathfinding with per-class rollback.
//!
//! Every [`MovementClass`] owns a [`FlowField`]: for each reachable cell,
//! the neighbouring cell to step into next and the hop count to the nearest
//! target. Fields are rebuilt with a breadth-first flood fill seeded from all
//! targets at once.
//!
//! Each class keeps a current and a previous generation. A speculative
//! [`Pathfinder::recalculate`] saves the current field before replacing it,
//! and [`Pathfinder::revert`] puts it back. Speculation must always end in a
//! commit or a revert; [`Pathfinder::speculate_all`] returns a guard that
//! reverts on drop unless committed.
//!
//! Two known properties of the fill:
//!
//! - It does not expand past a spawn once the spawn is reached, so cells
//!   lying strictly behind a spawn (seen from the targets) may stay
//!   unreached.
//! - Equal-distance ties go to whichever wavefront settles the cell first in
//!   FIFO order. With several equidistant targets the chosen chain depends on
//!   target declaration order.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::grid::{CellCoord, Grid};
use crate::movement::MovementClass;
use crate::pose::Pose;

/// Building occupancy as seen by the Ground flood fill.
pub trait BuildingOccupancy {
    /// Whether a building currently stands on `cell`.
    fn is_occupied(&self, cell: CellCoord) -> bool;
}

impl<F> BuildingOccupancy for F
where
    F: Fn(CellCoord) -> bool,
{
    fn is_occupied(&self, cell: CellCoord) -> bool {
        self(cell)
    }
}

/// Layout with no buildings at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBuildings;

impl BuildingOccupancy for NoBuildings {
    fn is_occupied(&self, _cell: CellCoord) -> bool {
        false
    }
}

/// Cached routing decision for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathRecord {
    /// Adjacent cell to move into next. Targets point at themselves.
    pub next_hop: CellCoord,
    /// Hops remaining to the nearest target.
    pub distance: u32,
}

/// One flood-fill generation for a single movement class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowField {
    class: MovementClass,
    width: u32,
    height: u32,
    /// Records in row-major order (`y * width + x`).
    records: Vec<Option<PathRecord>>,
}

impl FlowField {
    fn empty(class: MovementClass, grid: &Grid) -> Self {
        Self {
            class,
            width: grid.width(),
            height: grid.height(),
            records: vec![None; grid.cell_count()],
        }
    }

    /// Movement class this field was computed for.
    #[must_use]
    pub const fn class(&self) -> MovementClass {
        self.class
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.x < 0 || cell.y < 0 {
            return None;
        }
        let (x, y) = (cell.x as u32, cell.y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize) * (self.width as usize) + (x as usize))
    }

    /// Record for a cell, `None` when unreached or out of bounds.
    #[must_use]
    pub fn get(&self, cell: CellCoord) -> Option<PathRecord> {
        self.index(cell).and_then(|index| self.records[index])
    }

    /// Iterate over every reached cell and its record, in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, PathRecord)> + '_ {
        let width = self.width as usize;
        self.records.iter().enumerate().filter_map(move |(index, record)| {
            record.map(|r| (CellCoord::new((index % width) as i32, (index / width) as i32), r))
        })
    }

    /// Number of reached cells.
    #[must_use]
    pub fn reached_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_some()).count()
    }
}

/// Summary of one flood fill, for logging and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillStats {
    /// Cells given a record.
    pub settled: usize,
    /// Spawns reached.
    pub spawns_found: usize,
    /// Spawns on the grid.
    pub spawns_total: usize,
}

impl FillStats {
    /// Whether every spawn was reached.
    #[must_use]
    pub const fn all_spawns_found(&self) -> bool {
        self.spawns_found == self.spawns_total
    }
}

/// Whether `class` may enter `cell` under the given occupancy.
fn is_passable<O>(grid: &Grid, buildings: &O, class: MovementClass, cell: CellCoord) -> bool
where
    O: BuildingOccupancy + ?Sized,
{
    if !grid.has_flags(cell, class.required_flags()) {
        return false;
    }
    !(class.blocked_by_buildings() && buildings.is_occupied(cell))
}

/// Run the flood fill for one class without touching any cache.
///
/// # Example
///
/// ```
/// use td_core::grid::{CellCoord, Grid, TileLegend};
/// use td_core::movement::MovementClass;
/// use td_core::pathfinding::{flood_fill, NoBuildings};
///
/// let grid = Grid::from_template(&["SgggT"], &TileLegend::default()).unwrap();
/// let (field, stats) = flood_fill(&grid, &NoBuildings, MovementClass::Ground);
///
/// assert!(stats.all_spawns_found());
/// assert_eq!(field.get(CellCoord::new(0, 0)).unwrap().distance, 4);
/// ```
pub fn flood_fill<O>(grid: &Grid, buildings: &O, class: MovementClass) -> (FlowField, FillStats)
where
    O: BuildingOccupancy + ?Sized,
{
    let mut field = FlowField::empty(class, grid);
    let mut found = vec![false; grid.spawns().len()];
    let mut settled = 0;

    // (cell, reached from, distance)
    let mut queue: VecDeque<(CellCoord, CellCoord, u32)> = grid
        .targets()
        .iter()
        .map(|&target| (target, target, 0))
        .collect();

    while let Some((cell, from, distance)) = queue.pop_front() {
        let Some(index) = grid.index(cell) else {
            continue;
        };

        if field.records[index].is_some_and(|existing| existing.distance <= distance) {
            continue;
        }

        if !is_passable(grid, buildings, class, cell) {
            continue;
        }

        if field.records[index].is_none() {
            settled += 1;
        }
        field.records[index] = Some(PathRecord {
            next_hop: from,
            distance,
        });

        let mut is_spawn = false;
        for (slot, spawn) in found.iter_mut().zip(grid.spawns()) {
            if *spawn == cell {
                *slot = true;
                is_spawn = true;
            }
        }
        if is_spawn {
            continue;
        }

        for neighbor in cell.neighbors() {
            queue.push_back((neighbor, cell, distance + 1));
        }
    }

    let stats = FillStats {
        settled,
        spawns_found: found.iter().filter(|f| **f).count(),
        spawns_total: found.len(),
    };
    (field, stats)
}

/// Current and previous field for one class.
#[derive(Debug, Clone, Default)]
struct Generations {
    current: Option<FlowField>,
    previous: Option<FlowField>,
    /// Set between a recalculation and its commit or revert.
    saved: bool,
}

/// Flow fields for every movement class over one grid.
///
/// # Example
///
/// ```
/// use td_core::grid::{CellCoord, Grid, TileLegend};
/// use td_core::movement::MovementClass;
/// use td_core::pathfinding::Pathfinder;
///
/// let grid = Grid::from_template(&["SgggT"], &TileLegend::default()).unwrap();
/// let mut pathfinder = Pathfinder::new(grid);
///
/// let blocked = |cell: CellCoord| cell == CellCoord::new(2, 0);
/// assert!(!pathfinder.recalculate(MovementClass::Ground, &blocked));
/// assert!(pathfinder.revert(MovementClass::Ground));
/// ```
#[derive(Debug, Clone)]
pub struct Pathfinder {
    grid: Grid,
    generations: [Generations; 3],
}

impl Pathfinder {
    /// Create a pathfinder with no fields computed yet.
    ///
    /// Call [`recalculate_all`](Self::recalculate_all) before querying.
    #[must_use]
    pub fn new(grid: Grid) -> Self {
        Self {
            grid,
            generations: Default::default(),
        }
    }

    /// The grid being navigated.
    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Rebuild the field for `class`, saving the current one for rollback.
    ///
    /// Returns `true` iff every spawn is reachable. The new field is
    /// installed either way; on `false` the caller decides whether to
    /// [`revert`](Self::revert).
    pub fn recalculate<O>(&mut self, class: MovementClass, buildings: &O) -> bool
    where
        O: BuildingOccupancy + ?Sized,
    {
        let (field, stats) = flood_fill(&self.grid, buildings, class);

        tracing::debug!(
            class = %class,
            settled = stats.settled,
            spawns_found = stats.spawns_found,
            spawns_total = stats.spawns_total,
            "Flood fill complete"
        );

        let generations = &mut self.generations[class.index()];
        generations.previous = generations.current.replace(field);
        generations.saved = true;

        stats.all_spawns_found()
    }

    /// Rebuild every class. Returns the logical AND of the results; every
    /// class is rebuilt even after one fails.
    pub fn recalculate_all<O>(&mut self, buildings: &O) -> bool
    where
        O: BuildingOccupancy + ?Sized,
    {
        MovementClass::ALL
            .iter()
            .fold(true, |all, &class| self.recalculate(class, buildings) & all)
    }

    /// Restore the field saved by the last recalculation of `class`.
    ///
    /// Returns `false` (and changes nothing) when there is no saved field,
    /// i.e. the last recalculation was already committed or reverted.
    pub fn revert(&mut self, class: MovementClass) -> bool {
        let generations = &mut self.generations[class.index()];
        if !generations.saved {
            tracing::warn!(class = %class, "Revert requested with no saved generation");
            return false;
        }
        generations.current = generations.previous.take();
        generations.saved = false;
        true
    }

    /// Revert every class. Returns `true` iff every class had a saved field.
    pub fn revert_all(&mut self) -> bool {
        MovementClass::ALL
            .iter()
            .fold(true, |all, &class| self.revert(class) & all)
    }

    /// Keep the current field of `class` and drop the saved one.
    pub fn commit(&mut self, class: MovementClass) {
        let generations = &mut self.generations[class.index()];
        generations.previous = None;
        generations.saved = false;
    }

    /// Commit every class.
    pub fn commit_all(&mut self) {
        for class in MovementClass::ALL {
            self.commit(class);
        }
    }

    /// Rebuild every class behind a guard that reverts on drop.
    ///
    /// # Example
    ///
    /// ```
    /// use td_core::grid::{CellCoord, Grid, TileLegend};
    /// use td_core::pathfinding::{NoBuildings, Pathfinder};
    ///
    /// let grid = Grid::from_template(&["SgggT"], &TileLegend::default()).unwrap();
    /// let mut pathfinder = Pathfinder::new(grid);
    /// pathfinder.recalculate_all(&NoBuildings);
    /// pathfinder.commit_all();
    ///
    /// let wall = |cell: CellCoord| cell.x == 2;
    /// let speculation = pathfinder.speculate_all(&wall);
    /// assert!(!speculation.is_connected());
    /// drop(speculation); // reverted
    /// ```
    pub fn speculate_all<O>(&mut self, buildings: &O) -> Speculation<'_>
    where
        O: BuildingOccupancy + ?Sized,
    {
        let connected = self.recalculate_all(buildings);
        Speculation {
            pathfinder: self,
            connected,
            resolved: false,
        }
    }

    /// Current field for `class`, if computed.
    #[must_use]
    pub fn field(&self, class: MovementClass) -> Option<&FlowField> {
        self.generations[class.index()].current.as_ref()
    }

    /// Whether `class` has an uncommitted, unreverted recalculation.
    #[must_use]
    pub fn has_pending(&self, class: MovementClass) -> bool {
        self.generations[class.index()].saved
    }

    /// Record for `cell` in the current field of `class` only.
    #[must_use]
    pub fn record(&self, cell: CellCoord, class: MovementClass) -> Option<PathRecord> {
        self.field(class).and_then(|field| field.get(cell))
    }

    /// Next hop for a unit standing at `pose`.
    ///
    /// Looks up the pose's cell in the field of `class`, falling back to the
    /// Unconstrained field so stranded units still get a direction. `None`
    /// means the unit has no route at all.
    #[must_use]
    pub fn next_target(&self, pose: &Pose, class: MovementClass) -> Option<PathRecord> {
        let cell = pose.cell();
        self.record(cell, class)
            .or_else(|| self.record(cell, MovementClass::Unconstrained))
    }

    /// Follow next hops from `start` to a target in the field of `class`.
    ///
    /// The returned path starts at `start` and ends at a target. `None` if
    /// `start` is unreached.
    #[must_use]
    pub fn path_from(&self, start: CellCoord, class: MovementClass) -> Option<Vec<CellCoord>> {
        let field = self.field(class)?;
        let mut record = field.get(start)?;
        let mut path = Vec::with_capacity(record.distance as usize + 1);
        path.push(start);

        let mut cell = start;
        while record.distance > 0 {
            if path.len() > self.grid.cell_count() {
                tracing::error!(class = %class, start = %start, "Next-hop chain does not terminate");
                return None;
            }
            cell = record.next_hop;
            record = field.get(cell)?;
            path.push(cell);
        }
        debug_assert!(self.grid.is_target(cell));
        Some(path)
    }
}

/// Guard over a speculative [`Pathfinder::recalculate_all`].
///
/// Dropping the guard without calling [`commit`](Self::commit) reverts
/// every class.
#[must_use = "dropping a speculation reverts it"]
pub struct Speculation<'a> {
    pathfinder: &'a mut Pathfinder,
    connected: bool,
    resolved: bool,
}

impl Speculation<'_> {
    /// Whether every class reached every spawn.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    /// Read access to the speculative fields.
    #[must_use]
    pub fn pathfinder(&self) -> &Pathfinder {
        self.pathfinder
    }

    /// Keep the speculative fields.
    pub fn commit(mut self) {
        self.pathfinder.commit_all();
        self.resolved = true;
    }

    /// Discard the speculative fields.
    pub fn revert(mut self) {
        self.pathfinder.revert_all();
        self.resolved = true;
    }
}

impl Drop for Speculation<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            self.pathfinder.revert_all();
        }
    }
}
