//! Static tile grid with per-cell capability flags.
//!
//! The grid never changes after construction. Buildings are tracked by
//! [`BuildingLayout`](crate::buildings::BuildingLayout) and consulted by the
//! pathfinder; they are not written into the grid.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Integer cell coordinates.
///
/// Signed so that neighbours of edge cells can be represented and then
/// rejected by [`Grid::in_bounds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct CellCoord {
    /// Column index.
    pub x: i32,
    /// Row index.
    pub y: i32,
}

impl CellCoord {
    /// Create a new cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The four axis-aligned neighbours, in the order north, south, west, east.
    #[must_use]
    pub const fn neighbors(self) -> [Self; 4] {
        [
            Self::new(self.x, self.y - 1),
            Self::new(self.x, self.y + 1),
            Self::new(self.x - 1, self.y),
            Self::new(self.x + 1, self.y),
        ]
    }

    /// Manhattan distance to another cell.
    #[must_use]
    pub const fn manhattan_distance(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Continuous coordinates of the cell centre.
    #[must_use]
    pub fn center(self) -> (f64, f64) {
        (f64::from(self.x) + 0.5, f64::from(self.y) + 0.5)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for CellCoord {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// Bit flags describing what may happen on a tile.
///
/// # Example
///
/// ```
/// use td_core::grid::TileFlags;
///
/// let flags = TileFlags::WALKABLE.union(TileFlags::FLYABLE);
/// assert!(flags.contains(TileFlags::WALKABLE));
/// assert!(!flags.contains(TileFlags::BUILDABLE));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TileFlags(u8);

impl TileFlags {
    /// Ground units may walk here.
    pub const WALKABLE: Self = Self(1 << 0);
    /// Air units may fly here.
    pub const FLYABLE: Self = Self(1 << 1);
    /// Buildings may be placed here.
    pub const BUILDABLE: Self = Self(1 << 2);

    /// Every capability.
    pub const ALL: Self = Self(0b111);

    /// No flags set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Check if all flags in `other` are set in `self`.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Combine two flag sets.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Kinds of tile a map template can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// Open sky: flyable only.
    Air,
    /// Unit entry point.
    Spawn,
    /// Exit units try to reach.
    Target,
    /// Open ground: walkable, flyable and buildable.
    Grass,
}

impl TileKind {
    /// Capabilities of this tile kind.
    #[must_use]
    pub const fn flags(self) -> TileFlags {
        match self {
            Self::Air => TileFlags::FLYABLE,
            Self::Spawn | Self::Target => TileFlags::WALKABLE.union(TileFlags::FLYABLE),
            Self::Grass => TileFlags::ALL,
        }
    }
}

/// Character-to-tile mapping used when parsing map templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileLegend(HashMap<char, TileKind>);

impl TileLegend {
    /// Legend with no entries.
    #[must_use]
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Add or replace a mapping.
    #[must_use]
    pub fn with(mut self, symbol: char, kind: TileKind) -> Self {
        self.0.insert(symbol, kind);
        self
    }

    /// Extend this legend with another, the other's entries winning.
    pub fn extend(&mut self, other: &Self) {
        self.0.extend(other.0.iter().map(|(&c, &k)| (c, k)));
    }

    /// Look up a symbol.
    #[must_use]
    pub fn get(&self, symbol: char) -> Option<TileKind> {
        self.0.get(&symbol).copied()
    }
}

impl Default for TileLegend {
    /// `A` air, `S` spawn, `T` target, `g` grass.
    fn default() -> Self {
        Self::empty()
            .with('A', TileKind::Air)
            .with('S', TileKind::Spawn)
            .with('T', TileKind::Target)
            .with('g', TileKind::Grass)
    }
}

/// Immutable tile grid with spawn and target lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: u32,
    height: u32,
    /// Cell flags stored in row-major order.
    cells: Vec<TileFlags>,
    spawns: Vec<CellCoord>,
    targets: Vec<CellCoord>,
}

impl Grid {
    /// Build a grid from raw flags and explicit spawn/target lists.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidGrid`] if a dimension is zero, the cell
    /// count does not match, there is no spawn or no target, or a spawn or
    /// target lies outside the grid.
    pub fn new(
        width: u32,
        height: u32,
        cells: Vec<TileFlags>,
        spawns: Vec<CellCoord>,
        targets: Vec<CellCoord>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(GameError::InvalidGrid(format!(
                "dimensions must be positive, got {width}x{height}"
            )));
        }
        if width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(GameError::InvalidGrid(format!(
                "dimensions {width}x{height} exceed coordinate range"
            )));
        }
        let expected = (width as usize) * (height as usize);
        if cells.len() != expected {
            return Err(GameError::InvalidGrid(format!(
                "expected {expected} cells, got {}",
                cells.len()
            )));
        }
        if spawns.is_empty() {
            return Err(GameError::InvalidGrid("missing a spawn".into()));
        }
        if targets.is_empty() {
            return Err(GameError::InvalidGrid("missing a target".into()));
        }

        let grid = Self {
            width,
            height,
            cells,
            spawns,
            targets,
        };

        if let Some(cell) = grid
            .spawns
            .iter()
            .chain(&grid.targets)
            .find(|cell| !grid.in_bounds(**cell))
        {
            return Err(GameError::InvalidGrid(format!(
                "spawn or target {cell} outside {}x{} grid",
                grid.width, grid.height
            )));
        }

        Ok(grid)
    }

    /// Parse a grid from template rows.
    ///
    /// Whitespace is ignored and blank rows are skipped. Spawns and targets
    /// are collected in row-major order from `Spawn`/`Target` tiles.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidTemplate`] for unknown symbols or ragged
    /// rows, and [`GameError::InvalidGrid`] when the map lacks a spawn or a
    /// target.
    ///
    /// # Example
    ///
    /// ```
    /// use td_core::grid::{CellCoord, Grid, TileLegend};
    ///
    /// let grid = Grid::from_template(&["Sgg", "AAT"], &TileLegend::default()).unwrap();
    /// assert_eq!(grid.width(), 3);
    /// assert_eq!(grid.spawns(), &[CellCoord::new(0, 0)]);
    /// assert_eq!(grid.targets(), &[CellCoord::new(2, 1)]);
    /// ```
    pub fn from_template<S: AsRef<str>>(rows: &[S], legend: &TileLegend) -> Result<Self> {
        let rows: Vec<Vec<char>> = rows
            .iter()
            .map(|row| {
                row.as_ref()
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect::<Vec<_>>()
            })
            .filter(|row| !row.is_empty())
            .collect();

        let width = rows.first().map_or(0, Vec::len);
        let mut cells = Vec::with_capacity(width * rows.len());
        let mut spawns = Vec::new();
        let mut targets = Vec::new();

        for (y, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(GameError::InvalidTemplate {
                    row: y,
                    column: row.len().min(width),
                    message: format!("row has {} tiles, expected {width}", row.len()),
                });
            }
            for (x, &symbol) in row.iter().enumerate() {
                let kind = legend.get(symbol).ok_or_else(|| GameError::InvalidTemplate {
                    row: y,
                    column: x,
                    message: format!("unknown tile symbol '{symbol}'"),
                })?;
                let cell = CellCoord::new(x as i32, y as i32);
                match kind {
                    TileKind::Spawn => spawns.push(cell),
                    TileKind::Target => targets.push(cell),
                    TileKind::Air | TileKind::Grass => {}
                }
                cells.push(kind.flags());
            }
        }

        Self::new(width as u32, rows.len() as u32, cells, spawns, targets)
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Spawn cells, in declaration order.
    #[must_use]
    pub fn spawns(&self) -> &[CellCoord] {
        &self.spawns
    }

    /// Target cells, in declaration order.
    #[must_use]
    pub fn targets(&self) -> &[CellCoord] {
        &self.targets
    }

    /// Check if a cell lies within the grid.
    #[must_use]
    pub fn in_bounds(&self, cell: CellCoord) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as u32) < self.width && (cell.y as u32) < self.height
    }

    /// Row-major index (`y * width + x`) of an in-bounds cell.
    #[inline]
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if self.in_bounds(cell) {
            Some((cell.y as usize) * (self.width as usize) + (cell.x as usize))
        } else {
            None
        }
    }

    /// Flags at a cell, `None` when out of bounds.
    #[must_use]
    pub fn cell_flags(&self, cell: CellCoord) -> Option<TileFlags> {
        self.index(cell).map(|index| self.cells[index])
    }

    /// Check whether a cell has every flag in `flags`.
    #[must_use]
    pub fn has_flags(&self, cell: CellCoord, flags: TileFlags) -> bool {
        self.cell_flags(cell).is_some_and(|f| f.contains(flags))
    }

    /// Whether the cell is one of the spawns.
    #[must_use]
    pub fn is_spawn(&self, cell: CellCoord) -> bool {
        self.spawns.contains(&cell)
    }

    /// Whether the cell is one of the targets.
    #[must_use]
    pub fn is_target(&self, cell: CellCoord) -> bool {
        self.targets.contains(&cell)
    }
}
