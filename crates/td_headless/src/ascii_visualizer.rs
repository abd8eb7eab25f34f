//! ASCII path overlay.
//!
//! Renders one movement class's flow field as a character grid: each cell
//! shows the direction of its next hop, so a route can be followed by eye.
//!
//! ```text
//! ground  settled 10/15
//!  > > > > v
//!  ^ # # # v
//!  S . # > T
//! ```

use std::fmt::Write as _;

use td_core::grid::CellCoord;
use td_core::movement::MovementClass;
use td_core::simulation::Simulation;

/// ASCII visualization configuration.
#[derive(Debug, Clone)]
pub struct AsciiConfig {
    /// Mark cells holding at least one unit with `o`.
    pub show_units: bool,
    /// Print a legend below the grid.
    pub show_legend: bool,
    /// Use colored output (ANSI).
    pub use_color: bool,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            show_units: true,
            show_legend: false,
            use_color: false,
        }
    }
}

/// ANSI color codes.
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";

    pub const CYAN: &str = "\x1b[36m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const GREEN: &str = "\x1b[32m";
    pub const MAGENTA: &str = "\x1b[35m";
    pub const GRAY: &str = "\x1b[90m";
}

/// Arrow from `from` toward an adjacent `to`.
fn arrow(from: CellCoord, to: CellCoord) -> char {
    match (to.x - from.x, to.y - from.y) {
        (0, -1) => '^',
        (0, 1) => 'v',
        (-1, 0) => '<',
        (1, 0) => '>',
        _ => '?',
    }
}

/// Character and color for one cell.
fn cell_glyph(
    sim: &Simulation,
    class: MovementClass,
    cell: CellCoord,
    occupied: bool,
) -> (char, &'static str) {
    let grid = sim.grid();
    if occupied {
        return ('o', colors::MAGENTA);
    }
    if grid.is_spawn(cell) {
        return ('S', colors::CYAN);
    }
    if grid.is_target(cell) {
        return ('T', colors::GREEN);
    }
    if sim.buildings().contains(cell) {
        return ('#', colors::YELLOW);
    }
    match sim.pathfinder().record(cell, class) {
        Some(record) => (arrow(cell, record.next_hop), ""),
        None => ('.', colors::GRAY),
    }
}

/// Render the flow field of `class`.
///
/// `S` spawn, `T` target, `#` building, `.` no route, `o` unit, arrows point
/// at the next hop.
#[must_use]
pub fn render_paths(sim: &Simulation, class: MovementClass, config: &AsciiConfig) -> String {
    let grid = sim.grid();
    let mut output = String::new();

    let settled = sim
        .pathfinder()
        .field(class)
        .map_or(0, |field| field.reached_count());
    let _ = writeln!(output, "{class}  settled {settled}/{}", grid.cell_count());

    let occupied: Vec<CellCoord> = if config.show_units {
        sim.units().map(|unit| unit.pose.cell()).collect()
    } else {
        Vec::new()
    };

    for y in 0..grid.height() as i32 {
        for x in 0..grid.width() as i32 {
            let cell = CellCoord::new(x, y);
            let (ch, color) = cell_glyph(sim, class, cell, occupied.contains(&cell));
            output.push(' ');
            if config.use_color && !color.is_empty() {
                let _ = write!(output, "{}{color}{ch}{}", colors::BOLD, colors::RESET);
            } else {
                output.push(ch);
            }
        }
        output.push('\n');
    }

    if config.show_legend {
        output.push_str("S spawn  T target  # building  . no route  o unit  ^v<> next hop\n");
    }

    output
}

/// Render every movement class, one block after another.
#[must_use]
pub fn render_all(sim: &Simulation, config: &AsciiConfig) -> String {
    MovementClass::ALL
        .iter()
        .map(|&class| render_paths(sim, class, config))
        .collect::<Vec<_>>()
        .join("\n")
}
