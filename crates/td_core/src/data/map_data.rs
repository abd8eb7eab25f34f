//! Map definitions: ASCII templates plus legend overrides.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grid::{Grid, TileKind, TileLegend};

/// Names accepted by [`builtin_map`].
pub const BUILTIN_MAP_NAMES: [&str; 2] = ["classic", "test"];

/// A map as written in data files.
///
/// # Example RON
///
/// ```ron
/// MapData(
///     name: "corridor",
///     rows: ["SgggT"],
///     legend: {'d': Grass},
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapData {
    /// Map name.
    pub name: String,
    /// Template rows, top to bottom.
    pub rows: Vec<String>,
    /// Extra symbols on top of the default `A`/`S`/`T`/`g` legend.
    #[serde(default = "TileLegend::empty")]
    pub legend: TileLegend,
}

impl MapData {
    /// Build the grid described by this map.
    ///
    /// # Errors
    ///
    /// See [`Grid::from_template`].
    pub fn to_grid(&self) -> Result<Grid> {
        let mut legend = TileLegend::default();
        legend.extend(&self.legend);
        Grid::from_template(&self.rows, &legend)
    }
}

fn rows(template: &[&str]) -> Vec<String> {
    template.iter().map(|row| (*row).to_string()).collect()
}

/// Look up a map shipped with the crate.
///
/// `classic` is a walled arena with one spawn on the left edge and one target
/// on the right; `test` is a small open 5x5 map.
#[must_use]
pub fn builtin_map(name: &str) -> Option<MapData> {
    match name {
        "classic" => Some(MapData {
            name: "classic".into(),
            rows: rows(&[
                "AttttttttttttttttwA",
                "AtgggggggggggggggwA",
                "AtgggggggggggggggwA",
                "AtgggggggggggggggwA",
                "AtgggggggggggggggwA",
                "SddgggggggggggggddT",
                "AtgggggggggggggggwA",
                "AtgggggggggggggggwA",
                "AtgggggggggggggggwA",
                "AtgggggggggggggggwA",
                "AtgggggggggggggggwA",
                "ccccccccccccccccccc",
                "ccccccccccccccccccc",
            ]),
            // cliffs, trees, walls and columns are all open sky
            legend: TileLegend::empty()
                .with('c', TileKind::Air)
                .with('t', TileKind::Air)
                .with('w', TileKind::Air)
                .with('C', TileKind::Air)
                .with('d', TileKind::Grass),
        }),
        "test" => Some(MapData {
            name: "test".into(),
            rows: rows(&["AgggA", "gSgTg", "ggggg", "ggAgg", "AgggA"]),
            legend: TileLegend::empty(),
        }),
        _ => None,
    }
}
