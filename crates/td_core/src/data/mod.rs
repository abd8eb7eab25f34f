//! Data structures for maps and unit rosters.
//!
//! Everything here deserializes from RON. Parsing from strings is provided;
//! reading files is left to callers (see `td_headless`).

mod map_data;
mod unit_data;

pub use map_data::{builtin_map, MapData, BUILTIN_MAP_NAMES};
pub use unit_data::{default_roster, MovementData, UnitData};

use serde::de::DeserializeOwned;

use crate::error::{GameError, Result};

/// Deserialize a RON document, tagging errors with `source_name`.
///
/// # Errors
///
/// Returns [`GameError::DataParseError`] if the text is not valid RON for `T`.
pub fn from_ron_str<T: DeserializeOwned>(source_name: &str, text: &str) -> Result<T> {
    ron::from_str(text).map_err(|e| GameError::DataParseError {
        source_name: source_name.to_string(),
        message: e.to_string(),
    })
}
