//! Error types for the navigation core.

use thiserror::Error;

use crate::buildings::PlacementError;
use crate::grid::CellCoord;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all core errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GameError {
    /// Grid dimensions or cell data are inconsistent.
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    /// A map template could not be turned into a grid.
    #[error("Invalid map template at row {row}, column {column}: {message}")]
    InvalidTemplate {
        /// Zero-based row of the offending character.
        row: usize,
        /// Zero-based column of the offending character.
        column: usize,
        /// Error message.
        message: String,
    },

    /// A unit definition failed validation.
    #[error("Invalid unit data for '{id}': {message}")]
    InvalidUnitData {
        /// String identifier of the unit definition.
        id: String,
        /// Error message.
        message: String,
    },

    /// Unknown unit kind identifier.
    #[error("Unknown unit kind: {0}")]
    UnknownUnitKind(String),

    /// Spawn index outside the grid's spawn list.
    #[error("Spawn index {index} out of range ({available} spawns)")]
    InvalidSpawn {
        /// Requested spawn index.
        index: usize,
        /// Number of spawns on the grid.
        available: usize,
    },

    /// Building placement was rejected.
    #[error("Placement at {cell} rejected: {reason}")]
    PlacementRejected {
        /// Cell the building was requested at.
        cell: CellCoord,
        /// Specific reason for the rejection.
        reason: PlacementError,
    },

    /// The initial layout leaves at least one spawn without a route.
    #[error("Layout leaves spawns unreachable for {0}")]
    Unreachable(String),

    /// Data file parsing error.
    #[error("Failed to parse data '{source_name}': {message}")]
    DataParseError {
        /// Name of the data source that failed to parse.
        source_name: String,
        /// Error message.
        message: String,
    },
}
