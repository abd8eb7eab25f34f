//! JSON protocol for headless control.
//!
//! The `serve` subcommand communicates via JSON lines (one JSON object per
//! line):
//!
//! **Input (stdin):** commands from a controller
//! **Output (stdout):** one response per command
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","tick":0,"width":19,"height":13}
//! -> {"cmd":"spawn","kind":"footman"}
//! <- {"type":"spawned","unit_id":1,"kind":"footman"}
//! -> {"cmd":"preview","x":5,"y":5}
//! <- {"type":"placement","x":5,"y":5,"valid":true,"placed":false}
//! -> {"cmd":"tick","count":20}
//! <- {"type":"ticked","tick":20,"leaked":[],"removed":[],"stalled":[]}
//! -> {"cmd":"hash"}
//! <- {"type":"state_hash","tick":20,"hash":1234567890}
//! -> {"cmd":"quit"}
//! <- {"type":"bye"}
//! ```

use serde::{Deserialize, Serialize};

use td_core::buildings::PlacementError;
use td_core::grid::CellCoord;
use td_core::movement::MovementClass;
use td_core::simulation::UnitId;

use crate::runner::UnitReport;

/// Protocol version reported in [`Response::Ready`].
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (controller -> runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance the simulation by `count` ticks (default: 1).
    Tick {
        #[serde(default = "default_tick_count")]
        count: u32,
        /// Tick length override in milliseconds.
        #[serde(default)]
        dt_ms: Option<f64>,
    },

    /// Spawn a unit at a spawn point.
    Spawn {
        kind: String,
        #[serde(default)]
        spawn: usize,
    },

    /// Remove a unit.
    Despawn { unit_id: UnitId },

    /// Place a building.
    Place { x: i32, y: i32 },

    /// Check a placement without changing anything.
    Preview { x: i32, y: i32 },

    /// Remove a building.
    Remove { x: i32, y: i32 },

    /// Query current state without advancing time.
    Query,

    /// Render the flow field of one movement class.
    Paths {
        #[serde(default = "default_paths_class")]
        class: MovementClass,
    },

    /// Report the state hash (for determinism verification).
    Hash,

    /// Quit.
    Quit,
}

fn default_tick_count() -> u32 {
    1
}

fn default_paths_class() -> MovementClass {
    MovementClass::Ground
}

// ============================================================================
// Output Responses (runner -> controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        version: String,
        tick: u64,
        width: u32,
        height: u32,
    },

    /// Acknowledgment of a command with nothing else to report.
    Ack { cmd: String },

    /// Error processing a command.
    Error {
        message: String,
        cmd: Option<String>,
    },

    /// Unit was spawned.
    Spawned { unit_id: UnitId, kind: String },

    /// Result of `place` or `preview`.
    Placement {
        x: i32,
        y: i32,
        valid: bool,
        /// Whether a building now stands on the cell because of this command.
        placed: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<PlacementError>,
    },

    /// Result of `remove`.
    Removed { x: i32, y: i32, removed: bool },

    /// Ticks were simulated.
    Ticked {
        tick: u64,
        leaked: Vec<UnitId>,
        removed: Vec<UnitId>,
        stalled: Vec<UnitId>,
    },

    /// Current simulation state.
    State {
        tick: u64,
        elapsed_ms: f64,
        units: Vec<UnitReport>,
        buildings: Vec<CellCoord>,
        hash: u64,
    },

    /// ASCII flow-field overlay.
    Paths { class: MovementClass, overlay: String },

    /// State hash for determinism verification.
    StateHash { tick: u64, hash: u64 },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(tick: u64, width: u32, height: u32) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            tick,
            width,
            height,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Spawn { .. } => "spawn",
            Self::Despawn { .. } => "despawn",
            Self::Place { .. } => "place",
            Self::Preview { .. } => "preview",
            Self::Remove { .. } => "remove",
            Self::Query => "query",
            Self::Paths { .. } => "paths",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tick_defaults() {
        let cmd = Command::from_json(r#"{"cmd":"tick"}"#).unwrap();
        assert_eq!(cmd, Command::Tick { count: 1, dt_ms: None });

        let cmd = Command::from_json(r#"{"cmd":"tick","count":60,"dt_ms":16.0}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Tick {
                count: 60,
                dt_ms: Some(16.0)
            }
        );
    }

    #[test]
    fn test_parse_placement_commands() {
        assert_eq!(
            Command::from_json(r#"{"cmd":"place","x":3,"y":4}"#).unwrap(),
            Command::Place { x: 3, y: 4 }
        );
        let cmd = Command::from_json(r#"{"cmd":"preview","x":-1,"y":0}"#).unwrap();
        assert_eq!(cmd.name(), "preview");
        assert_eq!(
            Command::from_json(r#"{"cmd":"paths","class":"Air"}"#).unwrap(),
            Command::Paths {
                class: MovementClass::Air
            }
        );
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Command::from_json(r#"{"cmd":"attack","target":3}"#).is_err());
        assert!(Command::from_json("not json").is_err());
    }

    #[test]
    fn test_response_json_lines() {
        let line = Response::Placement {
            x: 2,
            y: 0,
            valid: false,
            placed: false,
            reason: Some(PlacementError::BlocksPath),
        }
        .to_json_line();
        assert!(line.ends_with('\n'));
        assert!(line.contains(r#""type":"placement""#));
        assert!(line.contains(r#""reason":"blocks_path""#));

        let line = Response::ready(0, 5, 5).to_json_line();
        assert!(line.contains(r#""version":"1.0""#));
        assert_eq!(Response::Bye.to_json_line(), "{\"type\":\"bye\"}\n");
    }
}
