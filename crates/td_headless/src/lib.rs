//! Headless runner for the tower-defense core.
//!
//! Runs scenarios without graphics, for CI verification and for external
//! controllers:
//!
//! - **Scenario runs**: play a RON scenario to the end and report as JSON
//! - **Path overlays**: render each movement class's flow field as ASCII
//! - **Determinism checks**: run a scenario repeatedly and compare hashes
//! - **Interactive control**: JSON commands on stdin, responses on stdout
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from controller (tick, spawn, place, etc.)
//! - **stdout**: Responses (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! See [`protocol`] module for the full command/response specification.
//!
//! # Example
//!
//! ```bash
//! # Run a built-in scenario
//! cargo run -p td_headless -- run --scenario classic
//!
//! # Show the ground flow field
//! cargo run -p td_headless -- paths --scenario classic --class ground
//!
//! # Drive a session by hand
//! echo '{"cmd":"tick","count":60}' | cargo run -p td_headless -- serve
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ascii_visualizer;
pub mod protocol;
pub mod runner;
pub mod scenario;
pub mod session;

pub use ascii_visualizer::{render_all, render_paths, AsciiConfig};
pub use protocol::{Command, Response};
pub use runner::{run_scenario, verify_scenario, RunReport, ScenarioRunner, VerifyReport};
pub use scenario::{MapSource, Scenario, ScenarioError, SpawnEvent};
pub use session::Session;
