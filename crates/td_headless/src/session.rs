//! Interactive JSON-lines session over a live simulation.

use std::io::{BufRead, Write};

use td_core::error::GameError;
use td_core::grid::CellCoord;
use td_core::simulation::{Simulation, TickEvents};

use crate::ascii_visualizer::{render_paths, AsciiConfig};
use crate::protocol::{Command, Response};
use crate::runner::UnitReport;

/// A simulation driven by [`Command`]s.
pub struct Session {
    sim: Simulation,
    tick_ms: f64,
    finished: bool,
}

impl Session {
    /// Wrap a simulation; `tick` commands default to `tick_ms` per tick.
    #[must_use]
    pub fn new(sim: Simulation, tick_ms: f64) -> Self {
        Self {
            sim,
            tick_ms,
            finished: false,
        }
    }

    /// The simulation being driven.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Whether a `quit` command has been handled.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// The greeting sent before any command.
    #[must_use]
    pub fn ready(&self) -> Response {
        let grid = self.sim.grid();
        Response::ready(self.sim.get_tick(), grid.width(), grid.height())
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> Response {
        Response::State {
            tick: self.sim.get_tick(),
            elapsed_ms: self.sim.elapsed_ms(),
            units: UnitReport::collect(&self.sim),
            buildings: self.sim.buildings().iter().collect(),
            hash: self.sim.state_hash(),
        }
    }

    /// Execute one command.
    pub fn handle(&mut self, cmd: Command) -> Response {
        let cmd_name = cmd.name();
        tracing::debug!(cmd = cmd_name, "Handling command");

        match cmd {
            Command::Tick { count, dt_ms } => {
                let dt = dt_ms.unwrap_or(self.tick_ms);
                if !(dt.is_finite() && dt >= 0.0) {
                    return Response::error(format!("Invalid tick length {dt}"), Some(cmd_name));
                }
                let mut all = TickEvents::default();
                for _ in 0..count {
                    let events = self.sim.tick(dt);
                    all.leaked.extend(events.leaked);
                    all.removed.extend(events.removed);
                    all.stalled.extend(events.stalled);
                }
                Response::Ticked {
                    tick: self.sim.get_tick(),
                    leaked: all.leaked,
                    removed: all.removed,
                    stalled: all.stalled,
                }
            }

            Command::Spawn { kind, spawn } => match self.sim.spawn_unit_by_key(&kind, spawn) {
                Ok(unit_id) => Response::Spawned { unit_id, kind },
                Err(e) => Response::error(e.to_string(), Some(cmd_name)),
            },

            Command::Despawn { unit_id } => {
                if self.sim.despawn_unit(unit_id) {
                    Response::ack(cmd_name)
                } else {
                    Response::error(format!("Unit {unit_id} not found"), Some(cmd_name))
                }
            }

            Command::Place { x, y } => {
                let result = self.sim.place_building(CellCoord::new(x, y));
                placement_response(x, y, result, true)
            }

            Command::Preview { x, y } => {
                let result = self.sim.preview_building(CellCoord::new(x, y));
                placement_response(x, y, result, false)
            }

            Command::Remove { x, y } => Response::Removed {
                x,
                y,
                removed: self.sim.remove_building(CellCoord::new(x, y)),
            },

            Command::Query => self.state(),

            Command::Paths { class } => Response::Paths {
                class,
                overlay: render_paths(&self.sim, class, &AsciiConfig::default()),
            },

            Command::Hash => Response::StateHash {
                tick: self.sim.get_tick(),
                hash: self.sim.state_hash(),
            },

            Command::Quit => {
                self.finished = true;
                Response::Bye
            }
        }
    }

    /// Read commands from `input` until `quit` or end of input, writing one
    /// response line per command to `output`.
    pub fn serve<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> std::io::Result<()> {
        output.write_all(self.ready().to_json_line().as_bytes())?;
        output.flush()?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match Command::from_json(line) {
                Ok(cmd) => self.handle(cmd),
                Err(e) => {
                    tracing::warn!(error = %e, "Unparseable command");
                    Response::error(format!("Parse error: {e}"), None)
                }
            };
            output.write_all(response.to_json_line().as_bytes())?;
            output.flush()?;

            if self.finished {
                break;
            }
        }

        tracing::info!(tick = self.sim.get_tick(), "Session ended");
        Ok(())
    }
}

fn placement_response(x: i32, y: i32, result: td_core::error::Result<()>, placing: bool) -> Response {
    match result {
        Ok(()) => Response::Placement {
            x,
            y,
            valid: true,
            placed: placing,
            reason: None,
        },
        Err(GameError::PlacementRejected { reason, .. }) => Response::Placement {
            x,
            y,
            valid: false,
            placed: false,
            reason: Some(reason),
        },
        Err(e) => Response::error(e.to_string(), Some(if placing { "place" } else { "preview" })),
    }
}
