//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism this guards against:
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Units are stored in a `BTreeMap` and buildings in a `BTreeSet`.
//!
//! - **Flood-fill tie-breaking**: equal-distance ties depend on FIFO order,
//!   which depends on target declaration order. Same map, same order.
//!
//! - **Floating-point math**: poses are `f64`. Results are bit-identical on
//!   one machine for one build; the hash covers raw bits.

use std::thread;

use td_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```
/// use td_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(3, 10, || 0u64, |n| *n += 2, |n| *n);
/// result.assert_deterministic();
/// assert_eq!(result.hashes, vec![20, 20, 20]);
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a [`Simulation`] twice with fixed-length ticks and compare hashes.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64, dt_ms: f64) -> bool
where
    F: Fn() -> Simulation,
{
    let result = verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| {
            sim.tick(dt_ms);
        },
        Simulation::state_hash,
    );
    result.is_deterministic
}

/// Run N simulations on scoped threads and collect final hashes.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations<F>(
    setup_fn: F,
    num_sims: usize,
    num_ticks: u64,
    dt_ms: f64,
) -> DeterminismResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.tick(dt_ms);
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64, dt_ms: f64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.tick(dt_ms);
        sim2.tick(dt_ms);

        if sim1.state_hash() != sim2.state_hash() {
            tracing::warn!(tick, "Simulations diverged");
            return Some(tick);
        }
    }

    None
}

/// Proptest strategies for grids, layouts and movement.
pub mod strategies {
    use std::f64::consts::TAU;

    use proptest::prelude::*;
    use td_core::grid::CellCoord;
    use td_core::movement::{MovementClass, MovementProfile};
    use td_core::pose::Pose;

    /// Generate a movement class.
    pub fn arb_movement_class() -> impl Strategy<Value = MovementClass> {
        prop_oneof![
            Just(MovementClass::Unconstrained),
            Just(MovementClass::Ground),
            Just(MovementClass::Air),
        ]
    }

    /// Generate a template of `2..=max_width` by `1..=max_height` tiles with
    /// exactly one spawn and one target, and a random mix of grass and air.
    pub fn arb_template(max_width: usize, max_height: usize) -> impl Strategy<Value = Vec<String>> {
        (2..=max_width, 1..=max_height).prop_flat_map(|(width, height)| {
            let cells = width * height;
            (
                proptest::collection::vec(prop_oneof![3 => Just('g'), 1 => Just('A')], cells),
                0..cells,
                0..cells - 1,
            )
                .prop_map(move |(mut tiles, spawn, target)| {
                    // skip over the spawn so the two never coincide
                    let target = if target >= spawn { target + 1 } else { target };
                    tiles[spawn] = 'S';
                    tiles[target] = 'T';
                    tiles
                        .chunks(width)
                        .map(|row| row.iter().collect::<String>())
                        .collect::<Vec<String>>()
                })
        })
    }

    /// Generate up to `max` cells inside a `width` x `height` grid.
    pub fn arb_cells(width: i32, height: i32, max: usize) -> impl Strategy<Value = Vec<CellCoord>> {
        proptest::collection::vec(
            (0..width, 0..height).prop_map(|(x, y)| CellCoord::new(x, y)),
            0..=max,
        )
    }

    /// Generate a pose within a 10x10 area.
    pub fn arb_pose() -> impl Strategy<Value = Pose> {
        (0.0..10.0f64, 0.0..10.0f64, 0.0..TAU).prop_map(|(x, y, facing)| Pose::new(x, y, facing))
    }

    /// Generate a movement profile in authoring ranges.
    ///
    /// Speed 0.5-10 tiles/s, rotation 30-3600 deg/s, free turn 0-360 deg.
    pub fn arb_profile() -> impl Strategy<Value = MovementProfile> {
        (arb_movement_class(), 0.5..10.0f64, 30.0..3600.0f64, 0.0..=360.0f64).prop_map(
            |(class, speed, rotation, angle)| {
                MovementProfile::from_authoring(class, speed, rotation, angle)
            },
        )
    }

    /// Generate a frame duration in milliseconds.
    pub fn arb_duration() -> impl Strategy<Value = f64> {
        0.0..2000.0f64
    }
}

#[cfg(test)]
mod tests {
    use super::strategies::*;
    use super::*;
    use crate::fixtures::{cell, corridor, open_field, simulation};
    use proptest::prelude::*;
    use td_core::grid::{Grid, TileLegend};
    use td_core::simulation::SimulationConfig;

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_detects_non_determinism() {
        use std::sync::atomic::{AtomicU64, Ordering};
        let counter = AtomicU64::new(0);
        let result = verify_determinism(
            2,
            1,
            || counter.fetch_add(1, Ordering::SeqCst),
            |_| {},
            |n| *n,
        );
        assert!(!result.is_deterministic);
        assert_eq!(result.unique_hashes().len(), 2);
    }

    #[test]
    fn test_empty_simulation_determinism() {
        assert!(verify_simulation_determinism(
            || simulation(corridor(6), SimulationConfig::default()),
            50,
            16.0
        ));
    }

    #[test]
    fn test_busy_simulation_determinism() {
        let setup = || {
            let mut sim = simulation(open_field(8, 6), SimulationConfig::default());
            sim.place_building(cell(3, 2)).unwrap();
            sim.place_building(cell(4, 4)).unwrap();
            for key in ["footman", "knight", "wyvern", "footman"] {
                sim.spawn_unit_by_key(key, 0).unwrap();
            }
            sim
        };

        assert!(verify_simulation_determinism(setup, 300, 16.0));
        assert_eq!(find_first_divergence(setup, 100, 33.0), None);
        run_parallel_simulations(setup, 4, 200, 16.0).assert_deterministic();
    }

    proptest! {
        #[test]
        fn prop_generated_templates_parse(rows in arb_template(8, 6)) {
            let grid = Grid::from_template(&rows, &TileLegend::default()).unwrap();
            prop_assert_eq!(grid.spawns().len(), 1);
            prop_assert_eq!(grid.targets().len(), 1);
        }

        #[test]
        fn prop_arb_cells_in_bounds(cells in arb_cells(5, 4, 10)) {
            for c in cells {
                prop_assert!((0..5).contains(&c.x) && (0..4).contains(&c.y));
            }
        }
    }
}
