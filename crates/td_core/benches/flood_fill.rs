//! Flood-fill and steering benchmarks for td_core.
//!
//! Run with: `cargo bench -p td_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use td_core::buildings::BuildingLayout;
use td_core::grid::CellCoord;
use td_core::movement::MovementClass;
use td_core::pathfinding::{flood_fill, Pathfinder};
use td_core::simulation::SimulationConfig;
use td_test_utils::fixtures::{open_field, simulation};

/// Every fourth column walled off except for a one-cell gap, alternating
/// top and bottom, so the route snakes across the whole map.
fn serpentine_walls(width: i32, height: i32) -> impl Fn(CellCoord) -> bool {
    move |cell: CellCoord| {
        if cell.x % 4 != 2 || cell.x >= width - 1 {
            return false;
        }
        let gap = if (cell.x / 4) % 2 == 0 { height - 1 } else { 0 };
        cell.y != gap
    }
}

pub fn flood_fill_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("flood_fill");

    for size in [32usize, 64, 128] {
        let grid = open_field(size, size);
        let walls = serpentine_walls(size as i32, size as i32);

        group.bench_with_input(BenchmarkId::new("ground_serpentine", size), &grid, |b, grid| {
            b.iter(|| flood_fill(black_box(grid), &walls, MovementClass::Ground));
        });

        group.bench_with_input(BenchmarkId::new("recalculate_all", size), &grid, |b, grid| {
            let mut pathfinder = Pathfinder::new(grid.clone());
            let layout = BuildingLayout::new();
            b.iter(|| {
                let connected = pathfinder.recalculate_all(black_box(&layout));
                pathfinder.revert_all();
                connected
            });
        });
    }

    group.finish();
}

pub fn steering_benchmark(c: &mut Criterion) {
    c.bench_function("tick_100_units_64x64", |b| {
        let mut sim = simulation(open_field(64, 64), SimulationConfig::default());
        for _ in 0..100 {
            sim.spawn_unit_by_key("footman", 0).expect("footman is in the default roster");
        }
        b.iter(|| black_box(sim.tick(16.0)));
    });
}

criterion_group!(benches, flood_fill_benchmark, steering_benchmark);
criterion_main!(benches);
