//! Criterion benchmarks for terrain window refreshes and map generation.
//!
//! Benchmarks:
//!   - forced window refresh at a fixed terrain_sub over growing maps
//!   - heightmap generation at a few map sizes
//!
//! Refresh time should stay flat as the map grows.
//!
//! Run with: cargo bench -p terrain --bench window_refresh

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use glam::Vec3;

use terrain::{HeightmapGenerator, HeightmapSettings, TerrainParameters, TerrainWindow, generate};

const TERRAIN_SUB: usize = 100;

// ---------------------------------------------------------------------------
// Benchmark: window refresh
// ---------------------------------------------------------------------------

fn bench_window_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("terrain_window_refresh");

    for size in [200usize, 800, 2000] {
        let map = match generate(size, size, 0.3, 0.03, 6.0) {
            Ok(map) => Arc::new(map),
            Err(e) => panic!("generation failed: {e}"),
        };
        let mut window = match TerrainWindow::new(TerrainParameters::new(map, TERRAIN_SUB)) {
            Ok(window) => window,
            Err(e) => panic!("window rejected: {e}"),
        };

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            let mut step = 0.0f32;
            b.iter(|| {
                step += 7.0;
                let _ = window.refresh(black_box(Vec3::new(step, 0.0, -step)));
                black_box(window.positions_flat().len())
            });
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: heightmap generation
// ---------------------------------------------------------------------------

fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("heightmap_generate");
    group.sample_size(10);

    for size in [256usize, 1024] {
        let settings = HeightmapSettings::new(size, size, 0.3, 0.03, 6.0);
        let generator = match HeightmapGenerator::new(settings) {
            Ok(generator) => generator,
            Err(e) => panic!("settings rejected: {e}"),
        };
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(generator.generate()));
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Register groups
// ---------------------------------------------------------------------------

criterion_group!(benches, bench_window_refresh, bench_generation);
criterion_main!(benches);
