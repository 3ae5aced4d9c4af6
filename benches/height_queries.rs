// Terrain Height Query Benchmarks
//
// Raw height function vs. grid-snapped cache, and full tile regeneration
// serial vs. parallel.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use earth_terrain::{
    HeightProvider, HeightQueryCache, HeightmapConfig, HeightmapStreamer, SharedHeightProvider,
    TerrainGenerator,
};

const QUERY_COUNTS: &[usize] = &[1_000, 10_000];
const TILE_SIZES: &[u32] = &[128, 512];

/// Footstep-like walk: many nearby queries that share grid cells
fn walk(count: usize) -> Vec<(f64, f64)> {
    (0..count)
        .map(|i| {
            let t = i as f64 * 0.05;
            (t * 3.0, (t * 0.7).sin() * 40.0)
        })
        .collect()
}

fn bench_height_function(c: &mut Criterion) {
    let mut group = c.benchmark_group("height_function");
    let generator = TerrainGenerator::new(12345);

    for &count in QUERY_COUNTS {
        let points = walk(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &points, |b, points| {
            b.iter(|| {
                for &(x, z) in points {
                    black_box(generator.height_at(x, z));
                }
            });
        });
    }

    group.finish();
}

fn bench_cached_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("cached_queries");

    for &count in QUERY_COUNTS {
        let points = walk(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &points, |b, points| {
            let mut cache = HeightQueryCache::new(Arc::new(TerrainGenerator::new(12345)), 10_000);
            b.iter(|| {
                for &(x, z) in points {
                    black_box(cache.height_at(x, z));
                }
            });
        });
    }

    group.finish();
}

fn bench_tile_regeneration(c: &mut Criterion) {
    let mut group = c.benchmark_group("tile_regeneration");
    group.sample_size(10);
    let provider: SharedHeightProvider = Arc::new(TerrainGenerator::new(12345));

    for &size in TILE_SIZES {
        for parallel_fill in [false, true] {
            let config = HeightmapConfig {
                size,
                parallel_fill,
                ..HeightmapConfig::default()
            };
            let label = if parallel_fill { "parallel" } else { "serial" };
            group.bench_with_input(BenchmarkId::new(label, size), &config, |b, config| {
                let mut streamer = HeightmapStreamer::new(provider.clone(), config);
                let mut offset = 0.0;
                b.iter(|| {
                    offset += 1_000.0;
                    streamer.regenerate(black_box(offset), 0.0);
                });
            });
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_height_function,
    bench_cached_queries,
    bench_tile_regeneration
);
criterion_main!(benches);
