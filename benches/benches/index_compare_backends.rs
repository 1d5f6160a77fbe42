// Copyright 2025 the Renderdb Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use renderdb_index::{Aabb3D, Index};

fn gen_grid_boxes(n: usize, cell: f64) -> Vec<Aabb3D<f64>> {
    let mut out = Vec::with_capacity(n * n * n);
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let (x0, y0, z0) = (x as f64 * cell, y as f64 * cell, z as f64 * cell);
                out.push(Aabb3D::<f64>::from_origin_size(x0, y0, z0, cell, cell, cell));
            }
        }
    }
    out
}

fn gen_grid_boxes_i64(n: usize, cell: i64) -> Vec<Aabb3D<i64>> {
    let mut out = Vec::with_capacity(n * n * n);
    for z in 0..n as i64 {
        for y in 0..n as i64 {
            for x in 0..n as i64 {
                out.push(Aabb3D::<i64>::from_origin_size(
                    x * cell,
                    y * cell,
                    z * cell,
                    cell,
                    cell,
                    cell,
                ));
            }
        }
    }
    out
}

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

fn gen_random_boxes(count: usize, extent: f64, size: f64) -> Vec<Aabb3D<f64>> {
    let mut rng = Rng::new(0xCAFE_F00D_DEAD_BEEF);
    (0..count)
        .map(|_| {
            let span = (extent - size).max(1.0);
            Aabb3D::<f64>::from_origin_size(
                rng.next_f64() * span,
                rng.next_f64() * span,
                rng.next_f64() * span,
                size,
                size,
                size,
            )
        })
        .collect()
}

fn gen_random_boxes_f32(count: usize, extent: f32, size: f32) -> Vec<Aabb3D<f32>> {
    let mut rng = Rng::new(0xFACE_FEED_CAFE_BABE);
    (0..count)
        .map(|_| {
            let span = (extent - size).max(1.0);
            Aabb3D::<f32>::from_origin_size(
                rng.next_f64() as f32 * span,
                rng.next_f64() as f32 * span,
                rng.next_f64() as f32 * span,
                size,
                size,
                size,
            )
        })
        .collect()
}

fn gen_clustered_boxes(n_clusters: usize, per_cluster: usize, spread: f64) -> Vec<Aabb3D<f64>> {
    let mut rng = Rng::new(0xC1A5_7E55_9999_ABCD);
    let centers: Vec<[f64; 3]> = (0..n_clusters)
        .map(|_| [rng.next_f64() * 2000.0, rng.next_f64() * 2000.0, rng.next_f64() * 2000.0])
        .collect();
    let mut out = Vec::with_capacity(n_clusters * per_cluster);
    for c in centers {
        for _ in 0..per_cluster {
            let d = [
                (rng.next_f64() - 0.5) * spread,
                (rng.next_f64() - 0.5) * spread,
                (rng.next_f64() - 0.5) * spread,
            ];
            out.push(Aabb3D::<f64>::from_origin_size(
                c[0] + d[0],
                c[1] + d[1],
                c[2] + d[2],
                12.0,
                12.0,
                12.0,
            ));
        }
    }
    out
}

fn bench_flatvec(c: &mut Criterion) {
    let mut group = c.benchmark_group("flatvec");
    for &n in &[8usize, 16, 24] {
        let boxes = gen_grid_boxes(n, 10.0);
        group.throughput(Throughput::Elements((n * n * n) as u64));
        group.bench_function(format!("insert_query_n{}", n), |b| {
            b.iter_batched(
                Index::<f64, u32>::new,
                |mut idx| {
                    for (i, r) in boxes.iter().copied().enumerate() {
                        let _ = idx.insert(r, i as u32);
                    }
                    let hits: usize = idx
                        .query_box(Aabb3D::<f64>::from_origin_size(20.0, 20.0, 20.0, 40.0, 40.0, 40.0))
                        .count();
                    black_box(hits);
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_rtree_i64(c: &mut Criterion) {
    let mut group = c.benchmark_group("rtree_i64");
    for &n in &[8usize, 16, 24] {
        let boxes = gen_grid_boxes_i64(n, 10);
        group.throughput(Throughput::Elements((n * n * n) as u64));
        group.bench_function(format!("insert_query_n{}", n), |b| {
            b.iter_batched(
                Index::<i64, u32>::with_rtree,
                |mut idx| {
                    for (i, r) in boxes.iter().copied().enumerate() {
                        let _ = idx.insert(r, i as u32);
                    }
                    let hits: usize = idx.query_box(Aabb3D::new(20, 20, 20, 60, 60, 60)).count();
                    black_box(hits);
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_rtree_f64(c: &mut Criterion) {
    let mut group = c.benchmark_group("rtree_f64");
    for &n in &[8usize, 16, 24] {
        let boxes = gen_grid_boxes(n, 10.0);
        group.throughput(Throughput::Elements((n * n * n) as u64));
        group.bench_function(format!("insert_query_n{}", n), |b| {
            b.iter_batched(
                Index::<f64, u32>::with_rtree,
                |mut idx| {
                    for (i, r) in boxes.iter().copied().enumerate() {
                        let _ = idx.insert(r, i as u32);
                    }
                    let hits: usize = idx
                        .query_box(Aabb3D::new(20.0, 20.0, 20.0, 60.0, 60.0, 60.0))
                        .count();
                    black_box(hits);
                },
                BatchSize::SmallInput,
            )
        });
        let entries: Vec<_> = boxes
            .iter()
            .copied()
            .enumerate()
            .map(|(i, r)| (r, i as u32))
            .collect();
        group.bench_function(format!("bulk_query_n{}", n), |b| {
            b.iter(|| {
                let idx = Index::<f64, u32>::with_rtree_bulk(&entries);
                let hits: usize = idx
                    .query_box(Aabb3D::new(20.0, 20.0, 20.0, 60.0, 60.0, 60.0))
                    .count();
                black_box(hits);
            })
        });
    }
    group.finish();
}

fn bench_rtree_f32(c: &mut Criterion) {
    let mut group = c.benchmark_group("rtree_f32");
    let boxes = gen_random_boxes_f32(4096, 2000.0, 12.0);
    group.bench_function("insert_query_random", |b| {
        b.iter_batched(
            Index::<f32, u32>::with_rtree,
            |mut idx| {
                for (i, r) in boxes.iter().copied().enumerate() {
                    let _ = idx.insert(r, i as u32);
                }
                let hits: usize = idx
                    .query_box(Aabb3D::<f32>::from_origin_size(800.0, 800.0, 800.0, 400.0, 400.0, 400.0))
                    .count();
                black_box(hits);
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_query_heavy_rtree_f64(c: &mut Criterion) {
    let mut group = c.benchmark_group("rtree_f64_query_heavy");
    let boxes = gen_random_boxes(16_384, 2000.0, 12.0);
    let entries: Vec<_> = boxes
        .iter()
        .copied()
        .enumerate()
        .map(|(i, r)| (r, i as u32))
        .collect();
    let idx = Index::<f64, u32>::with_rtree_bulk(&entries);
    group.bench_function("many_queries", |b| {
        b.iter(|| {
            let mut total = 0usize;
            for q in 0..256 {
                let x = (q % 16) as f64 * 120.0;
                let y = (q / 16) as f64 * 120.0;
                total += idx
                    .query_box(Aabb3D::<f64>::from_origin_size(x, y, 500.0, 150.0, 150.0, 150.0))
                    .count();
            }
            black_box(total);
        })
    });
    group.finish();
}

fn bench_clustered_f64(c: &mut Criterion) {
    let mut group = c.benchmark_group("f64_clustered");
    let boxes = gen_clustered_boxes(16, 256, 128.0);
    let query = Aabb3D::<f64>::from_origin_size(800.0, 800.0, 800.0, 400.0, 400.0, 400.0);
    group.bench_function("flatvec_insert_query", |b| {
        b.iter_batched(
            Index::<f64, u32>::new,
            |mut idx| {
                for (i, r) in boxes.iter().copied().enumerate() {
                    let _ = idx.insert(r, i as u32);
                }
                black_box(idx.query_box(query).count());
            },
            BatchSize::SmallInput,
        )
    });
    group.bench_function("rtree_insert_query", |b| {
        b.iter_batched(
            Index::<f64, u32>::with_rtree,
            |mut idx| {
                for (i, r) in boxes.iter().copied().enumerate() {
                    let _ = idx.insert(r, i as u32);
                }
                black_box(idx.query_box(query).count());
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_flatvec,
    bench_rtree_i64,
    bench_rtree_f64,
    bench_rtree_f32,
    bench_query_heavy_rtree_f64,
    bench_clustered_f64,
);
criterion_main!(benches);
