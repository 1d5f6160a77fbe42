// Copyright 2025 the Renderdb Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::Arc;

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use renderdb_repository::Bounds;
use renderdb_repository::filter::{Filter, Limit, SortByDistance, apply_filters};

fn gen_boxes(count: usize) -> Vec<Bounds> {
    let mut seed = 0x9E37_79B9_7F4A_7C15_u64;
    let mut next = move || {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        (seed >> 11) as f64 / (1u64 << 53) as f64
    };
    (0..count)
        .map(|_| {
            let (x, y, z, s) = (next() * 1000.0, next() * 1000.0, next() * 1000.0, next() * 20.0);
            Bounds::from_origin_size(x, y, z, s, s, s)
        })
        .collect()
}

fn bench_sort_by_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_pipeline");
    for &n in &[1_000usize, 10_000, 100_000] {
        let boxes = gen_boxes(n);
        group.throughput(Throughput::Elements(n as u64));
        let sort: Vec<Filter> = vec![Arc::new(SortByDistance::new([500.0, 500.0, 500.0]))];
        group.bench_function(format!("sort_by_distance_n{}", n), |b| {
            b.iter(|| black_box(apply_filters(&boxes, &sort).map(|v| v.len())))
        });
        let nearest: Vec<Filter> = vec![
            Arc::new(SortByDistance::new([500.0, 500.0, 500.0])),
            Arc::new(Limit { max: 100 }),
        ];
        group.bench_function(format!("nearest_100_n{}", n), |b| {
            b.iter(|| black_box(apply_filters(&boxes, &nearest).map(|v| v.len())))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sort_by_distance);
criterion_main!(benches);
