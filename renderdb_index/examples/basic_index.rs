// Copyright 2025 the Renderdb Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Basic usage of Renderdb Index: insert, bulk load, and query.

use renderdb_index::{Aabb3D, Index};

fn main() {
    let mut idx = Index::<i64, u32>::with_rtree();
    let _k1 = idx.insert(Aabb3D::new(0, 0, 0, 10, 10, 10), 1);
    let _k2 = idx.insert(Aabb3D::new(5, 5, 5, 15, 15, 15), 2);

    // Query a point
    let hits: Vec<_> = idx.query_point(6, 6, 6).collect();
    println!("hits at (6,6,6): {:?}", hits);

    // Bulk load a grid of unit cubes and query a slab through it
    let cubes: Vec<_> = (0..1000_i64)
        .map(|i| (Aabb3D::<i64>::from_origin_size(i % 10, (i / 10) % 10, i / 100, 1, 1, 1), i as u32))
        .collect();
    let grid = Index::<i64, u32>::with_rtree_bulk(&cubes);
    let slab = grid.query_box(Aabb3D::new(0, 0, 4, 9, 9, 4)).count();
    println!("cubes touching z=4: {slab}");
}
