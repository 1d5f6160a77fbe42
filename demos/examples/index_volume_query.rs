// Copyright 2025 the Renderdb Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Index volume queries.
//!
//! Bulk-load a scattered set of boxes, then compare the flat-vector and R-tree
//! backends on the same volume query.
//!
//! Run:
//! - `cargo run -p renderdb_demos --example index_volume_query`

use renderdb_index::{Aabb3D, Index};

fn main() {
    // A 20x20x20 lattice of small boxes, each labelled with its ordinal.
    let entries: Vec<(Aabb3D<f64>, i64)> = (0..8000_i64)
        .map(|i| {
            let (x, y, z) = ((i % 20) as f64, ((i / 20) % 20) as f64, (i / 400) as f64);
            (Aabb3D::<f64>::from_origin_size(x * 2.0, y * 2.0, z * 2.0, 0.5, 0.5, 0.5), i)
        })
        .collect();

    let mut flat = Index::<f64, i64>::new();
    for (aabb, id) in &entries {
        flat.insert(*aabb, *id);
    }
    let tree = Index::<f64, i64>::with_rtree_bulk(&entries);
    println!("R-tree height for {} boxes: {}", tree.len(), tree.backend().height());

    let volume = Aabb3D::new(3.9, 3.9, 3.9, 8.1, 8.1, 8.1);
    let mut from_flat: Vec<i64> = flat.query_box(volume).map(|(_, id)| id).collect();
    let mut from_tree: Vec<i64> = tree.query_box(volume).map(|(_, id)| id).collect();
    from_flat.sort_unstable();
    from_tree.sort_unstable();
    assert_eq!(from_flat, from_tree);
    println!("{} boxes intersect {:?}: {:?}", from_tree.len(), volume, from_tree);

    // A point on a face counts as inside.
    let on_face: Vec<_> = tree.query_point(0.5, 0.0, 0.0).collect();
    println!("hits at (0.5, 0, 0): {:?}", on_face);
    assert_eq!(on_face.len(), 1);
}
