// Copyright 2025 the Renderdb Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public `Index` API and generic implementation over a pluggable backend.

use alloc::vec::Vec;
use core::fmt::Debug;

use crate::backend::Backend;
use crate::backends::flatvec::FlatVec;
use crate::backends::rtree::{RTree, RTreeF32, RTreeF64, RTreeI64};
use crate::types::{Aabb3D, Scalar};

/// Stable handle for an entry.
///
/// Entries are never removed, so a key stays valid for the lifetime of the
/// index (or until [`IndexGeneric::clear`]).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(usize);

impl Key {
    const fn new(idx: usize) -> Self {
        Self(idx)
    }

    const fn idx(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug)]
struct Entry<T, P> {
    aabb: Aabb3D<T>,
    payload: P,
}

/// A generic AABB index parameterized by a spatial backend.
#[derive(Clone, Debug)]
pub struct IndexGeneric<T: Copy + PartialOrd + Debug, P: Copy + Debug, B: Backend<T>> {
    entries: Vec<Entry<T, P>>,
    backend: B,
}

impl<T, P, B> IndexGeneric<T, P, B>
where
    T: Copy + PartialOrd + Debug,
    P: Copy + Debug,
    B: Backend<T> + Default,
{
    /// Create an empty index using the backend's default constructor.
    pub fn new() -> Self {
        Self::with_backend(B::default())
    }
}

impl<T, P, B> IndexGeneric<T, P, B>
where
    T: Copy + PartialOrd + Debug,
    P: Copy + Debug,
    B: Backend<T>,
{
    /// Create an empty index around an already configured backend.
    ///
    /// The backend must be empty.
    pub fn with_backend(backend: B) -> Self {
        Self {
            entries: Vec::new(),
            backend,
        }
    }

    /// Reserve space for at least `n` entries.
    pub fn reserve(&mut self, n: usize) {
        self.entries.reserve(n);
    }

    /// Number of entries, duplicates included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a new AABB with payload. Returns a stable handle `Key`.
    ///
    /// Payloads are not checked for uniqueness; inserting the same payload
    /// twice yields two independent entries.
    pub fn insert(&mut self, aabb: Aabb3D<T>, payload: P) -> Key {
        let idx = self.entries.len();
        self.entries.push(Entry { aabb, payload });
        self.backend.insert(idx, aabb);
        Key::new(idx)
    }

    /// Look up the AABB and payload stored under `key`.
    pub fn get(&self, key: Key) -> Option<(Aabb3D<T>, P)> {
        self.entries
            .get(key.idx())
            .map(|e| (e.aabb, e.payload))
    }

    /// Iterate over every entry in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Key, Aabb3D<T>, P)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (Key::new(i), e.aabb, e.payload))
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.backend.clear();
    }

    /// Query for entries whose AABB contains the point.
    pub fn query_point(&self, x: T, y: T, z: T) -> impl Iterator<Item = (Key, P)> + '_ {
        self.resolve(self.backend.query_point(x, y, z))
    }

    /// Query for entries whose AABB intersects the given box.
    ///
    /// Each entry is reported at most once; order is unspecified.
    pub fn query_box(&self, query: Aabb3D<T>) -> impl Iterator<Item = (Key, P)> + '_ {
        self.resolve(self.backend.query_box(query))
    }

    /// Borrow the spatial backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn resolve<'a>(
        &'a self,
        slots: impl Iterator<Item = usize> + 'a,
    ) -> impl Iterator<Item = (Key, P)> + 'a {
        slots.filter_map(move |i| self.entries.get(i).map(|e| (Key::new(i), e.payload)))
    }
}

/// Default index using a flat vector backend.
pub type Index<T, P> = IndexGeneric<T, P, FlatVec<T>>;

impl<T: Copy + PartialOrd + Debug, P: Copy + Debug> Default for Index<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar, P: Copy + Debug> IndexGeneric<T, P, RTree<T>> {
    fn from_bulk(entries: &[(Aabb3D<T>, P)], max_children: usize, min_children: usize) -> Self {
        let mut pairs: Vec<(usize, Aabb3D<T>)> = Vec::with_capacity(entries.len());
        let mut stored = Vec::with_capacity(entries.len());
        for (i, (aabb, payload)) in entries.iter().copied().enumerate() {
            stored.push(Entry { aabb, payload });
            pairs.push((i, aabb));
        }
        Self {
            entries: stored,
            backend: RTree::bulk_build(&pairs, max_children, min_children),
        }
    }

    /// Build an R-tree-backed index in bulk with an explicit node fanout.
    pub fn with_rtree_bulk_fanout(
        entries: &[(Aabb3D<T>, P)],
        max_children: usize,
        min_children: usize,
    ) -> Self {
        Self::from_bulk(entries, max_children, min_children)
    }
}

impl<P: Copy + Debug> Index<f64, P> {
    /// Create an R-tree-backed index (f64 coordinates).
    pub fn with_rtree() -> IndexGeneric<f64, P, RTreeF64> {
        IndexGeneric::new()
    }

    /// Build an R-tree-backed index in bulk from entries.
    pub fn with_rtree_bulk(entries: &[(Aabb3D<f64>, P)]) -> IndexGeneric<f64, P, RTreeF64> {
        IndexGeneric::with_rtree_bulk_fanout(
            entries,
            crate::backends::rtree::DEFAULT_MAX_CHILDREN,
            crate::backends::rtree::DEFAULT_MIN_CHILDREN,
        )
    }
}

impl<P: Copy + Debug> Index<f32, P> {
    /// Create an R-tree-backed index (f32 coordinates).
    pub fn with_rtree() -> IndexGeneric<f32, P, RTreeF32> {
        IndexGeneric::new()
    }

    /// Build an f32 R-tree-backed index in bulk from entries.
    pub fn with_rtree_bulk(entries: &[(Aabb3D<f32>, P)]) -> IndexGeneric<f32, P, RTreeF32> {
        IndexGeneric::with_rtree_bulk_fanout(
            entries,
            crate::backends::rtree::DEFAULT_MAX_CHILDREN,
            crate::backends::rtree::DEFAULT_MIN_CHILDREN,
        )
    }
}

impl<P: Copy + Debug> Index<i64, P> {
    /// Create an i64 R-tree-backed index using integer SAH splits.
    pub fn with_rtree() -> IndexGeneric<i64, P, RTreeI64> {
        IndexGeneric::new()
    }

    /// Build an i64 R-tree-backed index in bulk from entries.
    pub fn with_rtree_bulk(entries: &[(Aabb3D<i64>, P)]) -> IndexGeneric<i64, P, RTreeI64> {
        IndexGeneric::with_rtree_bulk_fanout(
            entries,
            crate::backends::rtree::DEFAULT_MAX_CHILDREN,
            crate::backends::rtree::DEFAULT_MIN_CHILDREN,
        )
    }
}
