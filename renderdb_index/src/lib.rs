// Copyright 2025 the Renderdb Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Renderdb Index: a generic 3D AABB index.
//!
//! Renderdb Index is the spatial half of the geometry repository: it maps
//! payloads (typically object identifiers) to axis-aligned bounding boxes and
//! answers "which entries overlap this volume" queries.
//!
//! - Insert axis-aligned bounding boxes (AABBs) with user payloads.
//! - Query by point or intersecting box. Boxes touching only at a boundary intersect.
//! - Bulk-load a packed R-tree when the full entry set is known up front.
//!
//! Entries are never removed or moved; the index only grows (or is cleared as a whole).
//! It is generic over the scalar type `T` and does not depend on any geometry crate.
//!
//! Backends are pluggable via a simple trait so you can swap the spatial strategy without API churn.
//! The default backend is a flat vector (linear scan).
//! The R-tree backend is generic over the scalar and uses widened accumulator types
//! (f32→f64, f64→f64, i64→i128) for SAH-like splits.
//!
//! # Example
//!
//! ```rust
//! use renderdb_index::{Aabb3D, Index};
//!
//! // Create an R-tree index and add two boxes.
//! let mut idx = Index::<f64, i64>::with_rtree();
//! idx.insert(Aabb3D::new(0.0, 0.0, 0.0, 1.0, 1.0, 1.0), 1);
//! idx.insert(Aabb3D::new(5.0, 5.0, 5.0, 6.0, 6.0, 6.0), 2);
//!
//! // Query a volume overlapping the corner of the first box.
//! let hits: Vec<_> = idx
//!     .query_box(Aabb3D::new(0.5, 0.5, 0.5, 2.0, 2.0, 2.0))
//!     .map(|(_, id)| id)
//!     .collect();
//! assert_eq!(hits, vec![1]);
//! ```
//!
//! ## Choosing a backend
//!
//! - `FlatVec` (default): simplest and smallest, linear scans. Good for very small sets
//!   and as a reference when testing other backends.
//! - `RTreeF32`/`RTreeF64`/`RTreeI64`: R-tree with SAH-like splits and widened metrics;
//!   sub-linear queries for well-distributed data. See the [`backends`] docs for a brief SAH overview.
//!
//! ### Float semantics
//!
//! This crate assumes no NaNs for floating-point coordinates.
//! SAH metrics use widened accumulators to reduce precision pitfalls.

#![no_std]

extern crate alloc;

pub mod backend;
pub mod backends;
pub mod index;
pub mod types;

pub use backend::Backend;
pub use backends::flatvec::FlatVec;
pub use backends::rtree::{RTree, RTreeF32, RTreeF64, RTreeI64};
pub use index::{Index, IndexGeneric, Key};
pub use types::Aabb3D;
