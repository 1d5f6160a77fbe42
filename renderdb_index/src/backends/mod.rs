// Copyright 2025 the Renderdb Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend implementations for different spatial strategies.
//!
//! - `flatvec`: flat vector with linear scans (small, simple).
//! - `rtree`: generic R-tree (`T: Scalar`) with SAH-like split (aliases: `RTreeI64`, `RTreeF32`, `RTreeF64`).
//!
//! SAH note
//! --------
//! The R-tree uses an SAH-like split heuristic over volume.
//! For a split point `k` along a sorted axis we minimize:
//!
//! `cost(k) = volume(LB_k) * k + volume(RB_k) * (n - k)`
//!
//! where `LB_k` and `RB_k` are the bounding boxes of the first `k` and remaining `n - k` items.
//! We evaluate all `k` in O(n) per axis using prefix/suffix bounding boxes, and pick the lowest cost.
//! Ties (common for flat or degenerate boxes, whose volume is zero) fall back to half surface area.
//! Accumulators are widened (`f32`→`f64`, `f64`→`f64`, `i64`→`i128`) for robust comparisons.
//! The bulk builder uses an STR-like pass (x slabs, y strips, z runs) to seed packed leaves and parents.

pub mod flatvec;
pub mod rtree;
