// Copyright 2025 the Renderdb Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! R-tree backend generic over scalar `T: Scalar` with SAH-like split.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt::Debug;

use crate::backend::Backend;
use crate::types::{Aabb3D, Scalar, ScalarAcc, half_surface, union_aabb, volume};

/// Default maximum number of children per node.
pub const DEFAULT_MAX_CHILDREN: usize = 8;

/// Default minimum number of children per node after a split.
pub const DEFAULT_MIN_CHILDREN: usize = 4;

/// R-tree backend using SAH-like splits and widened accumulator metrics.
#[derive(Clone)]
pub struct RTree<T: Scalar> {
    max_children: usize,
    min_children: usize,
    root: Option<NodeIdx>,
    arena: Vec<RNode<T>>,
    len: usize,
}

#[derive(Clone)]
struct RNode<T: Scalar> {
    bbox: Aabb3D<T>,
    leaf: bool,
    children: Vec<RChild<T>>,
}

#[derive(Copy, Clone)]
enum RChild<T: Scalar> {
    Node(NodeIdx),
    Item { slot: usize, bbox: Aabb3D<T> },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct NodeIdx(usize);

impl NodeIdx {
    const fn new(i: usize) -> Self {
        Self(i)
    }

    const fn get(self) -> usize {
        self.0
    }
}

impl<T: Scalar> Default for RTree<T> {
    fn default() -> Self {
        Self::with_fanout(DEFAULT_MAX_CHILDREN, DEFAULT_MIN_CHILDREN)
    }
}

/// Volume cost with half-surface tie-breaker, compared lexicographically.
type Cost<T> = (ScalarAcc<T>, ScalarAcc<T>);

fn cost_of<T: Scalar>(b: &Aabb3D<T>) -> Cost<T> {
    (volume(b), half_surface(b))
}

fn centroid<T: Scalar>(b: &Aabb3D<T>, axis: usize) -> T {
    match axis {
        0 => Scalar::mid(b.min_x, b.max_x),
        1 => Scalar::mid(b.min_y, b.max_y),
        _ => Scalar::mid(b.min_z, b.max_z),
    }
}

fn cmp_centroid<T: Scalar>(a: &Aabb3D<T>, b: &Aabb3D<T>, axis: usize) -> Ordering {
    centroid(a, axis)
        .partial_cmp(&centroid(b, axis))
        .unwrap_or(Ordering::Equal)
}

/// Sort-Tile-Recursive grouping in 3D: x slabs, then y strips, then z runs of
/// at most `max` items each.
fn str_groups<I: Copy, T: Scalar>(
    items: &mut [I],
    max: usize,
    bbox_of: impl Fn(&I) -> Aabb3D<T>,
) -> Vec<Vec<I>> {
    let n = items.len();
    let groups = n.div_ceil(max);
    let mut s = 1_usize;
    while s * s * s < groups {
        s += 1;
    }
    // Strips and slabs hold whole runs, so only the final run can be partial
    // and each level shrinks.
    let strip_len = max.saturating_mul(s);
    let slab_len = strip_len.saturating_mul(s);
    let mut out = Vec::with_capacity(groups);
    items.sort_by(|a, b| cmp_centroid(&bbox_of(a), &bbox_of(b), 0));
    for slab in items.chunks_mut(slab_len) {
        slab.sort_by(|a, b| cmp_centroid(&bbox_of(a), &bbox_of(b), 1));
        for strip in slab.chunks_mut(strip_len) {
            strip.sort_by(|a, b| cmp_centroid(&bbox_of(a), &bbox_of(b), 2));
            for run in strip.chunks(max) {
                out.push(run.to_vec());
            }
        }
    }
    out
}

impl<T: Scalar> RTree<T> {
    /// Create an empty tree with the given node fanout.
    ///
    /// # Panics
    ///
    /// Panics if `max_children` is below two, if `min_children` is zero, or
    /// if an overflowing node of
    /// `max_children + 1` entries cannot be split into two halves of at least
    /// `min_children` each.
    pub fn with_fanout(max_children: usize, min_children: usize) -> Self {
        assert!(
            max_children >= 2 && min_children >= 1 && 2 * min_children <= max_children + 1,
            "invalid R-tree fanout: max={max_children}, min={min_children}"
        );
        Self {
            max_children,
            min_children,
            root: None,
            arena: Vec::new(),
            len: 0,
        }
    }

    /// Number of items stored in the tree.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no items.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the tree (0 when empty, 1 for a single leaf root).
    pub fn height(&self) -> usize {
        let mut h = 0;
        let mut cur = self.root;
        while let Some(i) = cur {
            h += 1;
            let n = &self.arena[i.get()];
            cur = if n.leaf {
                None
            } else {
                n.children.iter().find_map(|c| match c {
                    RChild::Node(ci) => Some(*ci),
                    RChild::Item { .. } => None,
                })
            };
        }
        h
    }

    /// Build an `RTree` from a set of (slot, bbox) pairs using a packed layout.
    pub fn bulk_build(pairs: &[(usize, Aabb3D<T>)], max_children: usize, min_children: usize) -> Self {
        let mut tree = Self::with_fanout(max_children, min_children);
        if pairs.is_empty() {
            return tree;
        }
        let mut items = pairs.to_vec();

        // Leaf level
        let mut level: Vec<usize> = Vec::new();
        for run in str_groups(&mut items, max_children, |(_, b)| *b) {
            let children: Vec<RChild<T>> = run
                .into_iter()
                .map(|(slot, bbox)| RChild::Item { slot, bbox })
                .collect();
            level.push(tree.push_node(true, children));
        }

        // Promote until a single root remains
        while level.len() > 1 {
            let runs = {
                let arena = &tree.arena;
                str_groups(&mut level, max_children, |&i| arena[i].bbox)
            };
            let mut next = Vec::with_capacity(runs.len());
            for run in runs {
                let children: Vec<RChild<T>> = run
                    .into_iter()
                    .map(|i| RChild::Node(NodeIdx::new(i)))
                    .collect();
                next.push(tree.push_node(false, children));
            }
            level = next;
        }

        tree.root = level.first().copied().map(NodeIdx::new);
        tree.len = pairs.len();
        tree
    }

    /// Build an `RTree` with the default fanout.
    pub fn bulk_build_default(pairs: &[(usize, Aabb3D<T>)]) -> Self {
        Self::bulk_build(pairs, DEFAULT_MAX_CHILDREN, DEFAULT_MIN_CHILDREN)
    }

    fn push_node(&mut self, leaf: bool, children: Vec<RChild<T>>) -> usize {
        let bbox = Self::node_bbox(&self.arena, &children);
        let idx = self.arena.len();
        self.arena.push(RNode {
            bbox,
            leaf,
            children,
        });
        idx
    }

    fn child_bbox(arena: &[RNode<T>], c: &RChild<T>) -> Aabb3D<T> {
        match c {
            RChild::Node(i) => arena[i.get()].bbox,
            RChild::Item { bbox, .. } => *bbox,
        }
    }

    fn node_bbox(arena: &[RNode<T>], children: &[RChild<T>]) -> Aabb3D<T> {
        let mut it = children.iter();
        let first = match it.next() {
            Some(c) => Self::child_bbox(arena, c),
            None => Aabb3D::new(T::zero(), T::zero(), T::zero(), T::zero(), T::zero(), T::zero()),
        };
        it.fold(first, |acc, c| union_aabb(acc, Self::child_bbox(arena, c)))
    }

    fn enlarge_cost(a: &Aabb3D<T>, b: &Aabb3D<T>) -> Cost<T> {
        let u = union_aabb(*a, *b);
        let (uv, us) = cost_of(&u);
        let (av, as_) = cost_of(a);
        (uv - av, us - as_)
    }

    fn choose_child(arena: &[RNode<T>], children: &[RChild<T>], bbox: &Aabb3D<T>) -> usize {
        let mut best_idx = 0_usize;
        let mut best_cost: Option<Cost<T>> = None;
        for (i, c) in children.iter().enumerate() {
            let cost = Self::enlarge_cost(&Self::child_bbox(arena, c), bbox);
            if best_cost.map(|bc| cost < bc).unwrap_or(true) {
                best_cost = Some(cost);
                best_idx = i;
            }
        }
        best_idx
    }

    /// SAH-like split: sort along each axis, precompute prefix/suffix AABBs, and
    /// choose `k` that minimizes `volume(LB_k) * k + volume(RB_k) * (n - k)`.
    fn split_children(
        arena: &[RNode<T>],
        children: Vec<RChild<T>>,
        min_children: usize,
    ) -> (Vec<RChild<T>>, Vec<RChild<T>>) {
        let n = children.len();
        let mut best: Option<(Cost<T>, usize, usize)> = None;
        for axis in 0..3 {
            let mut v = children.clone();
            v.sort_by(|a, b| {
                cmp_centroid(&Self::child_bbox(arena, a), &Self::child_bbox(arena, b), axis)
            });

            // Prefix and suffix bounding boxes give O(1) cost per split point.
            let mut prefix: Vec<Aabb3D<T>> = Vec::with_capacity(n);
            let mut acc: Option<Aabb3D<T>> = None;
            for c in &v {
                let bb = Self::child_bbox(arena, c);
                let next = acc.map_or(bb, |p| union_aabb(p, bb));
                prefix.push(next);
                acc = Some(next);
            }
            let mut suffix: Vec<Aabb3D<T>> = Vec::with_capacity(n);
            acc = None;
            for c in v.iter().rev() {
                let bb = Self::child_bbox(arena, c);
                let next = acc.map_or(bb, |p| union_aabb(bb, p));
                suffix.push(next);
                acc = Some(next);
            }
            suffix.reverse();

            for k in min_children..=(n - min_children) {
                let (lv, ls) = cost_of(&prefix[k - 1]);
                let (rv, rs) = cost_of(&suffix[k]);
                let wl = T::acc_from_usize(k);
                let wr = T::acc_from_usize(n - k);
                let c = (lv * wl + rv * wr, ls * wl + rs * wr);
                if best.as_ref().map(|(bc, _, _)| c < *bc).unwrap_or(true) {
                    best = Some((c, axis, k));
                }
            }
        }
        let (axis, k) = best.map_or((0, n / 2), |(_, axis, k)| (axis, k));
        let mut v = children;
        v.sort_by(|a, b| cmp_centroid(&Self::child_bbox(arena, a), &Self::child_bbox(arena, b), axis));
        let right = v.split_off(k);
        (v, right)
    }

    /// Split an overflowing node in place; returns the index of the new right sibling.
    fn split_node(arena: &mut Vec<RNode<T>>, node_idx: usize, min_children: usize) -> usize {
        let leaf = arena[node_idx].leaf;
        let children = core::mem::take(&mut arena[node_idx].children);
        let (left, right) = Self::split_children(arena, children, min_children);
        let l_bbox = Self::node_bbox(arena, &left);
        let r_bbox = Self::node_bbox(arena, &right);
        {
            let node = &mut arena[node_idx];
            node.children = left;
            node.bbox = l_bbox;
        }
        let r_idx = arena.len();
        arena.push(RNode {
            bbox: r_bbox,
            leaf,
            children: right,
        });
        r_idx
    }

    fn insert_node(
        arena: &mut Vec<RNode<T>>,
        node_idx: usize,
        slot: usize,
        bbox: Aabb3D<T>,
        max_children: usize,
        min_children: usize,
    ) -> Option<usize> {
        if arena[node_idx].leaf {
            let node = &mut arena[node_idx];
            node.children.push(RChild::Item { slot, bbox });
            node.bbox = union_aabb(node.bbox, bbox);
            if node.children.len() <= max_children {
                return None;
            }
            return Some(Self::split_node(arena, node_idx, min_children));
        }

        let idx = Self::choose_child(arena, &arena[node_idx].children, &bbox);
        let split = match arena[node_idx].children[idx] {
            RChild::Node(child_idx) => Self::insert_node(
                arena,
                child_idx.get(),
                slot,
                bbox,
                max_children,
                min_children,
            ),
            RChild::Item { .. } => None,
        };
        arena[node_idx].bbox = union_aabb(arena[node_idx].bbox, bbox);
        if let Some(new_right_idx) = split {
            arena[node_idx]
                .children
                .insert(idx + 1, RChild::Node(NodeIdx::new(new_right_idx)));
            if arena[node_idx].children.len() > max_children {
                return Some(Self::split_node(arena, node_idx, min_children));
            }
        }
        None
    }

    fn search<'a, F>(&'a self, mut node_hit: F) -> Box<dyn Iterator<Item = usize> + 'a>
    where
        F: FnMut(&Aabb3D<T>) -> bool,
    {
        let mut out = Vec::new();
        let Some(root_idx) = self.root else {
            return Box::new(out.into_iter());
        };
        let mut stack = vec![root_idx];
        while let Some(i) = stack.pop() {
            let n = &self.arena[i.get()];
            if !node_hit(&n.bbox) {
                continue;
            }
            for c in &n.children {
                match c {
                    RChild::Item { slot, bbox } => {
                        if node_hit(bbox) {
                            out.push(*slot);
                        }
                    }
                    RChild::Node(ci) => stack.push(*ci),
                }
            }
        }
        Box::new(out.into_iter())
    }
}

impl<T: Scalar> Backend<T> for RTree<T> {
    fn insert(&mut self, slot: usize, aabb: Aabb3D<T>) {
        self.len += 1;
        match self.root {
            None => {
                let idx = self.push_node(true, vec![RChild::Item { slot, bbox: aabb }]);
                self.root = Some(NodeIdx::new(idx));
            }
            Some(root_idx) => {
                let split = Self::insert_node(
                    &mut self.arena,
                    root_idx.get(),
                    slot,
                    aabb,
                    self.max_children,
                    self.min_children,
                );
                if let Some(right_idx) = split {
                    // Grow a new root over the old root and its new sibling
                    let children = vec![
                        RChild::Node(root_idx),
                        RChild::Node(NodeIdx::new(right_idx)),
                    ];
                    let idx = self.push_node(false, children);
                    self.root = Some(NodeIdx::new(idx));
                }
            }
        }
    }

    fn clear(&mut self) {
        self.root = None;
        self.arena.clear();
        self.len = 0;
    }

    fn query_point<'a>(&'a self, x: T, y: T, z: T) -> Box<dyn Iterator<Item = usize> + 'a> {
        self.search(move |b| b.contains_point(x, y, z))
    }

    fn query_box<'a>(&'a self, query: Aabb3D<T>) -> Box<dyn Iterator<Item = usize> + 'a> {
        self.search(move |b| b.overlaps(&query))
    }
}

impl<T: Scalar> Debug for RTree<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RTree")
            .field("max_children", &self.max_children)
            .field("min_children", &self.min_children)
            .field("arena_nodes", &self.arena.len())
            .field("len", &self.len)
            .field("has_root", &self.root.is_some())
            .finish_non_exhaustive()
    }
}

/// Convenience type aliases.
/// R-tree with i64 coordinates and i128 metrics.
pub type RTreeI64 = RTree<i64>;

/// R-tree with f32 coordinates and f64 metrics.
pub type RTreeF32 = RTree<f32>;

/// R-tree with f64 coordinates and f64 metrics.
pub type RTreeF64 = RTree<f64>;
