// Copyright 2025 the Renderdb Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Post-query filter strategies.
//!
//! A strategy looks at the bounding boxes of the candidates found by a spatial
//! query and returns the indices of the candidates to keep, in the order they
//! should be delivered. Strategies compose left to right: each one sees only
//! what the previous one kept.
//!
//! Options that arrive as loosely typed values (for example from a request
//! body) go through [`parse_filters`], which maps anything that is not a known
//! strategy to [`RepositoryError::InvalidOption`].

use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{RepositoryError, Result};
use crate::object::Bounds;

/// Reorders and/or prunes candidates by their bounding boxes.
pub trait FilterStrategy: Debug + Send + Sync {
    /// Return indices into `boxes` naming the candidates to keep, in output order.
    ///
    /// Each returned index must be `< boxes.len()`.
    fn apply(&self, boxes: &[Bounds]) -> Vec<usize>;

    /// Check the strategy's parameters before any query work begins.
    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Shared handle to a filter strategy.
pub type Filter = Arc<dyn FilterStrategy>;

/// Squared Euclidean distance from `p` to the closest point of `b`.
///
/// Zero when `p` lies inside (or on) the box.
pub fn squared_distance_to_box(p: [f64; 3], b: &Bounds) -> f64 {
    let min = b.min_corner();
    let max = b.max_corner();
    (0..3)
        .map(|i| {
            // `clamp` would panic on inverted or NaN bounds.
            let closest = p[i].max(min[i]).min(max[i]);
            let d = p[i] - closest;
            d * d
        })
        .sum()
}

/// Order candidates nearest-first by distance from `pivot` to the closest
/// point of each box. Ties keep their input order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SortByDistance {
    /// Reference location.
    pub pivot: [f64; 3],
}

impl SortByDistance {
    /// Sort by distance to `pivot`.
    pub fn new(pivot: [f64; 3]) -> Self {
        Self { pivot }
    }
}

impl FilterStrategy for SortByDistance {
    fn apply(&self, boxes: &[Bounds]) -> Vec<usize> {
        let distances: Vec<f64> = boxes
            .iter()
            .map(|b| squared_distance_to_box(self.pivot, b))
            .collect();
        let mut order: Vec<usize> = (0..boxes.len()).collect();
        order.sort_by(|&a, &b| distances[a].total_cmp(&distances[b]));
        order
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.pivot.iter().all(|c| c.is_finite()) {
            Ok(())
        } else {
            Err(format!("pivot must be finite, got {:?}", self.pivot))
        }
    }
}

/// Keep only the first `max` candidates.
///
/// Usually placed after [`SortByDistance`] to fetch the nearest few objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limit {
    /// Maximum number of candidates kept.
    pub max: usize,
}

impl FilterStrategy for Limit {
    fn apply(&self, boxes: &[Bounds]) -> Vec<usize> {
        (0..boxes.len().min(self.max)).collect()
    }
}

/// Serializable description of the built-in strategies.
///
/// ```
/// use renderdb_repository::filter::FilterSpec;
///
/// let spec: FilterSpec = serde_json::from_str(r#"{"sortByDistance": {"pivot": [0, 0, 0]}}"#).unwrap();
/// assert!(matches!(spec, FilterSpec::SortByDistance(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub enum FilterSpec {
    /// See [`SortByDistance`].
    SortByDistance(SortByDistance),
    /// See [`Limit`].
    Limit(Limit),
}

impl FilterSpec {
    /// Instantiate the described strategy.
    pub fn into_filter(self) -> Filter {
        match self {
            Self::SortByDistance(s) => Arc::new(s),
            Self::Limit(l) => Arc::new(l),
        }
    }
}

/// Turn loosely typed option values into strategies.
///
/// The first value that does not describe a valid strategy is reported as
/// [`RepositoryError::InvalidOption`] with its position.
pub fn parse_filters(values: &[serde_json::Value]) -> Result<Vec<Filter>> {
    let filters = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            FilterSpec::deserialize(v)
                .map(FilterSpec::into_filter)
                .map_err(|e| RepositoryError::invalid_option(i, format!("{v}: {e}")))
        })
        .collect::<Result<Vec<_>>>()?;
    validate_filters(&filters)?;
    Ok(filters)
}

/// Validate every strategy, reporting the first failure by position.
pub fn validate_filters(filters: &[Filter]) -> Result<()> {
    for (i, f) in filters.iter().enumerate() {
        f.validate()
            .map_err(|reason| RepositoryError::invalid_option(i, reason))?;
    }
    Ok(())
}

/// Run the pipeline over `boxes` and return indices into the original slice.
///
/// A strategy that returns an index outside its input is reported as
/// [`RepositoryError::InvalidOption`].
pub fn apply_filters(boxes: &[Bounds], filters: &[Filter]) -> Result<Vec<usize>> {
    let mut current: Vec<usize> = (0..boxes.len()).collect();
    for (position, f) in filters.iter().enumerate() {
        let view: Vec<Bounds> = current.iter().map(|&i| boxes[i]).collect();
        let picked = f.apply(&view);
        current = picked
            .into_iter()
            .map(|j| {
                current.get(j).copied().ok_or_else(|| {
                    RepositoryError::invalid_option(
                        position,
                        format!("{f:?} returned index {j} for {} candidates", view.len()),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn cube(center: [f64; 3], size: f64) -> Bounds {
        let h = size / 2.0;
        Bounds::new(
            center[0] - h,
            center[1] - h,
            center[2] - h,
            center[0] + h,
            center[1] + h,
            center[2] + h,
        )
    }

    #[derive(Debug)]
    struct Keep(Vec<usize>);

    impl FilterStrategy for Keep {
        fn apply(&self, _boxes: &[Bounds]) -> Vec<usize> {
            self.0.clone()
        }
    }

    #[test]
    fn same_center_larger_box_sorts_first() {
        let opt = SortByDistance::new([0.0, 0.0, 0.0]);
        let boxes = [cube([1.0, 1.0, 1.0], 0.1), cube([1.0, 1.0, 1.0], 0.2)];
        assert_eq!(opt.apply(&boxes), vec![1, 0]);
    }

    #[test]
    fn nearer_center_sorts_first() {
        let opt = SortByDistance::new([0.0, 0.0, 0.0]);
        let boxes = [cube([1.0, 1.0, 1.0], 1.0), cube([1.0, 1.0, 2.0], 1.0)];
        assert_eq!(opt.apply(&boxes), vec![0, 1]);
    }

    #[test]
    fn box_containing_pivot_sorts_first() {
        let opt = SortByDistance::new([0.0, 0.0, 0.0]);
        let boxes = [
            cube([1.0, 1.0, 1.0], 0.1),
            cube([0.0, 0.0, 0.0], 1000.0),
            cube([1.0, 1.0, 1.0], 0.9),
        ];
        assert_eq!(opt.apply(&boxes), vec![1, 2, 0]);
        assert_eq!(squared_distance_to_box([0.0; 3], &boxes[1]), 0.0);
    }

    #[test]
    fn ties_keep_input_order() {
        let opt = SortByDistance::new([0.0, 0.0, 0.0]);
        let b = cube([3.0, 0.0, 0.0], 1.0);
        let boxes = [b, cube([9.0, 0.0, 0.0], 1.0), b, b];
        assert_eq!(opt.apply(&boxes), vec![0, 2, 3, 1]);
    }

    #[test]
    fn inverted_or_nan_boxes_do_not_panic() {
        let inverted = Bounds::new(2.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let nan = Bounds::new(f64::NAN, 0.0, 0.0, 1.0, 1.0, 1.0);
        let opt = SortByDistance::new([0.0; 3]);
        let mut order = opt.apply(&[inverted, nan, cube([0.0; 3], 1.0)]);
        assert_eq!(squared_distance_to_box([0.0; 3], &inverted), 1.0);
        order.sort_unstable();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn degenerate_box_distance_is_point_distance() {
        let point = Bounds::new(3.0, 4.0, 0.0, 3.0, 4.0, 0.0);
        assert_eq!(squared_distance_to_box([0.0, 0.0, 0.0], &point), 25.0);
    }

    #[test]
    fn many_random_boxes_produce_a_permutation() {
        let mut seed = 0x2545_F491_4F6C_DD1D_u64;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            (seed >> 11) as f64 / (1_u64 << 53) as f64
        };
        let boxes: Vec<Bounds> = (0..1000)
            .map(|_| cube([next(), next(), next()], next()))
            .collect();
        let opt = SortByDistance::new([0.5, 0.5, 0.5]);
        let order = opt.apply(&boxes);
        let mut seen = order.clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..1000).collect::<Vec<_>>());
        let d: Vec<f64> = order
            .iter()
            .map(|&i| squared_distance_to_box(opt.pivot, &boxes[i]))
            .collect();
        assert!(d.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn no_filters_keep_everything() {
        let boxes = [cube([0.0; 3], 1.0), cube([1.0; 3], 1.0)];
        assert_eq!(apply_filters(&boxes, &[]).unwrap(), vec![0, 1]);
    }

    #[test]
    fn pipeline_maps_back_to_original_indices() {
        let boxes = [
            cube([5.0, 0.0, 0.0], 1.0),
            cube([1.0, 0.0, 0.0], 1.0),
            cube([3.0, 0.0, 0.0], 1.0),
        ];
        let filters: Vec<Filter> = vec![
            Arc::new(SortByDistance::new([0.0; 3])),
            Arc::new(Limit { max: 2 }),
            Arc::new(Keep(vec![1])),
        ];
        assert_eq!(apply_filters(&boxes, &filters).unwrap(), vec![2]);
    }

    #[test]
    fn out_of_range_index_is_invalid_option() {
        let boxes = [cube([0.0; 3], 1.0)];
        let filters: Vec<Filter> = vec![Arc::new(Limit { max: 5 }), Arc::new(Keep(vec![0, 3]))];
        let err = apply_filters(&boxes, &filters).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidOption { position: 1, .. }));
    }

    #[test]
    fn parse_known_filters() {
        let filters = parse_filters(&[
            json!({"sortByDistance": {"pivot": [1.0, 2.0, 3.0]}}),
            json!({"limit": {"max": 10}}),
        ])
        .unwrap();
        assert_eq!(filters.len(), 2);
    }

    #[test]
    fn parse_rejects_non_strategies() {
        let err = parse_filters(&[json!({"limit": {"max": 1}}), json!("somestring")]).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidOption { position: 1, .. }));
        assert_eq!(err.kind(), ErrorKind::InvalidOption);

        let err = parse_filters(&[json!({"sortByDistance": {"pivot": [0, 0]}})]).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidOption { position: 0, .. }));
    }

    #[test]
    fn non_finite_pivot_fails_validation() {
        let filters: Vec<Filter> = vec![Arc::new(SortByDistance::new([0.0, f64::NAN, 0.0]))];
        let err = validate_filters(&filters).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOption);
    }
}
