// Copyright 2025 the Renderdb Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry objects as stored by the repository.

use renderdb_index::Aabb3D;
use serde::{Deserialize, Serialize};

use crate::error::{RepositoryError, Result};

/// Store-assigned object identifier.
pub type ObjectId = i64;

/// Bounding box type used throughout the repository.
pub type Bounds = Aabb3D<f64>;

/// A geometric object: bounding box, opaque geometry payload, and metadata.
///
/// Objects are built by a geometry producer with `id == None`. The identifier
/// is assigned by the backing store once the object has been added; objects
/// read back from a store always carry one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryObject {
    /// Store-assigned identifier, `None` until persisted.
    pub id: Option<ObjectId>,
    /// Owning world, if any.
    pub world_id: Option<i64>,
    /// Owning layer, if any.
    pub layer_id: Option<i64>,
    /// Owning scene, if any.
    pub scene_id: Option<i64>,
    /// Axis-aligned bounds of the geometry.
    #[serde(with = "bounds_serde")]
    pub bounds: Bounds,
    /// Opaque geometry payload. Never inspected by the repository.
    pub geometry: Vec<u8>,
    /// Arbitrary JSON metadata, `Null` when absent.
    pub metadata: serde_json::Value,
}

impl GeometryObject {
    /// Create an ad-hoc object that belongs to no world, layer, or scene.
    pub fn new(bounds: Bounds, geometry: impl Into<Vec<u8>>, metadata: serde_json::Value) -> Self {
        Self {
            id: None,
            world_id: None,
            layer_id: None,
            scene_id: None,
            bounds,
            geometry: geometry.into(),
            metadata,
        }
    }

    /// Attach the object to a world.
    pub fn in_world(mut self, world_id: i64) -> Self {
        self.world_id = Some(world_id);
        self
    }

    /// Attach the object to a layer.
    pub fn in_layer(mut self, layer_id: i64) -> Self {
        self.layer_id = Some(layer_id);
        self
    }

    /// Attach the object to a scene.
    pub fn in_scene(mut self, scene_id: i64) -> Self {
        self.scene_id = Some(scene_id);
        self
    }

    /// Copy of this object carrying the given identifier.
    pub fn with_id(mut self, id: ObjectId) -> Self {
        self.id = Some(id);
        self
    }
}

/// Reject bounds that cannot be indexed: non-finite coordinates or `min > max`
/// on any axis.
pub fn validate_bounds(bounds: &Bounds) -> Result<()> {
    if !bounds.is_finite() {
        return Err(RepositoryError::InvalidInput(format!(
            "bounds must be finite, got {bounds:?}"
        )));
    }
    if bounds.is_empty() {
        return Err(RepositoryError::InvalidInput(format!(
            "bounds minimum exceeds maximum: {bounds:?}"
        )));
    }
    Ok(())
}

/// Serialize bounds as `{ "min": [x, y, z], "max": [x, y, z] }`.
mod bounds_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Bounds;

    #[derive(Serialize, Deserialize)]
    struct Corners {
        min: [f64; 3],
        max: [f64; 3],
    }

    pub(super) fn serialize<S: Serializer>(b: &Bounds, s: S) -> Result<S::Ok, S::Error> {
        Corners {
            min: b.min_corner(),
            max: b.max_corner(),
        }
        .serialize(s)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Bounds, D::Error> {
        let c = Corners::deserialize(d)?;
        Ok(Bounds::from_corners(c.min, c.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn new_objects_are_unpersisted() {
        let o = GeometryObject::new(Bounds::new(0.0, 0.0, 0.0, 1.0, 1.0, 1.0), vec![1, 2], json!(null))
            .in_world(1)
            .in_layer(2)
            .in_scene(3);
        assert_eq!(o.id, None);
        assert_eq!((o.world_id, o.layer_id, o.scene_id), (Some(1), Some(2), Some(3)));
        assert_eq!(o.clone().with_id(9).id, Some(9));
    }

    #[test]
    fn degenerate_bounds_are_valid() {
        let flat = Bounds::new(1.0, 1.0, 1.0, 1.0, 1.0, 1.0);
        assert!(validate_bounds(&flat).is_ok());
    }

    #[test]
    fn inverted_or_nan_bounds_are_invalid_input() {
        let inverted = Bounds::new(0.0, 2.0, 0.0, 1.0, 1.0, 1.0);
        assert_eq!(validate_bounds(&inverted).unwrap_err().kind(), ErrorKind::InvalidInput);
        let nan = Bounds::new(0.0, 0.0, f64::NAN, 1.0, 1.0, 1.0);
        assert_eq!(validate_bounds(&nan).unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn bounds_serialize_as_corners() {
        let o = GeometryObject::new(Bounds::new(0.0, 1.0, 2.0, 3.0, 4.0, 5.0), vec![], json!({"k": 1}));
        let v = serde_json::to_value(&o).unwrap();
        assert_eq!(v["bounds"], json!({"min": [0.0, 1.0, 2.0], "max": [3.0, 4.0, 5.0]}));
        let back: GeometryObject = serde_json::from_value(v).unwrap();
        assert_eq!(back, o);
    }
}
