// Copyright 2025 the Renderdb Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Renderdb Repository: geometry objects indexed by 3D bounding box.
//!
//! A [`Repository`] keeps an in-memory R-tree of `(bounds, id)` pairs in step
//! with a [`BackingStore`] holding the full objects (bounds, opaque geometry
//! bytes, JSON metadata, and world/layer/scene ownership).
//!
//! - On open, the index is rebuilt from everything the store holds.
//! - [`Repository::add`] writes to the store first and indexes only on success.
//! - Volume queries run against the index, pass through a pipeline of
//!   [`filter`] strategies, and are then hydrated from the store as an
//!   [`ObjectStream`].
//!
//! Two stores are provided: [`MemoryStore`] and [`SqliteStore`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use renderdb_repository::filter::{Filter, SortByDistance};
//! use renderdb_repository::{Bounds, GeometryObject, MemoryStore, Repository};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> renderdb_repository::Result<()> {
//! let mut repo = Repository::new(Arc::new(MemoryStore::default())).await?;
//! let near = repo
//!     .add(&GeometryObject::new(Bounds::new(1.0, 1.0, 1.0, 2.0, 2.0, 2.0), vec![1], serde_json::Value::Null))
//!     .await?;
//! let far = repo
//!     .add(&GeometryObject::new(Bounds::new(8.0, 8.0, 8.0, 9.0, 9.0, 9.0), vec![2], serde_json::Value::Null))
//!     .await?;
//!
//! let nearest_first: Vec<Filter> = vec![Arc::new(SortByDistance::new([0.0, 0.0, 0.0]))];
//! let everything = Bounds::new(0.0, 0.0, 0.0, 10.0, 10.0, 10.0);
//! assert_eq!(repo.get_inside_volume_ids(&everything, &nearest_first)?, vec![near, far]);
//!
//! let object = repo.get_with_id(far).await?;
//! assert_eq!(object.geometry, vec![2]);
//! # Ok(())
//! # }
//! ```
//!
//! Multi-object operations must be called from within a Tokio runtime: results
//! are produced by spawned tasks.

pub mod config;
pub mod error;
pub mod filter;
pub mod object;
pub mod repository;
pub mod store;
pub mod stream;

pub use config::RepositoryConfig;
pub use error::{ErrorKind, RepositoryError, Result};
pub use object::{Bounds, GeometryObject, ObjectId};
pub use repository::Repository;
pub use store::{BackingStore, MemoryStore, SqliteStore};
pub use stream::{Collected, ObjectSink, ObjectStream};
