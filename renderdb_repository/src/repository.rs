// Copyright 2025 the Renderdb Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The spatial geometry repository.

use std::collections::{HashMap, HashSet};
use std::fmt::{self, Debug};
use std::sync::Arc;

use renderdb_index::{IndexGeneric, Key, RTreeF64};

use crate::config::RepositoryConfig;
use crate::error::{RepositoryError, Result};
use crate::filter::{Filter, apply_filters, validate_filters};
use crate::object::{Bounds, GeometryObject, ObjectId, validate_bounds};
use crate::store::BackingStore;
use crate::stream::{self, ObjectStream};

type SpatialIndex = IndexGeneric<f64, ObjectId, RTreeF64>;

/// Geometry objects indexed by bounding box, backed by a durable store.
///
/// The R-tree holds only `(bounds, id)` pairs; full objects live in the store
/// and are hydrated on demand. Every identifier in the index is known to the
/// store: objects are indexed only after the store accepted them, and on
/// construction the index is rebuilt from the store's contents.
///
/// Mutation takes `&mut self` and queries take `&self`, so wrap the repository
/// in a lock of your choice to share it between tasks.
pub struct Repository<S: BackingStore + ?Sized> {
    store: Arc<S>,
    index: SpatialIndex,
    keys: HashMap<ObjectId, Key>,
    config: RepositoryConfig,
}

impl<S: BackingStore + ?Sized> Debug for Repository<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("len", &self.index.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: BackingStore + ?Sized> Repository<S> {
    /// Open a repository over `store` with the default configuration.
    ///
    /// See [`with_config`](Self::with_config).
    pub async fn new(store: Arc<S>) -> Result<Self> {
        Self::with_config(store, RepositoryConfig::default()).await
    }

    /// Open a repository over `store`, rebuilding the index from everything
    /// the store holds.
    ///
    /// The first error reported by the store aborts construction.
    pub async fn with_config(store: Arc<S>, config: RepositoryConfig) -> Result<Self> {
        config.validate()?;
        tracing::info!("replaying backing store into spatial index");

        let mut rows = store.get_all();
        let mut entries: Vec<(Bounds, ObjectId)> = Vec::new();
        let mut seen: HashSet<ObjectId> = HashSet::new();
        while let Some(item) = rows.next().await {
            let object = item?;
            let id = object.id.ok_or_else(|| {
                RepositoryError::Store("backing store returned an object without identifier".into())
            })?;
            validate_bounds(&object.bounds)?;
            if !seen.insert(id) {
                return Err(RepositoryError::DuplicateId(id));
            }
            entries.push((object.bounds, id));
        }

        let index = SpatialIndex::with_rtree_bulk_fanout(
            &entries,
            config.rtree_max_children,
            config.rtree_min_children,
        );
        let keys = index.iter().map(|(key, _, id)| (id, key)).collect();
        tracing::info!(objects = entries.len(), "replay finished");
        Ok(Self {
            store,
            index,
            keys,
            config,
        })
    }

    /// Number of indexed objects.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether no objects are indexed.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Bounds recorded in the index for `id`, if it is indexed.
    pub fn indexed_bounds(&self, id: ObjectId) -> Option<Bounds> {
        let key = self.keys.get(&id)?;
        self.index.get(*key).map(|(bounds, _)| bounds)
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The configuration in use.
    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Persist `object` and index it, returning the store-assigned identifier.
    ///
    /// The store is written first. If it fails, the index is not touched.
    /// Invalid bounds are rejected before the store is called.
    pub async fn add(&mut self, object: &GeometryObject) -> Result<ObjectId> {
        validate_bounds(&object.bounds)?;
        let id = self.store.add(object).await?;
        if self.keys.contains_key(&id) {
            return Err(RepositoryError::DuplicateId(id));
        }
        let key = self.index.insert(object.bounds, id);
        self.keys.insert(id, key);
        tracing::debug!(id, indexed = self.index.len(), "added geometry object");
        Ok(id)
    }

    /// Identifiers of the objects whose bounds intersect `volume`, after
    /// running the filter pipeline. The store is not consulted.
    ///
    /// Before filtering, candidates are ordered by identifier.
    pub fn get_inside_volume_ids(&self, volume: &Bounds, filters: &[Filter]) -> Result<Vec<ObjectId>> {
        validate_filters(filters)?;
        validate_bounds(volume)?;

        let mut hits: Vec<(Key, ObjectId)> = self.index.query_box(*volume).collect();
        hits.sort_unstable_by_key(|&(_, id)| id);
        let boxes: Vec<Bounds> = hits
            .iter()
            .filter_map(|&(key, _)| self.index.get(key).map(|(bounds, _)| bounds))
            .collect();
        let order = apply_filters(&boxes, filters)?;
        tracing::debug!(candidates = hits.len(), kept = order.len(), "volume query");
        Ok(order.into_iter().map(|i| hits[i].1).collect())
    }

    /// Stream the objects whose bounds intersect `volume`, filtered.
    ///
    /// Invalid filters or bounds yield a stream holding only that error.
    /// Objects are not guaranteed to arrive in filter order.
    pub fn get_inside_volume(&self, volume: &Bounds, filters: &[Filter]) -> ObjectStream {
        match self.get_inside_volume_ids(volume, filters) {
            Ok(ids) => self.retrieve_from_store(ids),
            Err(err) => ObjectStream::failed(err),
        }
    }

    /// Stream the objects with the given identifiers straight from the store.
    pub fn get_with_ids(&self, ids: Vec<ObjectId>) -> ObjectStream {
        self.retrieve_from_store(ids)
    }

    /// Fetch a single object.
    ///
    /// Fails with [`RepositoryError::NotFound`] if the store has no such object.
    pub async fn get_with_id(&self, id: ObjectId) -> Result<GeometryObject> {
        match self.get_with_ids(vec![id]).next().await {
            Some(result) => result,
            None => Err(RepositoryError::NotFound {
                expected: 1,
                actual: 0,
            }),
        }
    }

    /// Relay `store.get_many(ids)` onto a fresh stream, stopping at the first
    /// error. Rows the store returns for identifiers that were not asked for
    /// are rejected.
    fn retrieve_from_store(&self, ids: Vec<ObjectId>) -> ObjectStream {
        if ids.is_empty() {
            return ObjectStream::empty();
        }
        let requested: HashSet<ObjectId> = ids.iter().copied().collect();
        let mut rows = self.store.get_many(ids);
        let (mut sink, out) = stream::channel(self.config.channel_capacity);
        tokio::spawn(async move {
            while let Some(item) = rows.next().await {
                let err = match item {
                    Ok(object) if object.id.is_some_and(|id| requested.contains(&id)) => {
                        if !sink.send(object).await {
                            return;
                        }
                        continue;
                    }
                    Ok(object) => RepositoryError::Store(format!(
                        "backing store returned object {:?} which was not requested",
                        object.id
                    )),
                    Err(err) => err,
                };
                tracing::warn!(error = %err, delivered = sink.sent(), "retrieval aborted");
                sink.fail(err).await;
                return;
            }
        });
        out
    }
}
