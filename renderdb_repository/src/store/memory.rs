// Copyright 2025 the Renderdb Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-process backing store.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound::{Excluded, Unbounded};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{BackingStore, BatchFetch};
use crate::config::RepositoryConfig;
use crate::error::Result;
use crate::object::{Bounds, GeometryObject, ObjectId};
use crate::stream::{self, ObjectStream};

/// A row as persisted: metadata is kept in its encoded JSON form.
#[derive(Debug, Clone)]
struct StoredRow {
    world_id: Option<i64>,
    layer_id: Option<i64>,
    scene_id: Option<i64>,
    bounds: Bounds,
    geometry: Vec<u8>,
    metadata: String,
}

impl StoredRow {
    fn decode(&self, id: ObjectId) -> Result<GeometryObject> {
        let metadata = if self.metadata.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&self.metadata)?
        };
        Ok(GeometryObject {
            id: Some(id),
            world_id: self.world_id,
            layer_id: self.layer_id,
            scene_id: self.scene_id,
            bounds: self.bounds,
            geometry: self.geometry.clone(),
            metadata,
        })
    }
}

#[derive(Debug)]
struct State {
    rows: BTreeMap<ObjectId, StoredRow>,
    next_id: ObjectId,
}

/// Backing store that keeps every object in memory.
///
/// Behaves like [`SqliteStore`](super::SqliteStore): identifiers start at 1,
/// batches are fetched in chunks, and metadata goes through a JSON round-trip.
/// Nothing survives the process; useful for tests, demos, and caches.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
    config: RepositoryConfig,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(RepositoryConfig::default())
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new(config: RepositoryConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(State {
                rows: BTreeMap::new(),
                next_id: 1,
            })),
            config,
        }
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.state.read().rows.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.state.read().rows.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn overwrite_metadata(&self, id: ObjectId, raw: &str) {
        if let Some(row) = self.state.write().rows.get_mut(&id) {
            row.metadata = raw.to_owned();
        }
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn add(&self, object: &GeometryObject) -> Result<ObjectId> {
        let metadata = serde_json::to_string(&object.metadata)?;
        let row = StoredRow {
            world_id: object.world_id,
            layer_id: object.layer_id,
            scene_id: object.scene_id,
            bounds: object.bounds,
            geometry: object.geometry.clone(),
            metadata,
        };
        let mut state = self.state.write();
        let id = state.next_id;
        state.next_id += 1;
        state.rows.insert(id, row);
        Ok(id)
    }

    fn get_many(&self, ids: Vec<ObjectId>) -> ObjectStream {
        if ids.is_empty() {
            return ObjectStream::empty();
        }
        let (sink, out) = stream::channel(self.config.channel_capacity);
        let state = Arc::clone(&self.state);
        let chunk_size = self.config.fetch_chunk_size;
        tokio::spawn(async move {
            let mut batch = BatchFetch::new(sink, ids.len());
            // Like an SQL `IN (...)` list, repeated identifiers match one row.
            let unique: Vec<ObjectId> = ids
                .into_iter()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            for chunk in unique.chunks(chunk_size) {
                let rows: Vec<(ObjectId, StoredRow)> = {
                    let state = state.read();
                    chunk
                        .iter()
                        .filter_map(|id| state.rows.get(id).map(|r| (*id, r.clone())))
                        .collect()
                };
                for (id, row) in rows {
                    match row.decode(id) {
                        Ok(object) => {
                            if !batch.deliver(object).await {
                                return;
                            }
                        }
                        Err(err) => {
                            batch.fail(err).await;
                            return;
                        }
                    }
                }
            }
            batch.finish().await;
        });
        out
    }

    fn get_all(&self) -> ObjectStream {
        let (mut sink, out) = stream::channel(self.config.channel_capacity);
        let state = Arc::clone(&self.state);
        let page = self.config.fetch_chunk_size;
        tokio::spawn(async move {
            let mut after: Option<ObjectId> = None;
            loop {
                let rows: Vec<(ObjectId, StoredRow)> = {
                    let state = state.read();
                    let lower = after.map_or(Unbounded, Excluded);
                    state
                        .rows
                        .range((lower, Unbounded))
                        .take(page)
                        .map(|(id, r)| (*id, r.clone()))
                        .collect()
                };
                let Some((last, _)) = rows.last() else {
                    return;
                };
                after = Some(*last);
                for (id, row) in rows {
                    match row.decode(id) {
                        Ok(object) => {
                            if !sink.send(object).await {
                                return;
                            }
                        }
                        Err(err) => {
                            sink.fail(err).await;
                            return;
                        }
                    }
                }
            }
        });
        out
    }
}
