// Copyright 2025 the Renderdb Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backing stores: durable homes for full geometry objects.
//!
//! The repository only needs three things from a store: append one object and
//! learn its identifier, stream back a batch of objects by identifier, and
//! stream back everything (used once, to rebuild the spatial index).

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::{RepositoryError, Result};
use crate::object::{GeometryObject, ObjectId};
use crate::stream::{ObjectSink, ObjectStream};

/// Durable storage for geometry objects keyed by store-assigned identifiers.
///
/// Streaming methods return immediately and produce results from a spawned
/// task, so they must be called from within a Tokio runtime.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Persist `object` and return its newly assigned identifier.
    ///
    /// Identifiers are unique and never decrease. The object's own `id`, if
    /// any, is ignored.
    async fn add(&self, object: &GeometryObject) -> Result<ObjectId>;

    /// Stream the objects with the given identifiers, in no particular order.
    ///
    /// If fewer objects are found than identifiers requested, the stream ends
    /// with [`RepositoryError::NotFound`]. An empty request yields an empty stream.
    fn get_many(&self, ids: Vec<ObjectId>) -> ObjectStream;

    /// Stream every stored object.
    fn get_all(&self) -> ObjectStream;
}

/// Tracks how many rows a batch fetch delivered and reports a shortfall.
#[derive(Debug)]
pub(crate) struct BatchFetch {
    sink: ObjectSink,
    expected: usize,
}

impl BatchFetch {
    pub(crate) fn new(sink: ObjectSink, expected: usize) -> Self {
        Self { sink, expected }
    }

    /// Forward one row. `false` means the consumer is gone.
    pub(crate) async fn deliver(&mut self, object: GeometryObject) -> bool {
        self.sink.send(object).await
    }

    /// Abort the batch with `err`.
    pub(crate) async fn fail(self, err: RepositoryError) {
        self.sink.fail(err).await;
    }

    /// Close the batch, failing it if rows went missing.
    pub(crate) async fn finish(self) {
        let actual = self.sink.sent();
        if actual < self.expected {
            self.sink
                .fail(RepositoryError::NotFound {
                    expected: self.expected,
                    actual,
                })
                .await;
        }
    }
}
