// Copyright 2025 the Renderdb Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! SQLite backing store.

use std::collections::BTreeSet;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};

use super::{BackingStore, BatchFetch};
use crate::config::RepositoryConfig;
use crate::error::Result;
use crate::object::{Bounds, GeometryObject, ObjectId};
use crate::stream::{self, ObjectStream};

const COLUMNS: &str = "id, world_id, layer_id, scene_id, \
    bounds_x_min, bounds_y_min, bounds_z_min, bounds_x_max, bounds_y_max, bounds_z_max, \
    geometry_data, metadata";

/// Backing store persisting objects in a `geometry_objects` SQLite table.
///
/// ```no_run
/// # async fn demo() -> renderdb_repository::Result<()> {
/// use renderdb_repository::{RepositoryConfig, SqliteStore};
///
/// let store = SqliteStore::connect("sqlite:geometry.db", RepositoryConfig::default()).await?;
/// # Ok(()) }
/// ```
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    config: RepositoryConfig,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and make sure the
    /// table exists.
    ///
    /// In-memory databases (`sqlite::memory:`) live as long as their only
    /// connection, so the pool is limited to a single connection.
    pub async fn connect(url: &str, config: RepositoryConfig) -> Result<Self> {
        let opts = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;
        let store = Self::from_pool(pool, config);
        store.ensure_schema().await?;
        tracing::info!(url, "opened SQLite geometry store");
        Ok(store)
    }

    /// Wrap an existing pool. The schema is not touched.
    pub fn from_pool(pool: Pool<Sqlite>, config: RepositoryConfig) -> Self {
        Self { pool, config }
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Create the `geometry_objects` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS geometry_objects (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                world_id INTEGER,
                layer_id INTEGER,
                scene_id INTEGER,
                bounds_x_min REAL NOT NULL,
                bounds_y_min REAL NOT NULL,
                bounds_z_min REAL NOT NULL,
                bounds_x_max REAL NOT NULL,
                bounds_y_max REAL NOT NULL,
                bounds_z_max REAL NOT NULL,
                geometry_data BLOB NOT NULL,
                metadata TEXT
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Number of stored objects.
    pub async fn count(&self) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) FROM geometry_objects")
            .fetch_one(&self.pool)
            .await?;
        let n: i64 = row.try_get(0)?;
        Ok(usize::try_from(n).unwrap_or_default())
    }
}

fn decode_row(row: &SqliteRow) -> Result<GeometryObject> {
    let bounds = Bounds::new(
        row.try_get("bounds_x_min")?,
        row.try_get("bounds_y_min")?,
        row.try_get("bounds_z_min")?,
        row.try_get("bounds_x_max")?,
        row.try_get("bounds_y_max")?,
        row.try_get("bounds_z_max")?,
    );
    let metadata: Option<String> = row.try_get("metadata")?;
    let metadata = match metadata.as_deref() {
        None | Some("") => serde_json::Value::Null,
        Some(text) => serde_json::from_str(text)?,
    };
    Ok(GeometryObject {
        id: Some(row.try_get("id")?),
        world_id: row.try_get("world_id")?,
        layer_id: row.try_get("layer_id")?,
        scene_id: row.try_get("scene_id")?,
        bounds,
        geometry: row.try_get("geometry_data")?,
        metadata,
    })
}

async fn fetch_chunk(pool: &Pool<Sqlite>, ids: &[ObjectId]) -> Result<Vec<SqliteRow>> {
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("SELECT {COLUMNS} FROM geometry_objects WHERE id IN ({placeholders})");
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(*id);
    }
    Ok(query.fetch_all(pool).await?)
}

async fn fetch_page(
    pool: &Pool<Sqlite>,
    after: ObjectId,
    limit: usize,
) -> Result<Vec<SqliteRow>> {
    let sql = format!("SELECT {COLUMNS} FROM geometry_objects WHERE id > ? ORDER BY id LIMIT ?");
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    Ok(sqlx::query(&sql)
        .bind(after)
        .bind(limit)
        .fetch_all(pool)
        .await?)
}

#[async_trait]
impl BackingStore for SqliteStore {
    async fn add(&self, object: &GeometryObject) -> Result<ObjectId> {
        let metadata = serde_json::to_string(&object.metadata)?;
        let b = &object.bounds;
        let result = sqlx::query(
            "INSERT INTO geometry_objects (
                world_id, layer_id, scene_id,
                bounds_x_min, bounds_y_min, bounds_z_min,
                bounds_x_max, bounds_y_max, bounds_z_max,
                geometry_data, metadata
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(object.world_id)
        .bind(object.layer_id)
        .bind(object.scene_id)
        .bind(b.min_x)
        .bind(b.min_y)
        .bind(b.min_z)
        .bind(b.max_x)
        .bind(b.max_y)
        .bind(b.max_z)
        .bind(object.geometry.as_slice())
        .bind(metadata)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    fn get_many(&self, ids: Vec<ObjectId>) -> ObjectStream {
        if ids.is_empty() {
            return ObjectStream::empty();
        }
        let (sink, out) = stream::channel(self.config.channel_capacity);
        let pool = self.pool.clone();
        let chunk_size = self.config.fetch_chunk_size;
        tokio::spawn(async move {
            let mut batch = BatchFetch::new(sink, ids.len());
            // Repeats would match again in every other chunk that lists them.
            let unique: Vec<ObjectId> = ids
                .into_iter()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            for chunk in unique.chunks(chunk_size) {
                let rows = match fetch_chunk(&pool, chunk).await {
                    Ok(rows) => rows,
                    Err(err) => {
                        batch.fail(err).await;
                        return;
                    }
                };
                for row in &rows {
                    match decode_row(row) {
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
        let pool = self.pool.clone();
        let page = self.config.fetch_chunk_size;
        tokio::spawn(async move {
            let mut after = ObjectId::MIN;
            loop {
                let rows = match fetch_page(&pool, after, page).await {
                    Ok(rows) if rows.is_empty() => return,
                    Ok(rows) => rows,
                    Err(err) => {
                        sink.fail(err).await;
                        return;
                    }
                };
                for row in &rows {
                    let object = match decode_row(row) {
                        Ok(object) => object,
                        Err(err) => {
                            sink.fail(err).await;
                            return;
                        }
                    };
                    after = object.id.unwrap_or(after);
                    if !sink.send(object).await {
                        return;
                    }
                }
            }
        });
        out
    }
}
