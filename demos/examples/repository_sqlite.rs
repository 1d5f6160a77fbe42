// Copyright 2025 the Renderdb Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! SQLite-backed repository.
//!
//! Open (or create) a database, add a batch of objects, then reopen the
//! repository to show the index being rebuilt from the table.
//!
//! Run:
//! - `cargo run -p renderdb_demos --example repository_sqlite -- geometry.db`
//!
//! Without an argument an in-memory database is used.

use std::sync::Arc;

use renderdb_repository::{Bounds, GeometryObject, Repository, RepositoryConfig, SqliteStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let url = match std::env::args().nth(1) {
        Some(path) => format!("sqlite:{path}"),
        None => "sqlite::memory:".to_owned(),
    };
    let config = RepositoryConfig::default().with_fetch_chunk_size(64);
    let store = Arc::new(SqliteStore::connect(&url, config.clone()).await?);

    let mut repo = Repository::with_config(Arc::clone(&store), config.clone()).await?;
    let before = repo.len();
    for i in 0..500 {
        let c = f64::from(i);
        let object = GeometryObject::new(
            Bounds::from_origin_size(c % 25.0, (c / 25.0).floor(), 0.0, 0.9, 0.9, 0.9),
            vec![0_u8; 16],
            serde_json::Value::Null,
        )
        .in_scene(7);
        repo.add(&object).await?;
    }
    println!("indexed {} -> {} objects", before, repo.len());
    drop(repo);

    let repo = Repository::with_config(store, config).await?;
    let volume = Bounds::new(0.0, 0.0, 0.0, 4.0, 4.0, 1.0);
    let collected = repo.get_inside_volume(&volume, &[]).collect().await;
    println!(
        "reopened with {} objects; {} hydrated from {:?}",
        repo.len(),
        collected.objects.len(),
        volume
    );
    if let Some(err) = collected.error {
        tracing::error!(error = %err, "hydration failed");
    }
    Ok(())
}
