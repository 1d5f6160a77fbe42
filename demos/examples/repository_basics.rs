// Copyright 2025 the Renderdb Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Repository basics.
//!
//! Add a few objects to an in-memory repository, query a volume with filter
//! options parsed from JSON, and consume the result stream.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p renderdb_demos --example repository_basics`

use std::sync::Arc;

use renderdb_repository::filter::parse_filters;
use renderdb_repository::{Bounds, GeometryObject, MemoryStore, Repository};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut repo = Repository::new(Arc::new(MemoryStore::default())).await?;
    for (i, name) in ["crate", "barrel", "lamp", "statue"].into_iter().enumerate() {
        let offset = i as f64 * 3.0;
        let object = GeometryObject::new(
            Bounds::from_origin_size(offset, 0.0, offset, 1.0, 2.0, 1.0),
            format!("o {name}\nv 0 0 0\n").into_bytes(),
            json!({ "name": name }),
        )
        .in_world(1)
        .in_layer(1);
        let id = repo.add(&object).await?;
        println!("added {name} as {id}");
    }

    // Options usually arrive with a request; anything unknown is rejected by position.
    let filters = parse_filters(&[
        json!({ "sortByDistance": { "pivot": [10.0, 0.0, 10.0] } }),
        json!({ "limit": { "max": 2 } }),
    ])?;
    let volume = Bounds::new(-1.0, -1.0, -1.0, 20.0, 5.0, 20.0);
    println!("nearest ids: {:?}", repo.get_inside_volume_ids(&volume, &filters)?);

    let mut stream = repo.get_inside_volume(&volume, &filters);
    while let Some(item) = stream.next().await {
        let object = item?;
        println!("{:?}: {}", object.id, object.metadata["name"]);
    }

    match parse_filters(&[json!("somestring")]) {
        Ok(_) => println!("unexpectedly accepted"),
        Err(err) => println!("rejected option: {err}"),
    }
    Ok(())
}
