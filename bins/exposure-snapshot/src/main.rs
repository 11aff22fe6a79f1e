//! Exposure snapshot publisher.
//!
//! Runs one full aggregation pass (fetch → group → normalize → merge) over
//! the configured providers, then publishes one graph snapshot per asset and
//! a flattened search index to the selected storage backend.
//!
//! # Usage
//!
//! ```bash
//! # Aggregate every registered provider into local fixtures
//! exposure-snapshot
//!
//! # Scope the run to two providers
//! exposure-snapshot --providers morpho,ethena
//!
//! # Publish to the object store
//! exposure-snapshot --storage remote
//! ```
//!
//! Any failing provider aborts the whole run: each run is a full, idempotent
//! re-snapshot, so a half-built result is never published.

mod config;
mod search_index;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use exposure_core::{build_draft_graphs, SearchIndexEntry};
use exposure_registry::{build_adapters, RegistryConfig};
use exposure_snapshot_store::{
    graph_snapshot_path, search_index_path, to_json_value,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(true)
        .init();

    let providers = config.providers();
    tracing::info!(
        providers = ?providers.iter().map(|p| p.id()).collect::<Vec<_>>(),
        storage = ?config.storage,
        "starting exposure snapshot run"
    );

    let registry_config = RegistryConfig {
        debank_access_key: config.debank_access_key.clone(),
        dune_api_key: config.dune_api_key.clone(),
    };
    let adapters = build_adapters(&providers, &registry_config)?;
    let store = config.storage_backend()?.into_store();

    let draft_graphs = build_draft_graphs(&adapters).await?;

    let mut index_entries = Vec::new();

    for (asset, graph) in &draft_graphs {
        let snapshot = graph.to_snapshot(graph.sources().to_vec());
        let root = graph
            .root_node()
            .with_context(|| format!("missing root node for asset {asset}"))?;

        let path = graph_snapshot_path(&root.id);
        let location = store.put_json(&path, &to_json_value(&snapshot)?).await?;

        tracing::info!(
            asset = %asset,
            location = %location,
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            "published snapshot"
        );

        index_entries.extend(SearchIndexEntry::from_root_node(root));
    }

    let index = search_index::dedupe_and_sort(index_entries);
    store
        .put_json(&search_index_path(), &to_json_value(&index)?)
        .await?;
    tracing::info!(entries = index.len(), "published search index");

    Ok(())
}
