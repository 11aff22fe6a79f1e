//! Snapshot delivery backends.
//!
//! The pipeline only knows "write this JSON payload at this path"; whether
//! that lands in local fixture files or a remote object store is decided once
//! at process start by [`StorageBackend`] and never re-examined mid-run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

/// Blob path of one asset's graph snapshot, keyed by its canonical root id.
pub fn graph_snapshot_path(root_node_id: &str) -> String {
    format!("exposure/graph/{root_node_id}.json")
}

/// Blob path of the flattened root-node search index.
pub fn search_index_path() -> String {
    "exposure/search-index.json".to_string()
}

/// Which delivery backend a run publishes to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    /// Pretty-printed JSON files under a local fixture directory.
    LocalFixture { output_dir: PathBuf },
    /// HTTP PUTs against an object-store endpoint.
    RemoteObjectStore { base_url: String, token: String },
}

/// Uniform "write payload at path" interface over the delivery backends.
///
/// Returns the location the payload is reachable at (a filesystem path or a
/// public URL).
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn put_json(&self, path: &str, payload: &serde_json::Value) -> Result<String>;
}

impl StorageBackend {
    /// Construct the store for this backend.
    pub fn into_store(self) -> Box<dyn SnapshotStore> {
        match self {
            Self::LocalFixture { output_dir } => Box::new(LocalFixtureStore::new(output_dir)),
            Self::RemoteObjectStore { base_url, token } => {
                Box::new(RemoteObjectStore::new(base_url, token))
            }
        }
    }
}

/// Serialize a payload for delivery.
pub fn to_json_value<T: Serialize>(payload: &T) -> Result<serde_json::Value> {
    serde_json::to_value(payload).context("failed to serialize payload")
}

/// Fixture-backed store writing pretty-printed JSON files.
pub struct LocalFixtureStore {
    output_dir: PathBuf,
}

impl LocalFixtureStore {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    fn write_json_file(path: &Path, payload: &serde_json::Value) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = fs::File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, payload)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for LocalFixtureStore {
    async fn put_json(&self, path: &str, payload: &serde_json::Value) -> Result<String> {
        let full_path = self.output_dir.join(path);
        Self::write_json_file(&full_path, payload)?;

        tracing::debug!(
            target: "exposure_snapshot_store",
            path = %full_path.display(),
            "wrote fixture snapshot"
        );
        Ok(full_path.display().to_string())
    }
}

/// Object-store backend: one HTTP PUT per payload, authenticated with a
/// bearer token, published publicly readable.
pub struct RemoteObjectStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl RemoteObjectStore {
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }
}

#[async_trait]
impl SnapshotStore for RemoteObjectStore {
    async fn put_json(&self, path: &str, payload: &serde_json::Value) -> Result<String> {
        let url = format!("{}/{path}", self.base_url);
        let body = serde_json::to_string(payload).context("failed to serialize payload")?;

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header("x-access", "public")
            .body(body)
            .send()
            .await
            .with_context(|| format!("failed to upload {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("upload of {url} rejected with {status}: {body}");
        }

        tracing::debug!(
            target: "exposure_snapshot_store",
            url = %url,
            "uploaded snapshot"
        );
        Ok(url)
    }
}
