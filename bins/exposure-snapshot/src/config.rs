//! Configuration for the snapshot publisher.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use exposure_registry::Provider;
use exposure_snapshot_store::StorageBackend;

/// Exposure graph snapshot publisher.
///
/// Runs one full aggregation pass over the configured providers and
/// publishes one graph snapshot per asset plus a search index.
#[derive(Parser, Debug)]
#[command(name = "exposure-snapshot")]
#[command(about = "Aggregate DeFi exposure graphs and publish snapshots", long_about = None)]
pub struct Config {
    /// Providers to run (comma-separated; defaults to all registered)
    #[arg(long, value_delimiter = ',')]
    pub providers: Vec<Provider>,

    /// Where snapshots are published
    #[arg(long, value_enum, default_value_t = StorageMode::Local)]
    pub storage: StorageMode,

    /// Output directory for local fixture snapshots
    #[arg(long, default_value = "fixtures/output")]
    pub output_dir: PathBuf,

    /// Object-store endpoint for remote storage
    #[arg(long, env = "BLOB_STORE_URL")]
    pub blob_store_url: Option<String>,

    /// Object-store write token for remote storage
    #[arg(long, env = "BLOB_STORE_TOKEN", hide_env_values = true)]
    pub blob_store_token: Option<String>,

    /// Debank pro-openapi access key
    #[arg(long, env = "DEBANK_ACCESS_KEY", hide_env_values = true)]
    pub debank_access_key: Option<String>,

    /// Dune Analytics API key
    #[arg(long, env = "DUNE_API_KEY", hide_env_values = true)]
    pub dune_api_key: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StorageMode {
    /// Pretty-printed JSON fixtures on the local filesystem
    Local,
    /// HTTP object store
    Remote,
}

impl Config {
    /// Providers scoped for this run.
    pub fn providers(&self) -> Vec<Provider> {
        if self.providers.is_empty() {
            Provider::ALL.to_vec()
        } else {
            self.providers.clone()
        }
    }

    /// Resolve the delivery backend once, at startup.
    pub fn storage_backend(&self) -> Result<StorageBackend> {
        match self.storage {
            StorageMode::Local => Ok(StorageBackend::LocalFixture {
                output_dir: self.output_dir.clone(),
            }),
            StorageMode::Remote => Ok(StorageBackend::RemoteObjectStore {
                base_url: self
                    .blob_store_url
                    .clone()
                    .context("remote storage requires --blob-store-url")?,
                token: self
                    .blob_store_token
                    .clone()
                    .context("remote storage requires --blob-store-token")?,
            }),
        }
    }
}
