//! Core aggregation engine for DeFi exposure graphs.
//!
//! Consolidates heterogeneous provider reports of capital allocations into
//! one canonical weighted graph per tracked asset: a root node (the asset)
//! connected by USD-weighted edges to the instruments it is allocated into,
//! recursively.

mod adapter;
pub mod eligibility;
mod error;
mod graph;
pub mod ident;
mod runtime;
mod types;

pub use adapter::{Adapter, GraphResult};
pub use error::EmptyAggregation;
pub use graph::GraphStore;
pub use runtime::{build_draft_graphs, RunnableAdapter, StoresByAsset};
pub use types::{Edge, GraphSnapshot, LendingPosition, Node, NodeDetails, SearchIndexEntry};
