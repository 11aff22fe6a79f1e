//! Capability contract implemented by every provider integration.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{Edge, Node};

/// Nodes and edges produced for one root's downstream subtree.
#[derive(Clone, Debug, Default)]
pub struct GraphResult {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl GraphResult {
    /// Append another result's contributions to this one.
    pub fn merge(&mut self, other: GraphResult) {
        self.nodes.extend(other.nodes);
        self.edges.extend(other.edges);
    }
}

/// Provider integration contract.
///
/// `Catalog` and `Entry` are provider-shaped and opaque to the runtime: the
/// runtime only ever moves them between the methods below, never inspects
/// them. Grouped asset maps are ordered so a run visits assets
/// deterministically.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Raw dataset returned by one provider fetch.
    type Catalog: Send;
    /// One raw allocation entry grouped under an asset.
    type Entry: Send + Sync;

    /// Provider identifier, used for provenance labels and logs.
    fn id(&self) -> &'static str;

    /// Perform all network I/O needed to obtain the provider's raw dataset.
    ///
    /// Failures are not retried here; a failing catalog fetch aborts the run
    /// it is part of.
    async fn fetch_catalog(&self) -> Result<Self::Catalog>;

    /// Partition the catalog's raw entries by the asset they belong to.
    fn assets_by_allocations(&self, catalog: Self::Catalog)
        -> BTreeMap<String, Vec<Self::Entry>>;

    /// Construct the root node for one asset, or `None` to skip the asset.
    ///
    /// Returning `None` is the per-adapter eligibility gate (dust TVL, blank
    /// display name, structurally incomplete entries); it is a silent skip,
    /// not a failure.
    fn build_root_node(&self, asset: &str, entries: &[Self::Entry]) -> Option<Node>;

    /// Construct one allocation edge from one raw entry.
    ///
    /// Adapters that derive edges one-to-one from catalog entries override
    /// this; the default connects the pair with zero notional.
    fn build_edge(&self, root: &Node, leaf: &Node, _entry: &Self::Entry) -> Edge {
        Edge {
            from: root.id.clone(),
            to: leaf.id.clone(),
            allocation_usd: 0.0,
            lending_position: None,
        }
    }

    /// Produce the complete downstream subtree for one root.
    ///
    /// May issue further network calls (e.g. resolving a wallet's positions).
    /// Independent sub-resolutions for one root are expected to be dispatched
    /// as a joined concurrent group that fails fast.
    async fn normalize_leaves(&self, root: &Node, entries: &[Self::Entry])
        -> Result<GraphResult>;
}
