//! Merge store accumulating one asset's draft graph.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::types::{Edge, GraphSnapshot, LendingPosition, Node};

/// Deduplication key for edges: the same node pair may legitimately carry two
/// edges when they represent distinct lending exposures.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct EdgeKey {
    from: String,
    to: String,
    position: Option<LendingPosition>,
}

impl EdgeKey {
    fn of(edge: &Edge) -> Self {
        Self {
            from: edge.from.clone(),
            to: edge.to.clone(),
            position: edge.lending_position,
        }
    }
}

/// In-memory accumulator for one asset's nodes and edges.
///
/// One store exists per asset per run and is written by every adapter that
/// contributes to that asset. Writes are never concurrent: the runtime runs
/// adapters strictly one at a time, which is what makes the plain maps below
/// sufficient.
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: HashMap<String, Node>,
    node_order: Vec<String>,
    edges: HashMap<EdgeKey, Edge>,
    edge_order: Vec<EdgeKey>,
    sources: Vec<String>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, or fill the missing fields of the stored one.
    ///
    /// An existing populated field is never overwritten. A node often appears
    /// first as a sparse leaf reference from one resolution path and later as
    /// a fully described root from another (or the other way around); filling
    /// only absent fields lets sparse nodes be enriched without letting them
    /// erase richer data.
    pub fn upsert_node(&mut self, node: Node) {
        match self.nodes.entry(node.id.clone()) {
            Entry::Vacant(slot) => {
                self.node_order.push(node.id.clone());
                slot.insert(node);
            }
            Entry::Occupied(mut slot) => {
                let current = slot.get_mut();
                if current.chain.is_none() {
                    current.chain = node.chain;
                }
                if current.protocol.is_none() {
                    current.protocol = node.protocol;
                }
                if current.apy.is_none() {
                    current.apy = node.apy;
                }
                if current.tvl_usd.is_none() {
                    current.tvl_usd = node.tvl_usd;
                }
                if current.details.is_none() {
                    current.details = node.details;
                }
            }
        }
    }

    pub fn upsert_nodes(&mut self, nodes: impl IntoIterator<Item = Node>) {
        for node in nodes {
            self.upsert_node(node);
        }
    }

    /// Record an allocation edge.
    ///
    /// Edges sharing a `(from, to, lending_position)` key accumulate their
    /// USD notional: the same relationship can be rediscovered independently
    /// (e.g. several wallets exposed to one downstream position) and the
    /// total must be the sum of all contributions.
    pub fn add_edge(&mut self, edge: Edge) {
        match self.edges.entry(EdgeKey::of(&edge)) {
            Entry::Vacant(slot) => {
                self.edge_order.push(slot.key().clone());
                slot.insert(edge);
            }
            Entry::Occupied(mut slot) => {
                slot.get_mut().allocation_usd += edge.allocation_usd;
            }
        }
    }

    pub fn add_edges(&mut self, edges: impl IntoIterator<Item = Edge>) {
        for edge in edges {
            self.add_edge(edge);
        }
    }

    /// Record a provenance label for an adapter that contributed to this
    /// store.
    pub fn record_source(&mut self, source: &str) {
        if !self.sources.iter().any(|existing| existing == source) {
            self.sources.push(source.to_string());
        }
    }

    /// Adapters that contributed to this store, in contribution order.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// The first node inserted into the store.
    ///
    /// The runtime upserts each asset's root before any leaf, so this is the
    /// asset's root node; delivery relies on that ordering.
    pub fn root_node(&self) -> Option<&Node> {
        self.node_order.first().map(|id| &self.nodes[id])
    }

    pub fn node_count(&self) -> usize {
        self.node_order.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_order.len()
    }

    /// Materialize the accumulated graph into an immutable snapshot, in
    /// insertion order, with the supplied provenance labels.
    pub fn to_snapshot(&self, sources: Vec<String>) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self
                .node_order
                .iter()
                .map(|id| self.nodes[id].clone())
                .collect(),
            edges: self
                .edge_order
                .iter()
                .map(|key| self.edges[key].clone())
                .collect(),
            sources,
        }
    }
}
