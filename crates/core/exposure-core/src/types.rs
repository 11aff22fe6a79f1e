//! Fundamental data structures shared by adapters, resolvers, and the runtime.

use serde::{Deserialize, Serialize};

/// Kind-specific payload attached to a node.
///
/// Serialized as a `kind`-tagged object so snapshot consumers can dispatch on
/// one discriminant instead of probing for fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all_fields = "camelCase")]
pub enum NodeDetails {
    /// A leveraged lending position (one wallet's account in one market).
    Lending {
        collateral_usd: f64,
        debt_usd: f64,
        net_usd: f64,
        health_rate: f64,
    },
    /// A lending market an allocation supplies into.
    #[serde(rename = "Lending Market")]
    LendingMarket,
    /// A curated yield vault.
    Yield { curator: Option<String> },
    Deposit,
    Staked,
    Locked,
    #[serde(rename = "Liquidity Pool")]
    LiquidityPool,
    /// Insurance-style capital that absorbs losses first.
    Protection {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        curator: Option<String>,
    },
    Perpetuals,
    /// Terminal off-chain or custodial venue allocation.
    Investment,
}

/// A vertex in an asset's exposure graph.
///
/// `id` is the node's sole identity: two nodes with the same id anywhere in
/// the pipeline describe the same real-world object and must merge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvl_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<NodeDetails>,
}

impl Node {
    /// A sparse node carrying only identity and a display label.
    ///
    /// Handy as a struct-update base when building richer nodes:
    /// `Node { tvl_usd: Some(tvl), ..Node::new(id, name) }`.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            chain: None,
            name: name.into(),
            protocol: None,
            apy: None,
            tvl_usd: None,
            details: None,
        }
    }
}

/// Distinguishes the two exposures a lending position creates between the
/// same pair of nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LendingPosition {
    Collateral,
    Borrow,
}

/// A directed allocation of USD notional from one node into another.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub allocation_usd: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lending_position: Option<LendingPosition>,
}

/// Immutable output of one asset's aggregation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub sources: Vec<String>,
}

/// Flattened lookup record derived from one snapshot's root node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchIndexEntry {
    pub id: String,
    pub chain: String,
    pub protocol: String,
    pub name: String,
    pub node_id: String,
}

impl SearchIndexEntry {
    /// Derive a search-index record from a snapshot's root node.
    ///
    /// The protocol falls back to the id's second segment when the node does
    /// not carry one, and Midas product protocols collapse to plain `midas`.
    /// Roots without a display name are not indexable.
    pub fn from_root_node(root: &Node) -> Option<Self> {
        if root.id.is_empty() || root.name.is_empty() {
            return None;
        }

        let mut segments = root.id.split(':');
        let chain_from_id = segments.next().unwrap_or("global").to_lowercase();
        let protocol_from_id = segments.next().unwrap_or("unknown");

        let mut protocol = root
            .protocol
            .as_deref()
            .unwrap_or(protocol_from_id)
            .to_lowercase();
        if protocol.starts_with("midas") {
            protocol = "midas".to_string();
        }

        Some(Self {
            id: root.id.clone(),
            chain: chain_from_id,
            protocol,
            name: root.name.clone(),
            node_id: root.id.clone(),
        })
    }
}
