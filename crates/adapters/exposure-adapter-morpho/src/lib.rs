//! Morpho vault adapter.
//!
//! Covers both vault generations: v1 vaults allocate into Morpho lending
//! markets directly, while v2 vaults route capital through typed adapters
//! (market positions or downstream v1 vaults). Each vault is its own asset,
//! keyed by address.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use exposure_common::num::{round_to_two_decimals, scale_by_decimals};
use exposure_common::JsonClient;
use exposure_core::eligibility::is_allocation_usd_eligible;
use exposure_core::ident::{canonicalize_chain, slugify};
use exposure_core::{Adapter, Edge, GraphResult, Node, NodeDetails};
use futures::try_join;

mod query;

pub use query::{
    fetch_vault_v1s, fetch_vault_v2s, MarketPosition, MorphoAllocation, MorphoMarket,
    MorphoVaultV1, MorphoVaultV2, VaultV2Adapter, MORPHO_API_URL,
};

const MORPHO_ID: &str = "morpho";

/// `<chain>:morpho-v{1,2}:<address>` vault id.
fn vault_id(chain: &str, version: &str, address: &str) -> String {
    format!(
        "{}:morpho-{version}:{}",
        canonicalize_chain(chain),
        slugify(address)
    )
}

/// `<chain>:morpho-v{1,2}:<market key>` lending market id.
fn market_id(chain: &str, version: &str, unique_key: &str) -> String {
    format!(
        "{}:morpho-{version}:{}",
        canonicalize_chain(chain),
        slugify(unique_key)
    )
}

/// USD notional of one v1 vault allocation.
///
/// Falls back to price × scaled supply when the API omits the USD field.
fn resolve_allocation_usd(allocation: &MorphoAllocation) -> f64 {
    if let Some(usd) = allocation.supply_assets_usd {
        return usd;
    }

    let loan_asset = &allocation.market.loan_asset;
    let assets = allocation
        .supply_assets
        .as_deref()
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .unwrap_or(0.0);
    let normalized = scale_by_decimals(assets, loan_asset.decimals.unwrap_or(0));

    round_to_two_decimals(normalized * loan_asset.price_usd.unwrap_or(0.0))
}

/// `LOAN/COLLATERAL` pair label, or the loan symbol alone for
/// collateral-less idle markets.
fn market_name(market: &MorphoMarket) -> String {
    match &market.collateral_asset {
        Some(collateral) => format!("{}/{}", market.loan_asset.symbol, collateral.symbol),
        None => market.loan_asset.symbol.clone(),
    }
}

fn market_leaf(market: &MorphoMarket) -> Node {
    let chain = &market.morpho_blue.chain.network;
    Node {
        chain: Some(canonicalize_chain(chain)),
        protocol: Some("morpho-v1".to_string()),
        details: Some(NodeDetails::LendingMarket),
        ..Node::new(market_id(chain, "v1", &market.unique_key), market_name(market))
    }
}

/// One grouped allocation entry: a v1 market allocation or a v2 routing
/// adapter, each carrying its owning vault.
#[derive(Clone)]
pub enum MorphoEntry {
    V1 {
        vault: Arc<MorphoVaultV1>,
        allocation: MorphoAllocation,
    },
    V2 {
        vault: Arc<MorphoVaultV2>,
        adapter: VaultV2Adapter,
    },
}

pub enum MorphoCatalogEntry {
    V1(MorphoVaultV1),
    V2(MorphoVaultV2),
}

pub struct MorphoAdapter {
    client: JsonClient,
}

impl MorphoAdapter {
    pub fn new(client: JsonClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Adapter for MorphoAdapter {
    type Catalog = Vec<MorphoCatalogEntry>;
    type Entry = MorphoEntry;

    fn id(&self) -> &'static str {
        MORPHO_ID
    }

    async fn fetch_catalog(&self) -> Result<Self::Catalog> {
        let (v1, v2) = try_join!(
            fetch_vault_v1s(&self.client),
            fetch_vault_v2s(&self.client)
        )?;

        Ok(v1
            .into_iter()
            .map(MorphoCatalogEntry::V1)
            .chain(v2.into_iter().map(MorphoCatalogEntry::V2))
            .collect())
    }

    fn assets_by_allocations(
        &self,
        catalog: Self::Catalog,
    ) -> BTreeMap<String, Vec<Self::Entry>> {
        let mut grouped: BTreeMap<String, Vec<MorphoEntry>> = BTreeMap::new();

        for entry in catalog {
            match entry {
                MorphoCatalogEntry::V1(mut vault) => {
                    // Skip vaults with no assets, missing TVL data, or a
                    // blank display name: empty/dust vaults would produce
                    // root-only snapshots and unnamed vaults are useless in
                    // the search index.
                    let Some(state) = vault.state.as_mut() else {
                        continue;
                    };
                    let Some(total_assets_usd) = state.total_assets_usd else {
                        continue;
                    };
                    if !is_allocation_usd_eligible(total_assets_usd) {
                        continue;
                    }
                    if vault.name.trim().is_empty() {
                        continue;
                    }

                    let allocations = std::mem::take(&mut state.allocation);
                    if allocations.is_empty() {
                        continue;
                    }

                    let asset = vault.address.clone();
                    let vault = Arc::new(vault);
                    grouped
                        .entry(asset)
                        .or_default()
                        .extend(allocations.into_iter().map(|allocation| MorphoEntry::V1 {
                            vault: vault.clone(),
                            allocation,
                        }));
                }
                MorphoCatalogEntry::V2(mut vault) => {
                    let Some(total_assets_usd) = vault.total_assets_usd else {
                        continue;
                    };
                    if !is_allocation_usd_eligible(total_assets_usd) {
                        continue;
                    }
                    if vault.name.trim().is_empty() {
                        continue;
                    }

                    let adapters = std::mem::take(&mut vault.adapters.items);
                    if adapters.is_empty() {
                        continue;
                    }

                    let asset = vault.address.clone();
                    let vault = Arc::new(vault);
                    grouped
                        .entry(asset)
                        .or_default()
                        .extend(adapters.into_iter().map(|adapter| MorphoEntry::V2 {
                            vault: vault.clone(),
                            adapter,
                        }));
                }
            }
        }

        grouped
    }

    fn build_root_node(&self, _asset: &str, entries: &[Self::Entry]) -> Option<Node> {
        match entries.first()? {
            MorphoEntry::V1 { vault, .. } => {
                let state = vault.state.as_ref()?;
                Some(Node {
                    chain: Some(canonicalize_chain(&vault.chain.network)),
                    protocol: Some("morpho-v1".to_string()),
                    details: Some(NodeDetails::Yield {
                        curator: state.curators.first().map(|c| c.name.clone()),
                    }),
                    apy: state.net_apy,
                    tvl_usd: state.total_assets_usd,
                    ..Node::new(
                        vault_id(&vault.chain.network, "v1", &vault.address),
                        vault.name.trim(),
                    )
                })
            }
            MorphoEntry::V2 { vault, .. } => Some(Node {
                chain: Some(canonicalize_chain(&vault.chain.network)),
                protocol: Some("morpho-v2".to_string()),
                details: Some(NodeDetails::Yield {
                    curator: vault.curators.items.first().map(|c| c.name.clone()),
                }),
                apy: vault.net_apy,
                tvl_usd: vault.total_assets_usd,
                ..Node::new(
                    vault_id(&vault.chain.network, "v2", &vault.address),
                    vault.name.trim(),
                )
            }),
        }
    }

    fn build_edge(&self, root: &Node, leaf: &Node, entry: &Self::Entry) -> Edge {
        let allocation_usd = match entry {
            MorphoEntry::V1 { allocation, .. } => resolve_allocation_usd(allocation),
            MorphoEntry::V2 { adapter, .. } => match adapter {
                VaultV2Adapter::MarketV1 { assets_usd, .. }
                | VaultV2Adapter::MetaMorpho { assets_usd, .. } => assets_usd.unwrap_or(0.0),
                VaultV2Adapter::Other => 0.0,
            },
        };

        Edge {
            from: root.id.clone(),
            to: leaf.id.clone(),
            allocation_usd,
            lending_position: None,
        }
    }

    async fn normalize_leaves(
        &self,
        root: &Node,
        entries: &[Self::Entry],
    ) -> Result<GraphResult> {
        let mut result = GraphResult::default();

        for entry in entries {
            match entry {
                MorphoEntry::V1 { allocation, .. } => {
                    let allocation_usd = resolve_allocation_usd(allocation);
                    if !is_allocation_usd_eligible(allocation_usd) {
                        continue;
                    }

                    let leaf = market_leaf(&allocation.market);
                    result.edges.push(self.build_edge(root, &leaf, entry));
                    result.nodes.push(leaf);
                }
                MorphoEntry::V2 { vault, adapter } => match adapter {
                    VaultV2Adapter::MarketV1 {
                        assets_usd,
                        positions,
                    } => {
                        // When the API returns a single market position but
                        // omits its per-position USD value, the adapter's
                        // total is treated as fully allocated to it.
                        let fallback_usd = assets_usd.unwrap_or(0.0);
                        let can_fallback = positions.items.len() == 1;

                        for position in &positions.items {
                            let allocation_usd = position
                                .state
                                .as_ref()
                                .and_then(|state| state.supply_assets_usd)
                                .unwrap_or(if can_fallback { fallback_usd } else { 0.0 });

                            if !is_allocation_usd_eligible(allocation_usd) {
                                continue;
                            }

                            let leaf = market_leaf(&position.market);
                            result.edges.push(Edge {
                                from: root.id.clone(),
                                to: leaf.id.clone(),
                                allocation_usd,
                                lending_position: None,
                            });
                            result.nodes.push(leaf);
                        }
                    }
                    VaultV2Adapter::MetaMorpho {
                        assets_usd,
                        meta_morpho,
                    } => {
                        let allocation_usd = assets_usd.unwrap_or(0.0);
                        if !is_allocation_usd_eligible(allocation_usd) {
                            continue;
                        }

                        // v2 adapter targets are emitted as minimal nodes so
                        // edges never point at missing nodes in per-root
                        // snapshots.
                        let chain = &vault.chain.network;
                        let leaf = Node {
                            chain: Some(canonicalize_chain(chain)),
                            protocol: Some("morpho-v1".to_string()),
                            details: Some(NodeDetails::Yield { curator: None }),
                            ..Node::new(
                                vault_id(chain, "v1", &meta_morpho.address),
                                meta_morpho.name.trim(),
                            )
                        };
                        result.edges.push(Edge {
                            from: root.id.clone(),
                            to: leaf.id.clone(),
                            allocation_usd,
                            lending_position: None,
                        });
                        result.nodes.push(leaf);
                    }
                    VaultV2Adapter::Other => {}
                },
            }
        }

        Ok(result)
    }
}
