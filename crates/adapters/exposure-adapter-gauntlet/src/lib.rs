//! Gauntlet USD Alpha (gtUSDa) adapter.
//!
//! The metrics endpoint reflects several related Gauntlet vault products;
//! two of them are already covered by the Morpho adapter, so this adapter
//! intentionally normalizes only the gtUSDa vault.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use exposure_common::num::round_to_two_decimals;
use exposure_common::JsonClient;
use exposure_core::eligibility::{is_allocation_usd_eligible, AllocationPolicy};
use exposure_core::ident::{canonicalize_protocol, composite_id, slugify};
use exposure_core::{Adapter, Edge, GraphResult, Node, NodeDetails};
use serde::Deserialize;

const GAUNTLET_PROTOCOL: &str = "gauntlet";
const ASSET_GTUSDA: &str = "gtUSDa";

const GAUNTLET_METRICS_URL: &str = "https://app.gauntlet.xyz/aera-api/latest_vault_asset_metrics?vault_address=0x000000000001CdB57E58Fa75Fe420a0f4D6640D5&chain_id=8453";

/// The Gauntlet UI hides small allocations; matching that cutoff keeps
/// snapshots verifiable against their own view.
const UI_POLICY: AllocationPolicy = AllocationPolicy::with_display_cutoff(100_000.0);

/// Asset/product name overrides matching the Gauntlet UI naming. Kept as one
/// table so it can be edited without touching normalization logic.
const ASSET_NAME_OVERRIDES: &[(&str, &str)] = &[
    ("gtusdcc", "Gauntlet USDC Balanced"),
    ("resolvusdc", "Resolv USDC"),
    ("midasusdc", "Gauntlet USDC RWA"),
    ("exmusdc", "Extrafi XLend USDC"),
    ("gauntlet-usdc-core", "Gauntlet USDC Balanced"),
];

#[derive(Clone, Debug, Deserialize)]
pub struct MetricValue {
    #[serde(default)]
    pub value: Option<f64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct VaultSummary {
    pub balance_usd: MetricValue,
    pub share_price_apy_30d: MetricValue,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAsset {
    pub asset: String,
    pub asset_address: String,
    pub chain_id: i64,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    pub metrics: AssetMetrics,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AssetMetrics {
    pub balance_usd: MetricValue,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AssetGroup {
    pub group: String,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub assets: Vec<GroupAsset>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GauntletMetrics {
    pub summary: VaultSummary,
    pub groups: Vec<AssetGroup>,
}

fn chain_id_to_chain(chain_id: i64) -> String {
    match chain_id {
        1 => "eth".to_string(),
        10 => "op".to_string(),
        42161 => "arb".to_string(),
        8453 => "base".to_string(),
        other => other.to_string(),
    }
}

fn override_name(asset_slug: &str) -> Option<&'static str> {
    ASSET_NAME_OVERRIDES
        .iter()
        .find(|(slug, _)| *slug == asset_slug)
        .map(|(_, name)| *name)
}

/// Infer the protocol for assets the API leaves unattributed.
fn infer_protocol(asset: &GroupAsset) -> Option<String> {
    if let Some(protocol) = &asset.protocol {
        return Some(protocol.clone());
    }
    if asset.asset.starts_with("PT-") {
        return Some("pendle".to_string());
    }
    if asset.asset == "USDC" {
        return Some("circle".to_string());
    }
    None
}

pub struct GauntletAdapter {
    client: JsonClient,
}

impl GauntletAdapter {
    pub fn new(client: JsonClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Adapter for GauntletAdapter {
    type Catalog = GauntletMetrics;
    type Entry = Arc<GauntletMetrics>;

    fn id(&self) -> &'static str {
        GAUNTLET_PROTOCOL
    }

    async fn fetch_catalog(&self) -> Result<Self::Catalog> {
        let metrics: GauntletMetrics = self.client.get_json(GAUNTLET_METRICS_URL).await?;
        Ok(metrics)
    }

    fn assets_by_allocations(
        &self,
        catalog: Self::Catalog,
    ) -> BTreeMap<String, Vec<Self::Entry>> {
        BTreeMap::from([(ASSET_GTUSDA.to_string(), vec![Arc::new(catalog)])])
    }

    fn build_root_node(&self, _asset: &str, entries: &[Self::Entry]) -> Option<Node> {
        let metrics = entries.first()?;

        Some(Node {
            chain: Some("global".to_string()),
            protocol: Some(GAUNTLET_PROTOCOL.to_string()),
            details: Some(NodeDetails::Yield {
                curator: Some(GAUNTLET_PROTOCOL.to_string()),
            }),
            apy: metrics.summary.share_price_apy_30d.value,
            tvl_usd: metrics
                .summary
                .balance_usd
                .value
                .map(round_to_two_decimals),
            ..Node::new("global:gauntlet:gtusda", "Gauntlet USD Alpha")
        })
    }

    async fn normalize_leaves(
        &self,
        root: &Node,
        entries: &[Self::Entry],
    ) -> Result<GraphResult> {
        let mut result = GraphResult::default();

        let Some(metrics) = entries.first() else {
            return Ok(result);
        };

        for group in &metrics.groups {
            let is_supply = group.group == "supply";
            let is_primary_assets = group.group == "assets" && group.protocol.is_none();
            if !is_supply && !is_primary_assets {
                continue;
            }

            for asset in &group.assets {
                let allocation_usd = asset.metrics.balance_usd.value.unwrap_or(0.0);

                if !is_allocation_usd_eligible(allocation_usd) {
                    continue;
                }
                if !UI_POLICY.is_eligible(allocation_usd) {
                    continue;
                }

                let Some(protocol) = infer_protocol(asset) else {
                    continue;
                };

                let chain = chain_id_to_chain(asset.chain_id);
                let node_id = composite_id(&chain, &protocol, &asset.asset_address, &[]);
                let name = asset
                    .display_name
                    .clone()
                    .or_else(|| override_name(&slugify(&asset.asset)).map(str::to_string))
                    .unwrap_or_else(|| slugify(&asset.asset));

                result.nodes.push(Node {
                    chain: Some(chain),
                    protocol: Some(canonicalize_protocol(&protocol)),
                    ..Node::new(node_id.clone(), name)
                });
                result.edges.push(Edge {
                    from: root.id.clone(),
                    to: node_id,
                    allocation_usd,
                    lending_position: None,
                });
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metrics() -> GauntletMetrics {
        serde_json::from_value(json!({
            "summary": {
                "balance_usd": {"value": 52_000_000.123},
                "share_price_apy_30d": {"value": 0.071}
            },
            "groups": [
                {
                    "group": "supply",
                    "groupDisplayName": "Supplied",
                    "protocol": "morpho",
                    "summary": {"balance_usd": {"value": 30_000_000.0}},
                    "assets": [
                        {
                            "asset": "gtUSDCc",
                            "assetAddress": "0xAAA",
                            "chainId": 8453,
                            "protocol": "morpho",
                            "displayName": null,
                            "type": null,
                            "strategy_type": null,
                            "metrics": {"balance_usd": {"value": 12_000_000.0}}
                        },
                        {
                            "asset": "smallpos",
                            "assetAddress": "0xBBB",
                            "chainId": 8453,
                            "protocol": "morpho",
                            "displayName": null,
                            "type": null,
                            "strategy_type": null,
                            "metrics": {"balance_usd": {"value": 50_000.0}}
                        }
                    ]
                },
                {
                    "group": "assets",
                    "groupDisplayName": "Assets",
                    "protocol": null,
                    "summary": {"balance_usd": {"value": 20_000_000.0}},
                    "assets": [
                        {
                            "asset": "USDC",
                            "assetAddress": "0xCCC",
                            "chainId": 1,
                            "protocol": null,
                            "displayName": null,
                            "type": null,
                            "strategy_type": null,
                            "metrics": {"balance_usd": {"value": 8_000_000.0}}
                        },
                        {
                            "asset": "PT-sUSDe-29MAY2025",
                            "assetAddress": "0xDDD",
                            "chainId": 1,
                            "protocol": null,
                            "displayName": "PT sUSDe May",
                            "type": null,
                            "strategy_type": null,
                            "metrics": {"balance_usd": {"value": 4_000_000.0}}
                        },
                        {
                            "asset": "MYSTERY",
                            "assetAddress": "0xEEE",
                            "chainId": 1,
                            "protocol": null,
                            "displayName": null,
                            "type": null,
                            "strategy_type": null,
                            "metrics": {"balance_usd": {"value": 3_000_000.0}}
                        }
                    ]
                },
                {
                    "group": "assets",
                    "groupDisplayName": "Borrowed",
                    "protocol": "euler",
                    "summary": {"balance_usd": {"value": 1_000_000.0}},
                    "assets": []
                }
            ]
        }))
        .unwrap()
    }

    fn adapter() -> GauntletAdapter {
        GauntletAdapter::new(JsonClient::new())
    }

    #[test]
    fn root_reads_vault_summary() {
        let grouped = adapter().assets_by_allocations(metrics());
        let root = adapter()
            .build_root_node("gtUSDa", &grouped["gtUSDa"])
            .unwrap();

        assert_eq!(root.id, "global:gauntlet:gtusda");
        assert_eq!(root.name, "Gauntlet USD Alpha");
        assert_eq!(root.apy, Some(0.071));
        assert_eq!(root.tvl_usd, Some(52_000_000.12));
    }

    #[tokio::test]
    async fn ui_cutoff_hides_small_allocations() {
        let adapter = adapter();
        let grouped = adapter.assets_by_allocations(metrics());
        let root = adapter
            .build_root_node("gtUSDa", &grouped["gtUSDa"])
            .unwrap();

        let result = adapter
            .normalize_leaves(&root, &grouped["gtUSDa"])
            .await
            .unwrap();

        // smallpos clears the global floor but not the UI cutoff; MYSTERY
        // has no inferable protocol; the protocol-scoped "assets" group is
        // not a primary group.
        let ids: Vec<_> = result.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "base:morpho-v1:0xaaa",
                "eth:circle:0xccc",
                "eth:pendle:0xddd"
            ]
        );
    }

    #[tokio::test]
    async fn names_prefer_display_name_then_overrides() {
        let adapter = adapter();
        let grouped = adapter.assets_by_allocations(metrics());
        let root = adapter
            .build_root_node("gtUSDa", &grouped["gtUSDa"])
            .unwrap();

        let result = adapter
            .normalize_leaves(&root, &grouped["gtUSDa"])
            .await
            .unwrap();

        let by_id = |id: &str| {
            result
                .nodes
                .iter()
                .find(|n| n.id == id)
                .map(|n| n.name.clone())
                .unwrap()
        };
        assert_eq!(by_id("base:morpho-v1:0xaaa"), "Gauntlet USDC Balanced");
        assert_eq!(by_id("eth:pendle:0xddd"), "PT sUSDe May");
        assert_eq!(by_id("eth:circle:0xccc"), "usdc");
    }
}
