//! Sky (ex-MakerDAO) USDS adapter.
//!
//! Metrics come from the info.sky.money backend (blockanalitica); the
//! collateral allocations are the union of several ilk group pages. One
//! catalog backs three fixed assets: USDS, sUSDS, and stUSDS.
//!
//! These endpoints are the Sky UI's own backend and may move as Sky updates
//! their infrastructure.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use exposure_common::num::round_to_two_decimals;
use exposure_common::{ClientError, JsonClient};
use exposure_core::ident::slugify;
use exposure_core::{Adapter, Edge, GraphResult, Node, NodeDetails};
use futures::future::try_join_all;
use futures::try_join;
use serde::Deserialize;

const SKY_PROTOCOL: &str = "sky";
const ASSET_STUSDS: &str = "stUSDS";
const ASSET_SUSDS: &str = "sUSDS";
const ASSET_USDS: &str = "USDS";

const SKY_STUSDS_URL: &str = "https://info-sky.blockanalitica.com/stusds/?days_ago=1";
const SKY_SUSDS_URL: &str = "https://info-sky.blockanalitica.com/save/?days_ago=1";
const SKY_USDS_URL: &str =
    "https://info-sky.blockanalitica.com/tokens/0xdc035d45d973e3ec169d2276ddab16f1e407384f/?days_ago=1";

const SKY_ILK_GROUP_URLS: &[&str] = &[
    "https://info-sky.blockanalitica.com/groups/stablecoins/ilks/?days_ago=1&order=-debt",
    "https://info-sky.blockanalitica.com/groups/spark/ilks/?days_ago=1&order=-debt",
    "https://info-sky.blockanalitica.com/groups/obex/ilks/?days_ago=1&order=-debt",
    "https://info-sky.blockanalitica.com/groups/grove/ilks/?days_ago=1&order=-debt",
    "https://info-sky.blockanalitica.com/groups/core/ilks/?days_ago=1&order=-debt&p=1&p_size=10",
    "https://info-sky.blockanalitica.com/groups/legacy-rwa/ilks/?days_ago=1&order=-debt&p=1&p_size=10",
];

/// The backend reports some figures as numbers and others as decimal
/// strings, varying per endpoint.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

impl NumberOrText {
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Deserialize)]
struct StusdsResponse {
    rate: NumberOrText,
    total_assets: NumberOrText,
}

#[derive(Deserialize)]
struct SusdsResponse {
    rate: NumberOrText,
    total: NumberOrText,
}

#[derive(Deserialize)]
struct UsdsResponse {
    total_corrected: NumberOrText,
}

/// One collateral type backing the protocol.
#[derive(Clone, Debug, Deserialize)]
pub struct SkyIlk {
    pub ilk: String,
    pub collateral: NumberOrText,
}

#[derive(Deserialize)]
struct IlkGroupResponse {
    #[serde(default)]
    results: Vec<SkyIlk>,
}

#[derive(Clone, Debug)]
pub struct SkyMetrics {
    pub stusds_tvl: Option<f64>,
    pub susds_tvl: Option<f64>,
    pub usds_tvl: Option<f64>,
    pub stusds_apy: Option<f64>,
    pub susds_apy: Option<f64>,
}

async fn fetch_metrics(client: &JsonClient) -> Result<SkyMetrics, ClientError> {
    let (stusds, susds, usds) = try_join!(
        client.get_json::<StusdsResponse>(SKY_STUSDS_URL),
        client.get_json::<SusdsResponse>(SKY_SUSDS_URL),
        client.get_json::<UsdsResponse>(SKY_USDS_URL)
    )?;

    Ok(SkyMetrics {
        stusds_tvl: stusds.total_assets.value(),
        susds_tvl: susds.total.value(),
        usds_tvl: usds.total_corrected.value(),
        stusds_apy: stusds.rate.value(),
        susds_apy: susds.rate.value(),
    })
}

async fn fetch_allocations(client: &JsonClient) -> Result<Vec<SkyIlk>, ClientError> {
    let pages = try_join_all(
        SKY_ILK_GROUP_URLS
            .iter()
            .map(|url| client.get_json::<IlkGroupResponse>(url)),
    )
    .await?;

    Ok(pages.into_iter().flat_map(|page| page.results).collect())
}

#[derive(Clone, Debug)]
pub struct SkyCatalog {
    pub metrics: SkyMetrics,
    pub allocations: Vec<SkyIlk>,
}

/// Both halves of the catalog, shared by every asset's entry group.
#[derive(Clone)]
pub enum SkyEntry {
    Metrics(Arc<SkyMetrics>),
    Allocations(Arc<Vec<SkyIlk>>),
}

pub struct SkyAdapter {
    client: JsonClient,
}

impl SkyAdapter {
    pub fn new(client: JsonClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Adapter for SkyAdapter {
    type Catalog = SkyCatalog;
    type Entry = SkyEntry;

    fn id(&self) -> &'static str {
        SKY_PROTOCOL
    }

    async fn fetch_catalog(&self) -> Result<Self::Catalog> {
        let (metrics, allocations) = try_join!(
            fetch_metrics(&self.client),
            fetch_allocations(&self.client)
        )?;
        Ok(SkyCatalog {
            metrics,
            allocations,
        })
    }

    fn assets_by_allocations(
        &self,
        catalog: Self::Catalog,
    ) -> BTreeMap<String, Vec<Self::Entry>> {
        let metrics = Arc::new(catalog.metrics);
        let allocations = Arc::new(catalog.allocations);
        let shared = vec![
            SkyEntry::Metrics(metrics),
            SkyEntry::Allocations(allocations),
        ];

        BTreeMap::from([
            (ASSET_STUSDS.to_string(), shared.clone()),
            (ASSET_SUSDS.to_string(), shared.clone()),
            (ASSET_USDS.to_string(), shared),
        ])
    }

    fn build_root_node(&self, asset: &str, entries: &[Self::Entry]) -> Option<Node> {
        let Some(SkyEntry::Metrics(metrics)) = entries.first() else {
            return None;
        };

        let slug = slugify(asset);
        let (details, tvl_usd, apy) = match slug.as_str() {
            "usds" => (NodeDetails::Deposit, metrics.usds_tvl, None),
            "susds" => (NodeDetails::Staked, metrics.susds_tvl, metrics.susds_apy),
            "stusds" => (
                NodeDetails::Yield {
                    curator: Some(SKY_PROTOCOL.to_string()),
                },
                metrics.stusds_tvl,
                metrics.stusds_apy,
            ),
            _ => return None,
        };

        Some(Node {
            chain: Some("global".to_string()),
            protocol: Some(SKY_PROTOCOL.to_string()),
            details: Some(details),
            apy,
            tvl_usd,
            ..Node::new(format!("global:{SKY_PROTOCOL}:{slug}"), asset)
        })
    }

    async fn normalize_leaves(
        &self,
        root: &Node,
        entries: &[Self::Entry],
    ) -> Result<GraphResult> {
        let mut result = GraphResult::default();

        let Some(ilks) = entries.iter().find_map(|entry| match entry {
            SkyEntry::Allocations(ilks) => Some(ilks),
            _ => None,
        }) else {
            return Ok(result);
        };

        for ilk in ilks.iter() {
            let leaf = Node {
                chain: Some("global".to_string()),
                details: Some(NodeDetails::Investment),
                ..Node::new(
                    format!("global:{SKY_PROTOCOL}:{}", slugify(&ilk.ilk)),
                    ilk.ilk.clone(),
                )
            };
            result.edges.push(Edge {
                from: root.id.clone(),
                to: leaf.id.clone(),
                allocation_usd: round_to_two_decimals(ilk.collateral.value().unwrap_or(0.0)),
                lending_position: None,
            });
            result.nodes.push(leaf);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> SkyCatalog {
        SkyCatalog {
            metrics: SkyMetrics {
                stusds_tvl: Some(120_000_000.0),
                susds_tvl: Some(2_400_000_000.0),
                usds_tvl: Some(5_000_000_000.0),
                stusds_apy: Some(0.085),
                susds_apy: Some(0.065),
            },
            allocations: serde_json::from_value(json!([
                {"ilk": "SPARK-DAI", "collateral": "950000000.5", "name": "", "collateral_symbol": "", "collateral_name": ""},
                {"ilk": "WBTC-A", "collateral": 120000000.0, "name": "", "collateral_symbol": "", "collateral_name": ""}
            ]))
            .unwrap(),
        }
    }

    #[test]
    fn three_assets_share_one_catalog() {
        let adapter = SkyAdapter::new(JsonClient::new());
        let grouped = adapter.assets_by_allocations(catalog());
        assert_eq!(grouped.len(), 3);
        for entries in grouped.values() {
            assert_eq!(entries.len(), 2);
        }
    }

    #[test]
    fn roots_map_each_asset_to_its_detail_kind() {
        let adapter = SkyAdapter::new(JsonClient::new());
        let grouped = adapter.assets_by_allocations(catalog());

        let usds = adapter.build_root_node("USDS", &grouped["USDS"]).unwrap();
        assert_eq!(usds.id, "global:sky:usds");
        assert_eq!(usds.details, Some(NodeDetails::Deposit));
        assert_eq!(usds.apy, None);
        assert_eq!(usds.tvl_usd, Some(5_000_000_000.0));

        let stusds = adapter
            .build_root_node("stUSDS", &grouped["stUSDS"])
            .unwrap();
        assert_eq!(
            stusds.details,
            Some(NodeDetails::Yield {
                curator: Some("sky".to_string())
            })
        );
        assert_eq!(stusds.apy, Some(0.085));
    }

    #[test]
    fn unexpected_asset_symbols_are_skipped() {
        let adapter = SkyAdapter::new(JsonClient::new());
        let grouped = adapter.assets_by_allocations(catalog());
        assert!(adapter.build_root_node("DAI", &grouped["USDS"]).is_none());
    }

    #[tokio::test]
    async fn ilks_become_investment_leaves() {
        let adapter = SkyAdapter::new(JsonClient::new());
        let grouped = adapter.assets_by_allocations(catalog());
        let root = adapter.build_root_node("USDS", &grouped["USDS"]).unwrap();

        let result = adapter
            .normalize_leaves(&root, &grouped["USDS"])
            .await
            .unwrap();

        assert_eq!(result.nodes.len(), 2);
        assert_eq!(result.nodes[0].id, "global:sky:spark-dai");
        assert_eq!(result.nodes[0].name, "SPARK-DAI");
        assert_eq!(result.edges[0].allocation_usd, 950_000_000.5);
        assert_eq!(result.edges[1].allocation_usd, 120_000_000.0);
    }
}
