//! Ethena USDe/sUSDe backing adapter.
//!
//! One catalog (backing collateral + staking yield) feeds two fixed assets:
//! the stablecoin itself and its staked form. Backing collateral entries per
//! custodial venue become terminal Investment leaves shared by both roots.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use exposure_common::num::{round_to_two_decimals, scale_by_decimals};
use exposure_common::{ClientError, JsonClient};
use exposure_core::ident::slugify;
use exposure_core::{Adapter, Edge, GraphResult, Node, NodeDetails};
use futures::try_join;
use serde::Deserialize;

const ETHENA_PROTOCOL: &str = "ethena";
const ASSET_USDE: &str = "USDe";
const ASSET_SUSDE: &str = "sUSDe";

const ETHENA_BACKING_URL: &str = "https://api.llamarisk.com/protocols/ethena/overview/all/";
// Llamarisk also exposes APY time series, but picking the right series and
// datapoint is heavier than needed; Ethena's own yields endpoint returns the
// current staking yield directly.
const ETHENA_YIELDS_URL: &str = "https://app.ethena.fi/api/yields/protocol-and-staking-yield";

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollateralEntry {
    pub asset: String,
    pub exchange: String,
    #[serde(default)]
    pub usd_amount: Option<f64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CollateralData {
    pub collateral: Vec<CollateralEntry>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainMetricsData {
    pub total_usde_supply: String,
    pub total_susde_supply: String,
    pub usde_price: String,
    pub susde_price: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Latest<T> {
    pub data: T,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MetricSeries<T> {
    pub latest: Latest<T>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EthenaBackingResponse {
    pub collateral_metrics: MetricSeries<CollateralData>,
    pub chain_metrics: MetricSeries<ChainMetricsData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct YieldsResponse {
    #[serde(default)]
    staking_yield: Option<StakingYield>,
}

#[derive(Deserialize)]
struct StakingYield {
    #[serde(default)]
    value: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct EthenaCatalog {
    pub backing: EthenaBackingResponse,
    pub susde_apy: f64,
}

async fn fetch_backing(client: &JsonClient) -> Result<EthenaBackingResponse, ClientError> {
    client.get_json(ETHENA_BACKING_URL).await
}

async fn fetch_susde_apy(client: &JsonClient) -> Result<f64, ClientError> {
    let response: YieldsResponse = client.get_json(ETHENA_YIELDS_URL).await?;
    response
        .staking_yield
        .and_then(|y| y.value)
        .ok_or_else(|| ClientError::schema(ETHENA_YIELDS_URL, "missing stakingYield.value"))
}

/// Supply × price, both reported as decimal strings with the supply in wei.
fn supply_tvl_usd(supply_wei: &str, price: &str) -> f64 {
    let supply = supply_wei.trim().parse::<f64>().unwrap_or(0.0);
    let price = price.trim().parse::<f64>().unwrap_or(0.0);
    round_to_two_decimals(scale_by_decimals(supply, 18) * price)
}

fn backing_node_id(exchange: &str, asset: &str) -> String {
    format!(
        "global:{ETHENA_PROTOCOL}:{}:{}",
        slugify(exchange),
        slugify(asset)
    )
}

pub struct EthenaAdapter {
    client: JsonClient,
}

impl EthenaAdapter {
    pub fn new(client: JsonClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Adapter for EthenaAdapter {
    type Catalog = EthenaCatalog;
    type Entry = Arc<EthenaCatalog>;

    fn id(&self) -> &'static str {
        ETHENA_PROTOCOL
    }

    async fn fetch_catalog(&self) -> Result<Self::Catalog> {
        let (backing, susde_apy) = try_join!(
            fetch_backing(&self.client),
            fetch_susde_apy(&self.client)
        )?;
        Ok(EthenaCatalog { backing, susde_apy })
    }

    fn assets_by_allocations(
        &self,
        catalog: Self::Catalog,
    ) -> BTreeMap<String, Vec<Self::Entry>> {
        let shared = Arc::new(catalog);
        BTreeMap::from([
            (ASSET_USDE.to_string(), vec![shared.clone()]),
            (ASSET_SUSDE.to_string(), vec![shared]),
        ])
    }

    fn build_root_node(&self, asset: &str, entries: &[Self::Entry]) -> Option<Node> {
        let catalog = entries.first()?;
        let metrics = &catalog.backing.chain_metrics.latest.data;

        match asset {
            ASSET_USDE => Some(Node {
                chain: Some("global".to_string()),
                protocol: Some(ETHENA_PROTOCOL.to_string()),
                details: Some(NodeDetails::Deposit),
                tvl_usd: Some(supply_tvl_usd(
                    &metrics.total_usde_supply,
                    &metrics.usde_price,
                )),
                ..Node::new("global:ethena:usde", ASSET_USDE)
            }),
            ASSET_SUSDE => Some(Node {
                chain: Some("global".to_string()),
                protocol: Some(ETHENA_PROTOCOL.to_string()),
                details: Some(NodeDetails::Staked),
                apy: Some(catalog.susde_apy),
                tvl_usd: Some(supply_tvl_usd(
                    &metrics.total_susde_supply,
                    &metrics.susde_price,
                )),
                ..Node::new("global:ethena:susde", ASSET_SUSDE)
            }),
            _ => None,
        }
    }

    async fn normalize_leaves(
        &self,
        root: &Node,
        entries: &[Self::Entry],
    ) -> Result<GraphResult> {
        let mut result = GraphResult::default();

        let Some(catalog) = entries.first() else {
            return Ok(result);
        };

        for entry in &catalog.backing.collateral_metrics.latest.data.collateral {
            let usd = entry.usd_amount.unwrap_or(0.0);
            if usd <= 0.0 {
                continue;
            }

            let leaf = Node {
                chain: Some("global".to_string()),
                details: Some(NodeDetails::Investment),
                ..Node::new(
                    backing_node_id(&entry.exchange, &entry.asset),
                    format!("{}: {}", entry.exchange, entry.asset),
                )
            };
            result.edges.push(Edge {
                from: root.id.clone(),
                to: leaf.id.clone(),
                allocation_usd: round_to_two_decimals(usd),
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

    fn catalog() -> EthenaCatalog {
        let backing: EthenaBackingResponse = serde_json::from_value(json!({
            "collateral_metrics": {
                "latest": {
                    "timestamp": "2025-01-01T00:00:00Z",
                    "data": {
                        "collateral": [
                            {"asset": "BTC", "exchange": "Binance", "timestamp": 1, "usdAmount": 1_000_000.25},
                            {"asset": "ETH", "exchange": "OKX", "timestamp": 1, "usdAmount": 0.0}
                        ],
                        "totalBackingAssetsInUsd": 1_000_000.25
                    }
                }
            },
            "chain_metrics": {
                "latest": {
                    "timestamp": "2025-01-01T00:00:00Z",
                    "data": {
                        "totalUsdeSupply": "2000000000000000000000000",
                        "totalSusdeSupply": "1000000000000000000000000",
                        "usdePrice": "1.0",
                        "susdePrice": "1.1"
                    }
                }
            }
        }))
        .unwrap();

        EthenaCatalog {
            backing,
            susde_apy: 0.09,
        }
    }

    #[test]
    fn one_catalog_backs_both_assets() {
        let adapter = EthenaAdapter::new(JsonClient::new());
        let grouped = adapter.assets_by_allocations(catalog());
        assert_eq!(grouped.len(), 2);
        assert!(grouped.contains_key("USDe"));
        assert!(grouped.contains_key("sUSDe"));
    }

    #[test]
    fn roots_scale_wei_supplies_by_price() {
        let adapter = EthenaAdapter::new(JsonClient::new());
        let grouped = adapter.assets_by_allocations(catalog());

        let usde = adapter.build_root_node("USDe", &grouped["USDe"]).unwrap();
        assert_eq!(usde.id, "global:ethena:usde");
        assert_eq!(usde.tvl_usd, Some(2_000_000.0));
        assert_eq!(usde.apy, None);

        let susde = adapter.build_root_node("sUSDe", &grouped["sUSDe"]).unwrap();
        assert_eq!(susde.tvl_usd, Some(1_100_000.0));
        assert_eq!(susde.apy, Some(0.09));
        assert_eq!(susde.details, Some(NodeDetails::Staked));
    }

    #[test]
    fn unknown_assets_are_skipped() {
        let adapter = EthenaAdapter::new(JsonClient::new());
        let grouped = adapter.assets_by_allocations(catalog());
        assert!(adapter.build_root_node("ENA", &grouped["USDe"]).is_none());
    }

    #[tokio::test]
    async fn collateral_entries_become_venue_leaves() {
        let adapter = EthenaAdapter::new(JsonClient::new());
        let grouped = adapter.assets_by_allocations(catalog());
        let root = adapter.build_root_node("USDe", &grouped["USDe"]).unwrap();

        let result = adapter
            .normalize_leaves(&root, &grouped["USDe"])
            .await
            .unwrap();

        // Zero-USD entries are dropped.
        assert_eq!(result.nodes.len(), 1);
        assert_eq!(result.nodes[0].id, "global:ethena:binance:btc");
        assert_eq!(result.nodes[0].name, "Binance: BTC");
        assert_eq!(result.edges[0].allocation_usd, 1_000_000.25);
    }
}
