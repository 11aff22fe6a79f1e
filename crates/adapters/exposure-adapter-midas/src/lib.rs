//! Midas asset allocation adapter.
//!
//! Midas publishes one flat list of allocation rows across all of its
//! products; rows group by product symbol. Exchange and off-chain collateral
//! rows become terminal Investment leaves, while rows linking to a Debank
//! profile are expanded through the shared wallet resolver.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use exposure_common::JsonClient;
use exposure_core::ident::slugify;
use exposure_core::{Adapter, Edge, GraphResult, Node, NodeDetails};
use exposure_resolver_debank::{resolve_wallet_portfolio, DebankClient};
use serde::Deserialize;

mod curators;

use curators::curator_for_asset;

const MIDAS_API_URL: &str = "https://api-prod.midas.app/api/midas-assets/allocations";
const MIDAS_PROTOCOL: &str = "midas";

/// One allocation row of the Midas allocations API.
///
/// `amount` is reported in thousands of USD, as a decimal string.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MidasAllocation {
    pub product: String,
    pub first_level_allocation: String,
    #[serde(default)]
    pub second_level_allocation: Option<String>,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub link_title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

fn allocation_usd(allocation: &MidasAllocation) -> f64 {
    allocation.amount.trim().parse::<f64>().unwrap_or(0.0) * 1000.0
}

/// Last path segment of a Debank profile link.
fn wallet_from_link(link: &str) -> Option<&str> {
    let path = link.split(['?', '#']).next().unwrap_or(link);
    let wallet = path.trim_end_matches('/').rsplit('/').next()?;
    (!wallet.is_empty()).then_some(wallet)
}

pub struct MidasAdapter {
    client: JsonClient,
    debank: DebankClient,
}

impl MidasAdapter {
    pub fn new(client: JsonClient, debank: DebankClient) -> Self {
        Self { client, debank }
    }
}

#[async_trait]
impl Adapter for MidasAdapter {
    type Catalog = Vec<MidasAllocation>;
    type Entry = MidasAllocation;

    fn id(&self) -> &'static str {
        MIDAS_PROTOCOL
    }

    async fn fetch_catalog(&self) -> Result<Self::Catalog> {
        let allocations: Vec<MidasAllocation> = self.client.get_json(MIDAS_API_URL).await?;
        Ok(allocations)
    }

    fn assets_by_allocations(
        &self,
        catalog: Self::Catalog,
    ) -> BTreeMap<String, Vec<Self::Entry>> {
        let mut grouped: BTreeMap<String, Vec<MidasAllocation>> = BTreeMap::new();
        for allocation in catalog {
            grouped
                .entry(allocation.product.clone())
                .or_default()
                .push(allocation);
        }
        grouped
    }

    fn build_root_node(&self, asset: &str, entries: &[Self::Entry]) -> Option<Node> {
        let tvl_usd = entries.iter().map(allocation_usd).sum();

        Some(Node {
            chain: Some("global".to_string()),
            protocol: Some(MIDAS_PROTOCOL.to_string()),
            details: Some(NodeDetails::Yield {
                curator: curator_for_asset(asset),
            }),
            tvl_usd: Some(tvl_usd),
            ..Node::new(format!("global:{MIDAS_PROTOCOL}:{}", slugify(asset)), asset)
        })
    }

    fn build_edge(&self, root: &Node, leaf: &Node, entry: &Self::Entry) -> Edge {
        Edge {
            from: root.id.clone(),
            to: leaf.id.clone(),
            allocation_usd: allocation_usd(entry),
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
            match entry.first_level_allocation.as_str() {
                // Allocations to perp DEXes/CEXes and off-chain collateral
                // are terminal: the venue label is all Midas exposes.
                "Exchanges" | "Offchain Collateral" => {
                    let venue = entry.second_level_allocation.clone().unwrap_or_default();
                    let leaf = Node {
                        details: Some(NodeDetails::Investment),
                        ..Node::new(venue.clone(), venue)
                    };
                    result.edges.push(self.build_edge(root, &leaf, entry));
                    result.nodes.push(leaf);
                }
                _ => {
                    let is_debank_link = entry.link_title.as_deref() == Some("Debank")
                        || entry
                            .link
                            .as_deref()
                            .is_some_and(|link| link.starts_with("https://debank.com/profile"));

                    let Some(wallet) = entry
                        .link
                        .as_deref()
                        .filter(|_| is_debank_link)
                        .and_then(wallet_from_link)
                    else {
                        continue;
                    };

                    let wallet_result =
                        resolve_wallet_portfolio(&self.debank, wallet, &root.id).await?;
                    result.merge(wallet_result);
                }
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocation(product: &str, level: &str, venue: &str, amount: &str) -> MidasAllocation {
        MidasAllocation {
            product: product.to_string(),
            first_level_allocation: level.to_string(),
            second_level_allocation: Some(venue.to_string()),
            amount: amount.to_string(),
            link_title: None,
            link: None,
        }
    }

    fn adapter() -> MidasAdapter {
        MidasAdapter::new(JsonClient::new(), DebankClient::new(JsonClient::new(), None))
    }

    #[test]
    fn groups_rows_by_product() {
        let grouped = adapter().assets_by_allocations(vec![
            allocation("mTBILL", "Exchanges", "Binance", "10"),
            allocation("mEDGE", "Exchanges", "OKX", "5"),
            allocation("mTBILL", "Offchain Collateral", "Custodian", "2"),
        ]);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["mTBILL"].len(), 2);
        assert_eq!(grouped["mEDGE"].len(), 1);
    }

    #[test]
    fn root_sums_amounts_in_thousands() {
        let entries = vec![
            allocation("mTBILL", "Exchanges", "Binance", "10.5"),
            allocation("mTBILL", "Exchanges", "OKX", "4.5"),
        ];
        let root = adapter().build_root_node("mTBILL", &entries).unwrap();

        assert_eq!(root.id, "global:midas:mtbill");
        assert_eq!(root.tvl_usd, Some(15_000.0));
        assert_eq!(
            root.details,
            Some(NodeDetails::Yield {
                curator: Some("Superstate".to_string())
            })
        );
    }

    #[tokio::test]
    async fn exchange_rows_become_investment_leaves() {
        let adapter = adapter();
        let entries = vec![allocation("mTBILL", "Exchanges", "Binance", "10")];
        let root = adapter.build_root_node("mTBILL", &entries).unwrap();

        let result = adapter.normalize_leaves(&root, &entries).await.unwrap();
        assert_eq!(result.nodes.len(), 1);
        assert_eq!(result.nodes[0].id, "Binance");
        assert_eq!(result.nodes[0].details, Some(NodeDetails::Investment));
        assert_eq!(result.edges[0].allocation_usd, 10_000.0);
    }

    #[tokio::test]
    async fn rows_without_venue_or_debank_link_are_skipped() {
        let adapter = adapter();
        let entries = vec![MidasAllocation {
            product: "mTBILL".to_string(),
            first_level_allocation: "Onchain".to_string(),
            second_level_allocation: None,
            amount: "10".to_string(),
            link_title: Some("Etherscan".to_string()),
            link: Some("https://etherscan.io/address/0xabc".to_string()),
        }];
        let root = adapter.build_root_node("mTBILL", &entries).unwrap();

        let result = adapter.normalize_leaves(&root, &entries).await.unwrap();
        assert!(result.nodes.is_empty());
        assert!(result.edges.is_empty());
    }

    #[test]
    fn wallet_is_last_link_segment() {
        assert_eq!(
            wallet_from_link("https://debank.com/profile/0xAbC?chain=eth"),
            Some("0xAbC")
        );
        assert_eq!(
            wallet_from_link("https://debank.com/profile/0xdef/"),
            Some("0xdef")
        );
    }
}
