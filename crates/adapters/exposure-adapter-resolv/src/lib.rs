//! Resolv USR/wstUSR/RLP adapter.
//!
//! Headline metrics come from Resolv's published Dune queries; the actual
//! allocations are resolved by expanding the protocol's treasury wallets
//! (a public Debank bundle) through the shared wallet resolver.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use exposure_common::dune::{pick_number, pick_percent_ratio, DuneClient};
use exposure_common::num::{round_to_two_decimals, scale_by_decimals};
use exposure_common::ClientError;
use exposure_core::{Adapter, GraphResult, Node, NodeDetails};
use exposure_resolver_debank::{resolve_wallet, DebankClient};
use futures::try_join;
use regex::Regex;

const RESOLV_PROTOCOL: &str = "resolv";
const RESOLV_BUNDLE_ID: &str = "220554";

const ASSET_USR: &str = "USR";
const ASSET_WSTUSR: &str = "wstUSR";
const ASSET_RLP: &str = "RLP";

const QUERY_TVL: u64 = 4360119;
const QUERY_STUSR_APR: u64 = 4399489;
const QUERY_RLP_APR: u64 = 4300955;
const QUERY_STUSR_SHARE: u64 = 4364326;

#[derive(Clone, Debug, Default)]
pub struct ResolvMetrics {
    pub usr_tvl: Option<f64>,
    pub wstusr_tvl: Option<f64>,
    pub rlp_tvl: Option<f64>,
    pub usr_apy: Option<f64>,
    pub rlp_apy: Option<f64>,
}

fn apr_to_apy(apr_ratio: Option<f64>) -> Option<f64> {
    apr_ratio.map(|apr| (1.0 + apr / 365.0).powi(365) - 1.0)
}

async fn fetch_metrics(dune: &DuneClient) -> Result<ResolvMetrics, ClientError> {
    let (tvl, stusr_apr, rlp_apr, stusr_share) = try_join!(
        dune.query_row(QUERY_TVL),
        dune.query_row(QUERY_STUSR_APR),
        dune.query_row(QUERY_RLP_APR),
        dune.query_row(QUERY_STUSR_SHARE)
    )?;

    let usr_tvl = pick_number(tvl.as_ref(), &["total_usr_tvl"], &[]);
    let rlp_tvl = pick_number(tvl.as_ref(), &["usd_rlp_tvl"], &[]);

    let stusr_share_ratio =
        pick_percent_ratio(stusr_share.as_ref(), &["stusr_percentage"], &[]);
    let wstusr_tvl = match (usr_tvl, stusr_share_ratio) {
        (Some(tvl), Some(share)) => Some(round_to_two_decimals(tvl * share)),
        _ => None,
    };

    // The APR queries rename their columns now and then; fall back to
    // pattern matching over the row's column names.
    let seven_day = Regex::new(r"(?i)7.*apr").expect("static pattern");
    let daily = Regex::new(r"(?i)daily.*apr").expect("static pattern");
    let avg = Regex::new(r"(?i)avg.*apr").expect("static pattern");
    let usr_apr_ratio = pick_percent_ratio(
        stusr_apr.as_ref(),
        &["7-Day Avg APR (%)", "Daily APR (%)"],
        &[&seven_day, &daily, &avg],
    );

    let rlp_apy = pick_number(rlp_apr.as_ref(), &["rebase_7_apy"], &[])
        .map(|percent| scale_by_decimals(percent, 2));

    Ok(ResolvMetrics {
        usr_tvl,
        wstusr_tvl,
        rlp_tvl,
        usr_apy: apr_to_apy(usr_apr_ratio),
        rlp_apy,
    })
}

#[derive(Clone, Debug)]
pub struct ResolvCatalog {
    pub wallets: Vec<String>,
    pub metrics: ResolvMetrics,
}

/// Both halves of the catalog, shared by every asset's entry group.
#[derive(Clone)]
pub enum ResolvEntry {
    Metrics(Arc<ResolvMetrics>),
    Wallets(Arc<Vec<String>>),
}

pub struct ResolvAdapter {
    dune: DuneClient,
    debank: DebankClient,
}

impl ResolvAdapter {
    pub fn new(dune: DuneClient, debank: DebankClient) -> Self {
        Self { dune, debank }
    }
}

#[async_trait]
impl Adapter for ResolvAdapter {
    type Catalog = ResolvCatalog;
    type Entry = ResolvEntry;

    fn id(&self) -> &'static str {
        RESOLV_PROTOCOL
    }

    async fn fetch_catalog(&self) -> Result<Self::Catalog> {
        let (wallets, metrics) = try_join!(
            self.debank.bundle_wallets(RESOLV_BUNDLE_ID),
            fetch_metrics(&self.dune)
        )?;
        Ok(ResolvCatalog { wallets, metrics })
    }

    fn assets_by_allocations(
        &self,
        catalog: Self::Catalog,
    ) -> BTreeMap<String, Vec<Self::Entry>> {
        let metrics = Arc::new(catalog.metrics);
        let wallets = Arc::new(catalog.wallets);
        let shared = vec![
            ResolvEntry::Metrics(metrics),
            ResolvEntry::Wallets(wallets),
        ];

        BTreeMap::from([
            (ASSET_USR.to_string(), shared.clone()),
            (ASSET_WSTUSR.to_string(), shared.clone()),
            (ASSET_RLP.to_string(), shared),
        ])
    }

    fn build_root_node(&self, asset: &str, entries: &[Self::Entry]) -> Option<Node> {
        let Some(ResolvEntry::Metrics(metrics)) = entries.first() else {
            return None;
        };

        match asset {
            ASSET_USR => Some(Node {
                chain: Some("global".to_string()),
                protocol: Some(RESOLV_PROTOCOL.to_string()),
                details: Some(NodeDetails::Deposit),
                tvl_usd: metrics.usr_tvl,
                ..Node::new("global:resolv:usr", ASSET_USR)
            }),
            ASSET_WSTUSR => Some(Node {
                chain: Some("global".to_string()),
                protocol: Some(RESOLV_PROTOCOL.to_string()),
                details: Some(NodeDetails::Staked),
                apy: metrics.usr_apy,
                tvl_usd: metrics.wstusr_tvl,
                ..Node::new("global:resolv:wstusr", ASSET_WSTUSR)
            }),
            ASSET_RLP => Some(Node {
                chain: Some("global".to_string()),
                protocol: Some(RESOLV_PROTOCOL.to_string()),
                details: Some(NodeDetails::Protection {
                    curator: Some(RESOLV_PROTOCOL.to_string()),
                }),
                apy: metrics.rlp_apy,
                tvl_usd: metrics.rlp_tvl,
                ..Node::new("global:resolv:rlp", ASSET_RLP)
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

        let Some(wallets) = entries.iter().find_map(|entry| match entry {
            ResolvEntry::Wallets(wallets) => Some(wallets),
            _ => None,
        }) else {
            return Ok(result);
        };

        // Wallets resolve one at a time; within each wallet the three Debank
        // categories are fetched as a joined group.
        for wallet in wallets.iter() {
            let wallet_result = resolve_wallet(&self.debank, wallet, &root.id).await?;
            result.merge(wallet_result);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> ResolvMetrics {
        ResolvMetrics {
            usr_tvl: Some(400_000_000.0),
            wstusr_tvl: Some(100_000_000.0),
            rlp_tvl: Some(250_000_000.0),
            usr_apy: Some(0.061),
            rlp_apy: Some(0.094),
        }
    }

    fn catalog() -> ResolvCatalog {
        ResolvCatalog {
            wallets: vec!["0xtreasury".to_string()],
            metrics: metrics(),
        }
    }

    fn adapter() -> ResolvAdapter {
        let client = exposure_common::JsonClient::new();
        ResolvAdapter::new(
            DuneClient::new(client.clone(), "test-key"),
            DebankClient::new(client, None),
        )
    }

    #[test]
    fn three_assets_share_one_catalog() {
        let grouped = adapter().assets_by_allocations(catalog());
        assert_eq!(grouped.len(), 3);
        for entries in grouped.values() {
            assert_eq!(entries.len(), 2);
        }
    }

    #[test]
    fn rlp_root_is_protection_capital() {
        let grouped = adapter().assets_by_allocations(catalog());
        let root = adapter().build_root_node("RLP", &grouped["RLP"]).unwrap();

        assert_eq!(root.id, "global:resolv:rlp");
        assert_eq!(
            root.details,
            Some(NodeDetails::Protection {
                curator: Some("resolv".to_string())
            })
        );
        assert_eq!(root.apy, Some(0.094));
        assert_eq!(root.tvl_usd, Some(250_000_000.0));
    }

    #[test]
    fn wstusr_root_carries_staking_metrics() {
        let grouped = adapter().assets_by_allocations(catalog());
        let root = adapter()
            .build_root_node("wstUSR", &grouped["wstUSR"])
            .unwrap();

        assert_eq!(root.details, Some(NodeDetails::Staked));
        assert_eq!(root.tvl_usd, Some(100_000_000.0));
    }

    #[test]
    fn apr_compounds_daily_into_apy() {
        let apy = apr_to_apy(Some(0.05)).unwrap();
        assert!((apy - 0.05126).abs() < 1e-4);
        assert_eq!(apr_to_apy(None), None);
    }
}
