//! Drives the fetch/group/normalize/merge pipeline across adapters.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::adapter::Adapter;
use crate::error::EmptyAggregation;
use crate::graph::GraphStore;

/// Draft graphs keyed by asset symbol.
pub type StoresByAsset = BTreeMap<String, GraphStore>;

/// Object-safe form of [`Adapter`] used to run heterogeneous providers in one
/// batch.
///
/// The provider-shaped `Catalog`/`Entry` types never cross this boundary: the
/// blanket impl drives one adapter end to end, and only merge operations
/// reach the shared stores.
#[async_trait]
pub trait RunnableAdapter: Send + Sync {
    /// Provider identifier, used for provenance labels and logs.
    fn id(&self) -> &'static str;

    /// Run this adapter's full fetch/group/normalize pass and merge its
    /// contributions into the per-asset stores.
    async fn contribute(&self, stores: &mut StoresByAsset) -> Result<()>;
}

#[async_trait]
impl<A: Adapter> RunnableAdapter for A {
    fn id(&self) -> &'static str {
        Adapter::id(self)
    }

    async fn contribute(&self, stores: &mut StoresByAsset) -> Result<()> {
        let catalog = self.fetch_catalog().await?;
        let grouped = self.assets_by_allocations(catalog);

        for (asset, entries) in grouped {
            if entries.is_empty() {
                continue;
            }

            let Some(root) = self.build_root_node(&asset, &entries) else {
                tracing::debug!(
                    target: "exposure_runtime",
                    adapter = Adapter::id(self),
                    asset = %asset,
                    "root resolution skipped"
                );
                continue;
            };

            let result = self.normalize_leaves(&root, &entries).await?;

            // Stores are shared across adapters, keyed purely by asset
            // symbol: this is how two providers reporting the same asset end
            // up merged into one graph.
            let store = stores.entry(asset.clone()).or_default();
            store.record_source(Adapter::id(self));
            store.upsert_node(root);
            store.upsert_nodes(result.nodes);
            store.add_edges(result.edges);

            tracing::debug!(
                target: "exposure_runtime",
                adapter = Adapter::id(self),
                asset = %asset,
                nodes = store.node_count(),
                edges = store.edge_count(),
                "merged asset contribution"
            );
        }

        Ok(())
    }
}

/// Run one full aggregation pass over the given adapters.
///
/// Adapters run strictly one at a time. Sequencing bounds the aggregate
/// outbound request rate against provider APIs and makes a failed run
/// attributable to exactly one adapter; the first failure aborts the whole
/// batch, since a half-built snapshot must never be published.
pub async fn build_draft_graphs(adapters: &[Arc<dyn RunnableAdapter>]) -> Result<StoresByAsset> {
    let mut stores = StoresByAsset::new();

    for adapter in adapters {
        tracing::info!(
            target: "exposure_runtime",
            adapter = adapter.id(),
            "running adapter"
        );
        adapter
            .contribute(&mut stores)
            .await
            .with_context(|| format!("adapter '{}' failed", adapter.id()))?;
    }

    if stores.is_empty() {
        return Err(EmptyAggregation.into());
    }

    Ok(stores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::GraphResult;
    use crate::types::{Edge, Node};
    use std::collections::BTreeMap;

    /// Adapter whose catalog is a fixed list of `(asset, leaf id, usd)` rows.
    struct FixtureAdapter {
        id: &'static str,
        rows: Vec<(String, String, f64)>,
        root_tvl: Option<f64>,
    }

    #[async_trait]
    impl Adapter for FixtureAdapter {
        type Catalog = Vec<(String, String, f64)>;
        type Entry = (String, f64);

        fn id(&self) -> &'static str {
            self.id
        }

        async fn fetch_catalog(&self) -> Result<Self::Catalog> {
            Ok(self.rows.clone())
        }

        fn assets_by_allocations(
            &self,
            catalog: Self::Catalog,
        ) -> BTreeMap<String, Vec<Self::Entry>> {
            let mut grouped: BTreeMap<String, Vec<Self::Entry>> = BTreeMap::new();
            for (asset, leaf, usd) in catalog {
                grouped.entry(asset).or_default().push((leaf, usd));
            }
            grouped
        }

        fn build_root_node(&self, asset: &str, _entries: &[Self::Entry]) -> Option<Node> {
            Some(Node {
                tvl_usd: self.root_tvl,
                ..Node::new(format!("global:{}:{asset}", self.id), asset)
            })
        }

        async fn normalize_leaves(
            &self,
            root: &Node,
            entries: &[Self::Entry],
        ) -> Result<GraphResult> {
            let mut result = GraphResult::default();
            for (leaf, usd) in entries {
                result.nodes.push(Node::new(leaf, leaf));
                result.edges.push(Edge {
                    from: root.id.clone(),
                    to: leaf.clone(),
                    allocation_usd: *usd,
                    lending_position: None,
                });
            }
            Ok(result)
        }
    }

    fn adapter(
        id: &'static str,
        rows: &[(&str, &str, f64)],
    ) -> Arc<dyn RunnableAdapter> {
        Arc::new(FixtureAdapter {
            id,
            rows: rows
                .iter()
                .map(|(a, l, u)| (a.to_string(), l.to_string(), *u))
                .collect(),
            root_tvl: None,
        })
    }

    #[tokio::test]
    async fn groups_catalog_rows_into_per_asset_stores() {
        let adapters = vec![adapter(
            "fixture",
            &[
                ("USDX", "eth:aavev3:market", 1_000.0),
                ("USDY", "eth:morpho-v1:market", 2_000.0),
            ],
        )];

        let stores = build_draft_graphs(&adapters).await.unwrap();
        assert_eq!(stores.len(), 2);
        assert_eq!(stores["USDX"].root_node().unwrap().id, "global:fixture:USDX");
        assert_eq!(stores["USDX"].edge_count(), 1);
    }

    #[tokio::test]
    async fn adapters_sharing_an_asset_merge_into_one_store() {
        // One adapter contributes only a name, the other only a TVL, for the
        // same leaf id; the snapshot must contain a single enriched node.
        struct Sparse;
        struct Rich;

        #[async_trait]
        impl Adapter for Sparse {
            type Catalog = ();
            type Entry = ();
            fn id(&self) -> &'static str {
                "sparse"
            }
            async fn fetch_catalog(&self) -> Result<()> {
                Ok(())
            }
            fn assets_by_allocations(&self, _: ()) -> BTreeMap<String, Vec<()>> {
                BTreeMap::from([("USDX".to_string(), vec![()])])
            }
            fn build_root_node(&self, asset: &str, _: &[()]) -> Option<Node> {
                Some(Node::new("global:shared:usdx", asset))
            }
            async fn normalize_leaves(&self, root: &Node, _: &[()]) -> Result<GraphResult> {
                Ok(GraphResult {
                    nodes: vec![Node::new("eth:morpho-v1:abc", "Shared Vault")],
                    edges: vec![Edge {
                        from: root.id.clone(),
                        to: "eth:morpho-v1:abc".into(),
                        allocation_usd: 10.0,
                        lending_position: None,
                    }],
                })
            }
        }

        #[async_trait]
        impl Adapter for Rich {
            type Catalog = ();
            type Entry = ();
            fn id(&self) -> &'static str {
                "rich"
            }
            async fn fetch_catalog(&self) -> Result<()> {
                Ok(())
            }
            fn assets_by_allocations(&self, _: ()) -> BTreeMap<String, Vec<()>> {
                BTreeMap::from([("USDX".to_string(), vec![()])])
            }
            fn build_root_node(&self, asset: &str, _: &[()]) -> Option<Node> {
                Some(Node::new("global:shared:usdx", asset))
            }
            async fn normalize_leaves(&self, root: &Node, _: &[()]) -> Result<GraphResult> {
                Ok(GraphResult {
                    nodes: vec![Node {
                        tvl_usd: Some(500.0),
                        ..Node::new("eth:morpho-v1:abc", "")
                    }],
                    edges: vec![Edge {
                        from: root.id.clone(),
                        to: "eth:morpho-v1:abc".into(),
                        allocation_usd: 5.0,
                        lending_position: None,
                    }],
                })
            }
        }

        let adapters: Vec<Arc<dyn RunnableAdapter>> = vec![Arc::new(Sparse), Arc::new(Rich)];
        let stores = build_draft_graphs(&adapters).await.unwrap();

        let store = &stores["USDX"];
        assert_eq!(store.sources(), ["sparse", "rich"]);

        let snapshot = store.to_snapshot(store.sources().to_vec());
        let leaf = snapshot
            .nodes
            .iter()
            .find(|n| n.id == "eth:morpho-v1:abc")
            .unwrap();
        assert_eq!(leaf.name, "Shared Vault");
        assert_eq!(leaf.tvl_usd, Some(500.0));

        // Both adapters rediscovered the same relationship; the weight is
        // the sum of the contributions.
        let edge = snapshot
            .edges
            .iter()
            .find(|e| e.to == "eth:morpho-v1:abc")
            .unwrap();
        assert_eq!(edge.allocation_usd, 15.0);
    }

    #[tokio::test]
    async fn root_skip_leaves_no_store_behind() {
        struct Skipper;

        #[async_trait]
        impl Adapter for Skipper {
            type Catalog = ();
            type Entry = ();
            fn id(&self) -> &'static str {
                "skipper"
            }
            async fn fetch_catalog(&self) -> Result<()> {
                Ok(())
            }
            fn assets_by_allocations(&self, _: ()) -> BTreeMap<String, Vec<()>> {
                BTreeMap::from([("DUST".to_string(), vec![()])])
            }
            fn build_root_node(&self, _: &str, _: &[()]) -> Option<Node> {
                None
            }
            async fn normalize_leaves(&self, _: &Node, _: &[()]) -> Result<GraphResult> {
                unreachable!("normalize_leaves must not run for skipped roots")
            }
        }

        let adapters: Vec<Arc<dyn RunnableAdapter>> = vec![Arc::new(Skipper)];
        let err = build_draft_graphs(&adapters).await.unwrap_err();
        assert!(err.is::<EmptyAggregation>());
    }

    #[tokio::test]
    async fn empty_run_is_fatal() {
        let adapters = vec![adapter("empty", &[])];
        let err = build_draft_graphs(&adapters).await.unwrap_err();
        assert!(err.is::<EmptyAggregation>());
    }

    #[tokio::test]
    async fn failing_adapter_aborts_the_batch() {
        struct Failing;

        #[async_trait]
        impl Adapter for Failing {
            type Catalog = ();
            type Entry = ();
            fn id(&self) -> &'static str {
                "failing"
            }
            async fn fetch_catalog(&self) -> Result<()> {
                anyhow::bail!("upstream returned 503")
            }
            fn assets_by_allocations(&self, _: ()) -> BTreeMap<String, Vec<()>> {
                BTreeMap::new()
            }
            fn build_root_node(&self, _: &str, _: &[()]) -> Option<Node> {
                None
            }
            async fn normalize_leaves(&self, _: &Node, _: &[()]) -> Result<GraphResult> {
                Ok(GraphResult::default())
            }
        }

        let adapters: Vec<Arc<dyn RunnableAdapter>> = vec![
            Arc::new(Failing),
            adapter("healthy", &[("USDX", "leaf", 100.0)]),
        ];

        let err = build_draft_graphs(&adapters).await.unwrap_err();
        assert!(err.to_string().contains("adapter 'failing' failed"));
    }
}
