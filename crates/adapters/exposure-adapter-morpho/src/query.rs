//! Morpho GraphQL API payloads and paginated fetchers.

use exposure_common::{graphql_request, ClientError, JsonClient};
use serde::Deserialize;
use serde_json::json;

pub const MORPHO_API_URL: &str = "https://api.morpho.org/graphql";

/// Generic `{ items: [...] }` list wrapper used throughout the Morpho API.
#[derive(Clone, Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Items<T> {
    #[serde(default)]
    pub items: Vec<T>,
}

impl<T> Default for Items<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct MorphoChain {
    pub network: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MorphoLoanAsset {
    pub symbol: String,
    #[serde(default)]
    pub decimals: Option<u32>,
    #[serde(default)]
    pub price_usd: Option<f64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MorphoCollateralAsset {
    pub symbol: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MorphoBlueRef {
    pub chain: MorphoChain,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MorphoMarket {
    pub unique_key: String,
    pub loan_asset: MorphoLoanAsset,
    #[serde(default)]
    pub collateral_asset: Option<MorphoCollateralAsset>,
    pub morpho_blue: MorphoBlueRef,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MorphoAllocation {
    #[serde(default)]
    pub supply_assets_usd: Option<f64>,
    #[serde(default)]
    pub supply_assets: Option<String>,
    pub market: MorphoMarket,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MorphoCurator {
    pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MorphoVaultState {
    #[serde(default)]
    pub total_assets_usd: Option<f64>,
    #[serde(default)]
    pub net_apy: Option<f64>,
    #[serde(default)]
    pub curators: Vec<MorphoCurator>,
    #[serde(default)]
    pub allocation: Vec<MorphoAllocation>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MorphoVaultV1 {
    pub address: String,
    pub name: String,
    pub chain: MorphoChain,
    #[serde(default)]
    pub state: Option<MorphoVaultState>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketPositionState {
    #[serde(default)]
    pub supply_assets_usd: Option<f64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MarketPosition {
    #[serde(default)]
    pub state: Option<MarketPositionState>,
    pub market: MorphoMarket,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaMorphoTarget {
    pub address: String,
    pub name: String,
}

/// Capital routing adapters attached to a v2 vault.
///
/// The API exposes further adapter types; anything we do not model routes to
/// `Other` and is skipped during normalization, mirroring how unknown types
/// are ignored rather than failing the fetch.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type")]
pub enum VaultV2Adapter {
    #[serde(rename = "MorphoMarketV1", rename_all = "camelCase")]
    MarketV1 {
        #[serde(default)]
        assets_usd: Option<f64>,
        #[serde(default)]
        positions: Items<MarketPosition>,
    },
    #[serde(rename = "MetaMorpho", rename_all = "camelCase")]
    MetaMorpho {
        #[serde(default)]
        assets_usd: Option<f64>,
        meta_morpho: MetaMorphoTarget,
    },
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MorphoVaultV2 {
    pub address: String,
    pub name: String,
    pub chain: MorphoChain,
    #[serde(default)]
    pub total_assets_usd: Option<f64>,
    #[serde(default)]
    pub net_apy: Option<f64>,
    #[serde(default)]
    pub curators: Items<MorphoCurator>,
    #[serde(default)]
    pub adapters: Items<VaultV2Adapter>,
}

const VAULTS_V1_QUERY: &str = r#"
query Vaults($first: Int!, $skip: Int!) {
  vaults(first: $first, skip: $skip, where: { whitelisted: true }) {
    items {
      address
      name
      chain {
        network
      }
      state {
        totalAssetsUsd
        netApy
        curators {
          name
        }
        allocation {
          supplyAssetsUsd
          supplyAssets
          market {
            uniqueKey
            loanAsset {
              symbol
              decimals
              priceUsd
            }
            collateralAsset {
              symbol
            }
            morphoBlue {
              chain {
                network
              }
            }
          }
        }
      }
    }
  }
}
"#;

// The Morpho endpoint enforces a maximum query complexity that scales with
// nested list fan-out (`first` multipliers). The caps below keep a full v2
// page comfortably under the limit, at the cost of a smaller page size than
// the v1 query.
const VAULTS_V2_QUERY: &str = r#"
query VaultV2s($first: Int!, $skip: Int!, $adaptersFirst: Int!, $curatorsFirst: Int!) {
  vaultV2s(first: $first, skip: $skip, where: { whitelisted: true }) {
    items {
      address
      name
      chain {
        network
      }
      totalAssetsUsd
      netApy
      curators(first: $curatorsFirst, skip: 0) {
        items {
          name
        }
      }
      adapters(first: $adaptersFirst, skip: 0) {
        items {
          assetsUsd
          type
          ... on MorphoMarketV1Adapter {
            positions(first: 10) {
              items {
                state {
                  supplyAssetsUsd
                }
                market {
                  uniqueKey
                  loanAsset {
                    symbol
                  }
                  collateralAsset {
                    symbol
                  }
                  morphoBlue {
                    chain {
                      network
                    }
                  }
                }
              }
            }
          }
          ... on MetaMorphoAdapter {
            metaMorpho {
              address
              name
            }
          }
        }
      }
    }
  }
}
"#;

#[derive(Deserialize)]
struct VaultsV1Response {
    #[serde(default)]
    vaults: Option<Items<MorphoVaultV1>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VaultsV2Response {
    #[serde(default)]
    vault_v2s: Option<Items<MorphoVaultV2>>,
}

/// Fetch all whitelisted v1 vaults, paging by offset until a short page.
pub async fn fetch_vault_v1s(client: &JsonClient) -> Result<Vec<MorphoVaultV1>, ClientError> {
    const PAGE_SIZE: usize = 1000;

    let mut vaults = Vec::new();
    let mut skip = 0;

    loop {
        let response: VaultsV1Response = graphql_request(
            client,
            MORPHO_API_URL,
            VAULTS_V1_QUERY,
            &json!({ "first": PAGE_SIZE, "skip": skip }),
        )
        .await?;

        let items = response.vaults.unwrap_or_default().items;
        let page_len = items.len();
        vaults.extend(items);

        if page_len < PAGE_SIZE {
            break;
        }
        skip += PAGE_SIZE;
    }

    Ok(vaults)
}

/// Fetch all whitelisted v2 vaults, paging by offset until a short page.
pub async fn fetch_vault_v2s(client: &JsonClient) -> Result<Vec<MorphoVaultV2>, ClientError> {
    const PAGE_SIZE: usize = 20;
    const ADAPTERS_FIRST: usize = 20;
    const CURATORS_FIRST: usize = 1;

    let mut vaults = Vec::new();
    let mut skip = 0;

    loop {
        let response: VaultsV2Response = graphql_request(
            client,
            MORPHO_API_URL,
            VAULTS_V2_QUERY,
            &json!({
                "first": PAGE_SIZE,
                "skip": skip,
                "adaptersFirst": ADAPTERS_FIRST,
                "curatorsFirst": CURATORS_FIRST,
            }),
        )
        .await?;

        let items = response.vault_v2s.unwrap_or_default().items;
        let page_len = items.len();
        vaults.extend(items);

        if page_len < PAGE_SIZE {
            break;
        }
        skip += PAGE_SIZE;
    }

    Ok(vaults)
}
