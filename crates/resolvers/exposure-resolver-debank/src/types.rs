//! Subset of the Debank portfolio API payloads the resolver consumes.

use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TokenObject {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub chain: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub protocol_id: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub amount: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PortfolioStats {
    #[serde(default)]
    pub asset_usd_value: f64,
    #[serde(default)]
    pub debt_usd_value: f64,
    #[serde(default)]
    pub net_usd_value: f64,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PortfolioDetail {
    #[serde(default)]
    pub supply_token_list: Vec<TokenObject>,
    #[serde(default)]
    pub borrow_token_list: Vec<TokenObject>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub health_rate: Option<f64>,
    #[serde(default)]
    pub position_token: Option<TokenObject>,
    #[serde(default)]
    pub margin_token: Option<TokenObject>,
}

/// Present on app-chain items only (Debank apps have no pool object).
#[derive(Clone, Debug, Deserialize)]
pub struct PortfolioBase {
    pub app_id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PortfolioPool {
    pub id: String,
    pub chain: String,
    pub project_id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PortfolioItem {
    /// Debank's item category label ("Yield", "Lending", "Liquidity Pool", …).
    pub name: String,
    #[serde(default)]
    pub stats: PortfolioStats,
    #[serde(default)]
    pub detail: PortfolioDetail,
    #[serde(default)]
    pub base: Option<PortfolioBase>,
    #[serde(default)]
    pub pool: Option<PortfolioPool>,
    #[serde(default)]
    pub position_index: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ComplexProtocolItem {
    #[serde(default)]
    pub portfolio_item_list: Vec<PortfolioItem>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppProtocolItem {
    #[serde(default)]
    pub portfolio_item_list: Vec<PortfolioItem>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BundleWallet {
    pub id: String,
}
