//! Debank API client.

use exposure_common::{ClientError, JsonClient};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;

use crate::types::{AppProtocolItem, BundleWallet, ComplexProtocolItem, TokenObject};

const DEFAULT_BASE_URL: &str = "https://pro-openapi.debank.com/v1";
const BUNDLE_API_BASE_URL: &str = "https://api.debank.com";

/// Client for the Debank pro-openapi portfolio endpoints.
#[derive(Clone)]
pub struct DebankClient {
    client: JsonClient,
    access_key: Option<String>,
}

impl DebankClient {
    /// Build a client, optionally authenticated with a Debank access key.
    ///
    /// The key is optional so fixture runs can serve mocked responses; real
    /// Debank requests fail without one.
    pub fn new(client: JsonClient, access_key: Option<String>) -> Self {
        Self { client, access_key }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(key) = &self.access_key {
            match HeaderValue::from_str(key) {
                Ok(value) => {
                    headers.insert("AccessKey", value);
                }
                Err(_) => {
                    tracing::warn!(
                        target: "exposure_resolver_debank",
                        "access key is not a valid header value; sending unauthenticated"
                    );
                }
            }
        }
        headers
    }

    async fn get<T: DeserializeOwned>(&self, url: String) -> Result<T, ClientError> {
        self.client.get_json_with_headers(&url, self.headers()).await
    }

    fn wallet_url(path: &str, wallet: &str) -> String {
        format!("{DEFAULT_BASE_URL}/{path}?id={}", urlencoding::encode(wallet))
    }

    /// Positions a wallet holds inside supported protocols, per protocol.
    pub async fn complex_protocol_list(
        &self,
        wallet: &str,
    ) -> Result<Vec<ComplexProtocolItem>, ClientError> {
        self.get(Self::wallet_url("user/complex_protocol_list", wallet))
            .await
    }

    /// Positions a wallet holds on Debank-tracked app chains.
    pub async fn complex_app_list(
        &self,
        wallet: &str,
    ) -> Result<Vec<AppProtocolItem>, ClientError> {
        self.get(Self::wallet_url("user/complex_app_list", wallet))
            .await
    }

    /// Plain token balances held by a wallet.
    pub async fn all_token_list(&self, wallet: &str) -> Result<Vec<TokenObject>, ClientError> {
        self.get(Self::wallet_url("user/all_token_list", wallet))
            .await
    }

    /// Wallet addresses grouped under a public Debank bundle.
    pub async fn bundle_wallets(&self, bundle_id: &str) -> Result<Vec<String>, ClientError> {
        let url = format!(
            "{BUNDLE_API_BASE_URL}/bundle?id={}",
            urlencoding::encode(bundle_id)
        );
        let wallets: Vec<BundleWallet> = self.get(url).await?;
        Ok(wallets.into_iter().map(|wallet| wallet.id).collect())
    }
}
