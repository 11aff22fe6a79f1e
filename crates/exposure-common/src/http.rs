//! Thin JSON-over-HTTP client shared by provider integrations.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport and payload errors raised by provider requests.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a response (DNS, TLS, timeout, reset).
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The provider answered with a non-success status.
    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },
    /// The payload did not match the structural shape the caller requires.
    #[error("{url} returned a malformed payload: {detail}")]
    Schema { url: String, detail: String },
}

impl ClientError {
    pub fn schema(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Schema {
            url: url.into(),
            detail: detail.into(),
        }
    }
}

/// JSON HTTP client with a shared connection pool and a per-request timeout.
///
/// Cheap to clone; adapters hold one and reuse its pool across calls.
#[derive(Clone, Default)]
pub struct JsonClient {
    inner: reqwest::Client,
}

impl JsonClient {
    pub fn new() -> Self {
        Self {
            inner: reqwest::Client::new(),
        }
    }

    /// GET `url` and decode the JSON payload into `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ClientError> {
        self.get_json_with_headers(url, HeaderMap::new()).await
    }

    /// GET `url` with extra request headers and decode the payload into `T`.
    pub async fn get_json_with_headers<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> Result<T, ClientError> {
        let response = self
            .inner
            .get(url)
            .headers(headers)
            .timeout(HTTP_TIMEOUT)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.to_string(),
                source,
            })?;

        decode_json(url, response).await
    }

    /// POST a JSON `body` to `url` and decode the response payload into `T`.
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self
            .inner
            .post(url)
            .json(body)
            .timeout(HTTP_TIMEOUT)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.to_string(),
                source,
            })?;

        decode_json(url, response).await
    }
}

async fn decode_json<T: DeserializeOwned>(
    url: &str,
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(
            target: "exposure_common::http",
            url = %url,
            status = %status,
            "request rejected"
        );
        return Err(ClientError::Status {
            url: url.to_string(),
            status,
            body,
        });
    }

    let text = response
        .text()
        .await
        .map_err(|source| ClientError::Transport {
            url: url.to_string(),
            source,
        })?;

    serde_json::from_str(&text).map_err(|err| ClientError::schema(url, err.to_string()))
}
