//! Minimal GraphQL-over-HTTP request helper.
//!
//! Providers exposing GraphQL endpoints (e.g. the Morpho API) all accept the
//! standard `{query, variables}` POST body; this wraps it so adapters only
//! deal with typed response data.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::http::{ClientError, JsonClient};

#[derive(Serialize)]
struct GraphqlRequest<'a, V> {
    query: &'a str,
    variables: &'a V,
}

#[derive(Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlResponseError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponseError {
    message: String,
}

/// Execute one GraphQL query and return its `data` payload.
///
/// GraphQL transports errors in-band with a 200 status; the first entry of
/// the `errors` array is surfaced as a schema violation so callers see the
/// provider's own message.
pub async fn graphql_request<T, V>(
    client: &JsonClient,
    url: &str,
    query: &str,
    variables: &V,
) -> Result<T, ClientError>
where
    T: DeserializeOwned,
    V: Serialize,
{
    let response: GraphqlResponse<T> = client
        .post_json(url, &GraphqlRequest { query, variables })
        .await?;

    if let Some(error) = response.errors.first() {
        return Err(ClientError::schema(
            url,
            format!("graphql error: {}", error.message),
        ));
    }

    response
        .data
        .ok_or_else(|| ClientError::schema(url, "graphql response carried no data"))
}
