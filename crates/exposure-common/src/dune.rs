//! Dune Analytics query-results client.
//!
//! Providers without a public metrics API publish their numbers through saved
//! Dune queries. Column names there are analyst-controlled and drift over
//! time, so values are picked out of rows by exact column name first and by
//! pattern as a fallback.

use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::Value;

use crate::http::{ClientError, JsonClient};

const API_BASE: &str = "https://api.dune.com/api/v1";

/// One result row, keyed by column name.
pub type DuneRow = serde_json::Map<String, Value>;

#[derive(Deserialize)]
struct QueryResultsResponse {
    state: String,
    #[serde(default)]
    result: Option<QueryResult>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Default, Deserialize)]
struct QueryResult {
    #[serde(default)]
    rows: Vec<DuneRow>,
}

/// Client for the latest results of saved Dune queries.
pub struct DuneClient {
    client: JsonClient,
    api_key: String,
}

impl DuneClient {
    pub fn new(client: JsonClient, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }

    /// Fetch the latest result rows of a saved query.
    pub async fn query_rows(
        &self,
        query_id: u64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<DuneRow>, ClientError> {
        let url = format!("{API_BASE}/query/{query_id}/results?limit={limit}&offset={offset}");

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| ClientError::schema(&url, "API key is not a valid header value"))?;
        headers.insert("X-Dune-Api-Key", key);

        let response: QueryResultsResponse =
            self.client.get_json_with_headers(&url, headers).await?;

        if response.state == "QUERY_STATE_FAILED" {
            let detail = response
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "{}".to_string());
            return Err(ClientError::schema(
                &url,
                format!("query state FAILED: {detail}"),
            ));
        }

        Ok(response.result.unwrap_or_default().rows)
    }

    /// Fetch the first result row of a saved query, if any.
    pub async fn query_row(&self, query_id: u64) -> Result<Option<DuneRow>, ClientError> {
        Ok(self.query_rows(query_id, 1, 0).await?.into_iter().next())
    }
}

/// Pick the first finite numeric value among the named columns, falling back
/// to the first column whose name matches one of `patterns`.
pub fn pick_number(row: Option<&DuneRow>, columns: &[&str], patterns: &[&Regex]) -> Option<f64> {
    let row = row?;

    let mut value = columns.iter().find_map(|column| row.get(*column));

    if value.is_none() {
        value = patterns.iter().find_map(|pattern| {
            row.iter()
                .find(|(name, _)| pattern.is_match(name))
                .map(|(_, v)| v)
        });
    }

    as_finite_number(value?)
}

/// Like [`pick_number`], interpreting the value as a percentage and returning
/// the corresponding ratio.
pub fn pick_percent_ratio(
    row: Option<&DuneRow>,
    columns: &[&str],
    patterns: &[&Regex],
) -> Option<f64> {
    pick_number(row, columns, patterns).map(|n| n / 100.0)
}

fn as_finite_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> DuneRow {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn picks_named_columns_in_order() {
        let row = row(json!({"total_usr_tvl": 1_250_000.5, "usd_rlp_tvl": "99.5"}));
        assert_eq!(
            pick_number(Some(&row), &["total_usr_tvl"], &[]),
            Some(1_250_000.5)
        );
        assert_eq!(pick_number(Some(&row), &["usd_rlp_tvl"], &[]), Some(99.5));
    }

    #[test]
    fn falls_back_to_pattern_matching() {
        let row = row(json!({"7-Day Avg APR (%)": 4.2}));
        let pattern = Regex::new(r"(?i)7.*apr").unwrap();
        assert_eq!(
            pick_number(Some(&row), &["missing_column"], &[&pattern]),
            Some(4.2)
        );
    }

    #[test]
    fn rejects_non_numeric_values() {
        let row = row(json!({"apr": "n/a", "flag": true}));
        assert_eq!(pick_number(Some(&row), &["apr"], &[]), None);
        assert_eq!(pick_number(Some(&row), &["flag"], &[]), None);
        assert_eq!(pick_number(None, &["apr"], &[]), None);
    }

    #[test]
    fn percent_ratio_divides_by_hundred() {
        let row = row(json!({"stusr_percentage": 25.0}));
        assert_eq!(
            pick_percent_ratio(Some(&row), &["stusr_percentage"], &[]),
            Some(0.25)
        );
    }
}
