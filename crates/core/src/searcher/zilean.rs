//! Zilean (DMM index) search backend.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::ZileanConfig;
use crate::metrics;

use super::{IndexQuery, ReleaseIndex, ReleaseRecord, SearchError};

/// Zilean `/dmm/filtered` client.
pub struct ZileanClient {
    client: Client,
    config: ZileanConfig,
}

impl ZileanClient {
    pub fn new(config: ZileanConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    fn build_search_url(&self, query: &IndexQuery) -> String {
        let mut params: Vec<String> = Vec::new();
        if !query.query_title.is_empty() {
            params.push(format!("Query={}", urlencoding::encode(&query.query_title)));
        }
        if let Some(imdb_id) = query.imdb_id.as_deref().filter(|id| !id.is_empty()) {
            params.push(format!("ImdbId={}", urlencoding::encode(imdb_id)));
        }
        if let Some(year) = query.year {
            params.push(format!("Year={}", year));
        }
        if let Some(season) = query.season {
            params.push(format!("Season={}", season));
        }
        if let Some(episode) = query.episode {
            params.push(format!("Episode={}", episode));
        }

        let base = format!("{}/dmm/filtered", self.config.url.trim_end_matches('/'));
        if params.is_empty() {
            base
        } else {
            format!("{}?{}", base, params.join("&"))
        }
    }

    async fn fetch(&self, query: &IndexQuery) -> Result<Vec<ReleaseRecord>, SearchError> {
        let url = self.build_search_url(query);
        debug!(url = %url, "Searching Zilean");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let body = response.text().await?;
        Ok(parse_records(&body))
    }
}

/// Parse a Zilean response body. Anything other than a JSON array is
/// treated as no results; malformed entries are skipped.
pub(crate) fn parse_records(body: &str) -> Vec<ReleaseRecord> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(items)) => items.iter().filter_map(parse_record).collect(),
        Ok(_) => {
            warn!("Zilean returned a non-array response, treating as no results");
            Vec::new()
        }
        Err(e) => {
            warn!(error = %e, "Zilean returned invalid JSON, treating as no results");
            Vec::new()
        }
    }
}

fn parse_record(item: &Value) -> Option<ReleaseRecord> {
    let info_hash = item.get("info_hash")?.as_str()?.trim().to_lowercase();
    if !is_info_hash(&info_hash) {
        return None;
    }

    let title = ["raw_title", "filename"]
        .iter()
        .filter_map(|key| item.get(*key)?.as_str())
        .map(str::trim)
        .find(|t| !t.is_empty())?
        .to_string();

    let size_bytes = ["size", "size_bytes"]
        .iter()
        .find_map(|key| item.get(*key).and_then(parse_size));

    Some(ReleaseRecord {
        info_hash,
        title,
        size_bytes,
    })
}

/// Sizes arrive as numbers or numeric strings.
fn parse_size(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_info_hash(hash: &str) -> bool {
    hash.len() == 40 && hash.chars().all(|c| c.is_ascii_hexdigit())
}

#[async_trait]
impl ReleaseIndex for ZileanClient {
    fn name(&self) -> &str {
        "zilean"
    }

    async fn search(&self, query: &IndexQuery) -> Result<Vec<ReleaseRecord>, SearchError> {
        let start = Instant::now();
        let result = self.fetch(query).await;
        metrics::record_external_call(
            "zilean",
            "search",
            result.is_ok(),
            start.elapsed().as_secs_f64(),
        );

        match &result {
            Ok(records) => debug!(
                query = %query.query_title,
                results = records.len(),
                "Zilean search complete"
            ),
            Err(e) => warn!(query = %query.query_title, error = %e, "Zilean search failed"),
        }
        result
    }
}
