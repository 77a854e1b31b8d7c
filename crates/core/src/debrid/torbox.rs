//! TorBox debrid provider.
//!
//! TorBox needs no explicit file selection: once the file list is known a
//! single `requestdl` call returns the direct URL.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::TorBoxConfig;
use crate::metrics;

use super::poll::{Poller, Sleeper, TokioSleeper};
use super::{
    AddedTorrent, DebridProvider, FileCandidate, ProviderError, ProviderKind, ResolutionError,
    TorrentSnapshot, TorrentStatus,
};

/// TorBox API client.
pub struct TorBoxClient {
    client: Client,
    config: TorBoxConfig,
    hydration: Poller,
}

impl TorBoxClient {
    /// Create a new TorBox client.
    pub fn new(config: TorBoxConfig) -> Self {
        Self::with_sleeper(config, Arc::new(TokioSleeper))
    }

    /// Create a client whose polling sleeps through `sleeper`.
    pub fn with_sleeper(config: TorBoxConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");
        let hydration = Poller::with_sleeper(config.hydration, sleeper);

        Self {
            client,
            config,
            hydration,
        }
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    /// Send an authenticated request and unwrap the `{success, data}` envelope.
    async fn call(
        &self,
        operation: &str,
        api_key: &str,
        request: RequestBuilder,
    ) -> Result<Value, ProviderError> {
        let start = Instant::now();
        let result = send_enveloped(request.bearer_auth(api_key)).await;
        metrics::record_external_call(
            "torbox",
            operation,
            result.is_ok(),
            start.elapsed().as_secs_f64(),
        );
        result
    }
}

async fn send_enveloped(request: RequestBuilder) -> Result<Value, ProviderError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Api {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        });
    }

    let body: Value = response.json().await?;
    if body.get("success").and_then(Value::as_bool) != Some(true) {
        let detail = ["detail", "error"]
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_str))
            .unwrap_or("success=false")
            .to_string();
        return Err(ProviderError::Rejected(detail));
    }

    Ok(body.get("data").cloned().unwrap_or(Value::Null))
}

/// Ids arrive as numbers or strings.
fn id_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Map TorBox download state to the normalized status.
fn parse_torbox_status(state: &str, finished: bool, present: bool) -> TorrentStatus {
    let state = state.to_ascii_lowercase();
    if state.starts_with("error") || state.starts_with("failed") {
        return TorrentStatus::Failed;
    }
    if finished && present {
        return TorrentStatus::Ready;
    }
    match state.as_str() {
        "cached" | "completed" | "uploading" | "seeding" => TorrentStatus::Ready,
        "metadl" | "checkingresumedata" => TorrentStatus::Hydrating,
        s if s.starts_with("checking") => TorrentStatus::Hydrating,
        "downloading" | "queued" | "paused" | "allocating" => TorrentStatus::DownloadingNotCached,
        s if s.starts_with("stalled") => TorrentStatus::DownloadingNotCached,
        _ => TorrentStatus::Pending,
    }
}

fn parse_torrent(value: &Value) -> Option<TorrentSnapshot> {
    let torrent_id = id_string(value.get("id").or_else(|| value.get("torrent_id")))?;
    let raw_status = value
        .get("download_state")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let finished = value
        .get("download_finished")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let present = value
        .get("download_present")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let files = value
        .get("files")
        .and_then(Value::as_array)
        .map(|files| files.iter().filter_map(parse_file).collect())
        .unwrap_or_default();

    Some(TorrentSnapshot {
        torrent_id,
        status: parse_torbox_status(&raw_status, finished, present),
        raw_status,
        files,
        links: Vec::new(),
    })
}

fn parse_file(value: &Value) -> Option<FileCandidate> {
    let id = id_string(value.get("id"))?;
    let name = ["name", "short_name"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))?;
    let size = value.get("size").and_then(Value::as_u64).unwrap_or(0);
    Some(FileCandidate::new(id, name, size))
}

#[async_trait]
impl DebridProvider for TorBoxClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::TorBox
    }

    fn hydration(&self) -> &Poller {
        &self.hydration
    }

    async fn check_availability(
        &self,
        api_key: &str,
        info_hash: &str,
    ) -> Result<Option<HashSet<String>>, ProviderError> {
        let url = format!(
            "{}/api/torrents/checkcached?hash={}&format=object",
            self.base_url(),
            urlencoding::encode(info_hash)
        );
        let data = self.call("checkcached", api_key, self.client.get(&url)).await?;

        // TorBox answers per torrent, not per file
        let cached = match &data {
            Value::Object(map) => map.keys().any(|k| k.eq_ignore_ascii_case(info_hash)),
            _ => false,
        };
        debug!(info_hash, cached, "TorBox availability");
        Ok(if cached { None } else { Some(HashSet::new()) })
    }

    async fn add_source(
        &self,
        api_key: &str,
        magnet: &str,
    ) -> Result<AddedTorrent, ProviderError> {
        let url = format!("{}/api/torrents/createtorrent", self.base_url());
        let form = [("magnet", magnet), ("seed", "1"), ("allow_zip", "false")];
        let data = self
            .call("createtorrent", api_key, self.client.post(&url).form(&form))
            .await?;

        let torrent_id = id_string(data.get("torrent_id"))
            .or_else(|| id_string(data.get("id")))
            .ok_or_else(|| {
                ProviderError::InvalidResponse("no torrent id in createtorrent response".to_string())
            })?;

        let snapshot = parse_torrent(&data).filter(|s| !s.files.is_empty());
        Ok(AddedTorrent {
            torrent_id,
            snapshot,
        })
    }

    async fn list_files(
        &self,
        api_key: &str,
        torrent_id: &str,
    ) -> Result<TorrentSnapshot, ProviderError> {
        let url = format!(
            "{}/api/torrents/mylist?id={}&bypass_cache=true",
            self.base_url(),
            urlencoding::encode(torrent_id)
        );
        let data = self.call("mylist", api_key, self.client.get(&url)).await?;

        // A single object when filtered by id, but older deployments return the full list
        let torrent = match &data {
            Value::Array(items) => items
                .iter()
                .find(|t| id_string(t.get("id")).as_deref() == Some(torrent_id)),
            Value::Object(_) => Some(&data),
            _ => None,
        };

        torrent.and_then(parse_torrent).ok_or_else(|| {
            ProviderError::InvalidResponse(format!("torrent {} not in mylist", torrent_id))
        })
    }

    async fn finalize_link(
        &self,
        api_key: &str,
        snapshot: &TorrentSnapshot,
        file: &FileCandidate,
    ) -> Result<String, ResolutionError> {
        if snapshot.status == TorrentStatus::DownloadingNotCached {
            return Err(ResolutionError::NotCached(format!(
                "TorBox is downloading the torrent (state '{}')",
                snapshot.raw_status
            )));
        }

        let url = format!(
            "{}/api/torrents/requestdl?token={}&torrent_id={}&file_id={}&zip_link=false",
            self.base_url(),
            urlencoding::encode(api_key),
            urlencoding::encode(&snapshot.torrent_id),
            urlencoding::encode(&file.id)
        );
        let data = self
            .call("requestdl", api_key, self.client.get(&url))
            .await
            .map_err(|e| {
                warn!(torrent_id = %snapshot.torrent_id, file_id = %file.id, error = %e, "TorBox requestdl failed");
                ResolutionError::LinkGenerationFailed(e.to_string())
            })?;

        match data.as_str() {
            Some(link) if !link.is_empty() => Ok(link.to_string()),
            _ => Err(ResolutionError::LinkGenerationFailed(
                "requestdl returned no link".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_torbox_status() {
        assert_eq!(parse_torbox_status("metaDL", false, false), TorrentStatus::Hydrating);
        assert_eq!(
            parse_torbox_status("checkingResumeData", false, false),
            TorrentStatus::Hydrating
        );
        assert_eq!(parse_torbox_status("cached", true, true), TorrentStatus::Ready);
        assert_eq!(parse_torbox_status("completed", false, false), TorrentStatus::Ready);
        assert_eq!(
            parse_torbox_status("downloading", false, false),
            TorrentStatus::DownloadingNotCached
        );
        assert_eq!(
            parse_torbox_status("stalled (no seeds)", false, false),
            TorrentStatus::DownloadingNotCached
        );
        assert_eq!(parse_torbox_status("error", false, false), TorrentStatus::Failed);
        assert_eq!(parse_torbox_status("", false, false), TorrentStatus::Pending);
    }

    #[test]
    fn test_finished_and_present_is_ready() {
        assert_eq!(parse_torbox_status("uploading", true, true), TorrentStatus::Ready);
        assert_eq!(parse_torbox_status("whatever", true, true), TorrentStatus::Ready);
    }

    #[test]
    fn test_parse_torrent() {
        let value = json!({
            "id": 42,
            "download_state": "cached",
            "download_finished": true,
            "download_present": true,
            "files": [
                {"id": 0, "name": "Show/Show.S01E01.mkv", "size": 1000},
                {"id": 1, "short_name": "Show.S01E02.mkv", "size": 2000},
                {"name": "no-id.nfo"}
            ]
        });
        let snapshot = parse_torrent(&value).unwrap();

        assert_eq!(snapshot.torrent_id, "42");
        assert_eq!(snapshot.status, TorrentStatus::Ready);
        assert_eq!(snapshot.files.len(), 2);
        assert_eq!(snapshot.files[0], FileCandidate::new("0", "Show/Show.S01E01.mkv", 1000));
        assert_eq!(snapshot.files[1].name, "Show.S01E02.mkv");
    }

    #[tokio::test]
    async fn test_requestdl_failure_does_not_leak_token() {
        let client = TorBoxClient::new(TorBoxConfig {
            url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 2,
            ..TorBoxConfig::default()
        });
        let snapshot = TorrentSnapshot {
            torrent_id: "42".to_string(),
            status: TorrentStatus::Ready,
            raw_status: "cached".to_string(),
            files: Vec::new(),
            links: Vec::new(),
        };
        let file = FileCandidate::new("0", "Movie.2021.1080p.mkv", 1000);

        let err = client
            .finalize_link("tb-secret-key", &snapshot, &file)
            .await
            .unwrap_err();

        assert!(matches!(err, ResolutionError::LinkGenerationFailed(_)));
        assert!(!err.to_string().contains("tb-secret-key"));
    }

    #[test]
    fn test_id_string() {
        assert_eq!(id_string(Some(&json!(7))), Some("7".to_string()));
        assert_eq!(id_string(Some(&json!("abc"))), Some("abc".to_string()));
        assert_eq!(id_string(Some(&json!(""))), None);
        assert_eq!(id_string(Some(&json!(null))), None);
        assert_eq!(id_string(None), None);
    }
}
