//! Real-Debrid debrid provider.
//!
//! Real-Debrid needs an explicit `selectFiles` call while the torrent waits
//! for selection, then produces hoster links that must be unrestricted to
//! obtain the direct URL.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::RealDebridConfig;
use crate::metrics;

use super::poll::{Poller, Polled, Probe, Sleeper, TokioSleeper};
use super::{
    AddedTorrent, DebridProvider, FileCandidate, ProviderError, ProviderKind, ResolutionError,
    TorrentSnapshot, TorrentStatus,
};

/// Raw status that requires a `selectFiles` call.
const WAITING_FILES_SELECTION: &str = "waiting_files_selection";

/// Real-Debrid API client.
pub struct RealDebridClient {
    client: Client,
    config: RealDebridConfig,
    hydration: Poller,
    links: Poller,
}

#[derive(Debug, Deserialize)]
struct RdAddResponse {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RdTorrentInfo {
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    files: Vec<RdFile>,
    #[serde(default)]
    links: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RdFile {
    id: u64,
    #[serde(default)]
    path: String,
    #[serde(default)]
    bytes: u64,
}

#[derive(Debug, Deserialize)]
struct RdUnrestrictResponse {
    download: Option<String>,
}

impl RdTorrentInfo {
    fn into_snapshot(self) -> TorrentSnapshot {
        TorrentSnapshot {
            torrent_id: self.id,
            status: parse_rd_status(&self.status),
            raw_status: self.status,
            files: self
                .files
                .into_iter()
                .map(|f| FileCandidate::new(f.id.to_string(), f.path, f.bytes))
                .collect(),
            links: self.links,
        }
    }
}

/// Map Real-Debrid torrent status to the normalized status.
fn parse_rd_status(status: &str) -> TorrentStatus {
    match status {
        "downloaded" => TorrentStatus::Ready,
        "downloading" => TorrentStatus::DownloadingNotCached,
        "magnet_conversion" | "queued" | "compressing" | "uploading" => TorrentStatus::Hydrating,
        "magnet_error" | "error" | "virus" | "dead" => TorrentStatus::Failed,
        _ => TorrentStatus::Pending,
    }
}

/// Collect cached file ids for one hash from an instantAvailability body.
///
/// The body maps hash to `{"rd": [{"<file id>": {..}, ..}, ..]}`. A missing
/// hash means availability is unknown.
fn parse_cached_ids(body: &Value, info_hash: &str) -> Option<HashSet<String>> {
    let entry = body.as_object()?.iter().find_map(|(hash, entry)| {
        hash.eq_ignore_ascii_case(info_hash).then_some(entry)
    })?;

    let variants = entry.get("rd").and_then(Value::as_array);
    Some(
        variants
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
            .flat_map(|variant| variant.keys().cloned())
            .collect(),
    )
}

impl RealDebridClient {
    /// Create a new Real-Debrid client.
    pub fn new(config: RealDebridConfig) -> Self {
        Self::with_sleeper(config, Arc::new(TokioSleeper))
    }

    /// Create a client whose polling sleeps through `sleeper`.
    pub fn with_sleeper(config: RealDebridConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");
        let hydration = Poller::with_sleeper(config.hydration, sleeper.clone());
        let links = Poller::with_sleeper(config.links, sleeper);

        Self {
            client,
            config,
            hydration,
            links,
        }
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    /// Send an authenticated request, failing on non-2xx.
    async fn call(
        &self,
        operation: &str,
        api_key: &str,
        request: RequestBuilder,
    ) -> Result<Response, ProviderError> {
        let start = Instant::now();
        let result = send_checked(request.bearer_auth(api_key)).await;
        metrics::record_external_call(
            "realdebrid",
            operation,
            result.is_ok(),
            start.elapsed().as_secs_f64(),
        );
        result
    }

    async fn torrent_info(
        &self,
        api_key: &str,
        torrent_id: &str,
    ) -> Result<RdTorrentInfo, ProviderError> {
        let url = format!(
            "{}/torrents/info/{}",
            self.base_url(),
            urlencoding::encode(torrent_id)
        );
        let response = self.call("info", api_key, self.client.get(&url)).await?;
        Ok(response.json().await?)
    }

    /// Wait for the torrent to report `downloaded` with at least one link.
    async fn wait_for_link(
        &self,
        api_key: &str,
        torrent_id: &str,
    ) -> Result<String, ResolutionError> {
        let polled = self
            .links
            .poll(move |attempt| async move {
                match self.torrent_info(api_key, torrent_id).await {
                    Ok(info) => {
                        let status = parse_rd_status(&info.status);
                        match status {
                            TorrentStatus::Ready if !info.links.is_empty() => {
                                Ok(Probe::Ready(info.links[0].clone()))
                            }
                            TorrentStatus::DownloadingNotCached => Err(ResolutionError::NotCached(
                                "Real-Debrid is downloading the torrent".to_string(),
                            )),
                            TorrentStatus::Failed => Err(ResolutionError::LinkGenerationFailed(
                                format!("torrent status '{}'", info.status),
                            )),
                            _ => {
                                debug!(torrent_id, attempt, status = %info.status, "Waiting for links");
                                Ok(Probe::Pending)
                            }
                        }
                    }
                    Err(e) => {
                        warn!(torrent_id, attempt, error = %e, "Real-Debrid info poll failed");
                        Ok(Probe::Pending)
                    }
                }
            })
            .await?;

        match polled {
            Polled::Ready { value, .. } => Ok(value),
            Polled::Exhausted { attempts } => Err(ResolutionError::LinkGenerationFailed(format!(
                "no download link after {} attempts",
                attempts
            ))),
        }
    }
}

async fn send_checked(request: RequestBuilder) -> Result<Response, ProviderError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Api {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        });
    }
    Ok(response)
}

#[async_trait]
impl DebridProvider for RealDebridClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::RealDebrid
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
            "{}/torrents/instantAvailability/{}",
            self.base_url(),
            urlencoding::encode(info_hash)
        );
        let response = self
            .call("instant_availability", api_key, self.client.get(&url))
            .await?;
        let body: Value = response.json().await?;

        let cached = parse_cached_ids(&body, info_hash);
        match &cached {
            Some(ids) => info!(info_hash, cached_files = ids.len(), "Real-Debrid instant availability"),
            None => debug!(info_hash, "Real-Debrid has no availability data for hash"),
        }
        Ok(cached)
    }

    async fn add_source(
        &self,
        api_key: &str,
        magnet: &str,
    ) -> Result<AddedTorrent, ProviderError> {
        let url = format!("{}/torrents/addMagnet", self.base_url());
        let response = self
            .call(
                "add_magnet",
                api_key,
                self.client.post(&url).form(&[("magnet", magnet)]),
            )
            .await?;
        let added: RdAddResponse = response.json().await?;

        match added.id.filter(|id| !id.is_empty()) {
            Some(torrent_id) => Ok(AddedTorrent {
                torrent_id,
                snapshot: None,
            }),
            None => Err(ProviderError::InvalidResponse(
                "no torrent id in addMagnet response".to_string(),
            )),
        }
    }

    async fn list_files(
        &self,
        api_key: &str,
        torrent_id: &str,
    ) -> Result<TorrentSnapshot, ProviderError> {
        Ok(self.torrent_info(api_key, torrent_id).await?.into_snapshot())
    }

    async fn select_file(
        &self,
        api_key: &str,
        snapshot: &TorrentSnapshot,
        file: &FileCandidate,
    ) -> Result<(), ProviderError> {
        if snapshot.raw_status != WAITING_FILES_SELECTION {
            return Ok(());
        }

        let url = format!(
            "{}/torrents/selectFiles/{}",
            self.base_url(),
            urlencoding::encode(&snapshot.torrent_id)
        );
        debug!(torrent_id = %snapshot.torrent_id, file_id = %file.id, "Selecting file");
        self.call(
            "select_files",
            api_key,
            self.client.post(&url).form(&[("files", file.id.as_str())]),
        )
        .await?;
        Ok(())
    }

    async fn finalize_link(
        &self,
        api_key: &str,
        snapshot: &TorrentSnapshot,
        _file: &FileCandidate,
    ) -> Result<String, ResolutionError> {
        let link = self.wait_for_link(api_key, &snapshot.torrent_id).await?;

        let url = format!("{}/unrestrict/link", self.base_url());
        let response = self
            .call(
                "unrestrict",
                api_key,
                self.client.post(&url).form(&[("link", link.as_str())]),
            )
            .await
            .map_err(|e| ResolutionError::LinkGenerationFailed(e.to_string()))?;
        let unrestricted: RdUnrestrictResponse = response
            .json()
            .await
            .map_err(|e| ResolutionError::LinkGenerationFailed(e.to_string()))?;

        unrestricted
            .download
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                ResolutionError::LinkGenerationFailed("unrestrict returned no download".to_string())
            })
    }
}
