//! Mock debrid provider for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::RecordingSleeper;
use crate::config::PollConfig;
use crate::debrid::{
    AddedTorrent, DebridProvider, FileCandidate, Poller, ProviderError, ProviderKind,
    ResolutionError, TorrentSnapshot, TorrentStatus,
};

const MOCK_TORRENT_ID: &str = "mock-torrent-1";

/// Mock implementation of the DebridProvider trait.
///
/// Provides controllable behavior for testing:
/// - Scripted file listings, availability and torrent status
/// - One-shot failures per step
/// - Recorded calls for ordering assertions
///
/// Hydration uses a [`RecordingSleeper`], so polling never waits.
///
/// # Example
///
/// ```rust,ignore
/// let provider = MockProvider::new(ProviderKind::RealDebrid);
/// provider.set_files(vec![fixtures::movie_file("1")]).await;
/// provider.set_cached(Some(&["1"])).await;
///
/// let resolution = ResolutionSession::new(&provider, "key").run(&request).await?;
/// assert_eq!(resolution.url, "https://cdn.example/1");
/// ```
pub struct MockProvider {
    kind: ProviderKind,
    hydration: Poller,
    sleeper: Arc<RecordingSleeper>,
    /// Files returned once the torrent is hydrated.
    files: Arc<RwLock<Vec<FileCandidate>>>,
    /// Normalized and raw status reported by list_files.
    status: Arc<RwLock<(TorrentStatus, String)>>,
    /// list_files returns no files before this many calls.
    ready_after: Arc<RwLock<u32>>,
    /// Embed the file list in the add response.
    embed_files: Arc<RwLock<bool>>,
    /// Cached file ids reported by check_availability.
    cached: Arc<RwLock<Option<HashSet<String>>>>,
    availability_error: Arc<RwLock<Option<ProviderError>>>,
    add_error: Arc<RwLock<Option<ProviderError>>>,
    finalize_error: Arc<RwLock<Option<ResolutionError>>>,
    /// Operation names in call order.
    calls: Arc<RwLock<Vec<String>>>,
    magnets: Arc<RwLock<Vec<String>>>,
    api_keys: Arc<RwLock<Vec<String>>>,
    list_calls: Arc<RwLock<u32>>,
}

impl std::fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockProvider")
            .field("kind", &self.kind)
            .field("hydration", &self.hydration)
            .finish()
    }
}

impl MockProvider {
    /// Create a mock provider with an empty torrent.
    pub fn new(kind: ProviderKind) -> Self {
        let sleeper = Arc::new(RecordingSleeper::new());
        Self {
            kind,
            hydration: Poller::with_sleeper(PollConfig::new(5, 1000), sleeper.clone()),
            sleeper,
            files: Arc::new(RwLock::new(Vec::new())),
            status: Arc::new(RwLock::new((TorrentStatus::Ready, "downloaded".to_string()))),
            ready_after: Arc::new(RwLock::new(0)),
            embed_files: Arc::new(RwLock::new(false)),
            cached: Arc::new(RwLock::new(None)),
            availability_error: Arc::new(RwLock::new(None)),
            add_error: Arc::new(RwLock::new(None)),
            finalize_error: Arc::new(RwLock::new(None)),
            calls: Arc::new(RwLock::new(Vec::new())),
            magnets: Arc::new(RwLock::new(Vec::new())),
            api_keys: Arc::new(RwLock::new(Vec::new())),
            list_calls: Arc::new(RwLock::new(0)),
        }
    }

    /// Override the hydration budget.
    pub fn with_hydration_attempts(mut self, attempts: u32) -> Self {
        self.hydration = Poller::with_sleeper(PollConfig::new(attempts, 1000), self.sleeper.clone());
        self
    }

    /// The sleeper used for hydration polling.
    pub fn sleeper(&self) -> Arc<RecordingSleeper> {
        self.sleeper.clone()
    }

    /// Set the torrent file list.
    pub async fn set_files(&self, files: Vec<FileCandidate>) {
        *self.files.write().await = files;
    }

    /// Set the status reported by list_files.
    pub async fn set_status(&self, status: TorrentStatus, raw: &str) {
        *self.status.write().await = (status, raw.to_string());
    }

    /// Report no files until list_files has been called `calls` times.
    pub async fn set_ready_after(&self, calls: u32) {
        *self.ready_after.write().await = calls;
    }

    /// Return the file list directly from add_source.
    pub async fn set_embed_files(&self, embed: bool) {
        *self.embed_files.write().await = embed;
    }

    /// Set the cached file ids (`None` = availability unknown).
    pub async fn set_cached(&self, ids: Option<&[&str]>) {
        *self.cached.write().await =
            ids.map(|ids| ids.iter().map(|id| id.to_string()).collect());
    }

    /// Make the next availability check fail.
    pub async fn set_availability_error(&self, error: ProviderError) {
        *self.availability_error.write().await = Some(error);
    }

    /// Make the next add fail.
    pub async fn set_add_error(&self, error: ProviderError) {
        *self.add_error.write().await = Some(error);
    }

    /// Make the next link finalization fail.
    pub async fn set_finalize_error(&self, error: ResolutionError) {
        *self.finalize_error.write().await = Some(error);
    }

    /// Operation names in call order, e.g. `select_file:2`.
    pub async fn recorded_calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    /// Magnets passed to add_source.
    pub async fn added_magnets(&self) -> Vec<String> {
        self.magnets.read().await.clone()
    }

    /// API keys seen by add_source.
    pub async fn used_api_keys(&self) -> Vec<String> {
        self.api_keys.read().await.clone()
    }

    /// Number of list_files calls.
    pub async fn list_calls(&self) -> u32 {
        *self.list_calls.read().await
    }

    async fn record(&self, call: impl Into<String>) {
        self.calls.write().await.push(call.into());
    }

    async fn snapshot(&self, with_files: bool) -> TorrentSnapshot {
        let (status, raw_status) = self.status.read().await.clone();
        let files = if with_files && status != TorrentStatus::Failed {
            self.files.read().await.clone()
        } else {
            Vec::new()
        };
        TorrentSnapshot {
            torrent_id: MOCK_TORRENT_ID.to_string(),
            status: if with_files { status } else { TorrentStatus::Hydrating },
            raw_status,
            files,
            links: Vec::new(),
        }
    }
}

#[async_trait]
impl DebridProvider for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn hydration(&self) -> &Poller {
        &self.hydration
    }

    async fn check_availability(
        &self,
        _api_key: &str,
        _info_hash: &str,
    ) -> Result<Option<HashSet<String>>, ProviderError> {
        self.record("check_availability").await;
        if let Some(error) = self.availability_error.write().await.take() {
            return Err(error);
        }
        Ok(self.cached.read().await.clone())
    }

    async fn add_source(
        &self,
        api_key: &str,
        magnet: &str,
    ) -> Result<AddedTorrent, ProviderError> {
        self.record("add_source").await;
        self.magnets.write().await.push(magnet.to_string());
        self.api_keys.write().await.push(api_key.to_string());
        if let Some(error) = self.add_error.write().await.take() {
            return Err(error);
        }

        let snapshot = if *self.embed_files.read().await {
            Some(self.snapshot(true).await)
        } else {
            None
        };
        Ok(AddedTorrent {
            torrent_id: MOCK_TORRENT_ID.to_string(),
            snapshot,
        })
    }

    async fn list_files(
        &self,
        _api_key: &str,
        _torrent_id: &str,
    ) -> Result<TorrentSnapshot, ProviderError> {
        self.record("list_files").await;
        let calls = {
            let mut count = self.list_calls.write().await;
            *count += 1;
            *count
        };
        let ready = calls >= *self.ready_after.read().await;
        Ok(self.snapshot(ready).await)
    }

    async fn select_file(
        &self,
        _api_key: &str,
        _snapshot: &TorrentSnapshot,
        file: &FileCandidate,
    ) -> Result<(), ProviderError> {
        self.record(format!("select_file:{}", file.id)).await;
        Ok(())
    }

    async fn finalize_link(
        &self,
        _api_key: &str,
        _snapshot: &TorrentSnapshot,
        file: &FileCandidate,
    ) -> Result<String, ResolutionError> {
        self.record(format!("finalize_link:{}", file.id)).await;
        if let Some(error) = self.finalize_error.write().await.take() {
            return Err(error);
        }
        Ok(format!("https://cdn.example/{}", file.id))
    }
}
