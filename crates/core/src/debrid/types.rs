//! Types for debrid provider operations.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::error::ErrorKind;
use crate::release::{EpisodeTarget, ExclusionPreferences};

/// Which debrid backend handled a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    TorBox,
    RealDebrid,
}

impl ProviderKind {
    /// Returns the string representation for API responses and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::TorBox => "torbox",
            ProviderKind::RealDebrid => "realdebrid",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single provider HTTP call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        // TorBox takes the API key as a query parameter
        let e = e.without_url();
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_connect() {
            ProviderError::ConnectionFailed(e.to_string())
        } else if e.is_decode() {
            ProviderError::InvalidResponse(e.to_string())
        } else {
            ProviderError::ConnectionFailed(e.to_string())
        }
    }
}

/// Terminal failure of a resolution call.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("No debrid API key configured")]
    MissingCredentials,

    #[error("Failed to add torrent: {0}")]
    AddFailed(String),

    #[error("Torrent file list not available after {attempts} attempts")]
    HydrationTimeout { attempts: u32 },

    #[error("Torrent contains no video files")]
    NoVideoFiles,

    #[error("Torrent is not cached: {0}")]
    NotCached(String),

    #[error("Failed to generate download link: {0}")]
    LinkGenerationFailed(String),
}

impl ResolutionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolutionError::MissingCredentials => ErrorKind::MissingCredentials,
            ResolutionError::AddFailed(_) => ErrorKind::AddFailed,
            ResolutionError::HydrationTimeout { .. } => ErrorKind::HydrationTimeout,
            ResolutionError::NoVideoFiles => ErrorKind::NoVideoFiles,
            ResolutionError::NotCached(_) => ErrorKind::NotCached,
            ResolutionError::LinkGenerationFailed(_) => ErrorKind::LinkGenerationFailed,
        }
    }
}

/// One file inside a provider torrent listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCandidate {
    /// Provider-defined file id, stringified.
    pub id: String,
    /// Path or name as reported by the provider.
    pub name: String,
    pub size_bytes: u64,
}

impl FileCandidate {
    pub fn new(id: impl Into<String>, name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            size_bytes,
        }
    }
}

/// Provider torrent status, normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentStatus {
    /// Accepted, nothing known yet (or waiting for file selection).
    Pending,
    /// Fetching metadata / checking.
    Hydrating,
    /// Content available for link generation.
    Ready,
    /// Provider is downloading from the swarm; not instantly playable.
    DownloadingNotCached,
    /// Provider gave up on the torrent.
    Failed,
}

impl TorrentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentStatus::Pending => "pending",
            TorrentStatus::Hydrating => "hydrating",
            TorrentStatus::Ready => "ready",
            TorrentStatus::DownloadingNotCached => "downloading_not_cached",
            TorrentStatus::Failed => "failed",
        }
    }
}

/// Provider-side view of one torrent at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentSnapshot {
    pub torrent_id: String,
    pub status: TorrentStatus,
    /// Status string exactly as the provider reported it.
    pub raw_status: String,
    pub files: Vec<FileCandidate>,
    pub links: Vec<String>,
}

/// Result of submitting a magnet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedTorrent {
    pub torrent_id: String,
    /// Present when the add response already carried the file list.
    pub snapshot: Option<TorrentSnapshot>,
}

/// Whether the selected file is known to be the requested episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeMatch {
    /// No season/episode was asked for.
    NotRequested,
    /// The filename carries the requested episode.
    Confirmed,
    /// No filename matched; the best-ranked file was returned instead.
    Unconfirmed,
}

/// Input to a single resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    pub info_hash: String,
    pub magnet: Option<String>,
    pub exclusions: ExclusionPreferences,
    pub episode: Option<EpisodeTarget>,
}

impl ResolveRequest {
    pub fn new(info_hash: impl Into<String>) -> Self {
        Self {
            info_hash: info_hash.into(),
            magnet: None,
            exclusions: ExclusionPreferences::default(),
            episode: None,
        }
    }

    pub fn with_magnet(mut self, magnet: impl Into<String>) -> Self {
        self.magnet = Some(magnet.into());
        self
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionPreferences) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_episode(mut self, episode: EpisodeTarget) -> Self {
        self.episode = Some(episode);
        self
    }

    /// The caller's magnet, or one synthesized from the info hash.
    pub fn magnet_uri(&self) -> String {
        match self.magnet.as_deref().map(str::trim) {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => format!("magnet:?xt=urn:btih:{}", self.info_hash),
        }
    }
}

/// A playable stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub url: String,
    pub provider: ProviderKind,
    pub file: FileCandidate,
    pub score: i32,
    pub episode_match: EpisodeMatch,
}
