//! Types for release index searches.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorKind;

/// One release returned by the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    /// Lowercase 40-char hex info hash.
    pub info_hash: String,
    /// Raw release title / filename.
    pub title: String,
    pub size_bytes: Option<u64>,
}

/// A single request to the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexQuery {
    pub query_title: String,
    pub imdb_id: Option<String>,
    pub year: Option<u32>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl IndexQuery {
    /// Free-text query with no structured filters.
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query_title: query.into(),
            ..Default::default()
        }
    }
}

/// Errors that can occur during index searches.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search backend connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Search backend API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,
}

impl SearchError {
    /// Every search failure means the index is unavailable.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::UpstreamUnavailable
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        let e = e.without_url();
        if e.is_timeout() {
            SearchError::Timeout
        } else if e.is_connect() {
            SearchError::ConnectionFailed(e.to_string())
        } else {
            SearchError::ApiError(e.to_string())
        }
    }
}

/// Trait for release index backends.
#[async_trait]
pub trait ReleaseIndex: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Run one query. Unexpected response shapes yield an empty list.
    async fn search(&self, query: &IndexQuery) -> Result<Vec<ReleaseRecord>, SearchError>;
}
