//! Mock release index for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::searcher::{IndexQuery, ReleaseIndex, ReleaseRecord, SearchError};

/// A query handler that produces results dynamically based on the query.
type QueryHandler = Box<dyn Fn(&IndexQuery) -> Vec<ReleaseRecord> + Send + Sync>;

/// Mock implementation of the ReleaseIndex trait.
///
/// Returns fixed results, or results from a query handler when one is set.
/// Every query is recorded.
///
/// # Example
///
/// ```rust,ignore
/// let index = Arc::new(MockIndex::new());
/// index.set_query_handler(|q| {
///     if q.query_title == "Foo S01E02" {
///         vec![fixtures::release_record("Foo.S01E02.1080p", 1)]
///     } else {
///         Vec::new()
///     }
/// }).await;
///
/// let outcome = SearchCascade::new(index.clone()).search(&request).await?;
/// assert_eq!(index.search_count().await, 2);
/// ```
pub struct MockIndex {
    results: Arc<RwLock<Vec<ReleaseRecord>>>,
    queries: Arc<RwLock<Vec<IndexQuery>>>,
    /// If set, the next search will fail with this error.
    next_error: Arc<RwLock<Option<SearchError>>>,
    query_handler: Arc<RwLock<Option<QueryHandler>>>,
}

impl std::fmt::Debug for MockIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockIndex")
            .field("results", &"<results>")
            .field("queries", &"<queries>")
            .field("query_handler", &"<handler>")
            .finish()
    }
}

impl Default for MockIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl MockIndex {
    /// Create a new mock index with empty results.
    pub fn new() -> Self {
        Self {
            results: Arc::new(RwLock::new(Vec::new())),
            queries: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            query_handler: Arc::new(RwLock::new(None)),
        }
    }

    /// Set the results returned for every query.
    pub async fn set_results(&self, results: Vec<ReleaseRecord>) {
        *self.results.write().await = results;
    }

    /// Produce results per query instead of the fixed list.
    pub async fn set_query_handler<F>(&self, handler: F)
    where
        F: Fn(&IndexQuery) -> Vec<ReleaseRecord> + Send + Sync + 'static,
    {
        *self.query_handler.write().await = Some(Box::new(handler));
    }

    /// Configure the next search to fail with the given error.
    pub async fn set_next_error(&self, error: SearchError) {
        *self.next_error.write().await = Some(error);
    }

    /// Get recorded queries.
    pub async fn recorded_queries(&self) -> Vec<IndexQuery> {
        self.queries.read().await.clone()
    }

    /// Get the number of searches performed.
    pub async fn search_count(&self) -> usize {
        self.queries.read().await.len()
    }
}

#[async_trait]
impl ReleaseIndex for MockIndex {
    fn name(&self) -> &str {
        "mock-index"
    }

    async fn search(&self, query: &IndexQuery) -> Result<Vec<ReleaseRecord>, SearchError> {
        self.queries.write().await.push(query.clone());

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        if let Some(handler) = self.query_handler.read().await.as_ref() {
            return Ok(handler(query));
        }

        Ok(self.results.read().await.clone())
    }
}
