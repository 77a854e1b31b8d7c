//! Tiered search with acceptance filtering on the loosest tier.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::metrics;
use crate::release::{detect_episode, detect_season, EpisodeTarget};

use super::dedup::deduplicate_records;
use super::{IndexQuery, ReleaseIndex, ReleaseRecord, SearchError};

/// Movie or episodic content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Movie,
    #[serde(alias = "show", alias = "tv")]
    Series,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Series => "series",
        }
    }
}

/// What the caller is looking for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    pub title: String,
    pub imdb_id: Option<String>,
    pub year: Option<u32>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub media_type: MediaType,
}

/// The tier that produced a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTier {
    /// Title plus discrete year/IMDB/season/episode filters.
    Structured,
    /// `"<title> SxxEyy"` as free text.
    StringFallback,
    /// Title alone, filtered for season/episode disagreement.
    TitleOnly,
}

impl SearchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchTier::Structured => "structured",
            SearchTier::StringFallback => "string_fallback",
            SearchTier::TitleOnly => "title_only",
        }
    }
}

/// Results of a cascade. `tier` is `None` when every tier came back empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeOutcome {
    pub tier: Option<SearchTier>,
    pub records: Vec<ReleaseRecord>,
}

/// Runs progressively looser queries until one returns something.
///
/// Each tier's results replace the previous tier's; nothing is merged.
pub struct SearchCascade {
    index: Arc<dyn ReleaseIndex>,
}

impl SearchCascade {
    pub fn new(index: Arc<dyn ReleaseIndex>) -> Self {
        Self { index }
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<CascadeOutcome, SearchError> {
        let outcome = self.run_tiers(request).await?;

        let tier = outcome.tier.map(|t| t.as_str()).unwrap_or("empty");
        metrics::SEARCH_TIER_RESULTS.with_label_values(&[tier]).inc();
        metrics::SEARCH_RESULTS
            .with_label_values(&[])
            .observe(outcome.records.len() as f64);
        info!(
            index = self.index.name(),
            title = %request.title,
            tier,
            results = outcome.records.len(),
            "Search cascade complete"
        );

        Ok(outcome)
    }

    async fn run_tiers(&self, request: &SearchRequest) -> Result<CascadeOutcome, SearchError> {
        let structured = IndexQuery {
            query_title: request.title.clone(),
            imdb_id: request.imdb_id.clone(),
            year: request.year,
            season: request.season,
            episode: request.episode,
        };
        let records = self.query(&structured).await?;
        if !records.is_empty() {
            return Ok(found(SearchTier::Structured, records));
        }

        let target = EpisodeTarget::from_parts(request.season, request.episode);
        if let Some(target) = target {
            let text = format!("{} {}", request.title, target.tag());
            debug!(query = %text, "Structured search empty, trying string fallback");
            let records = self.query(&IndexQuery::text(text)).await?;
            if !records.is_empty() {
                return Ok(found(SearchTier::StringFallback, records));
            }
        }

        if let (MediaType::Series, Some(season)) = (request.media_type, request.season) {
            debug!(title = %request.title, "Falling back to title-only search");
            let records: Vec<_> = self
                .query(&IndexQuery::text(request.title.clone()))
                .await?
                .into_iter()
                .filter(|r| accepts(&r.title, season, request.episode))
                .collect();
            if !records.is_empty() {
                return Ok(found(SearchTier::TitleOnly, records));
            }
        }

        Ok(CascadeOutcome {
            tier: None,
            records: Vec::new(),
        })
    }

    async fn query(&self, query: &IndexQuery) -> Result<Vec<ReleaseRecord>, SearchError> {
        Ok(deduplicate_records(self.index.search(query).await?))
    }
}

fn found(tier: SearchTier, records: Vec<ReleaseRecord>) -> CascadeOutcome {
    CascadeOutcome {
        tier: Some(tier),
        records,
    }
}

/// Title-only acceptance: reject on a detected season or episode that
/// disagrees with the target. Undetectable numbers are accepted.
pub fn accepts(title: &str, season: u32, episode: Option<u32>) -> bool {
    if detect_season(title).is_some_and(|s| s != season) {
        return false;
    }
    match (episode, detect_episode(title)) {
        (Some(wanted), Some(found)) => wanted == found,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockIndex};

    fn series_request() -> SearchRequest {
        SearchRequest {
            title: "Foo".to_string(),
            season: Some(1),
            episode: Some(2),
            media_type: MediaType::Series,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_structured_tier_wins() {
        let index = Arc::new(MockIndex::new());
        index
            .set_results(vec![fixtures::release_record("Foo.S01E02.1080p", 1)])
            .await;

        let cascade = SearchCascade::new(index.clone());
        let outcome = cascade.search(&series_request()).await.unwrap();

        assert_eq!(outcome.tier, Some(SearchTier::Structured));
        assert_eq!(outcome.records.len(), 1);

        let queries = index.recorded_queries().await;
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].query_title, "Foo");
        assert_eq!(queries[0].season, Some(1));
        assert_eq!(queries[0].episode, Some(2));
    }

    #[tokio::test]
    async fn test_cascade_falls_through_all_tiers() {
        let index = Arc::new(MockIndex::new());
        index
            .set_query_handler(|query| {
                if query.query_title == "Foo" && query.season.is_none() {
                    vec![
                        fixtures::release_record("Foo.S01E02.720p", 1),
                        fixtures::release_record("Foo.S02E02.720p", 2),
                        fixtures::release_record("Foo.S01.Complete", 3),
                        fixtures::release_record("Foo.S01E05.1080p", 4),
                        fixtures::release_record("Foo.2019.1080p.x264", 5),
                    ]
                } else {
                    Vec::new()
                }
            })
            .await;

        let cascade = SearchCascade::new(index.clone());
        let outcome = cascade.search(&series_request()).await.unwrap();

        assert_eq!(outcome.tier, Some(SearchTier::TitleOnly));
        let titles: Vec<_> = outcome.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Foo.S01E02.720p", "Foo.S01.Complete", "Foo.2019.1080p.x264"]
        );

        let queries = index.recorded_queries().await;
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[1], IndexQuery::text("Foo S01E02"));
        assert_eq!(queries[2], IndexQuery::text("Foo"));
    }

    #[tokio::test]
    async fn test_string_fallback_tier() {
        let index = Arc::new(MockIndex::new());
        index
            .set_query_handler(|query| {
                if query.query_title == "Foo S01E02" {
                    vec![fixtures::release_record("Foo.S01E02.WEB", 9)]
                } else {
                    Vec::new()
                }
            })
            .await;

        let outcome = SearchCascade::new(index.clone())
            .search(&series_request())
            .await
            .unwrap();

        assert_eq!(outcome.tier, Some(SearchTier::StringFallback));
        assert_eq!(index.search_count().await, 2);
    }

    #[tokio::test]
    async fn test_movie_stops_after_structured() {
        let index = Arc::new(MockIndex::new());
        let request = SearchRequest {
            title: "Bar".to_string(),
            year: Some(2020),
            ..Default::default()
        };

        let outcome = SearchCascade::new(index.clone())
            .search(&request)
            .await
            .unwrap();

        assert_eq!(outcome.tier, None);
        assert!(outcome.records.is_empty());
        assert_eq!(index.search_count().await, 1);
    }

    #[tokio::test]
    async fn test_results_are_deduplicated() {
        let index = Arc::new(MockIndex::new());
        index
            .set_results(vec![
                fixtures::release_record("Foo A", 1),
                fixtures::release_record("Foo B", 1),
            ])
            .await;

        let outcome = SearchCascade::new(index)
            .search(&series_request())
            .await
            .unwrap();

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].title, "Foo A");
    }

    #[tokio::test]
    async fn test_index_failure_propagates() {
        let index = Arc::new(MockIndex::new());
        index.set_next_error(SearchError::Timeout).await;

        let result = SearchCascade::new(index).search(&series_request()).await;
        assert!(matches!(result, Err(SearchError::Timeout)));
    }

    #[test]
    fn test_accepts() {
        assert!(accepts("Foo.S01E02.720p", 1, Some(2)));
        assert!(accepts("Foo.S01.Complete", 1, Some(2)));
        assert!(accepts("Foo Season 1", 1, None));
        assert!(accepts("Foo.2019.1080p.x264", 1, Some(2)));
        assert!(!accepts("Foo.S02E02.720p", 1, Some(2)));
        assert!(!accepts("Foo.1x05.HDTV", 1, Some(2)));
        assert!(accepts("Foo.1x05.HDTV", 1, None));
    }

    #[test]
    fn test_media_type_aliases() {
        let parsed: MediaType = serde_json::from_str("\"show\"").unwrap();
        assert_eq!(parsed, MediaType::Series);
        let parsed: MediaType = serde_json::from_str("\"movie\"").unwrap();
        assert_eq!(parsed, MediaType::Movie);
    }
}
