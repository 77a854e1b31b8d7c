//! One resolution against one provider, start to finish.

use std::time::Instant;

use tracing::{debug, info, warn};

use super::selection::{rank_files, select_file, video_files};
use super::{DebridProvider, EpisodeMatch, ResolutionError, Resolution, ResolveRequest};
use crate::metrics;

/// Drives availability check, add, hydration, ranking, selection and link
/// generation strictly in sequence. A session is never reused; each call
/// submits a fresh add.
pub struct ResolutionSession<'a> {
    provider: &'a dyn DebridProvider,
    api_key: &'a str,
}

impl<'a> ResolutionSession<'a> {
    pub fn new(provider: &'a dyn DebridProvider, api_key: &'a str) -> Self {
        Self { provider, api_key }
    }

    /// Resolve a request to a playable URL.
    pub async fn run(self, request: &ResolveRequest) -> Result<Resolution, ResolutionError> {
        let kind = self.provider.kind();
        let start = Instant::now();

        let result = self.drive(request).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind().as_str(),
        };
        metrics::RESOLUTIONS_TOTAL
            .with_label_values(&[kind.as_str(), outcome])
            .inc();
        metrics::RESOLUTION_DURATION
            .with_label_values(&[kind.as_str()])
            .observe(start.elapsed().as_secs_f64());

        result
    }

    async fn drive(&self, request: &ResolveRequest) -> Result<Resolution, ResolutionError> {
        let provider = self.provider;
        let kind = provider.kind();
        let info_hash = request.info_hash.as_str();

        let cached = match provider.check_availability(self.api_key, info_hash).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!(provider = %kind, info_hash, error = %e, "Availability check failed, continuing without it");
                None
            }
        };
        if let Some(ids) = &cached {
            debug!(provider = %kind, info_hash, cached_files = ids.len(), "Instant availability known");
        }

        let added = provider
            .add_source(self.api_key, &request.magnet_uri())
            .await
            .map_err(|e| ResolutionError::AddFailed(e.to_string()))?;
        if added.torrent_id.is_empty() {
            return Err(ResolutionError::AddFailed(
                "provider returned no torrent id".to_string(),
            ));
        }
        info!(provider = %kind, info_hash, torrent_id = %added.torrent_id, "Torrent added");

        let snapshot = provider.poll_until_ready(self.api_key, added).await?;

        let videos = video_files(&snapshot.files);
        if videos.is_empty() {
            return Err(ResolutionError::NoVideoFiles);
        }

        let ranking = rank_files(videos, &request.exclusions, cached.as_ref());
        if ranking.degraded {
            metrics::DEGRADED_RANKINGS.inc();
            warn!(
                provider = %kind,
                torrent_id = %snapshot.torrent_id,
                files = ranking.ranked.len(),
                "Every file was rejected by scoring, falling back to largest file"
            );
        }

        let selection =
            select_file(&ranking, request.episode.as_ref()).ok_or(ResolutionError::NoVideoFiles)?;
        if selection.episode_match == EpisodeMatch::Unconfirmed {
            metrics::UNCONFIRMED_EPISODES.inc();
            warn!(
                provider = %kind,
                torrent_id = %snapshot.torrent_id,
                episode = ?request.episode,
                file = %selection.file.name,
                "No file matched the requested episode, using top-ranked file"
            );
        }
        info!(
            provider = %kind,
            torrent_id = %snapshot.torrent_id,
            file = %selection.file.name,
            score = selection.score,
            "Selected file"
        );

        provider
            .select_file(self.api_key, &snapshot, &selection.file)
            .await
            .map_err(|e| ResolutionError::LinkGenerationFailed(e.to_string()))?;

        let url = provider
            .finalize_link(self.api_key, &snapshot, &selection.file)
            .await?;

        Ok(Resolution {
            url,
            provider: kind,
            file: selection.file,
            score: selection.score,
            episode_match: selection.episode_match,
        })
    }
}
