//! Provider-independent ranking and file selection.

use std::collections::HashSet;

use crate::release::{
    matches_episode, score, EpisodeTarget, ExclusionPreferences, HARD_EXCLUDED_SCORE,
    NOT_CACHED_SCORE, REJECT_THRESHOLD,
};

use super::{EpisodeMatch, FileCandidate};

/// Containers considered playable.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm"];

/// Check whether a file name ends in a known video container.
pub fn is_video_file(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Keep only video files.
pub fn video_files(files: &[FileCandidate]) -> Vec<FileCandidate> {
    files
        .iter()
        .filter(|f| is_video_file(&f.name))
        .cloned()
        .collect()
}

/// A file with its final score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedFile {
    pub file: FileCandidate,
    pub score: i32,
}

/// Files in preference order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking {
    pub ranked: Vec<RankedFile>,
    /// Every file was rejected and the list is ordered by size instead.
    pub degraded: bool,
}

/// The file chosen for link generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub file: FileCandidate,
    pub score: i32,
    pub episode_match: EpisodeMatch,
}

/// Score and order video files.
///
/// When `cached` is known, files missing from it get [`NOT_CACHED_SCORE`].
/// Files at or below [`REJECT_THRESHOLD`] are dropped; junk sits above it
/// and only sinks to the bottom. If the threshold drops
/// everything, the ranking degrades to size order: files the caller
/// explicitly excluded go last there, but are kept so a stream is still
/// produced.
pub fn rank_files(
    files: Vec<FileCandidate>,
    exclusions: &ExclusionPreferences,
    cached: Option<&HashSet<String>>,
) -> Ranking {
    let scored: Vec<RankedFile> = files
        .into_iter()
        .map(|file| {
            let mut file_score = score(&file.name, file.size_bytes, exclusions);
            if let Some(cached) = cached {
                if !cached.contains(&file.id) && file_score != HARD_EXCLUDED_SCORE {
                    file_score = NOT_CACHED_SCORE;
                }
            }
            RankedFile {
                file,
                score: file_score,
            }
        })
        .collect();

    let mut ranked: Vec<RankedFile> = scored
        .iter()
        .filter(|r| r.score > REJECT_THRESHOLD)
        .cloned()
        .collect();

    if !ranked.is_empty() || scored.is_empty() {
        // stable: ties keep provider order
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        return Ranking {
            ranked,
            degraded: false,
        };
    }

    let mut fallback = scored;
    fallback.sort_by(|a, b| {
        let a_excluded = a.score == HARD_EXCLUDED_SCORE;
        let b_excluded = b.score == HARD_EXCLUDED_SCORE;
        a_excluded
            .cmp(&b_excluded)
            .then(b.file.size_bytes.cmp(&a.file.size_bytes))
    });
    Ranking {
        ranked: fallback,
        degraded: true,
    }
}

/// Pick a file from a ranking.
///
/// With a target episode, the first ranked file whose name carries that
/// episode wins; otherwise the top-ranked file is returned and marked
/// unconfirmed. Returns `None` only for an empty ranking.
pub fn select_file(ranking: &Ranking, target: Option<&EpisodeTarget>) -> Option<Selection> {
    let top = ranking.ranked.first()?;

    let Some(target) = target else {
        return Some(Selection {
            file: top.file.clone(),
            score: top.score,
            episode_match: EpisodeMatch::NotRequested,
        });
    };

    let (chosen, episode_match) = ranking
        .ranked
        .iter()
        .find(|r| matches_episode(&r.file.name, target))
        .map(|r| (r, EpisodeMatch::Confirmed))
        .unwrap_or((top, EpisodeMatch::Unconfirmed));

    Some(Selection {
        file: chosen.file.clone(),
        score: chosen.score,
        episode_match,
    })
}
