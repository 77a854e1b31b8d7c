//! Season/episode patterns in release names.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

static SEASON_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^a-z0-9])s(\d{1,2})(?:[\s._-]?e\d{1,3}|[^a-z0-9]|$)").unwrap());

static SEASON_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"season[\s._-]*(\d{1,2})").unwrap());

static CROSS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^a-z0-9])(\d{1,2})x(\d{2,3})(?:[^0-9]|$)").unwrap());

static SEASON_EPISODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^a-z0-9])s\d{1,2}[\s._-]?e(\d{1,3})").unwrap());

static EPISODE_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"episode[\s._-]*(\d{1,3})").unwrap());

/// A specific episode of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeTarget {
    pub season: u32,
    pub episode: u32,
}

impl EpisodeTarget {
    pub fn new(season: u32, episode: u32) -> Self {
        Self { season, episode }
    }

    /// Both halves must be present for an episode to be targeted.
    pub fn from_parts(season: Option<u32>, episode: Option<u32>) -> Option<Self> {
        Some(Self::new(season?, episode?))
    }

    /// `S01E02` form, as used in free-text index queries.
    pub fn tag(&self) -> String {
        format!("S{:02}E{:02}", self.season, self.episode)
    }
}

/// The filename shapes tried when confirming an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodePattern {
    /// `S02E05`
    PaddedSeasonEpisode,
    /// `S2E5`
    SeasonEpisode,
    /// `2x05`
    PaddedCross,
    /// `2x5`
    Cross,
}

impl EpisodePattern {
    pub const ALL: [EpisodePattern; 4] = [
        EpisodePattern::PaddedSeasonEpisode,
        EpisodePattern::SeasonEpisode,
        EpisodePattern::PaddedCross,
        EpisodePattern::Cross,
    ];

    fn render(&self, target: &EpisodeTarget) -> String {
        let (s, e) = (target.season, target.episode);
        match self {
            EpisodePattern::PaddedSeasonEpisode => format!("s{:02}e{:02}", s, e),
            EpisodePattern::SeasonEpisode => format!("s{}e{}", s, e),
            EpisodePattern::PaddedCross => format!("{}x{:02}", s, e),
            EpisodePattern::Cross => format!("{}x{}", s, e),
        }
    }

    /// Case-insensitive match of this shape. The numbers must not be
    /// glued to further digits, so `s1e1` does not match `s1e10`.
    pub fn matches(&self, name: &str, target: &EpisodeTarget) -> bool {
        let lower = name.to_lowercase();
        let needle = self.render(target);
        lower.match_indices(&needle).any(|(start, m)| {
            let before = lower[..start].chars().next_back();
            let after = lower[start + m.len()..].chars().next();
            !before.is_some_and(|c| c.is_ascii_digit()) && !after.is_some_and(|c| c.is_ascii_digit())
        })
    }
}

/// True if the name carries the target episode in any known shape.
pub fn matches_episode(name: &str, target: &EpisodeTarget) -> bool {
    EpisodePattern::ALL.iter().any(|p| p.matches(name, target))
}

/// Season number mentioned in a release name (`S01`, `Season 1`, `1x02`).
pub fn detect_season(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    [&*SEASON_MARKER_RE, &*SEASON_WORD_RE, &*CROSS_RE]
        .into_iter()
        .find_map(|re| capture_number(re, &lower, 1))
}

/// Episode number mentioned in a release name.
///
/// Only numbers tied to a season marker (`S01E02`, `1x02`) or the word
/// "episode" count; bare `x264`/`E-AC3` style tokens never do.
pub fn detect_episode(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    capture_number(&SEASON_EPISODE_RE, &lower, 1)
        .or_else(|| capture_number(&CROSS_RE, &lower, 2))
        .or_else(|| capture_number(&EPISODE_WORD_RE, &lower, 1))
}

fn capture_number(re: &Regex, haystack: &str, group: usize) -> Option<u32> {
    re.captures(haystack)?.get(group)?.as_str().parse().ok()
}
