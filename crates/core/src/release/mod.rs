//! Release filename analysis.
//!
//! Everything here is pure and synchronous: attribute extraction from a
//! release name, the candidate score built on top of it, and the episode
//! patterns shared by file selection and the search cascade.

mod attributes;
mod episode;
mod score;

pub use attributes::{
    extract, AudioFormat, Codec, HdrFormat, Quality, ReleaseAttributes, Source,
};
pub use episode::{detect_episode, detect_season, matches_episode, EpisodePattern, EpisodeTarget};
pub use score::{
    score, score_attributes, ExclusionPreferences, HARD_EXCLUDED_SCORE, JUNK_SCORE,
    NOT_CACHED_SCORE, REJECT_THRESHOLD,
};
