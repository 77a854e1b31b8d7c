//! Candidate scoring.
//!
//! Scores are ordinal. Anything at or below [`REJECT_THRESHOLD`] is rejected
//! from ranking; above it, higher is better.

use serde::{Deserialize, Serialize};

use super::attributes::{extract, AudioFormat, Codec, HdrFormat, Quality, ReleaseAttributes, Source};

/// Returned when a file carries something the caller asked to exclude.
pub const HARD_EXCLUDED_SCORE: i32 = -1000;

/// Returned for camera rips, telesyncs and samples.
pub const JUNK_SCORE: i32 = -500;

/// Assigned to files the provider does not report as cached.
pub const NOT_CACHED_SCORE: i32 = -2000;

/// Files scoring at or below this are dropped from ranking.
pub const REJECT_THRESHOLD: i32 = -900;

const GIB: u64 = 1024 * 1024 * 1024;
const MAX_SIZE_BONUS: u64 = 50;

/// Per-request exclusions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionPreferences {
    #[serde(default)]
    pub exclude_hevc: bool,
    /// Also covers Atmos, which ships on an E-AC3 core in streaming releases.
    #[serde(default)]
    pub exclude_eac3: bool,
    /// Also covers HDR10+.
    #[serde(default)]
    pub exclude_dolby_vision: bool,
}

/// Score a file by name and size.
pub fn score(filename: &str, size_bytes: u64, exclusions: &ExclusionPreferences) -> i32 {
    score_attributes(&extract(filename), size_bytes, exclusions)
}

/// Score already-extracted attributes.
pub fn score_attributes(
    attrs: &ReleaseAttributes,
    size_bytes: u64,
    exclusions: &ExclusionPreferences,
) -> i32 {
    if is_excluded(attrs, exclusions) {
        return HARD_EXCLUDED_SCORE;
    }
    if attrs.junk {
        return JUNK_SCORE;
    }

    let quality = match attrs.quality {
        Quality::Uhd4k => 200,
        Quality::Fhd1080p => 100,
        Quality::Hd720p => 50,
        Quality::Sd480p | Quality::Unknown => 0,
    };

    let source = match attrs.source {
        Source::Remux => 100,
        Source::Bluray => 80,
        Source::Web => 50,
        Source::Hdtv | Source::Cam | Source::Unknown => 0,
    };

    let audio = if [AudioFormat::Atmos, AudioFormat::TrueHd, AudioFormat::DtsX]
        .iter()
        .any(|a| attrs.audio.contains(a))
    {
        40
    } else if attrs.audio.contains(&AudioFormat::Eac3) {
        20
    } else {
        0
    };

    let mut hdr = 0;
    if attrs.hdr.contains(&HdrFormat::DolbyVision) {
        hdr += 50;
    }
    if attrs.hdr.contains(&HdrFormat::Hdr10) || attrs.hdr.contains(&HdrFormat::Hdr10Plus) {
        hdr += 30;
    }

    quality + source + audio + hdr + size_bonus(size_bytes)
}

fn is_excluded(attrs: &ReleaseAttributes, exclusions: &ExclusionPreferences) -> bool {
    (exclusions.exclude_hevc && attrs.codecs.contains(&Codec::Hevc))
        || (exclusions.exclude_eac3
            && (attrs.audio.contains(&AudioFormat::Eac3) || attrs.audio.contains(&AudioFormat::Atmos)))
        || (exclusions.exclude_dolby_vision
            && (attrs.hdr.contains(&HdrFormat::DolbyVision)
                || attrs.hdr.contains(&HdrFormat::Hdr10Plus)))
}

/// One point per whole GiB, capped.
fn size_bonus(size_bytes: u64) -> i32 {
    (size_bytes / GIB).min(MAX_SIZE_BONUS) as i32
}
