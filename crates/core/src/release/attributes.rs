//! Structured attributes parsed from a free-text release filename.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Trailing `-GROUP` right before an optional extension.
static RELEASE_GROUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-([A-Za-z0-9]+)(?:\.[A-Za-z0-9]{2,4})?$").unwrap());

/// Technical tokens that look like a release group but are not one.
const GROUP_DENYLIST: &[&str] = &[
    "264", "265", "hevc", "10bit", "8bit", "hdr", "remux", "4k", "2160p", "1080p", "720p",
    "480p", "webdl", "dl", "bluray", "x264", "x265", "h264", "h265",
];

/// Vertical resolution bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "4K")]
    Uhd4k,
    #[serde(rename = "1080p")]
    Fhd1080p,
    #[serde(rename = "720p")]
    Hd720p,
    #[serde(rename = "480p")]
    Sd480p,
    Unknown,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Uhd4k => "4K",
            Quality::Fhd1080p => "1080p",
            Quality::Hd720p => "720p",
            Quality::Sd480p => "480p",
            Quality::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    Hevc,
    Av1,
    H264,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AudioFormat {
    #[serde(rename = "atmos")]
    Atmos,
    #[serde(rename = "dts-x")]
    DtsX,
    #[serde(rename = "truehd")]
    TrueHd,
    #[serde(rename = "eac3")]
    Eac3,
    #[serde(rename = "ac3")]
    Ac3,
    #[serde(rename = "aac")]
    Aac,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HdrFormat {
    #[serde(rename = "dolby_vision")]
    DolbyVision,
    #[serde(rename = "hdr10+")]
    Hdr10Plus,
    #[serde(rename = "hdr10")]
    Hdr10,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Remux,
    Bluray,
    Web,
    Hdtv,
    Cam,
    Unknown,
}

/// Everything we can tell about a release from its name alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseAttributes {
    pub quality: Quality,
    pub codecs: BTreeSet<Codec>,
    pub audio: BTreeSet<AudioFormat>,
    pub hdr: BTreeSet<HdrFormat>,
    pub source: Source,
    pub release_group: Option<String>,
    /// Camera/telesync/sample marker present.
    pub junk: bool,
}

/// Lower-cased views of one filename.
struct Name<'a> {
    lower: String,
    /// Separators (`.`, `_`, `-`) collapsed to spaces, for multi-word phrases.
    spaced: String,
    original: &'a str,
}

impl<'a> Name<'a> {
    fn new(original: &'a str) -> Self {
        let lower = original.to_lowercase();
        let spaced = lower
            .chars()
            .map(|c| if matches!(c, '.' | '_' | '-') { ' ' } else { c })
            .collect();
        Self {
            lower,
            spaced,
            original,
        }
    }

    fn contains_any(&self, needles: &[&str]) -> bool {
        needles
            .iter()
            .any(|n| self.lower.contains(n) || self.spaced.contains(n))
    }

    /// Whole-token match, so short markers like "ts" or "dv" do not fire
    /// inside ordinary words.
    fn has_token(&self, tokens: &[&str]) -> bool {
        self.lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|t| tokens.contains(&t))
    }

    fn has_token_prefix(&self, prefix: &str) -> bool {
        self.lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|t| t.starts_with(prefix))
    }
}

/// Parse a release filename into its attributes.
pub fn extract(filename: &str) -> ReleaseAttributes {
    let name = Name::new(filename);
    ReleaseAttributes {
        quality: quality(&name),
        codecs: codecs(&name),
        audio: audio(&name),
        hdr: hdr(&name),
        source: source(&name),
        release_group: release_group(name.original),
        junk: is_junk(&name),
    }
}

fn quality(name: &Name) -> Quality {
    if name.contains_any(&["2160p"]) || name.has_token(&["4k", "uhd"]) {
        Quality::Uhd4k
    } else if name.contains_any(&["1080p"]) {
        Quality::Fhd1080p
    } else if name.contains_any(&["720p"]) {
        Quality::Hd720p
    } else if name.contains_any(&["480p"]) {
        Quality::Sd480p
    } else {
        Quality::Unknown
    }
}

fn codecs(name: &Name) -> BTreeSet<Codec> {
    let mut codecs = BTreeSet::new();
    if name.contains_any(&["hevc", "h265", "x265", "h.265"]) {
        codecs.insert(Codec::Hevc);
    }
    if name.has_token(&["av1"]) {
        codecs.insert(Codec::Av1);
    }
    if name.contains_any(&["h264", "x264", "h.264"]) || name.has_token(&["avc"]) {
        codecs.insert(Codec::H264);
    }
    codecs
}

fn audio(name: &Name) -> BTreeSet<AudioFormat> {
    let mut audio = BTreeSet::new();
    if name.contains_any(&["atmos"]) {
        audio.insert(AudioFormat::Atmos);
    }
    if name.contains_any(&["dts-hd", "dts hd", "dts:x", "dtsx", "dts-x", "dts x"]) {
        audio.insert(AudioFormat::DtsX);
    }
    if name.contains_any(&["truehd"]) {
        audio.insert(AudioFormat::TrueHd);
    }
    if name.contains_any(&["eac3", "ddp", "dd+", "dolby digital plus"]) {
        audio.insert(AudioFormat::Eac3);
    }
    if name.has_token(&["ac3", "dd5", "dd2"]) {
        audio.insert(AudioFormat::Ac3);
    }
    if name.has_token_prefix("aac") {
        audio.insert(AudioFormat::Aac);
    }
    audio
}

fn hdr(name: &Name) -> BTreeSet<HdrFormat> {
    let mut hdr = BTreeSet::new();
    if name.has_token(&["dv", "dovi"]) || name.contains_any(&["dolby vision"]) {
        hdr.insert(HdrFormat::DolbyVision);
    }
    // hdr10+ has to win over the generic hdr token it contains
    if name.contains_any(&["hdr10+", "hdr10plus"]) {
        hdr.insert(HdrFormat::Hdr10Plus);
    } else if name.has_token(&["hdr", "hdr10"]) {
        hdr.insert(HdrFormat::Hdr10);
    }
    hdr
}

fn source(name: &Name) -> Source {
    if name.contains_any(&["remux"]) {
        Source::Remux
    } else if name.contains_any(&["bluray", "blu-ray", "bdrip", "brrip"]) {
        Source::Bluray
    } else if name.contains_any(&["webdl", "web-dl", "webrip"])
        || name.has_token(&["web", "amzn", "nf", "hbo", "hmax", "dsnp"])
    {
        Source::Web
    } else if name.contains_any(&["hdtv"]) {
        Source::Hdtv
    } else if is_camera(name) {
        Source::Cam
    } else {
        Source::Unknown
    }
}

fn is_camera(name: &Name) -> bool {
    name.has_token(&["cam", "ts", "hdcam", "camrip", "telesync", "hdts"])
}

fn is_junk(name: &Name) -> bool {
    is_camera(name) || name.has_token(&["sample"])
}

fn release_group(filename: &str) -> Option<String> {
    let basename = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let group = RELEASE_GROUP_RE.captures(basename)?.get(1)?.as_str();
    if GROUP_DENYLIST.contains(&group.to_lowercase().as_str()) {
        None
    } else {
        Some(group.to_string())
    }
}
