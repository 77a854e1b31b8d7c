//! Error taxonomy shared by search and resolution.
//!
//! Module-level errors (`ResolutionError`, `SearchError`) carry the detail;
//! `ErrorKind` is the flat code the transport layer maps to protocol errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable classification of every terminal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingCredentials,
    AddFailed,
    HydrationTimeout,
    NoVideoFiles,
    NotCached,
    LinkGenerationFailed,
    UpstreamUnavailable,
}

impl ErrorKind {
    /// Returns the string code used in API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MissingCredentials => "missing_credentials",
            ErrorKind::AddFailed => "add_failed",
            ErrorKind::HydrationTimeout => "hydration_timeout",
            ErrorKind::NoVideoFiles => "no_video_files",
            ErrorKind::NotCached => "not_cached",
            ErrorKind::LinkGenerationFailed => "link_generation_failed",
            ErrorKind::UpstreamUnavailable => "upstream_unavailable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_as_str_matches_serde() {
        for kind in [
            ErrorKind::MissingCredentials,
            ErrorKind::AddFailed,
            ErrorKind::HydrationTimeout,
            ErrorKind::NoVideoFiles,
            ErrorKind::NotCached,
            ErrorKind::LinkGenerationFailed,
            ErrorKind::UpstreamUnavailable,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }
}
