//! Testing utilities and mock implementations.
//!
//! Mocks for the provider and index traits, a sleeper that records instead
//! of waiting, and fixtures, so resolution and search can be exercised
//! without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use omega_core::testing::{fixtures, MockIndex, MockProvider};
//!
//! let provider = MockProvider::new(ProviderKind::TorBox);
//! provider.set_files(vec![fixtures::movie_file("1")]).await;
//!
//! let index = MockIndex::new();
//! index.set_results(vec![fixtures::release_record("Foo.2020.1080p", 1)]).await;
//! ```

mod mock_index;
mod mock_provider;
mod sleeper;

pub use mock_index::MockIndex;
pub use mock_provider::MockProvider;
pub use sleeper::RecordingSleeper;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::debrid::FileCandidate;
    use crate::searcher::ReleaseRecord;

    /// A valid 40-char info hash.
    pub const INFO_HASH: &str = "0123456789abcdef0123456789abcdef01234567";

    /// Deterministic distinct info hash for index `n`.
    pub fn info_hash(n: u8) -> String {
        format!("{:040x}", n)
    }

    /// An index record with reasonable defaults.
    pub fn release_record(title: &str, n: u8) -> ReleaseRecord {
        ReleaseRecord {
            info_hash: info_hash(n),
            title: title.to_string(),
            size_bytes: Some(2 * 1024 * 1024 * 1024), // 2 GiB
        }
    }

    /// A single-movie torrent file.
    pub fn movie_file(id: &str) -> FileCandidate {
        FileCandidate::new(
            id,
            "Movie.2021.1080p.BluRay.x264-GRP.mkv",
            8 * 1024 * 1024 * 1024, // 8 GiB
        )
    }

    /// One episode of a season pack.
    pub fn episode_file(id: &str, season: u32, episode: u32) -> FileCandidate {
        FileCandidate::new(
            id,
            format!("Show/Show.S{:02}E{:02}.1080p.WEB-DL-GRP.mkv", season, episode),
            1500 * 1024 * 1024, // 1.5 GiB
        )
    }
}
