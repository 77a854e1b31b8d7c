//! Debrid providers and the resolution pipeline.
//!
//! Each backend implements [`DebridProvider`]; [`ResolutionSession`] drives
//! one resolution through the shared ranking and selection logic.

mod poll;
mod provider;
mod realdebrid;
mod selection;
mod session;
mod torbox;
mod types;

pub use poll::{Polled, Poller, Probe, Sleeper, TokioSleeper};
pub use provider::DebridProvider;
pub use realdebrid::RealDebridClient;
pub use selection::{
    is_video_file, rank_files, select_file, video_files, RankedFile, Ranking, Selection,
    VIDEO_EXTENSIONS,
};
pub use session::ResolutionSession;
pub use torbox::TorBoxClient;
pub use types::*;
