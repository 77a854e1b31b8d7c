//! Release index search.
//!
//! This module provides a `ReleaseIndex` trait over the DMM index (Zilean)
//! and the tiered `SearchCascade` built on top of it.

mod cascade;
mod dedup;
mod types;
mod zilean;

pub use cascade::{accepts, CascadeOutcome, MediaType, SearchCascade, SearchRequest, SearchTier};
pub use dedup::deduplicate_records;
pub use types::*;
pub use zilean::ZileanClient;
