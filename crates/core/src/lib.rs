pub mod config;
pub mod debrid;
pub mod error;
pub mod metrics;
pub mod release;
pub mod resolver;
pub mod searcher;
pub mod testing;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, SanitizedConfig,
};
pub use debrid::{
    DebridProvider, EpisodeMatch, ProviderError, ProviderKind, RealDebridClient, Resolution,
    ResolutionError, ResolveRequest, TorBoxClient,
};
pub use error::ErrorKind;
pub use release::{EpisodeTarget, ExclusionPreferences};
pub use resolver::{ApiKeys, StreamResolver};
pub use searcher::{
    MediaType, ReleaseIndex, ReleaseRecord, SearchCascade, SearchError, SearchRequest,
    ZileanClient,
};
