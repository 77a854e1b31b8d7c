use std::sync::Arc;

use omega_core::{Config, SanitizedConfig, SearchCascade, StreamResolver, ZileanClient};

/// Shared application state
pub struct AppState {
    config: Config,
    cascade: SearchCascade,
    resolver: StreamResolver,
}

impl AppState {
    pub fn new(config: Config, cascade: SearchCascade, resolver: StreamResolver) -> Self {
        Self {
            config,
            cascade,
            resolver,
        }
    }

    /// Build the state with one HTTP client per upstream service.
    pub fn from_config(config: Config) -> Self {
        let cascade = SearchCascade::new(Arc::new(ZileanClient::new(config.zilean.clone())));
        let resolver = StreamResolver::from_config(&config);
        Self::new(config, cascade, resolver)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn cascade(&self) -> &SearchCascade {
        &self.cascade
    }

    pub fn resolver(&self) -> &StreamResolver {
        &self.resolver
    }
}
