//! Resolution orchestrator.
//!
//! Picks a debrid provider from the API keys available for a request and
//! runs one [`ResolutionSession`] against it.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::config::{usable_key, Config};
use crate::debrid::{
    DebridProvider, ProviderKind, RealDebridClient, Resolution, ResolutionError,
    ResolutionSession, ResolveRequest, TorBoxClient,
};

/// Per-request provider API keys.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiKeys {
    #[serde(default)]
    pub torbox: Option<String>,
    #[serde(default)]
    pub realdebrid: Option<String>,
}

impl ApiKeys {
    pub fn new(torbox: Option<String>, realdebrid: Option<String>) -> Self {
        Self { torbox, realdebrid }
    }
}

/// Facade over the configured providers.
///
/// Key priority: request TorBox key, request Real-Debrid key, configured
/// TorBox key, configured Real-Debrid key.
pub struct StreamResolver {
    torbox: Arc<dyn DebridProvider>,
    realdebrid: Arc<dyn DebridProvider>,
    fallback: ApiKeys,
}

impl StreamResolver {
    pub fn new(
        torbox: Arc<dyn DebridProvider>,
        realdebrid: Arc<dyn DebridProvider>,
        fallback: ApiKeys,
    ) -> Self {
        Self {
            torbox,
            realdebrid,
            fallback,
        }
    }

    /// Build a resolver with one HTTP client per provider.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(TorBoxClient::new(config.torbox.clone())),
            Arc::new(RealDebridClient::new(config.realdebrid.clone())),
            ApiKeys::new(
                config.torbox.api_key.clone(),
                config.realdebrid.api_key.clone(),
            ),
        )
    }

    /// Pick the provider and key to use for a request.
    fn choose<'a>(
        &'a self,
        keys: &'a ApiKeys,
    ) -> Option<(&'a dyn DebridProvider, &'a str)> {
        let candidates = [
            (ProviderKind::TorBox, &keys.torbox),
            (ProviderKind::RealDebrid, &keys.realdebrid),
            (ProviderKind::TorBox, &self.fallback.torbox),
            (ProviderKind::RealDebrid, &self.fallback.realdebrid),
        ];

        candidates.into_iter().find_map(|(kind, key)| {
            let key = usable_key(key)?;
            let provider: &dyn DebridProvider = match kind {
                ProviderKind::TorBox => self.torbox.as_ref(),
                ProviderKind::RealDebrid => self.realdebrid.as_ref(),
            };
            Some((provider, key))
        })
    }

    /// Whether a request with `keys` has a provider to go to.
    pub fn has_credentials(&self, keys: &ApiKeys) -> bool {
        self.choose(keys).is_some()
    }

    /// Resolve a request to a playable URL.
    pub async fn resolve(
        &self,
        request: &ResolveRequest,
        keys: &ApiKeys,
    ) -> Result<Resolution, ResolutionError> {
        let (provider, api_key) = self
            .choose(keys)
            .ok_or(ResolutionError::MissingCredentials)?;

        info!(
            provider = %provider.kind(),
            info_hash = %request.info_hash,
            "Resolving stream"
        );

        ResolutionSession::new(provider, api_key).run(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{fixtures, MockProvider};

    struct Harness {
        torbox: Arc<MockProvider>,
        realdebrid: Arc<MockProvider>,
    }

    impl Harness {
        async fn new() -> Self {
            let torbox = Arc::new(MockProvider::new(ProviderKind::TorBox));
            let realdebrid = Arc::new(MockProvider::new(ProviderKind::RealDebrid));
            torbox.set_files(vec![fixtures::movie_file("1")]).await;
            realdebrid.set_files(vec![fixtures::movie_file("7")]).await;
            Self { torbox, realdebrid }
        }

        fn resolver(&self, fallback: ApiKeys) -> StreamResolver {
            StreamResolver::new(self.torbox.clone(), self.realdebrid.clone(), fallback)
        }
    }

    fn keys(torbox: Option<&str>, realdebrid: Option<&str>) -> ApiKeys {
        ApiKeys::new(torbox.map(String::from), realdebrid.map(String::from))
    }

    #[tokio::test]
    async fn test_request_torbox_key_wins() {
        let harness = Harness::new().await;
        let resolver = harness.resolver(keys(None, Some("env-rd")));

        let resolution = resolver
            .resolve(
                &ResolveRequest::new(fixtures::INFO_HASH),
                &keys(Some("req-tb"), Some("req-rd")),
            )
            .await
            .unwrap();

        assert_eq!(resolution.provider, ProviderKind::TorBox);
        assert_eq!(harness.torbox.used_api_keys().await[0], "req-tb");
        assert!(harness.realdebrid.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_request_realdebrid_key_beats_configured_torbox() {
        let harness = Harness::new().await;
        let resolver = harness.resolver(keys(Some("env-tb"), None));

        let resolution = resolver
            .resolve(
                &ResolveRequest::new(fixtures::INFO_HASH),
                &keys(None, Some("req-rd")),
            )
            .await
            .unwrap();

        assert_eq!(resolution.provider, ProviderKind::RealDebrid);
        assert_eq!(resolution.url, "https://cdn.example/7");
        assert_eq!(harness.realdebrid.used_api_keys().await[0], "req-rd");
        assert!(harness.torbox.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_falls_back_to_configured_keys() {
        let harness = Harness::new().await;
        let resolver = harness.resolver(keys(Some("  "), Some("env-rd")));

        let resolution = resolver
            .resolve(&ResolveRequest::new(fixtures::INFO_HASH), &ApiKeys::default())
            .await
            .unwrap();

        assert_eq!(resolution.provider, ProviderKind::RealDebrid);
        assert_eq!(harness.realdebrid.used_api_keys().await[0], "env-rd");
        assert!(resolver.has_credentials(&ApiKeys::default()));
    }

    #[tokio::test]
    async fn test_blank_request_key_is_ignored() {
        let harness = Harness::new().await;
        let resolver = harness.resolver(keys(Some("env-tb"), None));

        resolver
            .resolve(
                &ResolveRequest::new(fixtures::INFO_HASH),
                &keys(Some(""), None),
            )
            .await
            .unwrap();

        assert_eq!(harness.torbox.used_api_keys().await[0], "env-tb");
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let harness = Harness::new().await;
        let resolver = harness.resolver(ApiKeys::default());

        let err = resolver
            .resolve(&ResolveRequest::new(fixtures::INFO_HASH), &ApiKeys::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MissingCredentials);
        assert!(!resolver.has_credentials(&ApiKeys::default()));
        assert!(resolver.has_credentials(&keys(None, Some("req-rd"))));
        assert!(harness.torbox.recorded_calls().await.is_empty());
        assert!(harness.realdebrid.recorded_calls().await.is_empty());
    }

    #[test]
    fn test_api_keys_deserialize_partial() {
        let keys: ApiKeys = serde_json::from_str(r#"{"torbox":"abc"}"#).unwrap();
        assert_eq!(keys.torbox.as_deref(), Some("abc"));
        assert!(keys.realdebrid.is_none());
    }
}
