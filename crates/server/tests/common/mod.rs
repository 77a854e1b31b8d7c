//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock dependencies injected, enabling E2E testing of the MCP surface
//! without network access.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use omega_core::{
    debrid::ProviderKind,
    testing::{MockIndex, MockProvider},
    ApiKeys, Config, SearchCascade, StreamResolver,
};
use omega_server::state::AppState;

/// Re-export fixtures for test convenience
pub use omega_core::testing::fixtures;

/// Test fixture for E2E testing with mock dependencies.
///
/// Provides an in-process server with fully controllable mocks for:
/// - Release index search (MockIndex)
/// - TorBox and Real-Debrid providers (MockProvider)
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_tools_list() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.rpc("tools/list", json!({})).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock index - configure search results
    pub index: Arc<MockIndex>,
    /// Mock TorBox provider
    pub torbox: Arc<MockProvider>,
    /// Mock Real-Debrid provider
    pub realdebrid: Arc<MockProvider>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture without fallback debrid keys.
    pub async fn new() -> Self {
        Self::with_fallback_keys(ApiKeys::default()).await
    }

    /// Create a test fixture whose resolver falls back to `keys`.
    pub async fn with_fallback_keys(keys: ApiKeys) -> Self {
        let index = Arc::new(MockIndex::new());
        let torbox = Arc::new(MockProvider::new(ProviderKind::TorBox));
        let realdebrid = Arc::new(MockProvider::new(ProviderKind::RealDebrid));

        let mut config = Config::default();
        config.server.project_name = "Omega Test".to_string();
        config.torbox.api_key = keys.torbox.clone();
        config.realdebrid.api_key = keys.realdebrid.clone();

        let cascade = SearchCascade::new(Arc::clone(&index) as Arc<dyn omega_core::ReleaseIndex>);
        let resolver = StreamResolver::new(
            Arc::clone(&torbox) as Arc<dyn omega_core::DebridProvider>,
            Arc::clone(&realdebrid) as Arc<dyn omega_core::DebridProvider>,
            keys,
        );

        let state = Arc::new(AppState::new(config, cascade, resolver));
        let router = omega_server::api::create_router(state);

        Self {
            router,
            index,
            torbox,
            realdebrid,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a JSON-RPC request to the MCP messages endpoint.
    pub async fn rpc(&self, method: &str, params: Value) -> TestResponse {
        self.post(
            "/mcp/messages",
            json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params }),
        )
        .await
    }

    /// Call an MCP tool.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> TestResponse {
        self.rpc("tools/call", json!({ "name": name, "arguments": arguments }))
            .await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body_bytes).into_owned()))
        };

        TestResponse { status, body }
    }
}

/// Parse the JSON carried in an MCP text content result.
pub fn tool_text(body: &Value) -> Value {
    let text = body["result"]["content"][0]["text"]
        .as_str()
        .expect("result has no text content");
    serde_json::from_str(text).expect("text content is not JSON")
}
