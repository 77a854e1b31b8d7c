//! MCP transport: SSE handshake and JSON-RPC 2.0 tool calls.
//!
//! The transport is stateless. `GET /mcp/sse` only announces where messages
//! go; every `POST /mcp/messages` is answered in its own HTTP response.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use omega_core::{
    release, ApiKeys, EpisodeTarget, ErrorKind, ExclusionPreferences, MediaType, ResolutionError,
    ResolveRequest, SearchRequest,
};

use crate::metrics::{MCP_CALLS_TOTAL, MCP_SSE_SESSIONS};
use crate::state::AppState;

/// Protocol version announced in `initialize`.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Interval between SSE keep-alive comments.
const KEEP_ALIVE_SECS: u64 = 20;

/// Provider label attached to search hits.
const SEARCH_PROVIDER: &str = "Omega (Zilean)";

/// JSON-RPC error codes.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const MISSING_CREDENTIALS: i32 = -32000;
    pub const RESOLUTION_FAILED: i32 = -32001;
    pub const UPSTREAM_UNAVAILABLE: i32 = -32002;
}

// ============================================================================
// JSON-RPC envelope
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub id: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Error carrying the stable `error_code` for the failure kind.
    fn error_kind(id: Value, code: i32, kind: ErrorKind, message: impl Into<String>) -> Self {
        let mut response = Self::error(id, code, message);
        if let Some(error) = response.error.as_mut() {
            error.data = Some(json!({ "error_code": kind.as_str() }));
        }
        response
    }

    fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Wrap a serializable value as MCP text content.
fn text_content<T: Serialize>(value: &T) -> Value {
    json!({
        "content": [
            { "type": "text", "text": serde_json::to_string(value).unwrap_or_default() }
        ]
    })
}

// ============================================================================
// SSE handshake
// ============================================================================

/// Keeps the open-session gauge in step with live SSE streams.
struct SessionGuard;

impl SessionGuard {
    fn open() -> Self {
        MCP_SSE_SESSIONS.inc();
        Self
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        MCP_SSE_SESSIONS.dec();
    }
}

/// Public URL of the messages endpoint as seen by the client.
pub fn endpoint_url(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let proto = match headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
    {
        Some(p) if p.eq_ignore_ascii_case("https") => "https",
        _ => "http",
    };
    format!("{}://{}/mcp/messages", proto, host)
}

pub async fn sse(headers: HeaderMap) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let endpoint = endpoint_url(&headers);
    info!(endpoint = %endpoint, "MCP client connected");

    let guard = SessionGuard::open();
    let stream = stream::once(async move {
        Ok::<_, Infallible>(Event::default().event("endpoint").data(endpoint))
    })
    .chain(stream::pending())
    .map(move |event| {
        let _session = &guard;
        event
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(KEEP_ALIVE_SECS))
            .text("ping"),
    )
}

// ============================================================================
// JSON-RPC messages
// ============================================================================

pub async fn messages(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Malformed JSON-RPC request");
            MCP_CALLS_TOTAL
                .with_label_values(&["invalid", "error"])
                .inc();
            let response = JsonRpcResponse::error(Value::Null, codes::PARSE_ERROR, "Parse error");
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };

    if request.jsonrpc != "2.0" {
        warn!(jsonrpc = %request.jsonrpc, method = %request.method, "Unexpected JSON-RPC version");
    }
    // Params are not logged: they may carry API keys
    info!(method = %request.method, "MCP request");

    let id = request.id.clone().unwrap_or(Value::Null);
    let params = request.params.unwrap_or(Value::Null);

    let (label, status, response) = match request.method.as_str() {
        "initialize" => (
            "initialize",
            StatusCode::OK,
            JsonRpcResponse::result(id, initialize_result(&state)),
        ),
        "notifications/initialized" => {
            MCP_CALLS_TOTAL
                .with_label_values(&["notifications/initialized", "ok"])
                .inc();
            return StatusCode::NO_CONTENT.into_response();
        }
        "tools/list" => (
            "tools/list",
            StatusCode::OK,
            JsonRpcResponse::result(id, json!({ "tools": tool_definitions() })),
        ),
        "tools/call" => {
            let (status, response) = call_tool(&state, id, params).await;
            ("tools/call", status, response)
        }
        _ => (
            "unknown",
            StatusCode::NOT_FOUND,
            JsonRpcResponse::error(id, codes::METHOD_NOT_FOUND, "Method not found"),
        ),
    };

    let outcome = if response.is_error() { "error" } else { "ok" };
    MCP_CALLS_TOTAL.with_label_values(&[label, outcome]).inc();

    (status, Json(response)).into_response()
}

fn initialize_result(state: &AppState) -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": { "listChanged": true }
        },
        "serverInfo": {
            "name": state.config().server.project_name,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn tool_definitions() -> Value {
    json!([
        {
            "name": "search",
            "description": "Search the DMM cache index for torrent releases",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "query": { "type": "string" },
                    "imdb_id": { "type": "string" },
                    "year": { "type": "integer" },
                    "type": { "type": "string", "enum": ["movie", "show", "series"] },
                    "season": { "type": "integer" },
                    "episode": { "type": "integer" }
                }
            }
        },
        {
            "name": "resolve",
            "description": "Resolve a release to a direct stream URL via TorBox or Real-Debrid",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "info_hash": { "type": "string" },
                    "source_id": { "type": "string" },
                    "magnet": { "type": "string" },
                    "season": { "type": "integer" },
                    "episode": { "type": "integer" },
                    "api_keys": {
                        "type": "object",
                        "properties": {
                            "torbox": { "type": "string" },
                            "realdebrid": { "type": "string" }
                        }
                    },
                    "exclude_hevc": { "type": "boolean" },
                    "exclude_eac3": { "type": "boolean" },
                    "exclude_dolby_vision": { "type": "boolean" }
                }
            }
        }
    ])
}

// ============================================================================
// Tools
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct ToolCall {
    #[serde(default)]
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchArgs {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    imdb_id: Option<String>,
    #[serde(default)]
    year: Option<u32>,
    #[serde(default, rename = "type")]
    media_type: Option<MediaType>,
    #[serde(default)]
    season: Option<u32>,
    #[serde(default)]
    episode: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ResolveArgs {
    #[serde(default)]
    info_hash: Option<String>,
    #[serde(default)]
    source_id: Option<String>,
    #[serde(default)]
    magnet: Option<String>,
    #[serde(default)]
    season: Option<u32>,
    #[serde(default)]
    episode: Option<u32>,
    #[serde(default)]
    api_keys: Option<ApiKeys>,
    #[serde(flatten)]
    exclusions: ExclusionPreferences,
}

/// One search hit as returned to the client.
#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub provider: &'static str,
    pub title: String,
    pub size: Option<u64>,
    pub quality: &'static str,
    pub info_hash: String,
    #[serde(rename = "type")]
    pub media_type: &'static str,
}

async fn call_tool(state: &AppState, id: Value, params: Value) -> (StatusCode, JsonRpcResponse) {
    let call: ToolCall = match serde_json::from_value(params) {
        Ok(call) => call,
        Err(e) => {
            return (
                StatusCode::OK,
                JsonRpcResponse::error(id, codes::INVALID_PARAMS, format!("Invalid params: {}", e)),
            )
        }
    };
    let arguments = call.arguments.unwrap_or_else(|| json!({}));

    match call.name.as_str() {
        "search" => (StatusCode::OK, search_tool(state, id, arguments).await),
        "resolve" => (StatusCode::OK, resolve_tool(state, id, arguments).await),
        other => {
            warn!(tool = %other, "Unknown tool");
            (
                StatusCode::NOT_FOUND,
                JsonRpcResponse::error(id, codes::METHOD_NOT_FOUND, "Method not found"),
            )
        }
    }
}

async fn search_tool(state: &AppState, id: Value, arguments: Value) -> JsonRpcResponse {
    let args: SearchArgs = match serde_json::from_value(arguments) {
        Ok(args) => args,
        Err(e) => {
            return JsonRpcResponse::error(id, codes::INVALID_PARAMS, format!("Invalid arguments: {}", e))
        }
    };

    let title = match args.title.or(args.query).filter(|t| !t.trim().is_empty()) {
        Some(title) => title,
        None => return JsonRpcResponse::error(id, codes::INVALID_PARAMS, "Missing title"),
    };
    let media_type = args.media_type.unwrap_or_default();

    let request = SearchRequest {
        title,
        imdb_id: args.imdb_id,
        year: args.year,
        season: args.season,
        episode: args.episode,
        media_type,
    };

    match state.cascade().search(&request).await {
        Ok(outcome) => {
            let hits: Vec<SearchHit> = outcome
                .records
                .into_iter()
                .map(|record| SearchHit {
                    id: record.info_hash.clone(),
                    provider: SEARCH_PROVIDER,
                    quality: release::extract(&record.title).quality.as_str(),
                    title: record.title,
                    size: record.size_bytes,
                    info_hash: record.info_hash,
                    media_type: media_type.as_str(),
                })
                .collect();
            JsonRpcResponse::result(id, text_content(&hits))
        }
        Err(e) => {
            warn!(title = %request.title, error = %e, "Search failed");
            JsonRpcResponse::error_kind(
                id,
                codes::UPSTREAM_UNAVAILABLE,
                e.kind(),
                e.to_string(),
            )
        }
    }
}

async fn resolve_tool(state: &AppState, id: Value, arguments: Value) -> JsonRpcResponse {
    let args: ResolveArgs = match serde_json::from_value(arguments) {
        Ok(args) => args,
        Err(e) => {
            return JsonRpcResponse::error(id, codes::INVALID_PARAMS, format!("Invalid arguments: {}", e))
        }
    };
    let keys = args.api_keys.unwrap_or_default();

    if !state.resolver().has_credentials(&keys) {
        let err = ResolutionError::MissingCredentials;
        return JsonRpcResponse::error_kind(
            id,
            codes::MISSING_CREDENTIALS,
            err.kind(),
            err.to_string(),
        );
    }

    let info_hash = match args
        .info_hash
        .or(args.source_id)
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
    {
        Some(hash) => hash,
        None => return JsonRpcResponse::error(id, codes::INVALID_PARAMS, "Missing info_hash"),
    };

    let mut request = ResolveRequest::new(info_hash).with_exclusions(args.exclusions);
    if let Some(magnet) = args.magnet.filter(|m| !m.is_empty()) {
        request = request.with_magnet(magnet);
    }
    if let Some(target) = EpisodeTarget::from_parts(args.season, args.episode) {
        request = request.with_episode(target);
    }

    match state.resolver().resolve(&request, &keys).await {
        Ok(resolution) => JsonRpcResponse::result(
            id,
            text_content(&json!({
                "success": true,
                "stream": {
                    "url": resolution.url,
                    "provider": resolution.provider,
                    "file": resolution.file.name,
                    "episode_match": resolution.episode_match,
                }
            })),
        ),
        Err(e) => {
            warn!(info_hash = %request.info_hash, error = %e, "Resolution failed");
            let code = match &e {
                ResolutionError::MissingCredentials => codes::MISSING_CREDENTIALS,
                _ => codes::RESOLUTION_FAILED,
            };
            JsonRpcResponse::error_kind(id, code, e.kind(), e.to_string())
        }
    }
}
