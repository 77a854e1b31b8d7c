//! Real-Debrid adapter tests against a mocked HTTP API.
//!
//! These tests drive the real `RealDebridClient` through a full resolution:
//! - instantAvailability parsing and the cached-file penalty
//! - addMagnet, info polling and selectFiles
//! - link polling followed by unrestrict

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mockito::{Matcher, Server, ServerGuard};
use serde_json::{json, Value};

use omega_core::{
    config::{PollConfig, RealDebridConfig},
    debrid::{DebridProvider, EpisodeMatch, RealDebridClient, ResolutionSession},
    error::ErrorKind,
    release::EpisodeTarget,
    testing::{fixtures, RecordingSleeper},
    ResolveRequest,
};

const API_KEY: &str = "rd-test-key";
const TORRENT_ID: &str = "ABCDEF123";
const HOSTER_LINK: &str = "https://real-debrid.com/d/HOSTER1";

fn client(server: &ServerGuard, sleeper: Arc<RecordingSleeper>) -> RealDebridClient {
    let config = RealDebridConfig {
        url: server.url(),
        api_key: None,
        timeout_secs: 5,
        hydration: PollConfig::new(3, 10),
        links: PollConfig::new(3, 10),
    };
    RealDebridClient::with_sleeper(config, sleeper)
}

fn info(status: &str, links: &[&str]) -> Value {
    json!({
        "id": TORRENT_ID,
        "filename": "Show.S01.1080p.WEB-DL",
        "status": status,
        "files": [
            {"id": 1, "path": "/Show.S01E01.1080p.WEB-DL-GRP.mkv", "bytes": 2_000_000_000u64, "selected": 0},
            {"id": 2, "path": "/Show.S01E02.1080p.WEB-DL-GRP.mkv", "bytes": 2_000_000_000u64, "selected": 0},
            {"id": 3, "path": "/Sample/sample.mkv", "bytes": 10_000_000u64, "selected": 0}
        ],
        "links": links
    })
}

/// Info endpoint that answers with each body in turn, repeating the last.
async fn mock_info_sequence(server: &mut ServerGuard, bodies: Vec<Value>) -> mockito::Mock {
    let calls = Arc::new(AtomicUsize::new(0));
    server
        .mock("GET", format!("/torrents/info/{}", TORRENT_ID).as_str())
        .match_header("authorization", format!("Bearer {}", API_KEY).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body_from_request(move |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            bodies[n.min(bodies.len() - 1)].to_string().into_bytes()
        })
        .create_async()
        .await
}

async fn mock_availability(server: &mut ServerGuard, cached_ids: &[&str]) -> mockito::Mock {
    let variant: serde_json::Map<String, Value> = cached_ids
        .iter()
        .map(|id| (id.to_string(), json!({"filename": "x.mkv", "filesize": 1})))
        .collect();
    server
        .mock(
            "GET",
            format!("/torrents/instantAvailability/{}", fixtures::INFO_HASH).as_str(),
        )
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ (fixtures::INFO_HASH): {"rd": [variant]} }).to_string())
        .create_async()
        .await
}

async fn mock_add_magnet(server: &mut ServerGuard) -> mockito::Mock {
    server
        .mock("POST", "/torrents/addMagnet")
        .match_header("authorization", format!("Bearer {}", API_KEY).as_str())
        .match_body(Matcher::Regex("magnet=magnet%3A%3Fxt%3Durn%3Abtih%3A".into()))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(json!({"id": TORRENT_ID, "uri": "https://api.real-debrid.com/rest/1.0/torrents/info/ABCDEF123"}).to_string())
        .create_async()
        .await
}

async fn mock_unrestrict(server: &mut ServerGuard) -> mockito::Mock {
    server
        .mock("POST", "/unrestrict/link")
        .match_body(Matcher::UrlEncoded("link".into(), HOSTER_LINK.into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"id": "U1", "download": "https://dl.real-debrid.com/U1/Show.S01E02.mkv"}).to_string())
        .create_async()
        .await
}

#[tokio::test]
async fn test_resolves_episode_with_select_and_unrestrict() {
    let mut server = Server::new_async().await;
    let sleeper = Arc::new(RecordingSleeper::new());

    let availability = mock_availability(&mut server, &["1", "2"]).await;
    let add = mock_add_magnet(&mut server).await;
    let _info = mock_info_sequence(
        &mut server,
        vec![
            json!({"id": TORRENT_ID, "status": "magnet_conversion", "files": [], "links": []}),
            info("waiting_files_selection", &[]),
            info("downloaded", &[HOSTER_LINK]),
        ],
    )
    .await;
    let select = server
        .mock("POST", format!("/torrents/selectFiles/{}", TORRENT_ID).as_str())
        .match_body(Matcher::UrlEncoded("files".into(), "2".into()))
        .with_status(204)
        .create_async()
        .await;
    let unrestrict = mock_unrestrict(&mut server).await;

    let provider = client(&server, sleeper.clone());
    let request = ResolveRequest::new(fixtures::INFO_HASH).with_episode(EpisodeTarget::new(1, 2));
    let resolution = ResolutionSession::new(&provider, API_KEY)
        .run(&request)
        .await
        .unwrap();

    assert_eq!(resolution.url, "https://dl.real-debrid.com/U1/Show.S01E02.mkv");
    assert_eq!(resolution.file.id, "2");
    assert_eq!(resolution.episode_match, EpisodeMatch::Confirmed);
    // one sleep while the magnet converted
    assert_eq!(sleeper.sleeps().await.len(), 1);

    availability.assert_async().await;
    add.assert_async().await;
    select.assert_async().await;
    unrestrict.assert_async().await;
}

#[tokio::test]
async fn test_uncached_file_loses_to_cached_file() {
    let mut server = Server::new_async().await;

    let _availability = mock_availability(&mut server, &["1"]).await;
    let _add = mock_add_magnet(&mut server).await;
    let _info = mock_info_sequence(&mut server, vec![info("downloaded", &[HOSTER_LINK])]).await;
    let select = server
        .mock("POST", format!("/torrents/selectFiles/{}", TORRENT_ID).as_str())
        .expect(0)
        .create_async()
        .await;
    let _unrestrict = mock_unrestrict(&mut server).await;

    let provider = client(&server, Arc::new(RecordingSleeper::new()));
    let resolution = ResolutionSession::new(&provider, API_KEY)
        .run(&ResolveRequest::new(fixtures::INFO_HASH))
        .await
        .unwrap();

    assert_eq!(resolution.file.id, "1");
    // already downloaded: nothing to select
    select.assert_async().await;
}

#[tokio::test]
async fn test_downloading_after_selection_is_not_cached() {
    let mut server = Server::new_async().await;

    let _availability = mock_availability(&mut server, &["1", "2"]).await;
    let _add = mock_add_magnet(&mut server).await;
    let _info = mock_info_sequence(
        &mut server,
        vec![info("waiting_files_selection", &[]), info("downloading", &[])],
    )
    .await;
    let _select = server
        .mock("POST", format!("/torrents/selectFiles/{}", TORRENT_ID).as_str())
        .with_status(204)
        .create_async()
        .await;
    let unrestrict = server
        .mock("POST", "/unrestrict/link")
        .expect(0)
        .create_async()
        .await;

    let provider = client(&server, Arc::new(RecordingSleeper::new()));
    let err = ResolutionSession::new(&provider, API_KEY)
        .run(&ResolveRequest::new(fixtures::INFO_HASH))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotCached);
    unrestrict.assert_async().await;
}

#[tokio::test]
async fn test_links_never_appear() {
    let mut server = Server::new_async().await;
    let sleeper = Arc::new(RecordingSleeper::new());

    let _availability = mock_availability(&mut server, &["1", "2"]).await;
    let _add = mock_add_magnet(&mut server).await;
    let _info = mock_info_sequence(
        &mut server,
        vec![info("waiting_files_selection", &[]), info("queued", &[])],
    )
    .await;
    let _select = server
        .mock("POST", format!("/torrents/selectFiles/{}", TORRENT_ID).as_str())
        .with_status(204)
        .create_async()
        .await;

    let provider = client(&server, sleeper.clone());
    let err = ResolutionSession::new(&provider, API_KEY)
        .run(&ResolveRequest::new(fixtures::INFO_HASH))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::LinkGenerationFailed);
    // the whole link budget was spent, no sleep after the last attempt
    assert_eq!(sleeper.sleeps().await.len(), 2);
}

#[tokio::test]
async fn test_unrestrict_failure_is_link_generation_failed() {
    let mut server = Server::new_async().await;

    let _availability = mock_availability(&mut server, &["1", "2"]).await;
    let _add = mock_add_magnet(&mut server).await;
    let _info = mock_info_sequence(&mut server, vec![info("downloaded", &[HOSTER_LINK])]).await;
    let _unrestrict = server
        .mock("POST", "/unrestrict/link")
        .with_status(503)
        .with_body(r#"{"error": "hoster_unavailable", "error_code": 19}"#)
        .create_async()
        .await;

    let provider = client(&server, Arc::new(RecordingSleeper::new()));
    let err = ResolutionSession::new(&provider, API_KEY)
        .run(&ResolveRequest::new(fixtures::INFO_HASH))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::LinkGenerationFailed);
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_availability_unknown_hash() {
    let mut server = Server::new_async().await;
    let _availability = server
        .mock(
            "GET",
            format!("/torrents/instantAvailability/{}", fixtures::INFO_HASH).as_str(),
        )
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .create_async()
        .await;

    let provider = client(&server, Arc::new(RecordingSleeper::new()));
    let cached = provider
        .check_availability(API_KEY, fixtures::INFO_HASH)
        .await
        .unwrap();

    assert!(cached.is_none());
}

#[tokio::test]
async fn test_disabled_availability_endpoint_is_not_fatal() {
    let mut server = Server::new_async().await;

    let _availability = server
        .mock(
            "GET",
            format!("/torrents/instantAvailability/{}", fixtures::INFO_HASH).as_str(),
        )
        .with_status(403)
        .with_body(r#"{"error": "disabled_endpoint", "error_code": 37}"#)
        .create_async()
        .await;
    let _add = mock_add_magnet(&mut server).await;
    let _info = mock_info_sequence(&mut server, vec![info("downloaded", &[HOSTER_LINK])]).await;
    let _unrestrict = mock_unrestrict(&mut server).await;

    let provider = client(&server, Arc::new(RecordingSleeper::new()));
    let resolution = ResolutionSession::new(&provider, API_KEY)
        .run(&ResolveRequest::new(fixtures::INFO_HASH))
        .await
        .unwrap();

    assert!(resolution.url.starts_with("https://dl.real-debrid.com/"));
}
