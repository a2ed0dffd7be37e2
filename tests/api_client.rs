//! Ad server client integration tests

mod common;

use common::{TEST_API_KEY, client_for, mock_session, ssp_ad};
use pretty_assertions::assert_eq;
use serde_json::json;
use simula_ad_sdk::session::AdServer;
use simula_ad_sdk::types::{
    AdRequest, ChatMessage, FetchAdResponse, LegacyAdRequest, NativeContext, NativeRequest,
    SspRequest,
};
use simula_ad_sdk::{Error, SessionManager};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ssp_request() -> AdRequest {
    AdRequest::Ssp(SspRequest {
        session_id: "sess-42".to_string(),
        messages: vec![ChatMessage::user("best hiking boots?")],
        formats: vec!["all".to_string()],
        slot_id: "chat".to_string(),
        position: 2,
        theme: None,
    })
}

#[tokio::test]
async fn test_session_rejected_key_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/session/create"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_session(TEST_API_KEY, false, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
}

#[tokio::test]
async fn test_session_server_error_yields_no_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/session/create"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let session = client_for(&server)
        .create_session(TEST_API_KEY, true, Some("user-1"))
        .await
        .unwrap();
    assert_eq!(session, None);
}

#[tokio::test]
async fn test_ssp_fetch_sends_bearer_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/render_ad/ssp"))
        .and(header("authorization", format!("Bearer {}", TEST_API_KEY).as_str()))
        .and(body_partial_json(json!({
            "session_id": "sess-42",
            "slot_id": "chat",
            "position": 2
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ssp_ad("ad-1")))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server)
        .fetch_ad(TEST_API_KEY, &ssp_request())
        .await;
    let ad = response.ad().expect("ad served");
    assert_eq!(ad.id, "ad-1");
    assert_eq!(ad.iframe_url.as_deref(), Some("https://ads.example/ad-1"));
}

#[tokio::test]
async fn test_ad_not_inserted_is_no_fill() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/render_ad/ssp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "adInserted": false })))
        .mount(&server)
        .await;

    let response = client_for(&server)
        .fetch_ad(TEST_API_KEY, &ssp_request())
        .await;
    assert_eq!(response, FetchAdResponse::NoFill);
    assert_eq!(response.error_message(), Some("No fill"));
}

#[tokio::test]
async fn test_error_field_is_error_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/render_ad/ssp"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "error": "quota exceeded" })),
        )
        .mount(&server)
        .await;

    let response = client_for(&server)
        .fetch_ad(TEST_API_KEY, &ssp_request())
        .await;
    assert_eq!(response, FetchAdResponse::Error("quota exceeded".to_string()));
}

#[tokio::test]
async fn test_native_fetch_uses_native_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ssp/native"))
        .and(body_partial_json(json!({
            "slot": "feed",
            "width": 320,
            "context": { "searchTerm": "tents" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "adResponse": { "ad_id": "n-1", "html": "<div>Tents</div>", "format": "native" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = AdRequest::Native(NativeRequest {
        session_id: "sess-42".to_string(),
        slot: "feed".to_string(),
        position: 0,
        context: NativeContext::new().with_search_term("tents"),
        width: Some(320),
    });
    let response = client_for(&server).fetch_ad(TEST_API_KEY, &request).await;
    assert_eq!(
        response.ad().and_then(|ad| ad.html.as_deref()),
        Some("<div>Tents</div>")
    );
}

#[tokio::test]
async fn test_legacy_fetch_reads_ad_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ad_fetch"))
        .and(body_partial_json(json!({ "slot_id": "sidebar" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ad": { "id": "legacy-1", "format": "all", "iframeUrl": "https://ads.example/legacy" }
        })))
        .mount(&server)
        .await;

    let request = AdRequest::Legacy(LegacyAdRequest {
        conversation_history: vec![ChatMessage::user("hello")],
        formats: vec!["all".to_string()],
        slot_id: Some("sidebar".to_string()),
    });
    let response = client_for(&server).fetch_ad(TEST_API_KEY, &request).await;
    assert_eq!(response.ad().map(|ad| ad.id.as_str()), Some("legacy-1"));
}

#[tokio::test]
async fn test_http_failure_is_reported_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/render_ad/ssp"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let response = client_for(&server)
        .fetch_ad(TEST_API_KEY, &ssp_request())
        .await;
    assert_eq!(
        response,
        FetchAdResponse::Error("HTTP error! status: 502".to_string())
    );
}

#[tokio::test]
async fn test_beacons_hit_their_paths() {
    let server = MockServer::start().await;
    for beacon in ["impression", "viewport_entry", "viewport_exit"] {
        Mock::given(method("POST"))
            .and(path(format!("/track/engagement/{}/ad-9", beacon)))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/track_click"))
        .and(body_partial_json(json!({ "ad_id": "ad-9" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.track_impression(TEST_API_KEY, "ad-9").await;
    client.track_viewport_entry(TEST_API_KEY, "ad-9").await;
    client.track_viewport_exit(TEST_API_KEY, "ad-9").await;
    client
        .track_click(TEST_API_KEY, "ad-9", "https://shop.example")
        .await;
}

#[tokio::test]
async fn test_connect_through_settings() {
    let server = MockServer::start().await;
    mock_session(&server).await;

    let manager = SessionManager::connect(common::settings_for(&server))
        .await
        .unwrap();
    assert_eq!(manager.session_id(), Some(common::TEST_SESSION_ID));
    assert_eq!(manager.api_key(), TEST_API_KEY);
    assert!(!manager.bot_verdict().await.is_bot);
}
