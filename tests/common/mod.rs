//! Common test utilities and helpers
//!
//! Shared wiremock fixtures for integration tests.

#![allow(dead_code)]

use serde_json::{Value, json};
use simula_ad_sdk::config::Settings;
use simula_ad_sdk::session::{AdClient, BotGuard, SessionManagerGeneric};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_API_KEY: &str = "pub_test_key";
pub const TEST_SESSION_ID: &str = "sess-42";

/// Settings pointing at a mock server with fast gating
pub fn settings_for(server: &MockServer) -> Settings {
    let mut settings = Settings::default();
    settings.api.base_url = server.uri();
    settings.api.api_key = Some(TEST_API_KEY.to_string());
    settings.viewability.duration_ms = 50;
    settings.viewability.tick_interval_ms = 10;
    settings.fetch.min_interval_ms = 0;
    settings.bot_detection.enabled = false;
    settings
}

pub fn client_for(server: &MockServer) -> AdClient {
    AdClient::new_with_base_url(reqwest::Client::new(), server.uri())
}

/// Connect a manager to the mock server without bot detection
pub async fn connect(server: &MockServer) -> SessionManagerGeneric<AdClient> {
    SessionManagerGeneric::connect_with(
        settings_for(server),
        client_for(server),
        BotGuard::disabled(),
    )
    .await
    .expect("session manager connects")
}

/// Mount a successful `/session/create`
pub async fn mock_session(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/session/create"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "sessionId": TEST_SESSION_ID })),
        )
        .mount(server)
        .await;
}

/// Accept every engagement and click beacon
pub async fn mock_beacons(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path_regex(r"^/track/engagement/.+"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/track_click"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// SSP body carrying one iframe creative
pub fn ssp_ad(id: &str) -> Value {
    json!({
        "adResponse": {
            "ad_id": id,
            "iframe_url": format!("https://ads.example/{}", id),
            "click_url": "https://shop.example",
            "format": "all"
        }
    })
}

/// Paths of the requests the server received, in order
pub async fn received_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect()
}
