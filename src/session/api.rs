//! Ad server API integration
//!
//! This module handles communication with the ad server: session creation,
//! ad fetches, the mini-game endpoints, telemetry beacons and the legacy
//! ad-integration stream.

use crate::injector::sse::{self, TextStream};
use crate::types::{
    AdIntegrateRequest, AdRequest, CatalogResponse, ChatMessage, ClickEvent, EngagementEvent,
    EngagementKind, FetchAdResponse, GameData, GameInitRequest, GameLaunch, SessionResponse,
    UserProfileRequest,
    response::{GameInitResponse, PostGameAdResponse},
};
use crate::{Error, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;

/// Trait for ad server operations to enable testing with mocks
#[async_trait::async_trait]
pub trait AdServer: Send + Sync {
    /// Create a session for a publisher key
    ///
    /// Only an HTTP 401 is an error. Every other failure yields `Ok(None)`.
    async fn create_session(
        &self,
        api_key: &str,
        dev_mode: bool,
        ppid: Option<&str>,
    ) -> Result<Option<String>>;

    /// Fetch one ad; failures are folded into [`FetchAdResponse::Error`]
    async fn fetch_ad(&self, api_key: &str, request: &AdRequest) -> FetchAdResponse;

    /// Load the mini-game catalog
    async fn fetch_catalog(&self) -> Result<Vec<GameData>>;

    /// Launch a mini-game
    async fn init_game(&self, api_key: &str, request: &GameInitRequest) -> Result<GameLaunch>;

    /// Fetch the ad shown after a game closes, returning its iframe URL
    async fn fetch_post_game_ad(&self, api_key: &str, ad_id: &str) -> Result<Option<String>>;

    /// Send an engagement beacon; failures are logged only
    async fn track_engagement(&self, api_key: &str, kind: EngagementKind, ad_id: &str);

    /// Send a click beacon; failures are logged only
    async fn track_click(&self, api_key: &str, ad_id: &str, href: &str);

    /// Create a session for the legacy ad injector
    async fn create_injector_session(&self) -> Result<String>;

    /// Submit chat history and return the inferred user profile
    async fn user_profile(&self, messages: &[ChatMessage]) -> Result<Value>;

    /// Ask the server to weave an ad into a response, streamed as SSE
    async fn ad_integrate(&self, request: &AdIntegrateRequest) -> Result<TextStream>;

    async fn track_impression(&self, api_key: &str, ad_id: &str) {
        self.track_engagement(api_key, EngagementKind::Impression, ad_id)
            .await
    }

    async fn track_viewport_entry(&self, api_key: &str, ad_id: &str) {
        self.track_engagement(api_key, EngagementKind::ViewportEntry, ad_id)
            .await
    }

    async fn track_viewport_exit(&self, api_key: &str, ad_id: &str) {
        self.track_engagement(api_key, EngagementKind::ViewportExit, ad_id)
            .await
    }
}

/// Ad server API client
#[derive(Debug, Clone)]
pub struct AdClient {
    /// HTTP client
    client: Client,
    /// Base URL of the ad server, without trailing slash
    base_url: String,
}

impl AdClient {
    /// Create a client for the production ad server
    pub fn new(client: Client) -> Self {
        Self::new_with_base_url(client, crate::config::DEFAULT_API_BASE_URL.to_string())
    }

    /// Create a client with custom base URL (for testing and staging)
    pub fn new_with_base_url(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a client from settings, honoring proxy and timeout configuration
    pub fn from_settings(settings: &crate::config::Settings) -> Result<Self> {
        let network = crate::session::network::NetworkManager::new(&settings.network)?;
        Ok(Self::new_with_base_url(
            network.into_client(),
            settings.api.base_url.clone(),
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_json(&self, endpoint: &str, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request.send().await.map_err(|e| {
            tracing::error!("Failed to send request to {}: {}", endpoint, e);
            Error::network_at(endpoint, &format!("Network request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("{} returned error status: {}", endpoint, status);
            return Err(Error::status(status.as_u16(), endpoint));
        }

        response.json::<Value>().await.map_err(|e| {
            tracing::error!("Failed to parse {} response: {}", endpoint, e);
            Error::response(endpoint, &format!("Failed to parse JSON response: {}", e))
        })
    }
}

#[async_trait::async_trait]
impl AdServer for AdClient {
    async fn create_session(
        &self,
        api_key: &str,
        dev_mode: bool,
        ppid: Option<&str>,
    ) -> Result<Option<String>> {
        const ENDPOINT: &str = "/session/create";

        let mut query = vec![("devMode", dev_mode.to_string())];
        if let Some(ppid) = ppid {
            query.push(("ppid", ppid.to_string()));
        }

        let response = match self
            .client
            .post(self.url(ENDPOINT))
            .bearer_auth(api_key)
            .query(&query)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Session creation failed: {}", e);
                return Ok(None);
            }
        };

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                tracing::error!("Ad server rejected the API key");
                Err(Error::auth("Invalid API key", ENDPOINT))
            }
            status if !status.is_success() => {
                tracing::warn!("Session creation returned status {}", status);
                Ok(None)
            }
            _ => match response.json::<SessionResponse>().await {
                Ok(session) => {
                    tracing::debug!("Session created: {:?}", session.session_id);
                    Ok(session.session_id)
                }
                Err(e) => {
                    tracing::warn!("Failed to parse session response: {}", e);
                    Ok(None)
                }
            },
        }
    }

    async fn fetch_ad(&self, api_key: &str, request: &AdRequest) -> FetchAdResponse {
        let endpoint = request.endpoint();
        let body = match request.body() {
            Ok(body) => body,
            Err(e) => return FetchAdResponse::Error(format!("Failed to encode request: {}", e)),
        };

        tracing::debug!("Fetching ad from {}", endpoint);

        let request = self
            .client
            .post(self.url(endpoint))
            .bearer_auth(api_key)
            .json(&body);

        match self.send_json(endpoint, request).await {
            Ok(json) => FetchAdResponse::from_json(&json),
            Err(Error::Status { status, .. }) => {
                FetchAdResponse::Error(format!("HTTP error! status: {}", status))
            }
            Err(e) => FetchAdResponse::Error(crate::error::format_error(&e)),
        }
    }

    async fn fetch_catalog(&self) -> Result<Vec<GameData>> {
        const ENDPOINT: &str = "/minigames/catalogv2";

        let json = self
            .send_json(ENDPOINT, self.client.get(self.url(ENDPOINT)))
            .await?;
        let catalog: CatalogResponse = serde_json::from_value(json).map_err(|e| {
            Error::response(ENDPOINT, &format!("Unexpected catalog shape: {}", e))
        })?;
        Ok(catalog.into_games())
    }

    async fn init_game(&self, api_key: &str, request: &GameInitRequest) -> Result<GameLaunch> {
        const ENDPOINT: &str = "/minigames/init";

        let json = self
            .send_json(
                ENDPOINT,
                self.client
                    .post(self.url(ENDPOINT))
                    .bearer_auth(api_key)
                    .json(request),
            )
            .await?;
        let response: GameInitResponse = serde_json::from_value(json)?;
        response
            .ad_response
            .ok_or_else(|| Error::response(ENDPOINT, "adResponse missing from game launch"))
    }

    async fn fetch_post_game_ad(&self, api_key: &str, ad_id: &str) -> Result<Option<String>> {
        let endpoint = format!("/minigames/fallback_ad/{}", ad_id);

        let json = self
            .send_json(
                &endpoint,
                self.client.post(self.url(&endpoint)).bearer_auth(api_key),
            )
            .await?;
        let response: PostGameAdResponse = serde_json::from_value(json)?;
        Ok(response.ad_response.and_then(|ad| ad.iframe_url))
    }

    async fn track_engagement(&self, api_key: &str, kind: EngagementKind, ad_id: &str) {
        let endpoint = format!("/track/engagement/{}/{}", kind.as_str(), ad_id);

        let result = self
            .client
            .post(self.url(&endpoint))
            .bearer_auth(api_key)
            .json(&EngagementEvent::now())
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("Tracked {} for ad {}", kind.as_str(), ad_id);
            }
            Ok(response) => {
                tracing::warn!(
                    "Failed to track {} for ad {}: status {}",
                    kind.as_str(),
                    ad_id,
                    response.status()
                );
            }
            Err(e) => {
                tracing::warn!("Failed to track {} for ad {}: {}", kind.as_str(), ad_id, e);
            }
        }
    }

    async fn track_click(&self, api_key: &str, ad_id: &str, href: &str) {
        let result = self
            .client
            .post(self.url("/track_click"))
            .bearer_auth(api_key)
            .json(&ClickEvent::new(ad_id, href))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("Tracked click for ad {}", ad_id);
            }
            Ok(response) => {
                tracing::warn!("Failed to track click: status {}", response.status());
            }
            Err(e) => tracing::warn!("Failed to track click: {}", e),
        }
    }

    async fn create_injector_session(&self) -> Result<String> {
        const ENDPOINT: &str = "/create_session/";

        let json = self
            .send_json(ENDPOINT, self.client.post(self.url(ENDPOINT)))
            .await?;
        let session: SessionResponse = serde_json::from_value(json)?;
        session
            .session_id
            .ok_or_else(|| Error::session("Server did not return a session id"))
    }

    async fn user_profile(&self, messages: &[ChatMessage]) -> Result<Value> {
        const ENDPOINT: &str = "/user_profile/";

        self.send_json(
            ENDPOINT,
            self.client
                .post(self.url(ENDPOINT))
                .json(&UserProfileRequest::from_messages(messages)),
        )
        .await
    }

    async fn ad_integrate(&self, request: &AdIntegrateRequest) -> Result<TextStream> {
        const ENDPOINT: &str = "/ad_integrate/";

        let response = self
            .client
            .post(self.url(ENDPOINT))
            .json(request)
            .send()
            .await
            .map_err(|e| Error::network_at(ENDPOINT, &format!("Network request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("{} returned error status: {}", ENDPOINT, status);
            return Err(Error::status(status.as_u16(), ENDPOINT));
        }

        Ok(sse::data_stream(response.bytes_stream()))
    }
}
