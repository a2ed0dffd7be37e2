//! Ad injector
//!
//! Weaves sponsored content into assistant responses. On scheduled messages
//! the response is rewritten server-side and streamed back over SSE; on the
//! others the original response is streamed word by word.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use simula_ad_sdk::injector::{AdInjector, InjectorOptions, InsertOptions};
//! use simula_ad_sdk::types::ChatMessage;
//!
//! # tokio_test::block_on(async {
//! let options = InjectorOptions::new("Recipe assistant for home cooks").with_frequency(0.3);
//! let mut injector = AdInjector::init(options).await?;
//!
//! let history = vec![ChatMessage::user("What should I cook tonight?")];
//! let mut chunks = injector
//!     .insert_ad(&history, "Try a mushroom risotto.", InsertOptions::default())
//!     .await?;
//! while let Some(chunk) = chunks.next().await {
//!     print!("{} ", chunk?);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod schedule;
pub mod sse;

use futures::{StreamExt, stream};
use serde_json::Value;
use std::sync::Arc;

use crate::config::NetworkSettings;
use crate::session::{AdClient, AdServer, NetworkManager};
use crate::types::{AdIntegrateRequest, ChatMessage, format_conversation};
use crate::{Error, Result};

pub use schedule::InsertionSchedule;
pub use sse::{SseDecoder, TextStream};

/// Default ad frequency and fidelity
pub const DEFAULT_RATIO: f64 = 0.5;

/// Options for [`AdInjector`]
#[derive(Debug, Clone, Default)]
pub struct InjectorOptions {
    /// Description of the app and its users
    pub description: String,
    pub frequency: Option<f64>,
    pub fidelity: Option<f64>,
    pub filters: Vec<String>,
    pub api_base_url: Option<String>,
    /// Timeout, user agent and proxy for the HTTP client
    pub network: NetworkSettings,
}

impl InjectorOptions {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn with_fidelity(mut self, fidelity: f64) -> Self {
        self.fidelity = Some(fidelity);
        self
    }

    pub fn with_filters(mut self, filters: Vec<String>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn with_network(mut self, network: NetworkSettings) -> Self {
        self.network = network;
        self
    }

    fn client(&self) -> Result<AdClient> {
        let client = NetworkManager::new(&self.network)?.into_client();
        let base_url = self
            .api_base_url
            .clone()
            .unwrap_or_else(|| crate::config::DEFAULT_API_BASE_URL.to_string());
        Ok(AdClient::new_with_base_url(client, base_url))
    }
}

/// Per-call overrides for [`AdInjector::insert_ad`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertOptions {
    pub fidelity: Option<f64>,
    pub description: Option<String>,
    pub filters: Option<Vec<String>>,
}

/// Legacy SSE ad injector
pub struct AdInjector<T: AdServer = AdClient> {
    server: Arc<T>,
    session_id: String,
    description: String,
    frequency: f64,
    fidelity: f64,
    filters: Vec<String>,
    schedule: InsertionSchedule,
}

impl<T: AdServer> std::fmt::Debug for AdInjector<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdInjector")
            .field("session_id", &self.session_id)
            .field("frequency", &self.frequency)
            .field("fidelity", &self.fidelity)
            .field("filters", &self.filters)
            .finish()
    }
}

fn check_ratio(field: &str, value: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::validation_with_value(
            field,
            &format!("{} must be between 0 and 1", capitalize(field)),
            value,
        ));
    }
    Ok(value)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl AdInjector<AdClient> {
    /// Create a session on the configured server, then the injector
    pub async fn init(options: InjectorOptions) -> Result<Self> {
        let client = options.client()?;
        Self::init_with(client, options).await
    }

    /// Create an injector for an existing session
    pub fn new(session_id: impl Into<String>, options: InjectorOptions) -> Result<Self> {
        let client = options.client()?;
        Self::with_server(session_id, options, client)
    }
}

impl<T: AdServer> AdInjector<T> {
    /// Create a session on `server`, then the injector
    pub async fn init_with(server: T, options: InjectorOptions) -> Result<Self> {
        let session_id = server.create_injector_session().await?;
        tracing::debug!("Injector session created: {}", session_id);
        Self::with_server(session_id, options, server)
    }

    /// Create an injector for an existing session using `server`
    ///
    /// # Errors
    ///
    /// `Error::Validation` for an empty description or a frequency or
    /// fidelity outside `[0, 1]`.
    pub fn with_server(
        session_id: impl Into<String>,
        options: InjectorOptions,
        server: T,
    ) -> Result<Self> {
        if options.description.trim().is_empty() {
            return Err(Error::validation("description", "Description is required"));
        }
        let frequency = check_ratio("frequency", options.frequency.unwrap_or(DEFAULT_RATIO))?;
        let fidelity = check_ratio("fidelity", options.fidelity.unwrap_or(DEFAULT_RATIO))?;

        Ok(Self {
            server: Arc::new(server),
            session_id: session_id.into(),
            description: options.description,
            frequency,
            fidelity,
            filters: options.filters,
            schedule: InsertionSchedule::random(frequency),
        })
    }

    /// Replace the insertion schedule
    pub fn with_schedule(mut self, schedule: InsertionSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn fidelity(&self) -> f64 {
        self.fidelity
    }

    /// Submit the conversation and return the inferred user profile
    pub async fn process(&self, messages: &[ChatMessage]) -> Result<Value> {
        self.server.user_profile(messages).await.inspect_err(|e| {
            tracing::error!("Error processing user profile: {}", e);
        })
    }

    /// Stream the assistant response, with an ad woven in on scheduled messages
    pub async fn insert_ad(
        &mut self,
        history: &[ChatMessage],
        assistant_response: &str,
        overrides: InsertOptions,
    ) -> Result<TextStream> {
        if !self.schedule.should_insert() {
            tracing::debug!("Ad not inserted for message {}", self.schedule.step());
            let words: Vec<Result<String>> = assistant_response
                .split(' ')
                .map(|word| Ok(word.to_string()))
                .collect();
            return Ok(stream::iter(words).boxed());
        }

        let fidelity = match overrides.fidelity {
            Some(fidelity) => check_ratio("fidelity", fidelity)?,
            None => self.fidelity,
        };
        let request = AdIntegrateRequest {
            conv_history: format_conversation(history),
            llm_response: assistant_response.to_string(),
            fidelity,
            description: overrides
                .description
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| self.description.clone()),
            filters: overrides.filters.unwrap_or_else(|| self.filters.clone()),
            session_id: self.session_id.clone(),
        };

        tracing::debug!("Inserting ad for message {}", self.schedule.step());
        self.server.ad_integrate(&request).await.inspect_err(|e| {
            tracing::error!("Error inserting ad: {}", e);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn options() -> InjectorOptions {
        InjectorOptions::new("Travel planner for students")
    }

    fn client_for(server: &MockServer) -> AdClient {
        AdClient::new_with_base_url(reqwest::Client::new(), server.uri())
    }

    #[test]
    fn test_defaults() {
        let injector = AdInjector::new("s_1", options()).unwrap();
        assert_eq!(injector.frequency(), 0.5);
        assert_eq!(injector.fidelity(), 0.5);
        assert_eq!(injector.session_id(), "s_1");
    }

    #[test]
    fn test_validation() {
        let err = AdInjector::new("s_1", InjectorOptions::default()).unwrap_err();
        assert!(err.is_validation());

        let err = AdInjector::new("s_1", options().with_frequency(1.5)).unwrap_err();
        assert!(err.to_string().contains("Frequency must be between 0 and 1"));

        assert!(AdInjector::new("s_1", options().with_fidelity(-0.1)).is_err());
        assert!(AdInjector::new("s_1", options().with_frequency(f64::NAN)).is_err());
    }

    #[tokio::test]
    async fn test_init_creates_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/create_session/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sessionId": "inj_1"})))
            .expect(1)
            .mount(&server)
            .await;

        let injector = AdInjector::init(options().with_api_base_url(server.uri()))
            .await
            .unwrap();
        assert_eq!(injector.session_id(), "inj_1");
    }

    #[tokio::test]
    async fn test_init_uses_network_settings() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/create_session/"))
            .and(header("user-agent", "trip-planner/3.1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sessionId": "inj_ua"})))
            .expect(1)
            .mount(&server)
            .await;

        let network = NetworkSettings {
            user_agent: "trip-planner/3.1".to_string(),
            ..NetworkSettings::default()
        };
        let injector = AdInjector::init(
            options()
                .with_api_base_url(server.uri())
                .with_network(network),
        )
        .await
        .unwrap();
        assert_eq!(injector.session_id(), "inj_ua");
    }

    #[test]
    fn test_invalid_proxy_fails_construction() {
        let network = NetworkSettings {
            all_proxy: Some("not a url".to_string()),
            ..NetworkSettings::default()
        };
        let err = AdInjector::new("s_1", options().with_network(network)).unwrap_err();
        assert_eq!(err.category(), "proxy");
    }

    #[tokio::test]
    async fn test_skipped_message_streams_words() {
        let server = MockServer::start().await;
        let mut injector = AdInjector::with_server("s_1", options(), client_for(&server))
            .unwrap()
            .with_schedule(InsertionSchedule::seeded(0.0, 3));

        let chunks: Vec<String> = injector
            .insert_ad(&[], "Pack light for Lisbon", InsertOptions::default())
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec!["Pack", "light", "for", "Lisbon"]);
    }

    #[tokio::test]
    async fn test_scheduled_message_streams_sse() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ad_integrate/"))
            .and(body_partial_json(json!({
                "conv_history": "user: where to?",
                "llm_response": "Lisbon",
                "fidelity": 0.9,
                "description": "Travel planner for students",
                "session_id": "s_1"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string("data: Lisbon, \n\ndata: with HostelCo\n\n"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut injector = AdInjector::with_server("s_1", options(), client_for(&server))
            .unwrap()
            .with_schedule(InsertionSchedule::seeded(1.0, 3));
        let overrides = InsertOptions {
            fidelity: Some(0.9),
            ..InsertOptions::default()
        };

        let chunks: Vec<String> = injector
            .insert_ad(&[ChatMessage::user("where to?")], "Lisbon", overrides)
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec!["Lisbon, ", "with HostelCo"]);
    }

    #[tokio::test]
    async fn test_process_posts_history() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user_profile/"))
            .and(body_partial_json(json!({"conv_history": "user: hi\nassistant: hello"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"interests": ["travel"]})),
            )
            .mount(&server)
            .await;

        let injector = AdInjector::with_server("s_1", options(), client_for(&server)).unwrap();
        let profile = injector
            .process(&[ChatMessage::user("hi"), ChatMessage::assistant("hello")])
            .await
            .unwrap();
        assert_eq!(profile["interests"][0], "travel");
    }

    #[tokio::test]
    async fn test_integrate_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ad_integrate/"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let mut injector = AdInjector::with_server("s_1", options(), client_for(&server))
            .unwrap()
            .with_schedule(InsertionSchedule::seeded(1.0, 3));
        let err = injector
            .insert_ad(&[], "text", InsertOptions::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Status { status: 503, .. }));
    }
}
