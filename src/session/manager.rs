//! # Session Management Module
//!
//! The [`SessionManager`] is the provider every ad surface shares. It owns
//! the publisher key, the server session, the privacy settings and the
//! per-session [`SessionStore`].
//!
//! ## Lifecycle
//!
//! Connecting validates the options and creates a server session. A
//! rejected API key (HTTP 401) aborts construction. Any other failure leaves
//! the manager without a session id, and fetch-gated surfaces stay idle.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use simula_ad_sdk::config::Settings;
//! use simula_ad_sdk::session::SessionManager;
//!
//! # tokio_test::block_on(async {
//! let mut settings = Settings::default();
//! settings.api.api_key = Some("pub_live_123".to_string());
//!
//! let manager = SessionManager::connect(settings).await?;
//! println!("Session: {:?}", manager.session_id());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

use crate::{
    Result,
    config::Settings,
    session::{
        api::{AdClient, AdServer},
        bot::{BotGuard, BotVerdict},
        store::SessionStore,
    },
    types::{
        AdRequest, FetchAdResponse, NativeContext, filter_context_for_privacy,
        validation::resolve_api_key,
    },
};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Convenience type alias for SessionManager with the default AdClient
pub type SessionManager = SessionManagerGeneric<AdClient>;

/// Provider shared by every ad surface of a session
pub struct SessionManagerGeneric<T: AdServer = AdClient> {
    /// Configuration settings
    settings: Arc<Settings>,
    /// Effective publisher key
    api_key: String,
    /// Server session, absent when creation failed
    session_id: Option<String>,
    /// Per-session caches
    store: SessionStore,
    /// Ad server
    server: Arc<T>,
    /// Bot detection wrapper
    bot_guard: BotGuard,
    /// Memoized bot verdict
    verdict: OnceCell<BotVerdict>,
}

impl<T: AdServer> std::fmt::Debug for SessionManagerGeneric<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("session_id", &self.session_id)
            .field("dev_mode", &self.settings.api.dev_mode)
            .field("has_privacy_consent", &self.settings.api.has_privacy_consent)
            .field("bot_guard", &self.bot_guard)
            .finish()
    }
}

impl SessionManagerGeneric<AdClient> {
    /// Connect to the ad server described by `settings`
    ///
    /// # Errors
    ///
    /// `Error::Validation` when no API key is set outside dev mode,
    /// `Error::Auth` when the server rejects the key.
    pub async fn connect(settings: Settings) -> Result<Self> {
        let client = AdClient::from_settings(&settings)?;
        let bot_guard = BotGuard::from_settings(&settings.bot_detection);
        Self::connect_with(settings, client, bot_guard).await
    }
}

impl<T: AdServer> SessionManagerGeneric<T> {
    /// Connect using a custom ad server and bot guard
    pub async fn connect_with(settings: Settings, server: T, bot_guard: BotGuard) -> Result<Self> {
        let api_key = resolve_api_key(settings.api.api_key.as_deref(), settings.api.dev_mode)?;

        let session_id = server
            .create_session(
                &api_key,
                settings.api.dev_mode,
                settings.api.primary_user_id.as_deref(),
            )
            .await?;

        match &session_id {
            Some(id) => tracing::info!("Ad session established: {}", id),
            None => tracing::warn!("No ad session; surfaces will stay idle"),
        }

        Ok(Self {
            settings: Arc::new(settings),
            api_key,
            session_id,
            store: SessionStore::new(),
            server: Arc::new(server),
            bot_guard,
            verdict: OnceCell::new(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn has_privacy_consent(&self) -> bool {
        self.settings.api.has_privacy_consent
    }

    pub fn dev_mode(&self) -> bool {
        self.settings.api.dev_mode
    }

    /// Publisher-provided user id
    pub fn primary_user_id(&self) -> Option<&str> {
        self.settings.api.primary_user_id.as_deref()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn server(&self) -> &Arc<T> {
        &self.server
    }

    /// Bot verdict, computed on first use and reused afterwards
    pub async fn bot_verdict(&self) -> BotVerdict {
        self.verdict
            .get_or_init(|| self.bot_guard.verdict())
            .await
            .clone()
    }

    /// Verdict if detection has already completed
    pub fn cached_bot_verdict(&self) -> Option<&BotVerdict> {
        self.verdict.get()
    }

    /// Strip personal data from a context unless the user consented
    pub fn privacy_filtered(&self, context: &NativeContext) -> NativeContext {
        filter_context_for_privacy(context, self.has_privacy_consent())
    }

    /// Fetch an ad with this session's credentials
    pub async fn fetch_ad(&self, request: &AdRequest) -> FetchAdResponse {
        self.server.fetch_ad(&self.api_key, request).await
    }

    pub async fn track_impression(&self, ad_id: &str) {
        self.server.track_impression(&self.api_key, ad_id).await
    }

    pub async fn track_viewport_entry(&self, ad_id: &str) {
        self.server.track_viewport_entry(&self.api_key, ad_id).await
    }

    pub async fn track_viewport_exit(&self, ad_id: &str) {
        self.server.track_viewport_exit(&self.api_key, ad_id).await
    }

    pub async fn track_click(&self, ad_id: &str, href: &str) {
        self.server.track_click(&self.api_key, ad_id, href).await
    }
}
