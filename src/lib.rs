//! Simula Ad SDK
//!
//! Client-side ad serving for conversational apps: a session provider that
//! talks to the Simula ad server, viewability-gated ad surfaces that fetch at
//! most once per mount, a mini-game menu and the legacy SSE ad injector.
//!
//! # Features
//!
//! - **Session provider**: API key validation, server sessions, a shared
//!   per-session cache and a memoized bot verdict
//! - **Viewability**: impressions confirmed only after sustained visibility
//! - **Fetch gating**: one fetch per surface, rate limited across siblings,
//!   with no-fill results remembered for the rest of the session
//! - **Privacy**: personal context fields dropped without consent
//! - **Ad injector**: scheduled ad insertion streamed over SSE
//!
//! # Architecture
//!
//! Every surface kind shares one pure state machine
//! ([`surface::machine::AdSurface`]) that turns events into effects. The
//! async driver ([`surface::mount`]) owns a machine per surface and performs
//! the effects against a shared [`SessionManager`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use simula_ad_sdk::{SessionManager, Settings};
//! use simula_ad_sdk::surface::{SurfaceCallbacks, SurfaceConfig, mount};
//! use simula_ad_sdk::types::ChatMessage;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut settings = Settings::default();
//! settings.api.api_key = Some("pub_live_123".to_string());
//! let manager = Arc::new(SessionManager::connect(settings).await?);
//!
//! let config = SurfaceConfig::in_chat("chat", 0, vec![ChatMessage::user("Any dinner ideas?")])?;
//! let handle = mount(manager, config, SurfaceCallbacks::new().on_load(|ad| {
//!     println!("Loaded ad {}", ad.id);
//! }));
//! handle.trigger();
//! handle.observe(1.0);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod injector;
pub mod session;
pub mod surface;
pub mod types;
pub mod utils;

pub use config::{ConfigLoader, Settings};
pub use error::{Error, Result};
pub use injector::{AdInjector, InjectorOptions, InsertOptions};
pub use session::{AdClient, AdServer, SessionManager};
pub use surface::{AdSurface, SurfaceCallbacks, SurfaceConfig, SurfaceHandle, mount};
pub use types::{AdData, ChatMessage, FetchAdResponse, NativeContext, Theme, WidthSpec};
