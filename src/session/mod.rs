//! Session management for ad surfaces
//!
//! This module handles the provider shared by every surface: the ad server
//! client, bot detection, the per-session store and network configuration.

pub mod api;
pub mod bot;
pub mod manager;
pub mod network;
pub mod store;

pub use api::{AdClient, AdServer};
pub use bot::{BotDetector, BotGuard, BotVerdict, StaticDetector, UserAgentDetector};
pub use manager::{SessionManager, SessionManagerGeneric};
pub use network::{NetworkManager, ProxySpec};
pub use store::{SessionStore, SlotKey};
