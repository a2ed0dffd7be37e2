//! Configuration management for the ad SDK
//!
//! This module handles loading and managing settings shared by the
//! library and the `simula-ad` binary.

pub mod loader;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::{DEFAULT_API_BASE_URL, DEV_MODE_API_KEY, NetworkSettings, Settings};

/// Serializes tests that read or write process environment variables
#[cfg(test)]
pub(crate) static ENV_TEST_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
