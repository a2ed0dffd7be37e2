//! SDK configuration
//!
//! Settings are loaded from a TOML file and overridden by `SIMULA_*`
//! environment variables. Every field has a serde default so partial files
//! are accepted.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Production ad server
pub const DEFAULT_API_BASE_URL: &str = "https://simula-api-701226639755.us-central1.run.app";

/// API key substituted when running in dev mode without a key
pub const DEV_MODE_API_KEY: &str = "dev-mode-key";

// Helper functions for serde defaults
fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_threshold() -> f64 {
    0.5
}

fn default_duration_ms() -> u64 {
    1000
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_min_interval_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    crate::utils::user_agent()
}

/// Main configuration settings for the SDK
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Ad server and account configuration
    #[serde(default)]
    pub api: ApiSettings,
    /// Viewability measurement configuration
    #[serde(default)]
    pub viewability: ViewabilitySettings,
    /// Fetch gating configuration
    #[serde(default)]
    pub fetch: FetchSettings,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Network configuration
    #[serde(default)]
    pub network: NetworkSettings,
    /// Bot detection configuration
    #[serde(default)]
    pub bot_detection: BotDetectionSettings,
}

/// Ad server and account configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL of the ad server
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Publisher API key
    #[serde(default)]
    pub api_key: Option<String>,
    /// Dev mode, forwarded to session creation
    #[serde(default)]
    pub dev_mode: bool,
    /// Publisher-provided user id (ppid)
    #[serde(default)]
    pub primary_user_id: Option<String>,
    /// Whether the user consented to sharing PII fields
    #[serde(default)]
    pub has_privacy_consent: bool,
}

/// Viewability measurement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewabilitySettings {
    /// Minimum visible fraction of the element
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Continuous visible time required for an impression, in milliseconds
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
    /// Interval of the periodic duration check, in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

/// Fetch gating configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSettings {
    /// Minimum time between two fetches, in milliseconds
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    /// Delay applied to fetch triggers, in milliseconds
    #[serde(default)]
    pub debounce_ms: u64,
    /// Default for trigger-driven surfaces
    #[serde(default = "default_true")]
    pub only_when_visible: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable verbose logging
    #[serde(default)]
    pub verbose: bool,
}

/// Network and proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// User agent string
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// HTTPS proxy URL
    #[serde(default)]
    pub https_proxy: Option<String>,
    /// HTTP proxy URL
    #[serde(default)]
    pub http_proxy: Option<String>,
    /// All protocols proxy URL
    #[serde(default)]
    pub all_proxy: Option<String>,
}

/// Bot detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotDetectionSettings {
    /// Run the detector before fetching
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// User agent inspected by the built-in detector
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            dev_mode: false,
            primary_user_id: None,
            has_privacy_consent: false,
        }
    }
}

impl Default for ViewabilitySettings {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            duration_ms: default_duration_ms(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
            debounce_ms: 0,
            only_when_visible: default_true(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            verbose: false,
        }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
            https_proxy: None,
            http_proxy: None,
            all_proxy: None,
        }
    }
}

impl Default for BotDetectionSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            user_agent: None,
        }
    }
}

impl ViewabilitySettings {
    /// Required continuous visible duration
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Periodic duration check interval
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

impl NetworkSettings {
    /// Effective proxy: `https_proxy`, then `http_proxy`, then `all_proxy`
    pub fn proxy_url(&self) -> Option<&str> {
        self.https_proxy
            .as_deref()
            .or(self.http_proxy.as_deref())
            .or(self.all_proxy.as_deref())
    }
}

impl FetchSettings {
    /// Minimum time between fetches
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// Trigger debounce delay
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn parse_bool_env(name: &str, value: &str) -> crate::Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(crate::Error::config(
            name,
            &format!("Invalid boolean: {}", other),
        )),
    }
}

impl Settings {
    /// Create new settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from environment variables
    pub fn from_env() -> crate::Result<Self> {
        Self::default().merge_with_env()
    }

    /// Load settings from configuration file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::config("file", &format!("Failed to read config file: {}", e))
        })?;

        let settings: Settings = toml::from_str(&content).map_err(|e| {
            crate::Error::config("file", &format!("Failed to parse config file: {}", e))
        })?;

        Ok(settings)
    }

    /// Apply environment variable overrides on top of these settings
    pub fn merge_with_env(mut self) -> crate::Result<Self> {
        if let Ok(key) = std::env::var("SIMULA_API_KEY") {
            self.api.api_key = Some(key);
        }

        if let Ok(base_url) = std::env::var("SIMULA_API_BASE_URL") {
            self.api.base_url = base_url;
        }

        if let Ok(dev_mode) = std::env::var("SIMULA_DEV_MODE") {
            self.api.dev_mode = parse_bool_env("SIMULA_DEV_MODE", &dev_mode)?;
        }

        if let Ok(ppid) = std::env::var("SIMULA_PPID") {
            self.api.primary_user_id = Some(ppid);
        }

        if let Ok(consent) = std::env::var("SIMULA_PRIVACY_CONSENT") {
            self.api.has_privacy_consent = parse_bool_env("SIMULA_PRIVACY_CONSENT", &consent)?;
        }

        if let Ok(interval) = std::env::var("SIMULA_MIN_FETCH_INTERVAL_MS") {
            self.fetch.min_interval_ms = interval.parse().map_err(|e| {
                crate::Error::config("min_interval_ms", &format!("Invalid interval: {}", e))
            })?;
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(verbose) = std::env::var("VERBOSE") {
            self.logging.verbose = verbose.parse().unwrap_or(false);
        }

        // Proxy settings always override when present
        if let Ok(proxy) = std::env::var("HTTPS_PROXY") {
            self.network.https_proxy = Some(proxy);
        }
        if let Ok(proxy) = std::env::var("HTTP_PROXY") {
            self.network.http_proxy = Some(proxy);
        }
        if let Ok(proxy) = std::env::var("ALL_PROXY") {
            self.network.all_proxy = Some(proxy);
        }

        Ok(self)
    }

    /// Get effective proxy URL based on priority
    pub fn get_proxy_url(&self) -> Option<String> {
        self.network.proxy_url().map(str::to_string)
    }

    /// Validate configuration settings
    pub fn validate(&self) -> crate::Result<()> {
        if let Err(e) = url::Url::parse(&self.api.base_url) {
            return Err(crate::Error::config(
                "api.base_url",
                &format!("Invalid base URL '{}': {}", self.api.base_url, e),
            ));
        }

        if !(self.viewability.threshold > 0.0 && self.viewability.threshold <= 1.0) {
            return Err(crate::Error::config(
                "viewability.threshold",
                &format!(
                    "Threshold must be in (0, 1], got {}",
                    self.viewability.threshold
                ),
            ));
        }

        if self.viewability.duration_ms == 0 {
            return Err(crate::Error::config(
                "viewability.duration_ms",
                "Duration cannot be 0",
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(crate::Error::config(
                    "log_level",
                    &format!("Invalid log level: {}", self.logging.level),
                ));
            }
        }

        for (name, proxy_url) in [
            ("https_proxy", &self.network.https_proxy),
            ("http_proxy", &self.network.http_proxy),
            ("all_proxy", &self.network.all_proxy),
        ]
        .iter()
        {
            if let Some(url_str) = proxy_url
                && let Err(e) = url::Url::parse(url_str)
            {
                return Err(crate::Error::config(
                    *name,
                    &format!("Invalid proxy URL '{}': {}", url_str, e),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_TEST_MUTEX;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.api.base_url, DEFAULT_API_BASE_URL);
        assert!(settings.api.api_key.is_none());
        assert!(!settings.api.has_privacy_consent);
        assert_eq!(settings.viewability.threshold, 0.5);
        assert_eq!(settings.viewability.duration_ms, 1000);
        assert_eq!(settings.viewability.tick_interval_ms, 100);
        assert_eq!(settings.fetch.min_interval_ms, 1000);
        assert_eq!(settings.fetch.debounce_ms, 0);
        assert!(settings.fetch.only_when_visible);
        assert!(settings.bot_detection.enabled);
    }

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[api]
base_url = "http://localhost:8000"
api_key = "pub_123"

[fetch]
debounce_ms = 250
        "#
        )
        .unwrap();

        let settings = Settings::from_file(temp_file.path()).unwrap();
        assert_eq!(settings.api.base_url, "http://localhost:8000");
        assert_eq!(settings.api.api_key.as_deref(), Some("pub_123"));
        assert_eq!(settings.fetch.debounce_ms, 250);
        // Untouched sections keep their defaults
        assert_eq!(settings.fetch.min_interval_ms, 1000);
        assert_eq!(settings.viewability.duration_ms, 1000);
    }

    #[test]
    fn test_env_var_override() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

        unsafe {
            std::env::set_var("SIMULA_API_KEY", "env_key");
            std::env::set_var("SIMULA_DEV_MODE", "true");
            std::env::set_var("SIMULA_MIN_FETCH_INTERVAL_MS", "2500");
        }

        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.api.api_key.as_deref(), Some("env_key"));
        assert!(settings.api.dev_mode);
        assert_eq!(settings.fetch.min_interval_ms, 2500);

        unsafe {
            std::env::remove_var("SIMULA_API_KEY");
            std::env::remove_var("SIMULA_DEV_MODE");
            std::env::remove_var("SIMULA_MIN_FETCH_INTERVAL_MS");
        }
    }

    #[test]
    fn test_invalid_bool_env() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

        unsafe {
            std::env::set_var("SIMULA_PRIVACY_CONSENT", "maybe");
        }

        let result = Settings::from_env();
        assert!(matches!(result, Err(crate::Error::Config { .. })));

        unsafe {
            std::env::remove_var("SIMULA_PRIVACY_CONSENT");
        }
    }

    #[test]
    fn test_proxy_priority() {
        let mut settings = Settings::default();
        settings.network.https_proxy = Some("https://proxy1:8080".to_string());
        settings.network.http_proxy = Some("http://proxy2:8080".to_string());
        settings.network.all_proxy = Some("socks5://proxy3:1080".to_string());

        assert_eq!(settings.get_proxy_url().unwrap(), "https://proxy1:8080");

        settings.network.https_proxy = None;
        assert_eq!(settings.get_proxy_url().unwrap(), "http://proxy2:8080");

        settings.network.http_proxy = None;
        assert_eq!(settings.get_proxy_url().unwrap(), "socks5://proxy3:1080");
    }

    #[test]
    fn test_validation_success() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_threshold() {
        let mut settings = Settings::default();
        settings.viewability.threshold = 0.0;
        assert!(settings.validate().is_err());

        settings.viewability.threshold = 1.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_base_url() {
        let mut settings = Settings::default();
        settings.api.base_url = "not a url".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_proxy_url() {
        let mut settings = Settings::default();
        settings.network.https_proxy = Some("invalid-url".to_string());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_duration_helpers() {
        let settings = Settings::default();
        assert_eq!(settings.viewability.duration(), Duration::from_secs(1));
        assert_eq!(settings.fetch.min_interval(), Duration::from_secs(1));
        assert_eq!(settings.fetch.debounce(), Duration::ZERO);
    }
}
