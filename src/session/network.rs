//! Network configuration and proxy support
//!
//! This module builds the HTTP client shared by every request the SDK makes.

use crate::Result;
use crate::config::settings::NetworkSettings;
use reqwest::{Client, Proxy};
use std::time::Duration;

/// Proxy specification for outgoing requests
#[derive(Debug, Clone, Default)]
pub struct ProxySpec {
    /// Proxy URL
    pub proxy_url: Option<String>,
}

impl ProxySpec {
    /// Create new proxy specification
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the effective proxy from network settings
    pub fn from_settings(settings: &NetworkSettings) -> Self {
        Self {
            proxy_url: settings.proxy_url().map(str::to_string),
        }
    }

    /// Set proxy URL
    pub fn with_proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = Some(proxy_url.into());
        self
    }
}

/// Network manager owning the configured HTTP client
#[derive(Debug, Clone)]
pub struct NetworkManager {
    /// Base HTTP client
    client: Client,
}

impl NetworkManager {
    /// Create a network manager from settings
    pub fn new(settings: &NetworkSettings) -> Result<Self> {
        Self::with_proxy_spec(settings, &ProxySpec::from_settings(settings))
    }

    /// Create a network manager with an explicit proxy specification
    pub fn with_proxy_spec(settings: &NetworkSettings, proxy_spec: &ProxySpec) -> Result<Self> {
        let mut client_builder = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.request_timeout));

        if let Some(proxy_url) = &proxy_spec.proxy_url {
            let proxy = Proxy::all(proxy_url).map_err(|e| {
                crate::Error::proxy(proxy_url, &format!("Invalid proxy URL: {}", e))
            })?;
            client_builder = client_builder.proxy(proxy);
        }

        let client = client_builder.build().map_err(|e| {
            crate::Error::proxy(
                "client_builder",
                &format!("Failed to create HTTP client: {}", e),
            )
        })?;

        tracing::debug!(
            "HTTP client ready (timeout {}s, proxy: {})",
            settings.request_timeout,
            proxy_spec.proxy_url.as_deref().unwrap_or("none")
        );

        Ok(Self { client })
    }

    /// Take ownership of the configured HTTP client
    pub fn into_client(self) -> Client {
        self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_priority() {
        let settings = NetworkSettings {
            https_proxy: Some("http://secure:8443".to_string()),
            http_proxy: Some("http://plain:8080".to_string()),
            all_proxy: Some("socks5://all:1080".to_string()),
            ..NetworkSettings::default()
        };
        assert_eq!(
            ProxySpec::from_settings(&settings).proxy_url.as_deref(),
            Some("http://secure:8443")
        );

        let settings = NetworkSettings {
            all_proxy: Some("http://all:1080".to_string()),
            ..NetworkSettings::default()
        };
        assert_eq!(
            ProxySpec::from_settings(&settings).proxy_url.as_deref(),
            Some("http://all:1080")
        );
    }

    #[test]
    fn test_proxy_spec_builder() {
        let spec = ProxySpec::new().with_proxy("http://proxy:8080");
        assert_eq!(spec.proxy_url, Some("http://proxy:8080".to_string()));
        assert!(ProxySpec::new().proxy_url.is_none());
    }

    #[tokio::test]
    async fn test_network_manager_creation() {
        let manager = NetworkManager::new(&NetworkSettings::default());
        assert!(manager.is_ok());
    }

    #[tokio::test]
    async fn test_network_manager_with_proxy() {
        let spec = ProxySpec::new().with_proxy("http://proxy:8080");
        let result = NetworkManager::with_proxy_spec(&NetworkSettings::default(), &spec);
        match result {
            Ok(_) => {}
            Err(e) => assert!(e.to_string().contains("proxy")),
        }
    }

    #[tokio::test]
    async fn test_invalid_proxy_is_rejected() {
        let spec = ProxySpec::new().with_proxy("not a url");
        let err = NetworkManager::with_proxy_spec(&NetworkSettings::default(), &spec).unwrap_err();
        assert_eq!(err.category(), "proxy");
    }
}
