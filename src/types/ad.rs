//! Served ad creative

use serde::{Deserialize, Serialize};

/// One served creative
///
/// Immutable once received. A creative is rendered either from `iframe_url`
/// or from `html`; the remaining fields are metadata for telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdData {
    /// Server-assigned ad identifier, used for telemetry
    pub id: String,
    /// Creative format (e.g. "native", "all", "sponsored_suggestion")
    #[serde(default)]
    pub format: String,
    /// Sandboxed iframe source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iframe_url: Option<String>,
    /// Inline HTML creative
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Landing page opened on click
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_url: Option<String>,
    /// Third-party impression pixel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impression_url: Option<String>,
    /// Text content of legacy text ads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl AdData {
    /// Create an ad with only an id and format
    pub fn new(id: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            format: format.into(),
            iframe_url: None,
            html: None,
            click_url: None,
            impression_url: None,
            content: None,
        }
    }

    /// Set iframe URL
    pub fn with_iframe_url(mut self, url: impl Into<String>) -> Self {
        self.iframe_url = Some(url.into());
        self
    }

    /// Set inline HTML
    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Set click URL
    pub fn with_click_url(mut self, url: impl Into<String>) -> Self {
        self.click_url = Some(url.into());
        self
    }

    /// Whether the ad carries something renderable
    pub fn has_creative(&self) -> bool {
        self.iframe_url.is_some() || self.html.is_some() || self.content.is_some()
    }

    /// Whether the creative is rendered inline rather than in an iframe
    ///
    /// Inline creatives size themselves, so `AD_HEIGHT` messages only apply
    /// to iframe creatives.
    pub fn is_inline(&self) -> bool {
        self.html.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builder() {
        let ad = AdData::new("ad_1", "native")
            .with_iframe_url("https://cdn.example/ad_1")
            .with_click_url("https://example.com");

        assert_eq!(ad.id, "ad_1");
        assert!(ad.has_creative());
        assert!(!ad.is_inline());
        assert_eq!(ad.click_url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_camel_case_wire_format() {
        let ad: AdData = serde_json::from_value(serde_json::json!({
            "id": "abc",
            "format": "all",
            "iframeUrl": "https://cdn.example/abc",
            "clickUrl": "https://landing.example"
        }))
        .unwrap();

        assert_eq!(ad.iframe_url.as_deref(), Some("https://cdn.example/abc"));
        assert_eq!(ad.click_url.as_deref(), Some("https://landing.example"));
        assert!(ad.html.is_none());

        let json = serde_json::to_value(&ad).unwrap();
        assert!(json.get("html").is_none());
        assert_eq!(json["iframeUrl"], "https://cdn.example/abc");
    }

    #[test]
    fn test_missing_format_defaults_to_empty() {
        let ad: AdData = serde_json::from_str(r#"{"id":"x","content":"Try it"}"#).unwrap();
        assert_eq!(ad.format, "");
        assert!(ad.has_creative());
    }
}
