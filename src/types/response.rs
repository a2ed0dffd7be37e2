//! Response type definitions
//!
//! The ad server answers fetches in several historical shapes. They are
//! normalized here into [`FetchAdResponse`] so surfaces only ever see one
//! of: an ad, a no-fill, or an error message.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::ad::AdData;

/// Message carried by a no-fill outcome
pub const NO_FILL_MESSAGE: &str = "No fill";

/// Normalized outcome of an ad fetch
#[derive(Debug, Clone, PartialEq)]
pub enum FetchAdResponse {
    /// A creative was served
    Ad(AdData),
    /// The server had nothing to show
    NoFill,
    /// The request failed; the message is shown to `on_error`
    Error(String),
}

#[derive(Debug, Deserialize)]
struct SspAdResponse {
    ad_id: Option<String>,
    iframe_url: Option<String>,
    html: Option<String>,
    click_url: Option<String>,
    impression_url: Option<String>,
    format: Option<String>,
}

impl FetchAdResponse {
    /// Normalize a 2xx JSON body
    ///
    /// Checked in order: `error`, `adInserted: false`, `adResponse`, legacy
    /// `ad`. Anything else is a no-fill.
    pub fn from_json(body: &Value) -> Self {
        match body.get("error") {
            None | Some(Value::Null) => {}
            Some(Value::String(message)) => return Self::Error(message.clone()),
            Some(other) => return Self::Error(other.to_string()),
        }

        if body.get("adInserted").and_then(Value::as_bool) == Some(false) {
            return Self::NoFill;
        }

        if let Some(raw) = body.get("adResponse").filter(|v| v.is_object()) {
            return match serde_json::from_value::<SspAdResponse>(raw.clone()) {
                Ok(ssp) => Self::from_ssp(ssp),
                Err(e) => {
                    tracing::warn!("Malformed adResponse: {}", e);
                    Self::NoFill
                }
            };
        }

        if let Some(raw) = body.get("ad").filter(|v| v.is_object()) {
            return match serde_json::from_value::<AdData>(raw.clone()) {
                Ok(ad) if ad.has_creative() => Self::Ad(ad),
                Ok(_) => Self::NoFill,
                Err(e) => {
                    tracing::warn!("Malformed legacy ad: {}", e);
                    Self::NoFill
                }
            };
        }

        Self::NoFill
    }

    fn from_ssp(ssp: SspAdResponse) -> Self {
        let Some(id) = ssp.ad_id.filter(|id| !id.is_empty()) else {
            return Self::NoFill;
        };
        if ssp.iframe_url.is_none() && ssp.html.is_none() {
            return Self::NoFill;
        }

        Self::Ad(AdData {
            id,
            format: ssp.format.unwrap_or_default(),
            iframe_url: ssp.iframe_url,
            html: ssp.html,
            click_url: ssp.click_url,
            impression_url: ssp.impression_url,
            content: None,
        })
    }

    /// Served ad, if any
    pub fn ad(&self) -> Option<&AdData> {
        match self {
            Self::Ad(ad) => Some(ad),
            _ => None,
        }
    }

    pub fn is_no_fill(&self) -> bool {
        matches!(self, Self::NoFill)
    }

    /// Message reported to `on_error` for non-ad outcomes
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Ad(_) => None,
            Self::NoFill => Some(NO_FILL_MESSAGE),
            Self::Error(message) => Some(message),
        }
    }
}

/// Body of `/session/create`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// One entry of the mini-game catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon_url: String,
    #[serde(default)]
    pub description: String,
    /// Fields the menu doesn't interpret
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Catalog body, either wrapped in `data` or a bare list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CatalogResponse {
    Wrapped { data: Vec<GameData> },
    Bare(Vec<GameData>),
}

impl CatalogResponse {
    pub fn into_games(self) -> Vec<GameData> {
        match self {
            CatalogResponse::Wrapped { data } => data,
            CatalogResponse::Bare(games) => games,
        }
    }
}

/// Game iframe returned by `/minigames/init`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameLaunch {
    pub iframe_url: String,
    #[serde(default)]
    pub ad_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GameInitResponse {
    pub ad_response: Option<GameLaunch>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PostGameAd {
    pub iframe_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PostGameAdResponse {
    pub ad_response: Option<PostGameAd>,
}
