//! Request type definitions
//!
//! Wire bodies sent to the ad server. Field names follow the server's
//! mixed snake/camel conventions, so every rename is explicit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::context::NativeContext;
use crate::types::message::{ChatMessage, format_conversation};
use crate::types::theme::Theme;

/// Format requested by sponsored suggestion surfaces
pub const SPONSORED_SUGGESTION_FORMAT: &str = "sponsored_suggestion";

/// In-chat and ad slot fetch, sent to `/render_ad/ssp`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SspRequest {
    pub session_id: String,
    pub messages: Vec<ChatMessage>,
    pub formats: Vec<String>,
    pub slot_id: String,
    pub position: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
}

/// Native banner fetch, sent to `/ssp/native`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeRequest {
    pub session_id: String,
    pub slot: String,
    pub position: u32,
    pub context: NativeContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

/// Legacy fetch, sent to `/ad_fetch`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyAdRequest {
    pub conversation_history: Vec<ChatMessage>,
    pub formats: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_id: Option<String>,
}

/// Any ad fetch a surface can issue
#[derive(Debug, Clone, PartialEq)]
pub enum AdRequest {
    Ssp(SspRequest),
    Native(NativeRequest),
    Legacy(LegacyAdRequest),
}

impl AdRequest {
    /// Path of the endpoint serving this request
    pub fn endpoint(&self) -> &'static str {
        match self {
            AdRequest::Ssp(_) => "/render_ad/ssp",
            AdRequest::Native(_) => "/ssp/native",
            AdRequest::Legacy(_) => "/ad_fetch",
        }
    }

    /// JSON body of this request
    pub fn body(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            AdRequest::Ssp(request) => serde_json::to_value(request),
            AdRequest::Native(request) => serde_json::to_value(request),
            AdRequest::Legacy(request) => serde_json::to_value(request),
        }
    }
}

/// Mini-game launch, sent to `/minigames/init`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameInitRequest {
    #[serde(rename = "gameType")]
    pub game_type: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "currencyMode")]
    pub currency_mode: bool,
    pub w: u32,
    pub h: u32,
    pub char_id: String,
    pub char_name: String,
    pub char_image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub char_desc: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub delegate_char: bool,
}

/// Character hosting a mini-game session
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GameCharacter {
    pub id: String,
    pub name: String,
    pub image: String,
    pub description: Option<String>,
}

/// Engagement beacon kinds under `/track/engagement/`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngagementKind {
    Impression,
    ViewportEntry,
    ViewportExit,
}

impl EngagementKind {
    /// Path segment of this beacon
    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementKind::Impression => "impression",
            EngagementKind::ViewportEntry => "viewport_entry",
            EngagementKind::ViewportExit => "viewport_exit",
        }
    }
}

/// Body of an engagement beacon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementEvent {
    pub timestamp: DateTime<Utc>,
}

impl EngagementEvent {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
        }
    }
}

/// Body of a click beacon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub ad_id: String,
    pub href: String,
    #[serde(rename = "clickTime")]
    pub click_time: DateTime<Utc>,
}

impl ClickEvent {
    /// Click recorded now
    pub fn new(ad_id: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            ad_id: ad_id.into(),
            href: href.into(),
            click_time: Utc::now(),
        }
    }
}

/// Body of `/user_profile/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfileRequest {
    pub conv_history: String,
}

impl UserProfileRequest {
    pub fn from_messages(messages: &[ChatMessage]) -> Self {
        Self {
            conv_history: format_conversation(messages),
        }
    }
}

/// Body of `/ad_integrate/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdIntegrateRequest {
    pub conv_history: String,
    pub llm_response: String,
    pub fidelity: f64,
    pub description: String,
    pub filters: Vec<String>,
    pub session_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_ssp_request_wire_shape() {
        let request = SspRequest {
            session_id: "sess_1".to_string(),
            messages: vec![ChatMessage::user("hello")],
            formats: vec!["all".to_string()],
            slot_id: "chat".to_string(),
            position: 3,
            theme: None,
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "session_id": "sess_1",
                "messages": [{"role": "user", "content": "hello"}],
                "formats": ["all"],
                "slot_id": "chat",
                "position": 3
            })
        );
    }

    #[test]
    fn test_endpoints() {
        let native = AdRequest::Native(NativeRequest {
            session_id: "s".to_string(),
            slot: "feed".to_string(),
            position: 0,
            context: NativeContext::default(),
            width: Some(320),
        });
        assert_eq!(native.endpoint(), "/ssp/native");
        assert_eq!(native.body().unwrap()["width"], 320);

        let legacy = AdRequest::Legacy(LegacyAdRequest {
            conversation_history: vec![],
            formats: vec![],
            slot_id: None,
        });
        assert_eq!(legacy.endpoint(), "/ad_fetch");
        assert!(legacy.body().unwrap().get("slot_id").is_none());
    }

    #[test]
    fn test_game_init_request_renames() {
        let request = GameInitRequest {
            game_type: "trivia".to_string(),
            session_id: "sess_1".to_string(),
            currency_mode: false,
            w: 400,
            h: 600,
            char_id: "c1".to_string(),
            char_name: "Aria".to_string(),
            char_image: "https://cdn.example/aria.png".to_string(),
            char_desc: None,
            messages: vec![],
            delegate_char: true,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["gameType"], "trivia");
        assert_eq!(value["sessionId"], "sess_1");
        assert_eq!(value["currencyMode"], false);
        assert_eq!(value["char_name"], "Aria");
        assert!(value.get("char_desc").is_none());
    }

    #[test]
    fn test_click_event_uses_click_time() {
        let value = serde_json::to_value(ClickEvent::new("ad_1", "https://shop.example")).unwrap();
        assert_eq!(value["ad_id"], "ad_1");
        assert!(value.get("clickTime").is_some());
    }

    #[test]
    fn test_engagement_paths() {
        assert_eq!(EngagementKind::Impression.as_str(), "impression");
        assert_eq!(EngagementKind::ViewportEntry.as_str(), "viewport_entry");
        assert_eq!(EngagementKind::ViewportExit.as_str(), "viewport_exit");
    }

    #[test]
    fn test_user_profile_formats_history() {
        let request = UserProfileRequest::from_messages(&[
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
        ]);
        assert_eq!(request.conv_history, "user: hi\nassistant: hello");
    }
}
