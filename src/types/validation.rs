//! Configuration validation
//!
//! Validators run synchronously before any network call and return
//! `Error::Validation` naming the offending field.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::types::layout::WidthSpec;
use crate::types::{ChatMessage, NativeContext};
use crate::{Error, Result};

/// Deserialize a host-supplied JSON value, reporting the failing field path
pub fn from_value_at<T: DeserializeOwned>(root: &str, value: &Value) -> Result<T> {
    serde_path_to_error::deserialize(value).map_err(|err| {
        let path = err.path().to_string();
        let field = if path == "." {
            root.to_string()
        } else {
            format!("{}.{}", root, path)
        };
        Error::Validation {
            field,
            message: err.inner().to_string(),
            value: None,
        }
    })
}

/// Validate provider options and return the effective API key
///
/// Dev mode tolerates a missing key by substituting a placeholder.
pub fn resolve_api_key(api_key: Option<&str>, dev_mode: bool) -> Result<String> {
    match api_key.map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key.to_string()),
        _ if dev_mode => Ok(crate::config::DEV_MODE_API_KEY.to_string()),
        _ => Err(Error::validation(
            "apiKey",
            "A non-empty API key is required unless dev mode is enabled",
        )),
    }
}

/// Validate chat history passed to in-chat ad surfaces
pub fn validate_messages(messages: &[ChatMessage]) -> Result<()> {
    if messages.is_empty() {
        return Err(Error::validation("messages", "Cannot be an empty array"));
    }

    for (i, message) in messages.iter().enumerate() {
        if message.role.trim().is_empty() {
            return Err(Error::validation(
                format!("messages[{}].role", i),
                "Must be a non-empty string".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validated native banner placement
#[derive(Debug, Clone, PartialEq)]
pub struct BannerPlacement {
    /// Placement identifier, e.g. "feed"
    pub slot: String,
    /// Ordinal of this banner within the slot
    pub position: u32,
    /// Container width policy
    pub width: WidthSpec,
    /// Targeting hints
    pub context: NativeContext,
}

/// Validate native banner props
pub fn validate_banner(
    slot: &str,
    position: i64,
    width: Option<WidthSpec>,
    context: NativeContext,
) -> Result<BannerPlacement> {
    if slot.trim().is_empty() {
        return Err(Error::validation("slot", "Cannot be an empty string"));
    }

    if position < 0 {
        return Err(Error::validation_with_value(
            "position",
            "Must be a non-negative number",
            position,
        ));
    }
    let position = u32::try_from(position).map_err(|_| {
        Error::validation_with_value("position", "Position is too large", position)
    })?;

    context.validate()?;

    Ok(BannerPlacement {
        slot: slot.to_string(),
        position,
        width: width.unwrap_or_default(),
        context,
    })
}

/// Validate a debounce delay given in milliseconds
pub fn validate_debounce_ms(debounce_ms: i64) -> Result<u64> {
    u64::try_from(debounce_ms).map_err(|_| {
        Error::validation_with_value("debounceMs", "Must be a non-negative number", debounce_ms)
    })
}
