//! Targeting context attached to native banner requests

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Error, Result};

/// Maximum number of tags accepted in a context
pub const MAX_TAGS: usize = 10;

/// Maximum number of keys accepted in `customContext`
pub const MAX_CUSTOM_KEYS: usize = 10;

/// Value of a `customContext` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomValue {
    /// Single string
    Text(String),
    /// List of strings
    List(Vec<String>),
}

/// Optional targeting hints for a banner fetch
///
/// `user_email` and `user_profile` are personal data and are dropped by
/// [`filter_context_for_privacy`] unless the user consented.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NativeContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nsfw: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_context: Option<BTreeMap<String, CustomValue>>,
}

impl NativeContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a host-supplied JSON context
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::validation("context", "Must be an object"));
        }
        let context: Self = crate::types::validation::from_value_at("context", value)?;
        context.validate()?;
        Ok(context)
    }

    /// Set search term
    pub fn with_search_term(mut self, term: impl Into<String>) -> Self {
        self.search_term = Some(term.into());
        self
    }

    /// Set tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Set category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set user email
    pub fn with_user_email(mut self, email: impl Into<String>) -> Self {
        self.user_email = Some(email.into());
        self
    }

    /// Set user profile
    pub fn with_user_profile(mut self, profile: impl Into<String>) -> Self {
        self.user_profile = Some(profile.into());
        self
    }

    /// Add a custom context entry
    pub fn with_custom(mut self, key: impl Into<String>, value: CustomValue) -> Self {
        self.custom_context
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value);
        self
    }

    /// Check limits the type system cannot express
    pub fn validate(&self) -> Result<()> {
        if let Some(tags) = &self.tags {
            if tags.len() > MAX_TAGS {
                return Err(Error::validation_with_value(
                    "context.tags",
                    "Exceeds maximum length of 10",
                    tags.len(),
                ));
            }
            for (i, tag) in tags.iter().enumerate() {
                if tag.starts_with('#') {
                    return Err(Error::validation_with_value(
                        format!("context.tags[{}]", i),
                        "Tags should not include # prefix".to_string(),
                        tag,
                    ));
                }
            }
        }

        if let Some(custom) = &self.custom_context
            && custom.len() > MAX_CUSTOM_KEYS
        {
            return Err(Error::validation_with_value(
                "context.customContext",
                "Exceeds maximum of 10 keys",
                custom.len(),
            ));
        }

        Ok(())
    }

    /// Whether this context carries personal data
    pub fn has_pii(&self) -> bool {
        self.user_email.is_some() || self.user_profile.is_some()
    }
}

/// Drop personal fields unless the user consented
pub fn filter_context_for_privacy(
    context: &NativeContext,
    has_privacy_consent: bool,
) -> NativeContext {
    if has_privacy_consent {
        return context.clone();
    }

    NativeContext {
        user_email: None,
        user_profile: None,
        ..context.clone()
    }
}
