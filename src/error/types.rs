//! Error taxonomy for the SDK
//!
//! Validation errors are raised synchronously before any network call.
//! Network failures are converted into typed fetch results by the client, so
//! only session creation and configuration loading surface them as `Err`.

use thiserror::Error;

/// Main error type for the SDK
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed component configuration (theme, context, banner props, ...)
    #[error("Validation failed for {field}: {message}")]
    Validation {
        /// The field that failed validation
        field: String,
        /// Error message describing the validation failure
        message: String,
        /// The invalid value that caused the validation to fail
        value: Option<String>,
    },

    /// Configuration errors
    #[error("Configuration error in {field}: {message}")]
    Config {
        /// The configuration field that has an error
        field: String,
        /// Error message describing the issue
        message: String,
    },

    /// Authentication errors (HTTP 401 on session creation)
    #[error("Authentication failed: {reason}")]
    Auth {
        /// The reason why authentication failed
        reason: String,
        /// The endpoint where authentication was attempted
        endpoint: Option<String>,
    },

    /// Non-success HTTP status from the ad server
    #[error("Ad server returned status {status} for {endpoint}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Endpoint path that was requested
        endpoint: String,
    },

    /// Network/connection errors
    #[error("Network error: {message}")]
    Network {
        /// Error message describing the network issue
        message: String,
        /// Endpoint path involved, when known
        endpoint: Option<String>,
    },

    /// Proxy configuration errors
    #[error("Proxy error with config '{config}': {message}")]
    Proxy {
        /// The proxy configuration that caused the error
        config: String,
        /// Error message describing the proxy issue
        message: String,
    },

    /// Server response that could not be interpreted
    #[error("Unexpected response from {endpoint}: {message}")]
    Response {
        /// Endpoint path that produced the response
        endpoint: String,
        /// What was wrong with the payload
        message: String,
    },

    /// SSE stream errors
    #[error("Stream error: {0}")]
    Stream(String),

    /// Bot detection library failures
    #[error("Bot detection failed during {stage}: {message}")]
    BotDetection {
        /// Either `load` or `detect`
        stage: String,
        /// Error message reported by the detector
        message: String,
    },

    /// Session errors
    #[error("Session error: {0}")]
    Session(String),

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal issue
        message: String,
        /// Additional context about where the error occurred
        context: Option<String>,
    },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    /// Create a validation error carrying the offending value
    pub fn validation_with_value<S: Into<String>>(
        field: S,
        message: S,
        value: impl std::fmt::Display,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
            value: Some(value.to_string()),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(field: S, message: S) -> Self {
        Self::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth<S: Into<String>>(reason: S, endpoint: S) -> Self {
        Self::Auth {
            reason: reason.into(),
            endpoint: Some(endpoint.into()),
        }
    }

    /// Create a status error
    pub fn status(status: u16, endpoint: impl Into<String>) -> Self {
        Self::Status {
            status,
            endpoint: endpoint.into(),
        }
    }

    /// Create a network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
            endpoint: None,
        }
    }

    /// Create a network error for a specific endpoint
    pub fn network_at<S: Into<String>>(endpoint: S, message: S) -> Self {
        Self::Network {
            message: message.into(),
            endpoint: Some(endpoint.into()),
        }
    }

    /// Create a proxy error
    pub fn proxy<S: Into<String>>(config: S, message: S) -> Self {
        Self::Proxy {
            config: config.into(),
            message: message.into(),
        }
    }

    /// Create a response error
    pub fn response<S: Into<String>>(endpoint: S, message: S) -> Self {
        Self::Response {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a stream error
    pub fn stream(msg: impl Into<String>) -> Self {
        Self::Stream(msg.into())
    }

    /// Create a bot detection error
    pub fn bot_detection<S: Into<String>>(stage: S, message: S) -> Self {
        Self::BotDetection {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Create a session error
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
            context: None,
        }
    }

    /// Check if this is a retryable error
    ///
    /// Surfaces never retry within a session; this only informs callers that
    /// build their own provider lifecycle around the SDK.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network { .. } => true,
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            Error::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::Http(..) => "http",
            Error::Json(..) => "json",
            Error::Toml(..) => "toml",
            Error::Url(..) => "url",
            Error::Io(..) => "io",
            Error::Validation { .. } => "validation",
            Error::Config { .. } => "config",
            Error::Auth { .. } => "auth",
            Error::Status { .. } => "status",
            Error::Network { .. } => "network",
            Error::Proxy { .. } => "proxy",
            Error::Response { .. } => "response",
            Error::Stream(..) => "stream",
            Error::BotDetection { .. } => "bot_detection",
            Error::Session(..) => "session",
            Error::Internal { .. } => "internal",
        }
    }

    /// True for the error kinds raised by validators
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }
}
