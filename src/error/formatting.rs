//! Error formatting utilities
//!
//! Renders errors for `on_error` callbacks, the CLI and structured logs.

use crate::Error;
use std::error::Error as StdError;

/// Format error for display, appending nested causes
pub fn format_error(error: &Error) -> String {
    let formatted = match error {
        Error::Validation {
            field,
            message,
            value,
        } => match value {
            Some(val) => format!(
                "Validation failed for {} (value: '{}'): {}",
                field, val, message
            ),
            None => format!("Validation failed for {}: {}", field, message),
        },

        Error::Network {
            message,
            endpoint: Some(endpoint),
        } => format!("Network error calling {}: {}", endpoint, message),

        Error::Auth {
            reason,
            endpoint: Some(endpoint),
        } => format!("Authentication failed at {}: {}", endpoint, reason),

        Error::Proxy { config, message } => {
            format!("Proxy error with config '{}': {}", config, message)
        }

        // For standard errors, use their Display implementation
        _ => error.to_string(),
    };

    let mut result = formatted;
    let mut source = error.source();

    while let Some(cause) = source {
        if !result.contains(&cause.to_string()) {
            result = format!("{} (caused by {})", result, cause);
        }
        source = cause.source();
    }

    result
}

/// Format error as a JSON object for CLI output
pub fn format_error_for_output(error: &Error) -> serde_json::Value {
    serde_json::json!({
        "error": format_error(error),
        "category": error.category(),
        "retryable": error.is_retryable(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })
}

/// Format error for logging with structured data
pub fn format_error_for_logging(error: &Error) -> serde_json::Value {
    let mut log_data = serde_json::json!({
        "message": format_error(error),
        "category": error.category(),
        "retryable": error.is_retryable(),
    });

    match error {
        Error::Status { status, endpoint } => {
            log_data["status"] = serde_json::Value::Number((*status).into());
            log_data["endpoint"] = serde_json::Value::String(endpoint.clone());
        }
        Error::Network {
            endpoint: Some(endpoint),
            ..
        }
        | Error::Response { endpoint, .. } => {
            log_data["endpoint"] = serde_json::Value::String(endpoint.clone());
        }
        Error::Validation { field, .. } => {
            log_data["field"] = serde_json::Value::String(field.clone());
        }
        _ => {}
    }

    log_data
}
