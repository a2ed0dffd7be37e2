//! Command-line interface
//!
//! Shared pieces of the `simula-ad` subcommands: configuration loading,
//! logging setup and argument parsing helpers.

pub mod fetch;
pub mod inject;
pub mod session;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{ConfigLoader, Settings};
use crate::types::ChatMessage;

/// Connection options shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct ConnectArgs {
    pub config: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub dev_mode: bool,
    pub ppid: Option<String>,
    pub privacy_consent: bool,
    pub verbose: bool,
}

/// Load settings and apply command-line overrides
///
/// Precedence: flags, then environment, then the config file, then defaults.
pub fn load_settings(args: &ConnectArgs) -> Result<Settings> {
    let mut settings = ConfigLoader::new()
        .load_discovered(args.config.as_deref().map(std::path::Path::new))
        .context("Failed to load configuration")?;

    if let Some(api_key) = &args.api_key {
        settings.api.api_key = Some(api_key.clone());
    }
    if let Some(base_url) = &args.base_url {
        settings.api.base_url = base_url.clone();
    }
    if args.dev_mode {
        settings.api.dev_mode = true;
    }
    if let Some(ppid) = &args.ppid {
        settings.api.primary_user_id = Some(ppid.clone());
    }
    if args.privacy_consent {
        settings.api.has_privacy_consent = true;
    }
    settings.logging.verbose |= args.verbose;

    settings.validate()?;
    Ok(settings)
}

/// Install the stderr subscriber
pub fn init_logging(settings: &Settings) {
    let directive = log_directive(settings, std::env::var("RUST_LOG").ok());
    let env_filter = EnvFilter::new(directive);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Filter directive: `RUST_LOG` wins, then `--verbose`, then the configured level
fn log_directive(settings: &Settings, rust_log: Option<String>) -> String {
    match rust_log {
        Some(directive) if !directive.trim().is_empty() => directive,
        _ if settings.logging.verbose => "debug".to_string(),
        _ => settings.logging.level.clone(),
    }
}

/// Parse a `role:content` message argument
pub fn parse_message(raw: &str) -> std::result::Result<ChatMessage, String> {
    match raw.split_once(':') {
        Some((role, content)) if !role.trim().is_empty() => {
            Ok(ChatMessage::new(role.trim(), content.trim_start()))
        }
        _ => Err(format!("expected ROLE:CONTENT, got {:?}", raw)),
    }
}

/// Print a value as pretty JSON on stdout
pub(crate) fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
