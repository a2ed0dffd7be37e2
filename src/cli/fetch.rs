//! `fetch` subcommand
//!
//! Runs one ad surface to completion against the live server, assuming the
//! element is fully visible, and prints the outcome.

use anyhow::{Result, bail};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

use crate::cli::{ConnectArgs, init_logging, load_settings, print_json};
use crate::session::SessionManager;
use crate::surface::{RenderOutput, SurfaceCallbacks, SurfaceConfig, mount, native_banner_from_json};
use crate::types::{ChatMessage, Theme};

/// Surface to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FetchKind {
    /// In-chat ad from the conversation
    Chat,
    /// Legacy `/ad_fetch` endpoint
    Legacy,
    /// Native banner
    Native,
    /// Sponsored suggestions
    Suggestion,
}

#[derive(Debug, Clone)]
pub struct FetchArgs {
    pub connect: ConnectArgs,
    pub kind: FetchKind,
    pub slot: String,
    pub position: i64,
    pub messages: Vec<ChatMessage>,
    pub width: Option<String>,
    pub context: Option<String>,
    pub theme: Option<String>,
    pub timeout_secs: u64,
}

/// Build the surface configuration described by the arguments
pub fn surface_config(args: &FetchArgs) -> crate::Result<SurfaceConfig> {
    let position = u32::try_from(args.position).map_err(|_| {
        crate::Error::validation_with_value(
            "position",
            "Must be a non-negative number",
            args.position,
        )
    })?;

    let config = match args.kind {
        FetchKind::Chat => SurfaceConfig::in_chat(&args.slot, position, args.messages.clone())?,
        FetchKind::Legacy => {
            SurfaceConfig::ad_slot(&args.slot, args.messages.clone())?.with_legacy(true)
        }
        FetchKind::Suggestion => {
            SurfaceConfig::sponsored_suggestion(&args.slot, position, args.messages.clone())
        }
        FetchKind::Native => {
            let width = args.width.as_deref().map(parse_json_arg);
            let context = args.context.as_deref().map(parse_json_arg);
            native_banner_from_json(
                &args.slot,
                args.position,
                width.as_ref(),
                context.as_ref(),
            )?
        }
    };

    match &args.theme {
        Some(raw) => Ok(config.with_theme(Theme::from_value(&parse_json_arg(raw))?)),
        None => Ok(config),
    }
}

/// Treat the argument as JSON, falling back to a plain string
fn parse_json_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub async fn run_fetch(args: FetchArgs) -> Result<()> {
    let settings = load_settings(&args.connect)?;
    init_logging(&settings);

    let config = surface_config(&args)?.with_settings(&settings);
    let manager = Arc::new(SessionManager::connect(settings).await?);
    if manager.session_id().is_none() {
        bail!("No ad session could be created");
    }

    let (error_tx, mut error_rx) = tokio::sync::mpsc::unbounded_channel();
    let callbacks = SurfaceCallbacks::new().on_error(move |message| {
        let _ = error_tx.send(message.to_string());
    });

    let mut handle = mount(Arc::clone(&manager), config, callbacks);
    handle.width_measured(800.0);
    handle.observe(1.0);
    handle.trigger();

    let outcome = tokio::time::timeout(Duration::from_secs(args.timeout_secs), async {
        tokio::select! {
            output = handle.wait_for(|o| *o != RenderOutput::Collapsed) => Ok(output),
            Some(message) = error_rx.recv() => Err(message),
        }
    })
    .await;
    handle.unmount().await;

    let report = match outcome {
        Ok(Ok(output)) => json!({ "status": "ad", "render": render_json(&output) }),
        Ok(Err(message)) => json!({ "status": "no_ad", "error": message }),
        Err(_) => json!({ "status": "pending", "error": "Timed out waiting for the ad" }),
    };
    print_json(&report)
}

fn render_json(output: &RenderOutput) -> Value {
    match output {
        RenderOutput::Collapsed => json!({ "type": "collapsed" }),
        RenderOutput::Iframe { url, height } => {
            json!({ "type": "iframe", "url": url, "height": height })
        }
        RenderOutput::Html(html) => json!({ "type": "html", "html": html }),
        RenderOutput::Text(text) => json!({ "type": "text", "text": text }),
    }
}
