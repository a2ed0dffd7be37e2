//! `inject` subcommand

use anyhow::Result;
use futures::StreamExt;
use std::io::Write;

use crate::cli::{ConnectArgs, init_logging, load_settings};
use crate::injector::{AdInjector, InjectorOptions, InsertOptions};
use crate::session::AdClient;
use crate::types::ChatMessage;

#[derive(Debug, Clone)]
pub struct InjectArgs {
    pub connect: ConnectArgs,
    pub description: String,
    pub frequency: Option<f64>,
    pub fidelity: Option<f64>,
    pub filters: Vec<String>,
    pub messages: Vec<ChatMessage>,
    pub response: String,
    /// Reuse an existing injector session instead of creating one
    pub session_id: Option<String>,
    /// Print the inferred user profile before streaming
    pub profile: bool,
}

/// Stream an assistant response through the injector to stdout
pub async fn run_inject(args: InjectArgs) -> Result<()> {
    let settings = load_settings(&args.connect)?;
    init_logging(&settings);

    let mut options = InjectorOptions::new(args.description.as_str())
        .with_filters(args.filters.clone())
        .with_api_base_url(settings.api.base_url.as_str());
    options.frequency = args.frequency;
    options.fidelity = args.fidelity;

    let client = AdClient::from_settings(&settings)?;
    let mut injector = match &args.session_id {
        Some(session_id) => AdInjector::with_server(session_id.as_str(), options, client)?,
        None => AdInjector::init_with(client, options).await?,
    };
    tracing::info!("Injector session {}", injector.session_id());

    if args.profile {
        let profile = injector.process(&args.messages).await?;
        eprintln!("{}", serde_json::to_string_pretty(&profile)?);
    }

    let mut chunks = injector
        .insert_ad(&args.messages, &args.response, InsertOptions::default())
        .await?;

    // One chunk per line
    let mut stdout = std::io::stdout();
    while let Some(chunk) = chunks.next().await {
        writeln!(stdout, "{}", chunk?)?;
        stdout.flush()?;
    }

    Ok(())
}
