//! `session` and `games` subcommands

use anyhow::Result;
use serde_json::json;
use tracing::info;

use crate::cli::{ConnectArgs, init_logging, load_settings, print_json};
use crate::error::format_error_for_output;
use crate::session::{AdClient, AdServer, SessionManager};

/// Create a session and print its id
pub async fn run_session(args: ConnectArgs) -> Result<()> {
    let settings = load_settings(&args)?;
    init_logging(&settings);

    let manager = match SessionManager::connect(settings).await {
        Ok(manager) => manager,
        Err(e) => {
            print_json(&format_error_for_output(&e))?;
            return Err(e.into());
        }
    };
    let verdict = manager.bot_verdict().await;
    info!(
        "simula-ad v{} connected to {}",
        crate::utils::get_version(),
        manager.server().base_url()
    );

    print_json(&json!({
        "sessionId": manager.session_id(),
        "devMode": manager.dev_mode(),
        "isBot": verdict.is_bot,
    }))
}

/// Print the mini-game catalog
pub async fn run_games(args: ConnectArgs, limit: Option<usize>) -> Result<()> {
    let settings = load_settings(&args)?;
    init_logging(&settings);

    let client = AdClient::from_settings(&settings)?;
    let mut games = client.fetch_catalog().await?;
    if let Some(limit) = limit {
        games.truncate(limit);
    }
    info!("Catalog has {} games", games.len());

    print_json(&serde_json::to_value(games)?)
}
