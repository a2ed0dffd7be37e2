//! Command-line client for the Simula ad server
//!
//! # Usage
//!
//! ## Create a session
//! ```bash
//! simula-ad --api-key pub_live_123 session
//! ```
//!
//! ## Fetch an ad
//! ```bash
//! simula-ad --dev-mode fetch --kind native --slot feed --width 50% \
//!     --context '{"searchTerm":"tents"}'
//! simula-ad --dev-mode fetch --kind chat -m "user:Where should I camp?"
//! ```
//!
//! ## Stream a response through the ad injector
//! ```bash
//! simula-ad inject --description "Camping assistant" -m "user:hi" \
//!     --response "Try the lakeside site"
//! ```

use clap::{Args, Parser, Subcommand};

use simula_ad_sdk::cli::{
    ConnectArgs,
    fetch::{FetchArgs, FetchKind, run_fetch},
    inject::{InjectArgs, run_inject},
    parse_message,
    session::{run_games, run_session},
};
use simula_ad_sdk::types::ChatMessage;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "simula-ad")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct GlobalArgs {
    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<String>,

    /// Publisher API key
    #[arg(long, global = true, value_name = "KEY")]
    api_key: Option<String>,

    /// Ad server base URL
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    /// Enable dev mode
    #[arg(long, global = true)]
    dev_mode: bool,

    /// Publisher-provided user id
    #[arg(long, global = true)]
    ppid: Option<String>,

    /// The user consented to sharing personal data
    #[arg(long, global = true)]
    privacy_consent: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

impl From<GlobalArgs> for ConnectArgs {
    fn from(args: GlobalArgs) -> Self {
        ConnectArgs {
            config: args.config,
            api_key: args.api_key,
            base_url: args.base_url,
            dev_mode: args.dev_mode,
            ppid: args.ppid,
            privacy_consent: args.privacy_consent,
            verbose: args.verbose,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create an ad session and print its id
    Session,

    /// Run one ad surface and print the result
    Fetch {
        /// Surface kind
        #[arg(short, long, value_enum, default_value = "chat")]
        kind: FetchKind,

        /// Slot identifier
        #[arg(short, long, default_value = "cli")]
        slot: String,

        /// Position within the slot
        #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
        position: i64,

        /// Conversation message as ROLE:CONTENT (repeatable)
        #[arg(short, long = "message", value_parser = parse_message)]
        messages: Vec<ChatMessage>,

        /// Banner width: a number, "N%", "Npx" or "auto"
        #[arg(short, long)]
        width: Option<String>,

        /// Banner context as JSON
        #[arg(long)]
        context: Option<String>,

        /// Theme as JSON
        #[arg(long)]
        theme: Option<String>,

        /// Seconds to wait for the ad
        #[arg(long, default_value_t = 15)]
        timeout: u64,
    },

    /// List mini-games
    Games {
        /// Maximum number of games to print
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Stream an assistant response through the ad injector
    Inject {
        /// Description of the app and its users
        #[arg(short, long)]
        description: String,

        /// Ad frequency in [0, 1]
        #[arg(short, long)]
        frequency: Option<f64>,

        /// Ad fidelity in [0, 1]
        #[arg(long)]
        fidelity: Option<f64>,

        /// Content filter (repeatable)
        #[arg(long = "filter")]
        filters: Vec<String>,

        /// Conversation message as ROLE:CONTENT (repeatable)
        #[arg(short, long = "message", value_parser = parse_message)]
        messages: Vec<ChatMessage>,

        /// Assistant response to stream
        #[arg(short, long)]
        response: String,

        /// Existing injector session id
        #[arg(long)]
        session_id: Option<String>,

        /// Print the inferred user profile to stderr first
        #[arg(long)]
        profile: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let connect = ConnectArgs::from(cli.global);

    match cli.command {
        Commands::Session => run_session(connect).await,
        Commands::Games { limit } => run_games(connect, limit).await,
        Commands::Fetch {
            kind,
            slot,
            position,
            messages,
            width,
            context,
            theme,
            timeout,
        } => {
            run_fetch(FetchArgs {
                connect,
                kind,
                slot,
                position,
                messages,
                width,
                context,
                theme,
                timeout_secs: timeout,
            })
            .await
        }
        Commands::Inject {
            description,
            frequency,
            fidelity,
            filters,
            messages,
            response,
            session_id,
            profile,
        } => {
            run_inject(InjectArgs {
                connect,
                description,
                frequency,
                fidelity,
                filters,
                messages,
                response,
                session_id,
                profile,
            })
            .await
        }
    }
}
