use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

mod commands;
mod logging;
mod settings;

#[derive(Parser)]
#[command(name = "riya")]
#[command(about = "Riya - chat with your AI companion from the terminal", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every subcommand. They override config.toml and the
/// environment.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Path to config.toml
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Completion endpoint URL
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Guest message allowance
    #[arg(long, global = true, value_name = "N")]
    pub limit: Option<u32>,

    /// Keep the conversation in memory only
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Mirror logs to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chat REPL
    Chat {
        /// Resume this session id instead of the last one
        #[arg(long, value_name = "ID")]
        session: Option<String>,

        /// Start a fresh guest session
        #[arg(long, conflicts_with = "session")]
        new: bool,

        /// Chat as an already signed-in user
        #[arg(long, value_name = "USER_ID")]
        user: Option<String>,
    },
    /// Print the greeting for the current (or given) time
    Greeting {
        /// RFC 3339 timestamp to pick the greeting for
        #[arg(long, value_name = "TIME")]
        at: Option<String>,

        /// Use the welcome-back variant
        #[arg(long)]
        returning: bool,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set up your companion's persona
    Onboard,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = settings::Settings::load(&cli.global)?;
    let _log_guard = logging::init_logging(&settings.paths.logs_dir()?, cli.global.verbose)?;
    tracing::info!("[Bootstrap] riya {} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Chat { session, new, user } => {
            commands::chat::run(&settings, commands::chat::ChatArgs { session, new, user }).await?
        }
        Commands::Greeting {
            at,
            returning,
            json,
        } => commands::greeting::run(&settings, at.as_deref(), returning, json)?,
        Commands::Onboard => commands::onboard::run(&settings)?,
    }

    Ok(())
}
