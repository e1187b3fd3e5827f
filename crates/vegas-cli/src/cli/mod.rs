//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use vegas_core::config;

mod commands;

#[derive(Parser)]
#[command(name = "vegas")]
#[command(version = "0.1")]
#[command(about = "Casino games platform terminal client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in with a provider-issued identity credential
    Login {
        /// Identity credential (prompted on stdin if omitted)
        #[arg(long, value_name = "TOKEN")]
        credential: Option<String>,
    },

    /// Sign out and clear the stored session
    Logout,

    /// Show the current account balance
    Balance,

    /// Show the stored session state (local only)
    Status,

    /// Play slot machine rounds against the fetched balance
    Spin {
        /// Bet per round (default from config)
        #[arg(long)]
        bet: Option<i64>,

        /// Number of rounds to play
        #[arg(long, default_value_t = 1)]
        rounds: u32,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

/// Logging goes to stderr and is off unless RUST_LOG says otherwise; stdout
/// belongs to command output.
fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = config::Config::load().context("load config")?;

    match cli.command {
        Commands::Login { credential } => commands::auth::login(&config, credential).await,
        Commands::Logout => commands::auth::logout(&config).await,
        Commands::Balance => commands::account::balance(&config).await,
        Commands::Status => commands::auth::status(),
        Commands::Spin { bet, rounds } => commands::slots::spin(&config, bet, rounds).await,

        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
    }
}
