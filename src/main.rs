pub mod api;
pub mod app;
pub mod cli;
pub mod clipboard;
pub mod command;
pub mod config;
pub mod event;
pub mod ui;

use app::App;
use clap::Parser;
use cli::{Cli, CliCommand};
use config::load_config;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    // Initialize tracing (logs to stderr if RUST_LOG is set).
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        // No subcommand or explicit `tui` → launch the interactive TUI.
        None | Some(CliCommand::Tui) => run_tui().await,
        // All other subcommands → non-interactive JSONL output.
        Some(cmd) => cli::run_command(cmd).await,
    }
}

/// Launch the interactive TUI.
async fn run_tui() -> color_eyre::Result<()> {
    let config = load_config();

    // Tolerate a client build failure; the TUI can still show help etc.
    let api_client = match cli::build_client(&config) {
        Ok(client) => {
            tracing::info!(api_base = %config.api_base, "client initialized");
            Some(client)
        }
        Err(e) => {
            tracing::warn!("client setup failed: {e}");
            eprintln!("Warning: {e}. Running without API access.");
            None
        }
    };

    let terminal = ratatui::init();
    let result = App::new(config, api_client).run(terminal).await;
    ratatui::restore();
    result
}
