//! Trivia Session - unified CLI
//!
//! Runs the HTTP session API or inspects the stored session.

#![warn(missing_docs)]

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;
use trivia_session::{AppConfig, CoordinatorOptions, SessionHandle, SqliteSessionStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,trivia_session=debug")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Command::Serve { port, host } => run_server(config, host, port).await,
        Command::Show => show_session(config).await,
        Command::Reset => reset_session(config).await,
    }
}

/// Opens the configured store and starts the coordinator.
#[instrument(skip(config), fields(db_path = %config.db_path()))]
fn start_coordinator(config: &AppConfig) -> Result<SessionHandle> {
    let store = SqliteSessionStore::open(config.db_path().clone())
        .context("Failed to open session database")?;
    let options = CoordinatorOptions::new(config.session_id().clone(), config.roster())
        .with_rules(*config.rules());
    let (handle, outcome) = SessionHandle::spawn(store, options)?;
    info!(?outcome, "Session loaded");

    let handle = match config.build_question_source()? {
        Some(source) => handle.with_question_source(source),
        None => handle,
    };
    Ok(handle)
}

/// Run the HTTP session API
async fn run_server(config: AppConfig, host: String, port: u16) -> Result<()> {
    info!("Starting trivia session API");
    let handle = start_coordinator(&config)?;
    let addr = format!("{}:{}", host, port);
    trivia_session::serve(handle, &addr)
        .await
        .with_context(|| format!("HTTP server on {} failed", addr))?;
    Ok(())
}

/// Print the stored session
async fn show_session(config: AppConfig) -> Result<()> {
    let handle = start_coordinator(&config)?;
    let session = handle.get_session().await?;
    println!("{}", serde_json::to_string_pretty(&session)?);
    Ok(())
}

/// Reset scores and question state
async fn reset_session(config: AppConfig) -> Result<()> {
    let handle = start_coordinator(&config)?;
    let session = handle.reset_session().await?;
    info!(session_id = %session.id(), "Session reset");
    for team in session.teams() {
        println!("{}\t{}\t{}", team.id(), team.name(), team.score());
    }
    Ok(())
}
