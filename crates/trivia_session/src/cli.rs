//! Command-line interface for trivia_session.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Trivia Session - host-driven trivia game coordinator
#[derive(Parser, Debug)]
#[command(name = "trivia_session")]
#[command(about = "Durable session coordinator for host-driven trivia games", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML config file (defaults are used if it does not exist)
    #[arg(short, long, global = true, default_value = "trivia_session.toml")]
    pub config: PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP session API
    Serve {
        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Print the stored session as JSON
    Show,

    /// Zero all scores and clear the current question
    Reset,
}
