//! docsync CLI - Command-line interface for docsync
//!
//! Provides commands for:
//! - Signing in to the remote repository
//! - Viewing synchronisation status
//! - Listing, reading, writing and deleting documents

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use docsync_core::config::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    auth::AuthCommand,
    documents::{GetCommand, ListCommand, PutCommand, RmCommand},
    status::StatusCommand,
    Session,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "docsync",
    version,
    about = "Synchronise documents with a GitHub repository"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Work against an empty in-memory repository instead of the remote
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Authentication commands
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Show synchronisation status
    Status(StatusCommand),
    /// List document summaries
    List(ListCommand),
    /// Print a document
    Get(GetCommand),
    /// Save a local document file
    Put(PutCommand),
    /// Delete a document
    Rm(RmCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path);

    // Setup tracing
    let filter = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = OutputFormat::from_flag(cli.json);
    let session = Session::new(config, cli.offline);

    match cli.command {
        Commands::Auth(cmd) => cmd.execute(&session, format).await,
        Commands::Status(cmd) => cmd.execute(&session, format).await,
        Commands::List(cmd) => cmd.execute(&session, format).await,
        Commands::Get(cmd) => cmd.execute(&session, format).await,
        Commands::Put(cmd) => cmd.execute(&session, format).await,
        Commands::Rm(cmd) => cmd.execute(&session, format).await,
    }
}
