//! Command line interface for the gleaner metadata scraper.
//!
//! This crate provides a CLI tool for enriching paper records using the `gleaner` library.
//! It supports operations like:
//! - Writing a default configuration directory
//! - Listing the configured scrapers and their priorities
//! - Scraping metadata for titles or JSON draft files
//!
//! # Usage
//!
//! ```bash
//! # Write the default configuration
//! gleaner init
//!
//! # Show the registered scrapers
//! gleaner scrapers
//!
//! # Scrape metadata for a title
//! gleaner scrape "Attention is all you need"
//!
//! # Re-scrape a set of drafts from one provider and store the result
//! gleaner scrape "drafts/*.json" --from crossref --store
//! ```
//!
//! The CLI provides colored output and interactive confirmations for destructive
//! operations. It also supports various verbosity levels for debugging through
//! the `-v` flag.

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use clap::{builder::ArgAction, Args, Parser, Subcommand};
use console::style;
use gleaner::{
  config::Config,
  orchestrator::{FailurePolicy, ScrapeReport},
  preference::ScraperPreference,
  prelude::*,
  sink::JsonFileSink,
  transport::HttpTransport,
};
use tracing::{debug, trace};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub mod commands;
pub mod error;
pub mod interaction;

use crate::{commands::*, error::*, interaction::*};

/// Command line interface configuration and argument parsing
#[derive(Parser)]
#[command(author, version, about = "CLI for the gleaner metadata scraper")]
pub struct Cli {
  /// Verbose mode (-v, -vv, -vvv) for different levels of logging detail
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity"
    )]
  verbose: u8,

  /// Path to the configuration directory. If not specified, uses the default platform-specific
  /// config directory.
  #[arg(long, short, global = true)]
  config: Option<PathBuf>,

  /// Write logs to daily rolling files in this directory instead of the terminal
  #[arg(long, global = true)]
  log_dir: Option<PathBuf>,

  /// The subcommand to execute
  #[command(subcommand)]
  command: Commands,

  /// Skip all prompts and accept defaults (mostly for testing)
  #[arg(long, hide = true, global = true)]
  accept_defaults: bool,
}

/// Configures the logging system based on the verbosity level
///
/// # Arguments
///
/// * `verbosity` - Number of times the verbose flag was used
/// * `log_dir` - Directory for rolling log files, logs go to the terminal when `None`
///
/// The verbosity levels are:
/// - 0: error (default)
/// - 1: warn
/// - 2: info
/// - 3: debug
/// - 4+: trace
///
/// The returned guard flushes the log file when dropped and must be held until exit.
fn setup_logging(verbosity: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
  let filter = match verbosity {
    0 => "error",
    1 => "warn",
    2 => "info",
    3 => "debug",
    _ => "trace",
  };

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
  let subscriber = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_file(true)
    .with_line_number(true)
    .with_thread_ids(true)
    .with_target(true);

  match log_dir {
    Some(dir) => {
      let appender = tracing_appender::rolling::daily(dir, "gleaner.log");
      let (writer, guard) = tracing_appender::non_blocking(appender);
      subscriber.with_writer(writer).with_ansi(false).init();
      Some(guard)
    },
    None => {
      subscriber.init();
      None
    },
  }
}

/// Entry point for the gleaner CLI application
///
/// Handles command line argument parsing, sets up logging, and executes
/// the requested command.
///
/// # Errors
///
/// Returns [`GleanerdError`] for various failure conditions including:
/// - Malformed configuration or preference files
/// - Unknown scraper names
/// - File system errors
/// - User interaction errors
#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  let _guard = setup_logging(cli.verbose, cli.log_dir.as_deref());

  let config_dir = cli.config.clone().unwrap_or_else(Config::default_path);
  trace!("Using configuration directory {}", config_dir.display());
  let terminal = Terminal::new(cli.accept_defaults);

  let result = match cli.command {
    Commands::Init { force } => init(&terminal, &config_dir, force),
    Commands::Scrapers => scrapers(&terminal, &config_dir),
    Commands::Scrape(args) => scrape(&terminal, &config_dir, args).await,
  };

  if let Err(error) = result {
    terminal.reply(ResponseContent::Error(&error))?;
    std::process::exit(1);
  }
  Ok(())
}
