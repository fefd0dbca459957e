//! Subcommands of the gleaner CLI.

use super::*;

pub mod init;
pub mod scrape;
pub mod scrapers;

pub use init::init;
pub use scrape::{scrape, ScrapeArgs};
pub use scrapers::scrapers;

/// Available commands for the CLI
#[derive(Subcommand, Clone)]
pub enum Commands {
  /// Write the default configuration, preferences and scraper definitions
  Init {
    /// Overwrite existing files without asking
    #[arg(long)]
    force: bool,
  },

  /// List the configured scrapers by priority
  Scrapers,

  /// Scrape metadata for titles or JSON draft files
  Scrape(ScrapeArgs),
}
