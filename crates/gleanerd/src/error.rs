//! Error types for the gleaner CLI.

use thiserror::Error;

use super::*;

/// Type alias for Results with [`GleanerdError`]
pub type Result<T> = core::result::Result<T, GleanerdError>;

/// Errors that can occur while running a CLI command.
#[derive(Error, Debug)]
pub enum GleanerdError {
  /// An error raised by the scraping library.
  #[error(transparent)]
  Gleaner(#[from] GleanerError),

  /// A file system operation failed.
  #[error(transparent)]
  Io(#[from] std::io::Error),

  /// A draft file could not be read or written as JSON.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// A matched draft file could not be accessed.
  #[error(transparent)]
  Glob(#[from] glob::GlobError),

  /// A prompt could not be shown or answered.
  #[error(transparent)]
  Dialog(#[from] dialoguer::Error),

  /// The scrape command was run without any titles or files.
  #[error("Nothing to scrape: pass titles or paths of JSON draft files")]
  NoInput,
}
