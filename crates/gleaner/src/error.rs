//! Error types for the gleaner library.
//!
//! This module provides the error type shared by every stage of the scraping pipeline:
//! - Transport failures (network, timeouts, rate limiting, bad status codes)
//! - Parse failures of malformed provider responses
//! - Configuration problems
//!
//! Note that a provider declining to run (an eligibility skip) is never an error.
//!
//! # Examples
//!
//! ```
//! use gleaner::error::GleanerError;
//!
//! fn is_worth_retrying_later(error: &GleanerError) -> bool {
//!   matches!(error, GleanerError::RateLimited { .. } | GleanerError::Timeout { .. })
//! }
//! ```

use thiserror::Error;

use super::*;

/// Error type alias used for the [`gleaner`](crate) crate.
pub type Result<T> = core::result::Result<T, GleanerError>;

/// Errors that can occur while scraping metadata.
///
/// Most variants are produced by a single provider and are captured by the
/// [`ChunkRunner`](crate::chunk::ChunkRunner) as a [`ScrapeFailure`] rather than aborting a batch.
#[derive(Error, Debug)]
pub enum GleanerError {
  /// A network request failed before a response was received.
  ///
  /// This can occur when:
  /// - The network is unavailable
  /// - The server is unreachable
  /// - TLS/SSL errors occur
  #[error(transparent)]
  Network(#[from] reqwest::Error),

  /// A fetch did not complete within its time budget.
  #[error("Request to {target} timed out after {after:?}")]
  Timeout {
    /// The URL or file that was being fetched
    target: String,
    /// The timeout that elapsed
    after:  Duration,
  },

  /// The provider refused the request because of rate limiting or bot detection.
  ///
  /// Produced for HTTP 429 and 403 responses, and for bodies containing one of a provider's
  /// configured blocked markers. Providers with an alternate endpoint retry once on this error.
  #[error("Rate limited by {target} (status {status})")]
  RateLimited {
    /// HTTP status code, or 200 when detected from the body
    status: u16,
    /// The URL that was being fetched
    target: String,
  },

  /// The provider answered with a non-success status code other than rate limiting.
  #[error("Request to {target} failed with status {status}")]
  HttpStatus {
    /// HTTP status code
    status: u16,
    /// The URL that was being fetched
    target: String,
  },

  /// A response could not be understood at all.
  ///
  /// A response that is well-formed but simply contains no match is not a parse failure; the
  /// draft is passed through unchanged instead.
  #[error("Failed to parse response: {0}")]
  Parse(String),

  /// JSON (de)serialization failed.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// A TOML configuration file could not be deserialized.
  #[error(transparent)]
  TomlDe(#[from] toml::de::Error),

  /// A file system operation failed.
  #[error(transparent)]
  Path(#[from] std::io::Error),

  /// The chunk runner was asked to run with a chunk size of zero.
  #[error("Chunk size must be at least 1")]
  InvalidChunkSize,

  /// A scraper was requested by name but is not present in the registry.
  #[error("No scraper named \"{0}\" is registered")]
  UnknownScraper(String),

  /// Generic configuration error.
  #[error("{0}")]
  Config(String),
}

/// A provider failure attributed to the draft it happened on.
///
/// The orchestrator wraps every per-item error in this type so the caller can report which
/// provider failed for which draft (e.g. "3 of 5 providers failed").
#[derive(Error, Debug)]
#[error("Scraper \"{provider}\" failed for draft {draft_index}: {error}")]
pub struct ScrapeFailure {
  /// Name of the provider that failed
  pub provider:    String,
  /// Position of the draft in the input batch
  pub draft_index: usize,
  /// The underlying error
  #[source]
  pub error:       GleanerError,
}

impl GleanerError {
  /// Whether this error indicates the provider is throttling us.
  pub fn is_rate_limited(&self) -> bool { matches!(self, Self::RateLimited { .. }) }
}
