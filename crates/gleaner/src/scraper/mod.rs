//! The scraper contract.
//!
//! A scraper wraps one external metadata provider and goes through three stages for every draft:
//!
//! 1. [`Scraper::pre_process`]: pure eligibility check plus request construction, no I/O
//! 2. [`Scraper::fetch`]: the only stage that touches the network or disk, bounded by a timeout
//! 3. [`Scraper::parsing_process`]: pure merge of the response into a *copy* of the draft
//!
//! [`Scraper::scrape`] composes the three through the explicit [`ScrapeState`] machine, so every
//! suspension point and failure boundary is visible in one place. A scraper that declines to run
//! hands back the draft unchanged; that is not an error.
//!
//! # Examples
//!
//! ```
//! use gleaner::{
//!   error::Result,
//!   prelude::*,
//!   scraper::{RawResponse, ScrapeRequest},
//! };
//!
//! struct Shouting;
//!
//! #[async_trait::async_trait]
//! impl Scraper for Shouting {
//!   fn name(&self) -> &str { "shouting" }
//!
//!   fn pre_process(&self, draft: &EntityDraft) -> ScrapeRequest {
//!     ScrapeRequest::url("https://example.org").enabled(!draft.title.is_empty())
//!   }
//!
//!   async fn fetch(&self, request: &ScrapeRequest) -> Result<RawResponse> {
//!     Ok(RawResponse::new(request.target.to_string(), 200, b"".to_vec()))
//!   }
//!
//!   fn parsing_process(&self, _raw: RawResponse, draft: &EntityDraft) -> Result<EntityDraft> {
//!     let mut draft = draft.clone();
//!     draft.title = draft.title.to_uppercase();
//!     Ok(draft)
//!   }
//! }
//! ```

use super::*;

mod state;

pub use state::*;

/// Time budget of a fetch when the provider does not configure one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// One external metadata provider.
///
/// Implementations are values registered in a [`ScraperRegistry`]; there is no deeper hierarchy
/// than this trait.
#[async_trait]
pub trait Scraper: Send + Sync {
  /// Unique provider name, matching its preference entry.
  fn name(&self) -> &str;

  /// Decides whether this provider should run for `draft` and computes the request.
  ///
  /// Must be a pure function of the draft and the scraper's configuration.
  fn pre_process(&self, draft: &EntityDraft) -> ScrapeRequest;

  /// Performs the I/O described by `request`.
  async fn fetch(&self, request: &ScrapeRequest) -> Result<RawResponse>;

  /// Merges the fields found in `raw` into a copy of `draft`.
  ///
  /// Return the draft unchanged when the response merely contains no match; reserve errors for
  /// responses that cannot be understood at all.
  fn parsing_process(&self, raw: RawResponse, draft: &EntityDraft) -> Result<EntityDraft>;

  /// Runs all stages for `draft`.
  ///
  /// The fetch stage is bounded by [`ScrapeRequest::timeout`] whatever the implementation of
  /// [`Scraper::fetch`] does.
  async fn scrape(&self, draft: &EntityDraft) -> Result<EntityDraft> {
    let mut state = ScrapeState::Idle;
    while !state.is_terminal() {
      state = state.advance(self, draft).await?;
    }
    Ok(state.into_draft(draft))
  }
}

/// Where a request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
  /// An HTTP(S) endpoint
  Url(String),
  /// A local file
  File(PathBuf),
  /// Nothing to fetch, used by disabled requests
  Nowhere,
}

/// Output of [`Scraper::pre_process`].
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
  /// Primary location to fetch
  pub target:   Target,
  /// Alternate location, tried once if the primary one rate limits us
  pub fallback: Option<Target>,
  /// Request headers, including any credentials
  pub headers:  BTreeMap<String, String>,
  /// Whether the provider is eligible to run
  pub enable:   bool,
  /// Time budget of the fetch stage
  pub timeout:  Duration,
}

/// Output of [`Scraper::fetch`].
#[derive(Debug, Clone)]
pub struct RawResponse {
  /// Location the body was read from
  pub target: String,
  /// HTTP status code, 200 for files
  pub status: u16,
  /// Raw body bytes
  pub body:   Vec<u8>,
}

impl Display for Target {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Target::Url(url) => write!(f, "{url}"),
      Target::File(path) => write!(f, "{}", path.display()),
      Target::Nowhere => write!(f, "<nowhere>"),
    }
  }
}

impl ScrapeRequest {
  /// An enabled request for `url` with the default timeout and no headers.
  pub fn url(url: impl Into<String>) -> Self { Self::targeting(Target::Url(url.into())) }

  /// An enabled request for a local file.
  pub fn file(path: impl Into<PathBuf>) -> Self { Self::targeting(Target::File(path.into())) }

  /// A request that marks the provider as ineligible.
  pub fn disabled() -> Self { Self { enable: false, ..Self::targeting(Target::Nowhere) } }

  /// Shared constructor.
  fn targeting(target: Target) -> Self {
    Self {
      target,
      fallback: None,
      headers: BTreeMap::new(),
      enable: true,
      timeout: DEFAULT_TIMEOUT,
    }
  }

  /// Sets eligibility.
  pub fn enabled(mut self, enable: bool) -> Self {
    self.enable = enable;
    self
  }

  /// Adds a header.
  pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.insert(key.into(), value.into());
    self
  }

  /// Sets the fetch timeout.
  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Sets the alternate target used after rate limiting.
  pub fn fallback(mut self, target: Target) -> Self {
    self.fallback = Some(target);
    self
  }

  /// A copy of this request aimed at its fallback target, if it has one.
  pub fn to_fallback(&self) -> Option<ScrapeRequest> {
    self
      .fallback
      .clone()
      .map(|target| ScrapeRequest { target, fallback: None, ..self.clone() })
  }
}

impl RawResponse {
  /// Creates a response.
  pub fn new(target: impl Into<String>, status: u16, body: Vec<u8>) -> Self {
    Self { target: target.into(), status, body }
  }

  /// The body decoded as UTF-8, replacing invalid sequences.
  pub fn text(&self) -> String { String::from_utf8_lossy(&self.body).into_owned() }

  /// Whether the body holds nothing but whitespace.
  pub fn is_blank(&self) -> bool { self.body.iter().all(u8::is_ascii_whitespace) }
}
