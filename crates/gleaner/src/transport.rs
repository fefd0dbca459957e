//! Network and file transport for the fetch stage.
//!
//! A [`Transport`] turns a [`ScrapeRequest`] into a [`RawResponse`] and classifies failures:
//!
//! - HTTP 429 and 403 become [`GleanerError::RateLimited`], since providers use both to throttle
//! - Any other non-success status becomes [`GleanerError::HttpStatus`]
//! - An elapsed timeout becomes [`GleanerError::Timeout`]
//!
//! [`HttpTransport`] is the real implementation. [`StaticTransport`] serves canned responses and is
//! what the test suites use, so nothing in them touches the network.

use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Mutex,
};

use reqwest::{Client, StatusCode};

use super::*;

/// User agent sent when a provider does not configure its own.
pub const USER_AGENT: &str = concat!("gleaner/", env!("CARGO_PKG_VERSION"));

/// Performs the I/O of the fetch stage.
#[async_trait]
pub trait Transport: Send + Sync {
  /// Fetches the request's target.
  async fn fetch(&self, request: &ScrapeRequest) -> Result<RawResponse>;
}

/// Transport backed by a shared [`reqwest::Client`] and the local file system.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
  /// Shared connection pool
  client: Client,
}

impl HttpTransport {
  /// Creates a transport with a fresh connection pool.
  pub fn new() -> Self { Self::default() }

  /// Creates a transport reusing an existing client.
  pub fn with_client(client: Client) -> Self { Self { client } }

  /// Sends a GET request and classifies the response status.
  async fn get(&self, url: &str, request: &ScrapeRequest) -> Result<RawResponse> {
    let mut builder = self.client.get(url).timeout(request.timeout);
    if !request.headers.keys().any(|key| key.eq_ignore_ascii_case("user-agent")) {
      builder = builder.header(reqwest::header::USER_AGENT, USER_AGENT);
    }
    for (key, value) in &request.headers {
      builder = builder.header(key, value);
    }

    let response = builder.send().await.map_err(|e| classify_reqwest(e, url, request))?;
    let status = response.status();
    check_status(status, url)?;

    let body = response.bytes().await.map_err(|e| classify_reqwest(e, url, request))?;
    Ok(RawResponse::new(url, status.as_u16(), body.to_vec()))
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn fetch(&self, request: &ScrapeRequest) -> Result<RawResponse> {
    let fetch = async {
      match &request.target {
        Target::Url(url) => self.get(url, request).await,
        Target::File(path) => {
          let body = tokio::fs::read(path).await?;
          Ok(RawResponse::new(path.display().to_string(), 200, body))
        },
        Target::Nowhere => Err(GleanerError::Config("Request has no target to fetch".into())),
      }
    };

    tokio::time::timeout(request.timeout, fetch).await.unwrap_or_else(|_| {
      Err(GleanerError::Timeout { target: request.target.to_string(), after: request.timeout })
    })
  }
}

/// Maps HTTP status codes onto the error taxonomy.
fn check_status(status: StatusCode, target: &str) -> Result<()> {
  match status {
    StatusCode::TOO_MANY_REQUESTS | StatusCode::FORBIDDEN =>
      Err(GleanerError::RateLimited { status: status.as_u16(), target: target.to_string() }),
    status if !status.is_success() =>
      Err(GleanerError::HttpStatus { status: status.as_u16(), target: target.to_string() }),
    _ => Ok(()),
  }
}

/// Turns reqwest's own timeout into [`GleanerError::Timeout`] so callers see one kind of timeout.
fn classify_reqwest(error: reqwest::Error, target: &str, request: &ScrapeRequest) -> GleanerError {
  if error.is_timeout() {
    GleanerError::Timeout { target: target.to_string(), after: request.timeout }
  } else {
    GleanerError::Network(error)
  }
}

/// A canned reply served by [`StaticTransport`].
#[derive(Debug, Clone)]
struct StaticReply {
  /// Status code to answer with
  status: u16,
  /// Body to answer with
  body:   Vec<u8>,
  /// Artificial latency
  delay:  Duration,
}

/// Offline transport answering from a fixed table of targets.
///
/// Unknown targets answer 404. Every request is recorded, which makes it easy to assert what a
/// scraper asked for.
///
/// # Examples
///
/// ```
/// use gleaner::{prelude::*, scraper::ScrapeRequest, transport::StaticTransport};
///
/// # async fn example() -> Result<(), GleanerError> {
/// let transport = StaticTransport::new().with_body("https://api.test/paper", r#"{"title": "x"}"#);
/// let response = transport.fetch(&ScrapeRequest::url("https://api.test/paper")).await?;
/// assert_eq!(response.text(), r#"{"title": "x"}"#);
/// assert_eq!(transport.requests(), vec!["https://api.test/paper".to_string()]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct StaticTransport {
  /// Replies keyed by rendered target
  replies:  HashMap<String, StaticReply>,
  /// Targets requested so far, in order
  requests: Mutex<Vec<String>>,
  /// Number of requests served
  count:    AtomicUsize,
}

impl StaticTransport {
  /// Creates a transport with no replies.
  pub fn new() -> Self { Self::default() }

  /// Answers `target` with status 200 and `body`.
  pub fn with_body(self, target: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
    self.with_reply(target, 200, body, Duration::ZERO)
  }

  /// Answers `target` with an empty body and `status`.
  pub fn with_status(self, target: impl Into<String>, status: u16) -> Self {
    self.with_reply(target, status, Vec::new(), Duration::ZERO)
  }

  /// Answers `target` with `body` after sleeping for `delay`.
  pub fn with_delayed_body(
    self,
    target: impl Into<String>,
    body: impl Into<Vec<u8>>,
    delay: Duration,
  ) -> Self {
    self.with_reply(target, 200, body, delay)
  }

  /// Shared builder.
  fn with_reply(
    mut self,
    target: impl Into<String>,
    status: u16,
    body: impl Into<Vec<u8>>,
    delay: Duration,
  ) -> Self {
    self.replies.insert(target.into(), StaticReply { status, body: body.into(), delay });
    self
  }

  /// Every target requested so far.
  pub fn requests(&self) -> Vec<String> {
    self.requests.lock().map(|requests| requests.clone()).unwrap_or_default()
  }

  /// Number of requests served so far.
  pub fn request_count(&self) -> usize { self.count.load(Ordering::SeqCst) }
}

#[async_trait]
impl Transport for StaticTransport {
  async fn fetch(&self, request: &ScrapeRequest) -> Result<RawResponse> {
    let target = request.target.to_string();
    self.count.fetch_add(1, Ordering::SeqCst);
    if let Ok(mut requests) = self.requests.lock() {
      requests.push(target.clone());
    }

    let Some(reply) = self.replies.get(&target).cloned() else {
      return Err(GleanerError::HttpStatus { status: 404, target });
    };
    if !reply.delay.is_zero() {
      tokio::time::sleep(reply.delay).await;
    }

    let status = StatusCode::from_u16(reply.status)
      .map_err(|e| GleanerError::Config(format!("Invalid canned status: {e}")))?;
    check_status(status, &target)?;
    Ok(RawResponse::new(target, reply.status, reply.body))
  }
}
