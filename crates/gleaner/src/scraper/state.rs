//! Per-draft state machine driving a [`Scraper`].

use super::*;

/// Where a single scrape of one draft currently stands.
///
/// ```text
/// Idle ──pre_process──▶ PreProcessed ──fetch──▶ Fetched ──parsing_process──▶ Parsed
///   └──(not eligible)──▶ Disabled
/// ```
///
/// `Parsed` and `Disabled` are terminal. The only suspension point is the `PreProcessed →
/// Fetched` transition.
#[derive(Debug, Clone)]
pub enum ScrapeState {
  /// Nothing has happened yet
  Idle,
  /// Eligible, with the request to send
  PreProcessed(ScrapeRequest),
  /// Response received, not yet merged
  Fetched(RawResponse),
  /// Finished with a new draft
  Parsed(EntityDraft),
  /// The provider declined to run
  Disabled,
}

impl ScrapeState {
  /// Whether no further transition is possible.
  pub fn is_terminal(&self) -> bool {
    matches!(self, ScrapeState::Parsed(_) | ScrapeState::Disabled)
  }

  /// Performs exactly one transition.
  ///
  /// Terminal states are returned unchanged.
  ///
  /// # Errors
  ///
  /// Returns the error of the stage that failed, or [`GleanerError::Timeout`] if the fetch
  /// exceeds the request's time budget.
  pub async fn advance<S>(self, scraper: &S, draft: &EntityDraft) -> Result<ScrapeState>
  where S: Scraper + ?Sized {
    match self {
      ScrapeState::Idle => {
        let request = scraper.pre_process(draft);
        if request.enable {
          trace!("{} eligible, target {}", scraper.name(), request.target);
          Ok(ScrapeState::PreProcessed(request))
        } else {
          trace!("{} not eligible for \"{}\"", scraper.name(), draft.title);
          Ok(ScrapeState::Disabled)
        }
      },
      ScrapeState::PreProcessed(request) => {
        debug!("Fetching from {} via: {}", scraper.name(), request.target);
        match tokio::time::timeout(request.timeout, scraper.fetch(&request)).await {
          Ok(response) => Ok(ScrapeState::Fetched(response?)),
          Err(_) => Err(GleanerError::Timeout {
            target: request.target.to_string(),
            after:  request.timeout,
          }),
        }
      },
      ScrapeState::Fetched(response) => {
        trace!("{} response: {}", scraper.name(), response.text());
        Ok(ScrapeState::Parsed(scraper.parsing_process(response, draft)?))
      },
      terminal => Ok(terminal),
    }
  }

  /// The resulting draft: the parsed one, or a copy of `input` when the provider did not run.
  pub fn into_draft(self, input: &EntityDraft) -> EntityDraft {
    match self {
      ScrapeState::Parsed(draft) => draft,
      _ => input.clone(),
    }
  }
}
