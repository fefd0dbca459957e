//! Drives the registry's scrapers over a batch of drafts.
//!
//! For every draft, every enabled provider runs concurrently on its own copy of the draft, with at
//! most `chunk_size` fetches in flight across the whole batch. Provider failures are collected,
//! never propagated, and the surviving outputs are merged per draft by priority (see
//! [`merge`](crate::merge)).
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use gleaner::{
//!   draft::EntityDraft, orchestrator::Orchestrator, registry::ScraperRegistry,
//!   status::SilentStatus,
//! };
//!
//! # async fn example() -> Result<(), gleaner::error::GleanerError> {
//! let orchestrator = Orchestrator::new(ScraperRegistry::new(), Arc::new(SilentStatus));
//!
//! // With nothing enabled every draft passes through unchanged.
//! let report = orchestrator.scrape_all(vec![EntityDraft::with_title("Neural Nets")]).await?;
//! assert_eq!(report.drafts[0].title, "Neural Nets");
//! assert!(report.errors.is_empty());
//! # Ok(())
//! # }
//! ```

use super::*;
use crate::{
  chunk::{ChunkOutcome, ChunkRunner, StopHandle, DEFAULT_CHUNK_SIZE},
  merge::{merge_outputs, ExistingValues},
  sink::EntitySink,
};

/// What fills a work item's slot when its provider fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
  /// The failed provider contributes nothing
  #[default]
  Skip,
  /// The slot receives the unchanged input draft, which also contributes nothing to the merge
  PassThrough,
}

/// Result of scraping a batch.
#[derive(Debug, Default)]
pub struct ScrapeReport {
  /// Merged drafts, in input order
  pub drafts:      Vec<EntityDraft>,
  /// One entry per failed (draft, provider) pair
  pub errors:      Vec<ScrapeFailure>,
  /// Whether a stop request cut the run short
  pub stopped:     bool,
  /// Error returned by the persistence collaborator, if any
  pub store_error: Option<GleanerError>,
}

/// Scrapes batches of drafts with the scrapers of a registry.
pub struct Orchestrator {
  /// Available scrapers
  registry:   ScraperRegistry,
  /// Progress sink
  status:     Arc<dyn StatusReporter>,
  /// Maximum number of work items in flight
  chunk_size: usize,
  /// What to do with failed work items
  policy:     FailurePolicy,
  /// Optional cancellation flag, checked between chunks
  stop:       Option<StopHandle>,
}

impl ScrapeReport {
  /// Number of drafts for which at least one provider failed.
  pub fn drafts_with_failures(&self) -> usize {
    self.errors.iter().map(|failure| failure.draft_index).collect::<BTreeSet<_>>().len()
  }
}

impl Orchestrator {
  /// Creates an orchestrator with the default chunk size and [`FailurePolicy::Skip`].
  pub fn new(registry: ScraperRegistry, status: Arc<dyn StatusReporter>) -> Self {
    Self {
      registry,
      status,
      chunk_size: DEFAULT_CHUNK_SIZE,
      policy: FailurePolicy::default(),
      stop: None,
    }
  }

  /// Sets the number of work items dispatched at once.
  ///
  /// Zero is rejected with [`GleanerError::InvalidChunkSize`] when scraping.
  pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
    self.chunk_size = chunk_size;
    self
  }

  /// Sets the failure policy.
  pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
    self.policy = policy;
    self
  }

  /// Attaches a stop handle; remaining chunks are skipped once it is triggered.
  pub fn with_stop(mut self, stop: StopHandle) -> Self {
    self.stop = Some(stop);
    self
  }

  /// The registry this orchestrator draws scrapers from.
  pub fn registry(&self) -> &ScraperRegistry { &self.registry }

  /// Scrapes every draft with every enabled provider.
  ///
  /// Values already present in the drafts are kept; providers only fill empty fields, the
  /// highest priority provider winning.
  ///
  /// # Errors
  ///
  /// Only fails for an invalid chunk size. Provider failures are reported in
  /// [`ScrapeReport::errors`].
  pub async fn scrape_all(&self, drafts: Vec<EntityDraft>) -> Result<ScrapeReport> {
    let providers: Vec<RegisteredScraper> = self.registry.enabled().into_iter().cloned().collect();
    self.run(drafts, providers, ExistingValues::Keep).await
  }

  /// Re-scrapes every draft with one named provider, whether or not it is enabled.
  ///
  /// Unlike [`Orchestrator::scrape_all`], values found by the provider replace existing ones.
  ///
  /// # Errors
  ///
  /// Returns [`GleanerError::UnknownScraper`] if no scraper of that name is registered.
  pub async fn scrape_from(&self, drafts: Vec<EntityDraft>, name: &str) -> Result<ScrapeReport> {
    let provider = self
      .registry
      .get(name)
      .cloned()
      .ok_or_else(|| GleanerError::UnknownScraper(name.to_string()))?;
    self.run(drafts, vec![provider], ExistingValues::Replace).await
  }

  /// Scrapes every draft and hands the result to `sink`.
  ///
  /// A failing sink does not change the merged drafts; its error is returned in
  /// [`ScrapeReport::store_error`].
  pub async fn scrape_and_store(
    &self,
    drafts: Vec<EntityDraft>,
    sink: &dyn EntitySink,
    is_create: bool,
    merge_existing: bool,
  ) -> Result<ScrapeReport> {
    let report = self.scrape_all(drafts).await?;
    Ok(self.store(report, sink, is_create, merge_existing).await)
  }

  /// Hands the drafts of a finished scrape to `sink`.
  ///
  /// The drafts are returned unchanged either way; a sink error ends up in
  /// [`ScrapeReport::store_error`].
  pub async fn store(
    &self,
    mut report: ScrapeReport,
    sink: &dyn EntitySink,
    is_create: bool,
    merge_existing: bool,
  ) -> ScrapeReport {
    match sink.update(&report.drafts, is_create, merge_existing).await {
      Ok(()) => debug!("Stored {} scraped drafts", report.drafts.len()),
      Err(error) => {
        warn!("Failed to store {} scraped drafts: {}", report.drafts.len(), error);
        report.store_error = Some(error);
      },
    }
    report
  }

  /// Runs `providers` over `drafts` and merges the outputs.
  async fn run(
    &self,
    drafts: Vec<EntityDraft>,
    providers: Vec<RegisteredScraper>,
    existing: ExistingValues,
  ) -> Result<ScrapeReport> {
    let mut runner = ChunkRunner::new(self.chunk_size)?;
    if let Some(stop) = &self.stop {
      runner = runner.with_stop(stop.clone());
    }
    if drafts.is_empty() || providers.is_empty() {
      debug!("Nothing to scrape: {} drafts, {} providers", drafts.len(), providers.len());
      return Ok(ScrapeReport { drafts, ..ScrapeReport::default() });
    }

    debug!("Scraping {} drafts with {} providers", drafts.len(), providers.len());
    for provider in &providers {
      self.status.set_status(&format!("Scraping metadata from {} ...", provider.name()));
    }

    let items: Vec<(usize, usize)> =
      (0..drafts.len()).flat_map(|d| (0..providers.len()).map(move |p| (d, p))).collect();

    let op = |(d, p): (usize, usize)| {
      let draft = &drafts[d];
      let provider = &providers[p];
      async move {
        provider.scraper.scrape(draft).await.map_err(|error| ScrapeFailure {
          provider: provider.name().to_string(),
          draft_index: d,
          error,
        })
      }
    };

    let outcome: ChunkOutcome<EntityDraft, ScrapeFailure> = match self.policy {
      FailurePolicy::Skip => runner.run(items, op).await,
      FailurePolicy::PassThrough => {
        let fallback = |(d, _): (usize, usize)| {
          let draft = drafts[d].clone();
          async move { draft }
        };
        runner.run_with_fallback(items, op, fallback).await
      },
    };

    for failure in &outcome.errors {
      warn!("{}", failure);
    }

    let mut results = outcome.results.into_iter();
    let merged: Vec<EntityDraft> = drafts
      .iter()
      .map(|draft| {
        let outputs: Vec<(f64, EntityDraft)> = providers
          .iter()
          .filter_map(|provider| {
            results.next().flatten().map(|output| (provider.priority(), output))
          })
          .collect();
        merge_outputs(draft, outputs, existing)
      })
      .collect();

    self.status.set_status(&format!(
      "Scraped {} entities with {} provider failures",
      merged.len(),
      outcome.errors.len()
    ));

    Ok(ScrapeReport {
      drafts:      merged,
      errors:      outcome.errors,
      stopped:     outcome.stopped,
      store_error: None,
    })
  }
}
