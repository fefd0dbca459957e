use super::*;

fn orchestrator(scrapers: Vec<(f64, FixtureScraper)>) -> Orchestrator {
  let registry = scrapers.into_iter().fold(ScraperRegistry::new(), |registry, (priority, scraper)| {
    registry.with_scraper(preference(scraper.name, priority), Arc::new(scraper))
  });
  Orchestrator::new(registry, Arc::new(SilentStatus))
}

#[tokio::test]
async fn timeout_for_one_pair_keeps_everything_else() -> TestResult<()> {
  let a = FixtureScraper::new("a")
    .answer("D1", "Venue A1", 0)
    .answer("D2", "Venue A2", 5_000)
    .answer("D3", "Venue A3", 0);
  let b = FixtureScraper::new("b")
    .answer("D1", "Venue B1", 0)
    .answer("D2", "Venue B2", 0)
    .answer("D3", "Venue B3", 0);
  let orchestrator = orchestrator(vec![(9.0, a), (3.0, b)]);

  let drafts = ["D1", "D2", "D3"].map(EntityDraft::with_title).to_vec();
  let report = orchestrator.scrape_all(drafts).await?;

  assert_eq!(report.drafts.len(), 3);
  assert_eq!(report.drafts[0].publication, "Venue A1");
  assert_eq!(report.drafts[1].publication, "Venue B2");
  assert_eq!(report.drafts[2].publication, "Venue A3");

  assert_eq!(report.errors.len(), 1);
  let failure = &report.errors[0];
  assert_eq!(failure.provider, "a");
  assert_eq!(failure.draft_index, 1);
  assert!(matches!(failure.error, GleanerError::Timeout { .. }));
  assert!(failure.to_string().contains("timed out"));
  Ok(())
}

#[tokio::test]
async fn priority_decides_regardless_of_arrival_order() -> TestResult<()> {
  let a = FixtureScraper::new("a").answer("Neural Nets", "NeurIPS", 80);
  let b = FixtureScraper::new("b").answer("Neural Nets", "arXiv", 0);
  let orchestrator = orchestrator(vec![(9.0, a), (3.0, b)]);

  let report = orchestrator.scrape_all(vec![EntityDraft::with_title("Neural Nets")]).await?;
  assert_eq!(report.drafts[0].publication, "NeurIPS");
  assert!(report.errors.is_empty());
  Ok(())
}

#[tokio::test]
async fn in_flight_fetches_never_exceed_the_chunk_size() -> TestResult<()> {
  let in_flight = Arc::new(AtomicUsize::new(0));
  let peak = Arc::new(AtomicUsize::new(0));
  let titles: Vec<&'static str> =
    (0..25).map(|i| &*Box::leak(format!("paper {i}").into_boxed_str())).collect();

  let mut a = FixtureScraper::new("a").tracking(in_flight.clone(), peak.clone());
  let mut b = FixtureScraper::new("b").tracking(in_flight.clone(), peak.clone());
  for title in titles.iter().copied() {
    a = a.answer(title, "Venue A", 10);
    b = b.answer(title, "Venue B", 10);
  }
  let orchestrator = orchestrator(vec![(2.0, a), (1.0, b)]).with_chunk_size(7);

  let drafts = titles.iter().map(|title| EntityDraft::with_title(*title)).collect();
  let report = orchestrator.scrape_all(drafts).await?;

  assert_eq!(report.drafts.len(), 25);
  assert!(report.drafts.iter().all(|draft| draft.publication == "Venue A"));
  assert!(peak.load(Ordering::SeqCst) <= 7);
  assert!(peak.load(Ordering::SeqCst) > 1);
  Ok(())
}

#[tokio::test]
async fn ineligible_drafts_pass_through_without_errors() -> TestResult<()> {
  let a = FixtureScraper::new("a").answer("known", "Venue", 0);
  let orchestrator = orchestrator(vec![(9.0, a)]);

  let mut draft = EntityDraft::with_title("unknown").tag("inbox");
  draft.year = "1999".into();
  let report = orchestrator.scrape_all(vec![draft.clone()]).await?;

  assert_eq!(report.drafts, vec![draft]);
  assert!(report.errors.is_empty());
  Ok(())
}

#[tokio::test]
async fn empty_batches_are_a_no_op() -> TestResult<()> {
  let orchestrator = orchestrator(vec![(9.0, FixtureScraper::new("a"))]);
  let report = orchestrator.scrape_all(Vec::new()).await?;
  assert!(report.drafts.is_empty());
  assert!(report.errors.is_empty());
  Ok(())
}

#[tokio::test]
async fn pass_through_policy_counts_failures_but_changes_nothing() -> TestResult<()> {
  let a = FixtureScraper::new("a").answer("slow", "Venue", 5_000);
  let orchestrator = orchestrator(vec![(9.0, a)]).with_failure_policy(FailurePolicy::PassThrough);

  let report = orchestrator.scrape_all(vec![EntityDraft::with_title("slow")]).await?;
  assert_eq!(report.drafts[0], EntityDraft::with_title("slow"));
  assert_eq!(report.errors.len(), 1);
  Ok(())
}

#[tokio::test]
async fn status_reports_the_failure_count() -> TestResult<()> {
  let a = FixtureScraper::new("a").answer("D1", "Venue", 0).answer("D2", "Venue", 5_000);
  let (status, mut messages) = ChannelStatus::new();
  let registry = ScraperRegistry::new().with_scraper(preference("a", 9.0), Arc::new(a));
  let orchestrator = Orchestrator::new(registry, Arc::new(status));

  orchestrator.scrape_all(["D1", "D2"].map(EntityDraft::with_title).to_vec()).await?;

  let mut last = None;
  while let Ok(message) = messages.try_recv() {
    last = Some(message);
  }
  assert_eq!(last.as_deref(), Some("Scraped 2 entities with 1 provider failures"));
  Ok(())
}

#[tokio::test]
async fn scraped_drafts_reach_the_sink() -> TestResult<()> {
  let dir = tempdir()?;
  let sink = JsonFileSink::new(dir.path().join("library.json"));
  let a = FixtureScraper::new("a").answer("Neural Nets", "NeurIPS", 0);
  let orchestrator = orchestrator(vec![(9.0, a)]);

  let drafts = vec![EntityDraft::with_title("Neural Nets")];
  let report = orchestrator.scrape_and_store(drafts, &sink, true, true).await?;
  assert!(report.store_error.is_none());

  let stored = sink.load().await?;
  assert_eq!(stored.len(), 1);
  assert_eq!(stored[0].publication, "NeurIPS");
  Ok(())
}

#[tokio::test]
async fn a_failing_sink_does_not_change_the_drafts() -> TestResult<()> {
  struct Unwritable;

  #[async_trait]
  impl EntitySink for Unwritable {
    async fn update(&self, _drafts: &[EntityDraft], _is_create: bool, _merge: bool) -> Result<()> {
      Err(GleanerError::Config("read-only library".into()))
    }
  }

  let a = FixtureScraper::new("a").answer("Neural Nets", "NeurIPS", 0);
  let orchestrator = orchestrator(vec![(9.0, a)]);

  let drafts = vec![EntityDraft::with_title("Neural Nets")];
  let report = orchestrator.scrape_and_store(drafts.clone(), &Unwritable, true, false).await?;
  assert_eq!(report.drafts[0].publication, "NeurIPS");
  assert!(matches!(report.store_error, Some(GleanerError::Config(_))));

  // Re-scrapes are stored through the same step
  let rescraped = orchestrator.scrape_from(drafts, "a").await?;
  let report = orchestrator.store(rescraped, &Unwritable, true, true).await;
  assert_eq!(report.drafts[0].publication, "NeurIPS");
  assert!(matches!(report.store_error, Some(GleanerError::Config(_))));
  Ok(())
}
