use super::*;

const ARXIV_URL: &str = "https://export.arxiv.org/api/query?id_list=1706.03762&max_results=1";
const DBLP_URL: &str =
  "https://dblp.org/search/publ/api?q=Attention+is+All+you+Need&format=json&h=1";
const DBLP_MIRROR_URL: &str =
  "https://dblp.uni-trier.de/search/publ/api?q=Attention+is+All+you+Need&format=json&h=1";
const SEMANTIC_SCHOLAR_URL: &str = concat!(
  "https://api.semanticscholar.org/graph/v1/paper/search",
  "?query=Attention+is+All+you+Need&limit=1&fields=title,authors,year,venue,externalIds"
);
const CROSSREF_URL: &str =
  "https://api.crossref.org/works?query.bibliographic=Attention+is+All+you+Need&rows=1";

const ARXIV_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query: search_query=&amp;id_list=1706.03762</title>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All
      You Need</title>
    <author><name>Ashish Vaswani</name></author>
    <author><name>Noam Shazeer</name></author>
    <arxiv:doi>10.48550/arXiv.1706.03762</arxiv:doi>
  </entry>
</feed>"#;

const DBLP_HITS: &str = r#"{
  "result": {
    "hits": {
      "@total": "1",
      "hit": [{
        "info": {
          "authors": {"author": [
            {"@pid": "1", "text": "A. Vaswani"},
            {"@pid": "2", "text": "N. Shazeer"}
          ]},
          "title": "Attention is All you Need.",
          "venue": "NIPS",
          "year": "2017",
          "type": "Conference and Workshop Papers"
        }
      }]
    }
  }
}"#;

const CROSSREF_WORKS: &str = r#"{
  "message": {
    "items": [{
      "title": ["Attention is All you Need"],
      "container-title": ["Advances in Neural Information Processing Systems"],
      "type": "proceedings-article",
      "published": {"date-parts": [[2017]]},
      "DOI": "10.5555/3295222.3295349"
    }]
  }
}"#;

fn draft() -> EntityDraft {
  EntityDraft::with_title("Attention is All you Need").arxiv("1706.03762")
}

fn default_registry(transport: Arc<StaticTransport>) -> TestResult<ScraperRegistry> {
  Ok(ScraperRegistry::build(&TomlPreferences::defaults()?, &ProviderCatalog::builtin()?, transport))
}

#[tokio::test]
async fn builtin_providers_merge_by_priority() -> TestResult<()> {
  let transport = Arc::new(
    StaticTransport::new()
      .with_body(ARXIV_URL, ARXIV_FEED)
      .with_body(DBLP_URL, DBLP_HITS)
      .with_status(SEMANTIC_SCHOLAR_URL, 429),
  );
  let registry = default_registry(transport.clone())?;
  let orchestrator = Orchestrator::new(registry, Arc::new(SilentStatus));

  let report = orchestrator.scrape_all(vec![draft()]).await?;
  let merged = &report.drafts[0];

  assert_eq!(merged.title, "Attention is All you Need");
  assert_eq!(merged.authors, "Ashish Vaswani, Noam Shazeer");
  assert_eq!(merged.year, "2017");
  assert_eq!(merged.publication, "NIPS");
  assert_eq!(merged.pub_type, Some(PubType::Conference));
  assert_eq!(merged.doi.as_deref(), Some("10.48550/arXiv.1706.03762"));

  // openreview has no fixture (404), semanticscholar is rate limited, doi is ineligible.
  let mut failed: Vec<&str> =
    report.errors.iter().map(|failure| failure.provider.as_str()).collect();
  failed.sort_unstable();
  assert_eq!(failed, vec!["openreview", "semanticscholar"]);
  assert!(report.errors.iter().any(|failure| failure.error.is_rate_limited()));
  assert!(!transport.requests().iter().any(|target| target.starts_with("https://doi.org")));
  Ok(())
}

#[tokio::test]
async fn rate_limited_provider_uses_its_fallback_once() -> TestResult<()> {
  let transport = Arc::new(
    StaticTransport::new()
      .with_status(DBLP_URL, 429)
      .with_body(DBLP_MIRROR_URL, DBLP_HITS),
  );
  let registry = default_registry(transport.clone())?;
  let orchestrator = Orchestrator::new(registry, Arc::new(SilentStatus));

  let drafts = vec![EntityDraft::with_title("Attention is All you Need")];
  let report = orchestrator.scrape_from(drafts, "dblp").await?;
  assert_eq!(report.drafts[0].publication, "NIPS");
  assert!(report.errors.is_empty());
  assert_eq!(transport.requests(), vec![DBLP_URL.to_string(), DBLP_MIRROR_URL.to_string()]);
  Ok(())
}

#[tokio::test]
async fn rescraping_from_a_disabled_provider_replaces_values() -> TestResult<()> {
  let transport = Arc::new(StaticTransport::new().with_body(CROSSREF_URL, CROSSREF_WORKS));
  let orchestrator = Orchestrator::new(default_registry(transport)?, Arc::new(SilentStatus));

  let mut stale = EntityDraft::with_title("Attention is All you Need");
  stale.publication = "arXiv".into();
  let report = orchestrator.scrape_from(vec![stale], "crossref").await?;

  let merged = &report.drafts[0];
  assert_eq!(merged.publication, "Advances in Neural Information Processing Systems");
  assert_eq!(merged.doi.as_deref(), Some("10.5555/3295222.3295349"));
  assert_eq!(merged.pub_type, Some(PubType::Conference));
  Ok(())
}

#[tokio::test]
async fn non_matching_results_pass_through() -> TestResult<()> {
  let other_title = DBLP_HITS.replace("Attention is All you Need.", "Something Else Entirely");
  let transport = Arc::new(StaticTransport::new().with_body(DBLP_URL, other_title));
  let orchestrator = Orchestrator::new(default_registry(transport)?, Arc::new(SilentStatus));

  let input = EntityDraft::with_title("Attention is All you Need");
  let report = orchestrator.scrape_from(vec![input.clone()], "dblp").await?;
  assert_eq!(report.drafts[0], input);
  assert!(report.errors.is_empty());
  Ok(())
}

#[tokio::test]
async fn malformed_responses_are_failures() -> TestResult<()> {
  let transport =
    Arc::new(StaticTransport::new().with_body(DBLP_URL, "<html>Service Unavailable</html>"));
  let orchestrator = Orchestrator::new(default_registry(transport)?, Arc::new(SilentStatus));

  let drafts = vec![EntityDraft::with_title("Attention is All you Need")];
  let report = orchestrator.scrape_from(drafts, "dblp").await?;
  assert_eq!(report.errors.len(), 1);
  assert!(matches!(report.errors[0].error, GleanerError::Json(_)));
  Ok(())
}

#[tokio::test]
async fn unknown_provider_names_are_rejected() -> TestResult<()> {
  let orchestrator =
    Orchestrator::new(default_registry(Arc::new(StaticTransport::new()))?, Arc::new(SilentStatus));
  let result = orchestrator.scrape_from(vec![draft()], "googlescholar").await;
  assert!(matches!(result, Err(GleanerError::UnknownScraper(_))));
  Ok(())
}
