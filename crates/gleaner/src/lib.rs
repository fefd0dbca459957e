//! Concurrent metadata scraping for academic paper libraries.
//!
//! `gleaner` takes partially known paper records ("drafts") and enriches them by querying an
//! ordered, configurable set of external metadata providers. It provides:
//!
//! - A draft model for in-flight paper metadata
//! - A bounded, failure-isolating concurrent runner
//! - A three-stage scraper contract with an explicit state machine
//! - Declaratively configured providers for JSON and XML metadata APIs
//! - A registry built from user preferences
//! - An orchestrator that merges provider results by priority
//!
//! # Features
//!
//! - **Partial-failure tolerance**: one provider timing out never costs you the fields other
//!   providers found
//! - **Bounded concurrency**: work is dispatched in chunks so external services are not flooded
//! - **Deterministic merging**: conflicting values are resolved by provider priority, regardless
//!   of which response arrived first
//! - **Built-in providers**: arXiv, DOI, DBLP, Semantic Scholar, Crossref and OpenReview ship as
//!   TOML definitions
//!
//! # Getting Started
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gleaner::{
//!   draft::EntityDraft,
//!   orchestrator::Orchestrator,
//!   preference::TomlPreferences,
//!   provider::ProviderCatalog,
//!   registry::ScraperRegistry,
//!   status::TracingStatus,
//!   transport::HttpTransport,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!   let transport = Arc::new(HttpTransport::new());
//!   let registry = ScraperRegistry::build(
//!     &TomlPreferences::defaults()?,
//!     &ProviderCatalog::builtin()?,
//!     transport,
//!   );
//!
//!   let orchestrator = Orchestrator::new(registry, Arc::new(TracingStatus));
//!   let drafts = vec![EntityDraft::with_title("Attention is all you need")];
//!   let report = orchestrator.scrape_all(drafts).await?;
//!
//!   println!("Venue: {}", report.drafts[0].publication);
//!   println!("{} provider failures", report.errors.len());
//!   Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`draft`]: The in-flight paper record and its fields
//! - [`chunk`]: Chunked concurrent runner
//! - [`scraper`]: The scraper contract and its state machine
//! - [`provider`]: Declaratively configured scrapers
//! - [`registry`]: Ordered collection of scrapers built from preferences
//! - [`merge`]: Priority-based merge policy
//! - [`orchestrator`]: Drives everything for a batch of drafts
//! - [`preference`], [`status`], [`sink`], [`transport`]: Collaborator interfaces
//! - [`prelude`]: Common traits and types for ergonomic imports

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::{
  collections::{BTreeMap, BTreeSet, HashMap},
  fmt::Display,
  path::{Path, PathBuf},
  str::FromStr,
  sync::Arc,
  time::Duration,
};

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
#[cfg(test)]
use {tempfile::tempdir, tracing_test::traced_test};

pub mod chunk;
pub mod config;
pub mod draft;
pub mod error;
pub mod merge;
pub mod orchestrator;
pub mod preference;
pub mod provider;
pub mod registry;
pub mod scraper;
pub mod sink;
pub mod status;
pub mod transport;

use crate::{
  draft::*, error::*, preference::*, provider::*, registry::*, scraper::*, status::*, transport::*,
};

/// Common traits and types for ergonomic imports.
///
/// # Usage
///
/// ```no_run
/// use gleaner::prelude::*;
///
/// fn describe(scraper: &dyn Scraper) -> String { scraper.name().to_string() }
/// ```
pub mod prelude {
  pub use crate::{
    draft::{DraftField, EntityDraft, PubType},
    error::GleanerError,
    preference::PreferenceStore,
    scraper::Scraper,
    sink::EntitySink,
    status::StatusReporter,
    transport::Transport,
  };
}
