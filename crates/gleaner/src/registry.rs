//! The set of available scrapers and their preferences.
//!
//! A [`ScraperRegistry`] is built once per orchestration run from a [`PreferenceStore`] and a
//! [`ProviderCatalog`], and is read-only afterwards.

use super::*;

/// A scraper paired with the preference entry it was built from.
#[derive(Clone)]
pub struct RegisteredScraper {
  /// The scraper's configuration entry
  pub preference: ScraperPreference,
  /// The scraper itself
  pub scraper:    Arc<dyn Scraper>,
}

/// Scrapers keyed by unique name.
#[derive(Clone, Default)]
pub struct ScraperRegistry {
  /// Registered scrapers keyed by preference name
  scrapers: BTreeMap<String, RegisteredScraper>,
}

impl RegisteredScraper {
  /// The scraper's name.
  pub fn name(&self) -> &str { &self.preference.name }

  /// The scraper's merge priority.
  pub fn priority(&self) -> f64 { self.preference.priority }
}

impl std::fmt::Debug for RegisteredScraper {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RegisteredScraper")
      .field("preference", &self.preference)
      .field("scraper", &self.scraper.name())
      .finish()
  }
}

impl std::fmt::Debug for ScraperRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_list().entries(self.scrapers.values()).finish()
  }
}

impl ScraperRegistry {
  /// Creates an empty registry.
  pub fn new() -> Self { Self::default() }

  /// Builds configured scrapers for every preference entry.
  ///
  /// Entries of built-in providers are matched with their definition in `catalog`; custom entries
  /// carry their TOML definition in `scrape_impl_code`. Entries without a usable definition are
  /// logged and skipped, and malformed entries end up registered but disabled. Daily request
  /// limits are counted in memory; see [`ScraperRegistry::build_with_usage`].
  ///
  /// # Examples
  ///
  /// ```
  /// use std::sync::Arc;
  ///
  /// use gleaner::{
  ///   preference::TomlPreferences, provider::ProviderCatalog, registry::ScraperRegistry,
  ///   transport::StaticTransport,
  /// };
  ///
  /// let registry = ScraperRegistry::build(
  ///   &TomlPreferences::defaults().unwrap(),
  ///   &ProviderCatalog::builtin().unwrap(),
  ///   Arc::new(StaticTransport::new()),
  /// );
  /// let enabled: Vec<&str> = registry.enabled().iter().map(|s| s.name()).collect();
  /// assert_eq!(enabled, vec!["arxiv", "doi", "dblp", "openreview", "semanticscholar"]);
  /// ```
  pub fn build(
    preferences: &dyn PreferenceStore,
    catalog: &ProviderCatalog,
    transport: Arc<dyn Transport>,
  ) -> Self {
    Self::build_with_usage(preferences, catalog, transport, Arc::new(UsageLedger::in_memory()))
  }

  /// [`ScraperRegistry::build`] counting daily request limits in `ledger`, which every scraper of
  /// the registry shares.
  pub fn build_with_usage(
    preferences: &dyn PreferenceStore,
    catalog: &ProviderCatalog,
    transport: Arc<dyn Transport>,
    ledger: Arc<UsageLedger>,
  ) -> Self {
    let mut registry = Self::new();
    for preference in preferences.scraper_preferences() {
      let definition = if preference.custom {
        match ScraperDefinition::from_str(&preference.scrape_impl_code) {
          Ok(definition) => definition,
          Err(e) => {
            warn!("Skipping custom scraper {}: invalid definition: {}", preference.name, e);
            continue;
          },
        }
      } else {
        match catalog.get(&preference.name) {
          Some(definition) => definition.clone(),
          None => {
            warn!("Skipping scraper {}: no definition available", preference.name);
            continue;
          },
        }
      };

      let definition = ScraperDefinition { name: preference.name.clone(), ..definition };
      let credential = preferences.credential(&preference.name);
      let scraper = ConfiguredScraper::new(definition, credential, transport.clone())
        .with_usage_ledger(ledger.clone());
      registry.register(preference, Arc::new(scraper));
    }

    debug!("Registered {} scrapers, {} enabled", registry.len(), registry.enabled().len());
    registry
  }

  /// Adds or replaces a scraper under its preference name.
  pub fn register(&mut self, preference: ScraperPreference, scraper: Arc<dyn Scraper>) {
    self.scrapers.insert(preference.name.clone(), RegisteredScraper { preference, scraper });
  }

  /// Builder-style [`ScraperRegistry::register`].
  pub fn with_scraper(mut self, preference: ScraperPreference, scraper: Arc<dyn Scraper>) -> Self {
    self.register(preference, scraper);
    self
  }

  /// Enabled scrapers by descending priority; equal priorities stay in name order.
  pub fn enabled(&self) -> Vec<&RegisteredScraper> {
    let mut enabled: Vec<&RegisteredScraper> =
      self.scrapers.values().filter(|scraper| scraper.preference.enable).collect();
    enabled.sort_by(|a, b| b.priority().total_cmp(&a.priority()));
    enabled
  }

  /// Looks up a scraper by name, whether or not it is enabled.
  pub fn get(&self, name: &str) -> Option<&RegisteredScraper> { self.scrapers.get(name) }

  /// All scrapers in name order.
  pub fn iter(&self) -> impl Iterator<Item = &RegisteredScraper> { self.scrapers.values() }

  /// Number of registered scrapers.
  pub fn len(&self) -> usize { self.scrapers.len() }

  /// Whether no scraper is registered.
  pub fn is_empty(&self) -> bool { self.scrapers.is_empty() }
}
