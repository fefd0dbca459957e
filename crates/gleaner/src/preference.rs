//! Scraper preferences: which providers run, with which priority and credentials.
//!
//! Preferences are read through the [`PreferenceStore`] trait so the pipeline never depends on
//! where they live. [`TomlPreferences`] is the file-backed implementation:
//!
//! ```toml
//! preference_version = 1
//!
//! [scrapers.dblp]
//! name = "dblp"
//! category = "cs"
//! enable = true
//! priority = 7
//!
//! [scrapers.ieee]
//! name = "ieee"
//! enable = true
//! args = "my-api-key"
//! priority = 4
//! ```
//!
//! # Examples
//!
//! ```
//! use gleaner::preference::{PreferenceStore, TomlPreferences};
//!
//! let preferences = TomlPreferences::defaults().unwrap();
//! let arxiv = preferences.scraper_preference("arxiv").unwrap();
//! assert!(arxiv.enable);
//! assert_eq!(arxiv.priority, 9.0);
//! ```

use super::*;

/// Version written by [`TomlPreferences::migrate`]; files without a version predate it.
pub const PREFERENCE_VERSION: i64 = 1;

/// Scrapers removed from the default set; dropped on migration.
const DEPRECATED_SCRAPERS: [&str; 5] = ["cvf", "pdf", "paperlib", "chemrxiv", "biomedrxiv"];

/// Category assigned to scrapers that are not part of the default set.
const CUSTOM_CATEGORY: &str = "custom";

/// One scraper's configuration entry.
///
/// Disabled entries stay in the preferences but are excluded from the pipeline. The `*_code`
/// fields carry payloads for user-defined scrapers; for configured providers `scrape_impl_code`
/// holds an inline TOML [`ScraperDefinition`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperPreference {
  /// Unique key
  pub name:                 String,
  /// Field of study the provider covers
  pub category:             String,
  /// Human readable description
  pub description:          String,
  /// Whether the provider takes part in default scrapes
  pub enable:               bool,
  /// Whether this is a user-defined scraper
  pub custom:               bool,
  /// Credentials or options, e.g. an API key
  pub args:                 String,
  /// Precedence when merging, higher wins
  pub priority:             f64,
  /// Custom pre-processing payload
  pub pre_process_code:     String,
  /// Custom parsing payload
  pub parsing_process_code: String,
  /// Custom scraper definition payload
  pub scrape_impl_code:     String,
}

/// Read access to scraper preferences.
pub trait PreferenceStore: Send + Sync {
  /// Raw scraper entries keyed by name. Entries may be malformed.
  fn scraper_entries(&self) -> BTreeMap<String, toml::Value>;

  /// The typed preference for `name`, or `None` if it is absent or malformed.
  fn scraper_preference(&self, name: &str) -> Option<ScraperPreference> {
    let entry = self.scraper_entries().remove(name)?;
    parse_entry(name, entry)
      .map_err(|e| warn!("Ignoring malformed preference entry for {}: {}", name, e))
      .ok()
  }

  /// Every entry as a typed preference.
  ///
  /// Malformed entries are logged and come back disabled, so they never run but are still
  /// listed.
  fn scraper_preferences(&self) -> Vec<ScraperPreference> {
    self
      .scraper_entries()
      .into_iter()
      .map(|(name, entry)| {
        parse_entry(&name, entry).unwrap_or_else(|e| {
          warn!("Malformed preference entry for {} treated as disabled: {}", name, e);
          ScraperPreference { name, enable: false, ..ScraperPreference::default() }
        })
      })
      .collect()
  }

  /// Credential for a provider, defaulting to the entry's non-empty `args`.
  fn credential(&self, name: &str) -> Option<String> {
    self.scraper_preference(name).map(|preference| preference.args).filter(|args| !args.is_empty())
  }
}

/// Parses a raw entry, falling back to its key when it carries no name.
fn parse_entry(name: &str, entry: toml::Value) -> Result<ScraperPreference> {
  let mut preference: ScraperPreference = entry.try_into()?;
  if preference.name.is_empty() {
    preference.name = name.to_string();
  }
  Ok(preference)
}

/// Preferences stored in a TOML file.
#[derive(Debug, Clone, Default)]
pub struct TomlPreferences {
  /// Format version, 0 for files that predate versioning
  version:  i64,
  /// Raw scraper entries keyed by name
  scrapers: BTreeMap<String, toml::Value>,
}

impl FromStr for TomlPreferences {
  type Err = GleanerError;

  /// Parses a preferences file.
  ///
  /// Accepts both the `[scrapers.<name>]` table layout and the legacy `[[scrapers]]` array layout,
  /// which [`TomlPreferences::migrate`] converts.
  fn from_str(s: &str) -> Result<Self> {
    let mut table: toml::Table = toml::from_str(s)?;
    let version = table.get("preference_version").and_then(toml::Value::as_integer).unwrap_or(0);

    let scrapers = match table.remove("scrapers") {
      Some(toml::Value::Table(entries)) => entries.into_iter().collect(),
      Some(toml::Value::Array(entries)) => entries
        .into_iter()
        .filter_map(|entry| {
          let name = entry.get("name").and_then(toml::Value::as_str)?.to_string();
          Some((name, entry))
        })
        .collect(),
      Some(other) =>
        return Err(GleanerError::Config(format!(
          "Expected a table of scrapers, found {}",
          other.type_str()
        ))),
      None => BTreeMap::new(),
    };

    Ok(Self { version, scrapers })
  }
}

impl TomlPreferences {
  /// Creates empty preferences at the current version.
  pub fn new() -> Self { Self { version: PREFERENCE_VERSION, scrapers: BTreeMap::new() } }

  /// The built-in default preferences.
  pub fn defaults() -> Result<Self> { Self::from_str(include_str!("../config/preferences.toml")) }

  /// Loads preferences from a file.
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    let content = std::fs::read_to_string(path)?;
    Self::from_str(&content)
  }

  /// Adds or replaces an entry.
  pub fn with_entry(mut self, preference: ScraperPreference) -> Result<Self> {
    let entry = toml::Value::try_from(&preference)
      .map_err(|e| GleanerError::Config(format!("Failed to serialize preference: {e}")))?;
    self.scrapers.insert(preference.name, entry);
    Ok(self)
  }

  /// Adds or replaces a raw entry, which need not be well-formed.
  pub fn with_raw_entry(mut self, name: impl Into<String>, entry: toml::Value) -> Self {
    self.scrapers.insert(name.into(), entry);
    self
  }

  /// Enables or disables a scraper, returning whether it exists.
  pub fn set_enabled(&mut self, name: &str, enable: bool) -> bool {
    match self.scrapers.get_mut(name).and_then(toml::Value::as_table_mut) {
      Some(entry) => {
        entry.insert("enable".into(), toml::Value::Boolean(enable));
        true
      },
      None => false,
    }
  }

  /// Format version of the loaded file.
  pub fn version(&self) -> i64 { self.version }

  /// Brings preferences written by older versions up to date.
  ///
  /// Starts from the defaults and lays the existing entries over them, so newly added providers
  /// appear. Deprecated scrapers are dropped and entries unknown to the defaults are categorized
  /// as custom. Does nothing for current files.
  ///
  /// Returns the names of the removed entries.
  pub fn migrate(&mut self) -> Result<Vec<String>> {
    if self.version >= PREFERENCE_VERSION {
      return Ok(Vec::new());
    }

    let defaults = Self::defaults()?;
    let mut migrated = defaults.scrapers.clone();
    let mut removed = Vec::new();

    for (name, mut entry) in std::mem::take(&mut self.scrapers) {
      if DEPRECATED_SCRAPERS.contains(&name.as_str()) {
        removed.push(name);
        continue;
      }
      let category = defaults
        .scrapers
        .get(&name)
        .and_then(|default| default.get("category"))
        .cloned()
        .unwrap_or_else(|| toml::Value::String(CUSTOM_CATEGORY.into()));
      if let Some(table) = entry.as_table_mut() {
        table.insert("category".into(), category);
      }
      migrated.insert(name, entry);
    }

    info!("Migrated preferences to version {}, removed {:?}", PREFERENCE_VERSION, removed);
    self.scrapers = migrated;
    self.version = PREFERENCE_VERSION;
    Ok(removed)
  }

  /// Serializes the preferences in the `[scrapers.<name>]` layout.
  pub fn to_toml_string(&self) -> Result<String> {
    let mut table = toml::Table::new();
    table.insert("preference_version".into(), toml::Value::Integer(self.version));
    let scrapers = self.scrapers.clone().into_iter().collect();
    table.insert("scrapers".into(), toml::Value::Table(scrapers));
    toml::to_string_pretty(&table)
      .map_err(|e| GleanerError::Config(format!("Failed to serialize preferences: {e}")))
  }

  /// Writes the preferences to `path`, creating parent directories.
  pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, self.to_toml_string()?)?;
    Ok(())
  }
}

impl PreferenceStore for TomlPreferences {
  fn scraper_entries(&self) -> BTreeMap<String, toml::Value> { self.scrapers.clone() }
}
