//! On-disk configuration.
//!
//! Everything lives under one configuration directory:
//!
//! ```text
//! <config_dir>/
//! ├── config.toml        # chunk size, library location
//! ├── preferences.toml   # scraper preferences
//! ├── usage.toml         # requests spent today by providers with a daily limit
//! └── scrapers/          # provider definitions, one <name>.toml each
//! ```
//!
//! Provider definitions in `scrapers/` override the built-in ones of the same name.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gleaner::{config::Config, status::TracingStatus, transport::HttpTransport};
//!
//! # async fn example() -> Result<(), gleaner::error::GleanerError> {
//! let config = Config::load(Config::default_path())?;
//! let orchestrator =
//!   config.orchestrator(Arc::new(HttpTransport::new()), Arc::new(TracingStatus))?;
//! # Ok(())
//! # }
//! ```

use super::*;
use crate::{chunk::DEFAULT_CHUNK_SIZE, orchestrator::Orchestrator};

/// Name of the general settings file.
const CONFIG_FILE: &str = "config.toml";

/// Name of the preferences file.
const PREFERENCES_FILE: &str = "preferences.toml";

/// Name of the request usage ledger.
const USAGE_FILE: &str = "usage.toml";

/// Name of the provider definition directory.
const SCRAPERS_DIR: &str = "scrapers";

/// General settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Directory holding all configuration
  #[serde(skip)]
  pub config_dir:   PathBuf,
  /// Number of work items dispatched at once
  pub chunk_size:   usize,
  /// JSON file scraped drafts are stored in
  pub library_path: PathBuf,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      config_dir:   Self::default_path(),
      chunk_size:   DEFAULT_CHUNK_SIZE,
      library_path: Self::default_library_path(),
    }
  }
}

impl Config {
  /// Returns the default configuration directory.
  ///
  /// - On Unix: `~/.config/gleaner`
  /// - On macOS: `~/Library/Application Support/gleaner`
  /// - On Windows: `%APPDATA%\gleaner`
  /// - Fallback: `./gleaner` in the current directory
  pub fn default_path() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("gleaner")
  }

  /// Returns the default library file, under the platform's data directory.
  pub fn default_library_path() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("gleaner").join("library.json")
  }

  /// Sets the configuration directory.
  pub fn with_config_dir(mut self, config_dir: impl Into<PathBuf>) -> Self {
    self.config_dir = config_dir.into();
    self
  }

  /// Sets the chunk size.
  pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
    self.chunk_size = chunk_size;
    self
  }

  /// Sets the library file.
  pub fn with_library_path(mut self, library_path: impl Into<PathBuf>) -> Self {
    self.library_path = library_path.into();
    self
  }

  /// Path of the general settings file.
  pub fn config_file(&self) -> PathBuf { self.config_dir.join(CONFIG_FILE) }

  /// Path of the preferences file.
  pub fn preferences_path(&self) -> PathBuf { self.config_dir.join(PREFERENCES_FILE) }

  /// Path of the request usage ledger.
  pub fn usage_path(&self) -> PathBuf { self.config_dir.join(USAGE_FILE) }

  /// Path of the provider definition directory.
  pub fn scrapers_path(&self) -> PathBuf { self.config_dir.join(SCRAPERS_DIR) }

  /// Loads the settings stored in `config_dir`, falling back to defaults when there are none.
  pub fn load(config_dir: impl AsRef<Path>) -> Result<Self> {
    let config_dir = config_dir.as_ref();
    let file = config_dir.join(CONFIG_FILE);
    let config = if file.exists() {
      let content = std::fs::read_to_string(&file)?;
      toml::from_str(&content)?
    } else {
      debug!("No settings at {}, using defaults", file.display());
      Self::default()
    };
    Ok(config.with_config_dir(config_dir))
  }

  /// Writes the general settings file.
  pub fn save(&self) -> Result<()> {
    std::fs::create_dir_all(&self.config_dir)?;
    let content = toml::to_string_pretty(self)
      .map_err(|e| GleanerError::Config(format!("Failed to serialize settings: {e}")))?;
    std::fs::write(self.config_file(), content)?;
    Ok(())
  }

  /// Writes settings, default preferences and the built-in provider definitions.
  ///
  /// Existing files are left alone unless `overwrite` is set. Returns the files written.
  pub fn init(&self, overwrite: bool) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(self.scrapers_path())?;
    let mut written = Vec::new();

    if overwrite || !self.config_file().exists() {
      self.save()?;
      written.push(self.config_file());
    }
    if overwrite || !self.preferences_path().exists() {
      TomlPreferences::defaults()?.save(self.preferences_path())?;
      written.push(self.preferences_path());
    }
    for (name, source) in ProviderCatalog::builtin_sources() {
      let path = self.scrapers_path().join(format!("{name}.toml"));
      if overwrite || !path.exists() {
        std::fs::write(&path, source)?;
        written.push(path);
      }
    }

    info!("Initialized {} configuration files in {}", written.len(), self.config_dir.display());
    Ok(written)
  }

  /// Loads the preferences, migrating files written by older versions.
  ///
  /// Without a preferences file the defaults are used.
  pub fn preferences(&self) -> Result<TomlPreferences> {
    let path = self.preferences_path();
    if !path.exists() {
      return TomlPreferences::defaults();
    }

    let mut preferences = TomlPreferences::from_file(&path)?;
    let removed = preferences.migrate()?;
    if !removed.is_empty() {
      info!("Dropped deprecated scrapers: {}", removed.join(", "));
    }
    Ok(preferences)
  }

  /// The built-in provider definitions overlaid with the ones in the scrapers directory.
  pub fn catalog(&self) -> Result<ProviderCatalog> {
    let catalog = ProviderCatalog::builtin()?;
    let dir = self.scrapers_path();
    if dir.is_dir() {
      catalog.with_dir(dir)
    } else {
      Ok(catalog)
    }
  }

  /// Builds the scraper registry described by this configuration.
  ///
  /// Daily request limits are counted in the usage ledger, so they hold across runs.
  pub fn registry(&self, transport: Arc<dyn Transport>) -> Result<ScraperRegistry> {
    let ledger = Arc::new(UsageLedger::load(self.usage_path())?);
    let (preferences, catalog) = (self.preferences()?, self.catalog()?);
    Ok(ScraperRegistry::build_with_usage(&preferences, &catalog, transport, ledger))
  }

  /// Builds an orchestrator over [`Config::registry`] with the configured chunk size.
  pub fn orchestrator(
    &self,
    transport: Arc<dyn Transport>,
    status: Arc<dyn StatusReporter>,
  ) -> Result<Orchestrator> {
    if self.chunk_size == 0 {
      return Err(GleanerError::InvalidChunkSize);
    }
    Ok(Orchestrator::new(self.registry(transport)?, status).with_chunk_size(self.chunk_size))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_path_is_under_the_config_dir() {
    let path = Config::default_path();
    assert!(path.ends_with("gleaner"));
    assert!(path.starts_with(dirs::config_dir().unwrap_or_else(|| PathBuf::from("."))));
  }

  #[test]
  fn missing_settings_fall_back_to_defaults() {
    let dir = tempdir().unwrap();
    let config = Config::load(dir.path()).unwrap();
    assert_eq!(config.config_dir, dir.path());
    assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
  }

  #[test]
  fn init_writes_everything_once() {
    let dir = tempdir().unwrap();
    let config = Config::default().with_config_dir(dir.path()).with_chunk_size(4);

    let written = config.init(false).unwrap();
    assert_eq!(written.len(), 2 + ProviderCatalog::builtin_sources().count());
    assert!(config.scrapers_path().join("dblp.toml").exists());
    assert!(config.init(false).unwrap().is_empty());

    assert_eq!(Config::load(dir.path()).unwrap().chunk_size, 4);
  }

  #[test]
  fn local_definitions_override_builtin_ones() {
    let dir = tempdir().unwrap();
    let config = Config::default().with_config_dir(dir.path());
    config.init(false).unwrap();
    std::fs::write(
      config.scrapers_path().join("dblp.toml"),
      r#"
        name = "dblp"
        endpoint_template = "https://dblp.mirror.test/search?q={title}"
        [response_format]
        type = "json"
        [response_format.field_maps]
        publication = { path = "venue" }
      "#,
    )
    .unwrap();

    let catalog = config.catalog().unwrap();
    assert_eq!(
      catalog.get("dblp").unwrap().endpoint_template,
      "https://dblp.mirror.test/search?q={title}"
    );
    assert!(catalog.get("arxiv").is_some());
  }

  #[test]
  fn daily_limits_hold_across_registries() {
    let dir = tempdir().unwrap();
    let config = Config::default().with_config_dir(dir.path());
    config.init(false).unwrap();
    std::fs::write(
      config.scrapers_path().join("dblp.toml"),
      r#"
        name = "dblp"
        endpoint_template = "https://dblp.mirror.test/search?q={title}"
        daily_limit = 1
        [response_format]
        type = "json"
        [response_format.field_maps]
        publication = { path = "venue" }
      "#,
    )
    .unwrap();
    let draft = EntityDraft::with_title("Neural Nets");

    let first = config.registry(Arc::new(StaticTransport::new())).unwrap();
    assert!(first.get("dblp").unwrap().scraper.pre_process(&draft).enable);
    assert!(config.usage_path().exists());

    let second = config.registry(Arc::new(StaticTransport::new())).unwrap();
    assert!(!second.get("dblp").unwrap().scraper.pre_process(&draft).enable);
    assert!(second.get("arxiv").is_some());
  }

  #[test]
  fn zero_chunk_size_is_rejected_up_front() {
    let dir = tempdir().unwrap();
    let config = Config::default().with_config_dir(dir.path()).with_chunk_size(0);
    let result = config.orchestrator(Arc::new(StaticTransport::new()), Arc::new(SilentStatus));
    assert!(matches!(result, Err(GleanerError::InvalidChunkSize)));
  }
}
