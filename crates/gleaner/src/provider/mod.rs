//! Declaratively configured scrapers.
//!
//! Most metadata providers follow the same shape: render a URL from what the draft already knows,
//! fetch a JSON or XML document, and copy a handful of values out of it. Rather than hand-writing
//! a scraper per provider, a [`ScraperDefinition`] describes that shape in TOML and a
//! [`ConfiguredScraper`] implements the [`Scraper`] contract for it.
//!
//! # Configuration
//!
//! ```toml
//! name = "dblp"
//! endpoint_template = "https://dblp.org/search/publ/api?q={title}&format=json"
//! timeout_secs = 5
//! match_title = true
//!
//! [eligibility]
//! requires = ["title"]
//! requires_empty = ["publication"]
//!
//! [response_format]
//! type = "json"
//!
//! [response_format.field_maps]
//! title = { path = "result/hits/hit/0/info/title" }
//! publication = { path = "result/hits/hit/0/info/venue" }
//! ```
//!
//! Templates may use `{title}`, `{doi}`, `{arxiv}` and `{args}` (the provider's credential string
//! from the preferences). `{title}` is encoded as a query value; `{doi}` and `{arxiv}` are encoded
//! as path segments, keeping their `/` separators. A rendered endpoint starting with `file://` is
//! read from disk.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gleaner::{
//!   draft::EntityDraft,
//!   prelude::*,
//!   provider::{ConfiguredScraper, ProviderCatalog},
//!   transport::HttpTransport,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = ProviderCatalog::builtin()?;
//! let definition = catalog.get("arxiv").unwrap().clone();
//! let arxiv = ConfiguredScraper::new(definition, None, Arc::new(HttpTransport::new()));
//!
//! let draft = arxiv.scrape(&EntityDraft::new().arxiv("2301.07041")).await?;
//! println!("{} ({})", draft.title, draft.year);
//! # Ok(())
//! # }
//! ```

use chrono::NaiveDate;

use super::*;

pub mod budget;
pub mod json;
pub mod xml;

pub use budget::{RequestBudget, UsageLedger};

/// Built-in provider definitions, keyed by file name.
const BUILTIN_DEFINITIONS: [(&str, &str); 6] = [
  ("arxiv", include_str!("../../config/scrapers/arxiv.toml")),
  ("doi", include_str!("../../config/scrapers/doi.toml")),
  ("dblp", include_str!("../../config/scrapers/dblp.toml")),
  ("openreview", include_str!("../../config/scrapers/openreview.toml")),
  ("semanticscholar", include_str!("../../config/scrapers/semanticscholar.toml")),
  ("crossref", include_str!("../../config/scrapers/crossref.toml")),
];

/// TOML description of a provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperDefinition {
  /// Provider name, matching its preference entry
  pub name:              String,
  /// Human readable description
  #[serde(default)]
  pub description:       String,
  /// Template for the request URL
  pub endpoint_template: String,
  /// Template for an alternate URL tried once after rate limiting
  #[serde(default)]
  pub fallback_template: Option<String>,
  /// Fetch time budget in seconds
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs:      u64,
  /// Maximum number of requests per UTC day
  #[serde(default)]
  pub daily_limit:       Option<u32>,
  /// Body fragments that reveal a bot-detection page instead of data
  #[serde(default)]
  pub blocked_markers:   Vec<String>,
  /// Only accept responses whose title matches the draft's title
  #[serde(default)]
  pub match_title:       bool,
  /// When the provider is allowed to run
  #[serde(default)]
  pub eligibility:       Eligibility,
  /// Request headers; values may use the same placeholders as the endpoint
  #[serde(default)]
  pub headers:           BTreeMap<String, String>,
  /// How to read the response
  pub response_format:   ResponseFormat,
}

/// Preconditions a draft must meet before a provider runs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Eligibility {
  /// Fields that must hold a value
  pub requires:            Vec<DraftField>,
  /// Fields that must still be empty
  pub requires_empty:      Vec<DraftField>,
  /// Whether a credential (the preference `args`) must be configured
  pub requires_credential: bool,
}

/// Available response format handlers.
///
/// # Examples
///
/// XML configuration:
/// ```toml
/// [response_format]
/// type = "xml"
/// strip_namespaces = true
///
/// [response_format.field_maps]
/// title = { path = "feed/entry/title" }
/// ```
///
/// JSON configuration:
/// ```toml
/// [response_format]
/// type = "json"
///
/// [response_format.field_maps]
/// title = { path = "message/title/0" }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ResponseFormat {
  /// XML response parser configuration
  #[serde(rename = "xml")]
  Xml(xml::XmlConfig),
  /// JSON response parser configuration
  #[serde(rename = "json")]
  Json(json::JsonConfig),
}

/// Field mapping configuration.
///
/// Defines how to extract and transform one draft field from a response.
///
/// # Examples
///
/// ```toml
/// [field_maps.title]
/// path = "entry/title"
/// transform = { type = "replace", pattern = "\\s+", replacement = " " }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct FieldMap {
  /// Path to the field in the response (slash separated)
  pub path:      String,
  /// Optional transformation to apply to the extracted value
  #[serde(default)]
  pub transform: Option<Transform>,
}

/// Available field value transformations.
///
/// # Examples
///
/// ```toml
/// # Keep only the year of a timestamp
/// transform = { type = "replace", pattern = "^(\\d{4}).*$", replacement = "$1" }
///
/// # Convert date format
/// transform = { type = "date", from_format = "%Y-%m-%d", to_format = "%Y" }
///
/// # Construct full URL
/// transform = { type = "url", base = "https://example.com/{value}", suffix = ".pdf" }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Transform {
  /// Replace text using regex pattern
  Replace {
    /// Regular expression pattern to match, compiled when the definition is loaded
    pattern:     Pattern,
    /// Text to replace matched patterns with
    replacement: String,
  },
  /// Convert between date formats
  Date {
    /// Source date format string using chrono syntax (e.g., "%Y-%m-%d")
    from_format: String,
    /// Target date format string using chrono syntax (e.g., "%Y")
    to_format:   String,
  },
  /// Construct URL from parts
  Url {
    /// Base URL template, may contain {value} placeholder
    base:   String,
    /// Optional suffix to append to the URL (e.g., ".pdf")
    suffix: Option<String>,
  },
}

/// A regular expression compiled once, when its definition is deserialized.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "String")]
pub struct Pattern(Regex);

/// Turns a raw response body into draft field values.
///
/// Implemented separately for each [`ResponseFormat`]. A field that cannot be found is simply
/// absent from the result; only bodies that cannot be parsed at all are errors.
pub trait ResponseProcessor: Send + Sync {
  /// Extracts every mapped field that is present in `data`.
  fn extract_fields(&self, data: &[u8]) -> Result<BTreeMap<DraftField, String>>;
}

/// A [`Scraper`] driven by a [`ScraperDefinition`].
pub struct ConfiguredScraper {
  /// The provider description
  definition: ScraperDefinition,
  /// Credential from the preferences, substituted for `{args}`
  credential: Option<String>,
  /// Where requests go
  transport:  Arc<dyn Transport>,
  /// Usage cap, when the definition has one
  budget:     Option<RequestBudget>,
}

/// Collection of provider definitions, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ProviderCatalog {
  /// Definitions keyed by provider name
  definitions: BTreeMap<String, ScraperDefinition>,
}

/// Default fetch budget, in seconds.
fn default_timeout_secs() -> u64 { DEFAULT_TIMEOUT.as_secs() }

impl FromStr for ScraperDefinition {
  type Err = GleanerError;

  fn from_str(s: &str) -> Result<Self> { Ok(toml::from_str(s)?) }
}

impl ScraperDefinition {
  /// The fetch time budget.
  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }

  /// The processor for this definition's response format.
  pub fn processor(&self) -> &dyn ResponseProcessor {
    match &self.response_format {
      ResponseFormat::Xml(config) => config as &dyn ResponseProcessor,
      ResponseFormat::Json(config) => config as &dyn ResponseProcessor,
    }
  }
}

impl Eligibility {
  /// Whether `draft` satisfies the field preconditions and the credential requirement.
  pub fn allows(&self, draft: &EntityDraft, credential: Option<&str>) -> bool {
    self.requires.iter().all(|field| !draft.is_empty(*field))
      && self.requires_empty.iter().all(|field| draft.is_empty(*field))
      && (!self.requires_credential || credential.is_some_and(|c| !c.trim().is_empty()))
  }
}

impl TryFrom<String> for Pattern {
  type Error = regex::Error;

  fn try_from(pattern: String) -> core::result::Result<Self, Self::Error> {
    Regex::new(&pattern).map(Self)
  }
}

impl FromStr for Pattern {
  type Err = GleanerError;

  fn from_str(s: &str) -> Result<Self> {
    Regex::new(s).map(Self).map_err(|e| GleanerError::Config(format!("Invalid regex: {e}")))
  }
}

impl Pattern {
  /// The compiled expression.
  pub fn regex(&self) -> &Regex { &self.0 }
}

impl ConfiguredScraper {
  /// Creates a scraper from a definition, an optional credential and a transport.
  ///
  /// A daily limit is counted in memory until a ledger is attached with
  /// [`ConfiguredScraper::with_usage_ledger`].
  pub fn new(
    definition: ScraperDefinition,
    credential: Option<String>,
    transport: Arc<dyn Transport>,
  ) -> Self {
    Self { definition, credential, transport, budget: None }
      .with_usage_ledger(Arc::new(UsageLedger::in_memory()))
  }

  /// Counts the daily limit, if the definition has one, in `ledger`.
  pub fn with_usage_ledger(mut self, ledger: Arc<UsageLedger>) -> Self {
    self.budget = self
      .definition
      .daily_limit
      .map(|limit| RequestBudget::new(self.definition.name.clone(), limit, ledger));
    self
  }

  /// The definition driving this scraper.
  pub fn definition(&self) -> &ScraperDefinition { &self.definition }

  /// Substitutes the draft's values into a template.
  fn render(&self, template: &str, draft: &EntityDraft) -> String {
    let title: String =
      url::form_urlencoded::byte_serialize(draft.title.trim().as_bytes()).collect();
    template
      .replace("{title}", &title)
      .replace("{doi}", &encode_path(draft.doi.as_deref().unwrap_or_default().trim()))
      .replace("{arxiv}", &encode_path(draft.arxiv.as_deref().unwrap_or_default().trim()))
      .replace("{args}", self.credential.as_deref().unwrap_or_default())
  }

  /// Renders a template into a fetch target.
  fn render_target(&self, template: &str, draft: &EntityDraft) -> Target {
    let rendered = self.render(template, draft);
    match rendered.strip_prefix("file://") {
      Some(path) => Target::File(PathBuf::from(path)),
      None => Target::Url(rendered),
    }
  }

  /// Fails with [`GleanerError::RateLimited`] when the body is a bot-detection page.
  fn check_blocked(&self, response: RawResponse) -> Result<RawResponse> {
    if self.definition.blocked_markers.is_empty() {
      return Ok(response);
    }
    let text = response.text();
    if self.definition.blocked_markers.iter().any(|marker| text.contains(marker.as_str())) {
      return Err(GleanerError::RateLimited { status: response.status, target: response.target });
    }
    Ok(response)
  }
}

#[async_trait]
impl Scraper for ConfiguredScraper {
  fn name(&self) -> &str { &self.definition.name }

  fn pre_process(&self, draft: &EntityDraft) -> ScrapeRequest {
    if !self.definition.eligibility.allows(draft, self.credential.as_deref()) {
      return ScrapeRequest::disabled();
    }
    if let Some(budget) = &self.budget {
      if !budget.try_acquire() {
        debug!("{} daily request budget exhausted", self.definition.name);
        return ScrapeRequest::disabled();
      }
    }

    let mut request = ScrapeRequest::disabled().enabled(true).timeout(self.definition.timeout());
    request.target = self.render_target(&self.definition.endpoint_template, draft);
    request.fallback = self
      .definition
      .fallback_template
      .as_ref()
      .map(|template| self.render_target(template, draft));
    for (key, value) in &self.definition.headers {
      request.headers.insert(key.clone(), self.render(value, draft));
    }
    request
  }

  async fn fetch(&self, request: &ScrapeRequest) -> Result<RawResponse> {
    let primary = self.transport.fetch(request).await.and_then(|raw| self.check_blocked(raw));
    match (primary, request.to_fallback()) {
      (Err(error), Some(fallback)) if error.is_rate_limited() => {
        warn!("{} rate limited ({}), trying {}", self.definition.name, error, fallback.target);
        self.transport.fetch(&fallback).await.and_then(|raw| self.check_blocked(raw))
      },
      (result, _) => result,
    }
  }

  fn parsing_process(&self, raw: RawResponse, draft: &EntityDraft) -> Result<EntityDraft> {
    if raw.is_blank() {
      debug!("{} returned an empty response", self.definition.name);
      return Ok(draft.clone());
    }

    let fields = self.definition.processor().extract_fields(&raw.body)?;
    if fields.is_empty() {
      debug!("{} found no match for \"{}\"", self.definition.name, draft.title);
      return Ok(draft.clone());
    }

    if self.definition.match_title {
      let matched = fields
        .get(&DraftField::Title)
        .is_some_and(|title| normalize_title(title) == draft.normalized_title());
      if !matched {
        debug!("{} result does not match \"{}\"", self.definition.name, draft.title);
        return Ok(draft.clone());
      }
    }

    let mut scraped = draft.clone();
    for (field, value) in fields {
      scraped.set(field, value);
    }
    Ok(scraped)
  }
}

impl ProviderCatalog {
  /// Creates an empty catalog.
  pub fn new() -> Self { Self::default() }

  /// A catalog holding the built-in definitions.
  pub fn builtin() -> Result<Self> {
    BUILTIN_DEFINITIONS
      .iter()
      .try_fold(Self::new(), |catalog, (_, toml)| catalog.with_definition_str(toml))
  }

  /// The raw TOML of every built-in definition, keyed by name.
  pub fn builtin_sources() -> impl Iterator<Item = (&'static str, &'static str)> {
    BUILTIN_DEFINITIONS.into_iter()
  }

  /// Adds or replaces a definition.
  pub fn with_definition(mut self, definition: ScraperDefinition) -> Self {
    self.definitions.insert(definition.name.clone(), definition);
    self
  }

  /// Adds a definition from a TOML string.
  pub fn with_definition_str(self, toml_str: &str) -> Result<Self> {
    Ok(self.with_definition(ScraperDefinition::from_str(toml_str)?))
  }

  /// Adds a definition from a TOML file.
  pub fn with_definition_file(self, path: impl AsRef<Path>) -> Result<Self> {
    let content = std::fs::read_to_string(path)?;
    self.with_definition_str(&content)
  }

  /// Adds every `.toml` definition found in `dir`, replacing same-named ones.
  pub fn with_dir(self, dir: impl AsRef<Path>) -> Result<Self> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
      return Err(GleanerError::Path(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("Scraper definition directory {} not found", dir.display()),
      )));
    }

    let mut catalog = self;
    for entry in std::fs::read_dir(dir)? {
      let path = entry?.path();
      if path.extension().is_some_and(|ext| ext == "toml") {
        catalog = catalog.with_definition_file(path)?;
      }
    }
    Ok(catalog)
  }

  /// Looks up a definition.
  pub fn get(&self, name: &str) -> Option<&ScraperDefinition> { self.definitions.get(name) }

  /// Names of all definitions.
  pub fn names(&self) -> impl Iterator<Item = &str> { self.definitions.keys().map(String::as_str) }
}

/// Percent-encodes every `/`-separated segment of an identifier for use in a URL path.
fn encode_path(value: &str) -> String {
  value
    .split('/')
    .map(|segment| {
      // byte_serialize writes spaces as `+`, which a path would take literally
      let encoded: String = url::form_urlencoded::byte_serialize(segment.as_bytes()).collect();
      encoded.replace('+', "%20")
    })
    .collect::<Vec<_>>()
    .join("/")
}

/// Applies a transformation to an extracted value.
///
/// # Errors
///
/// Returns [`GleanerError::Parse`] for a date that does not match `from_format`.
fn apply_transform(value: &str, transform: &Transform) -> Result<String> {
  match transform {
    Transform::Replace { pattern, replacement } =>
      Ok(pattern.regex().replace_all(value, replacement.as_str()).into_owned()),
    Transform::Date { from_format, to_format } =>
      chrono::NaiveDateTime::parse_from_str(value, from_format)
        .map(|dt| dt.format(to_format).to_string())
        .or_else(|_| {
          NaiveDate::parse_from_str(value, from_format).map(|d| d.format(to_format).to_string())
        })
        .map_err(|e| GleanerError::Parse(format!("Invalid date: {e}"))),
    Transform::Url { base, suffix } =>
      Ok(format!("{}{}", base.replace("{value}", value), suffix.as_deref().unwrap_or(""))),
  }
}

/// Applies the optional transform of `map` to `value`.
fn finish_value(value: String, map: &FieldMap) -> Result<String> {
  match &map.transform {
    Some(transform) => apply_transform(&value, transform),
    None => Ok(value),
  }
}
