//! The in-flight paper record that scrapers enrich.
//!
//! An [`EntityDraft`] is created transiently for every scrape request, from a file import, a web
//! capture, or an existing library record. It flows through the providers by value: each provider
//! receives a clone and returns a new draft, so one draft is never mutated by two operations at
//! once.
//!
//! # Examples
//!
//! ```
//! use gleaner::draft::{DraftField, EntityDraft, PubType};
//!
//! let mut draft = EntityDraft::with_title("Neural Nets");
//! assert!(draft.is_empty(DraftField::Publication));
//!
//! draft.set(DraftField::Publication, "NeurIPS");
//! draft.set(DraftField::PubType, "inproceedings");
//! assert_eq!(draft.pub_type, Some(PubType::Conference));
//! ```

use super::*;

/// A partially known paper record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityDraft {
  /// The paper's title
  pub title:       String,
  /// Ordered, comma-joined author list
  pub authors:     String,
  /// Publication year
  pub year:        String,
  /// Journal, conference, or publisher name
  pub publication: String,
  /// Kind of venue, `None` while unknown
  pub pub_type:    Option<PubType>,
  /// arXiv identifier, e.g. `2301.07041`
  pub arxiv:       Option<String>,
  /// Digital Object Identifier, e.g. `10.1145/1327452.1327492`
  pub doi:         Option<String>,
  /// Path of the source file this draft was imported from
  pub main_url:    Option<PathBuf>,
  /// Tags attached to the paper
  pub tags:        BTreeSet<String>,
}

/// Kind of publication venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PubType {
  /// Journal article
  Journal,
  /// Conference or workshop paper
  Conference,
  /// Book or book chapter
  Book,
  /// Preprints, theses, reports and everything else
  Other,
}

/// The scalar fields of an [`EntityDraft`] that providers may write.
///
/// Tags are deliberately absent: they form a set and are merged by union.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DraftField {
  /// [`EntityDraft::title`]
  Title,
  /// [`EntityDraft::authors`]
  Authors,
  /// [`EntityDraft::year`]
  Year,
  /// [`EntityDraft::publication`]
  Publication,
  /// [`EntityDraft::pub_type`]
  PubType,
  /// [`EntityDraft::arxiv`]
  Arxiv,
  /// [`EntityDraft::doi`]
  Doi,
}

impl DraftField {
  /// Every field, in a fixed order.
  pub const ALL: [DraftField; 7] = [
    DraftField::Title,
    DraftField::Authors,
    DraftField::Year,
    DraftField::Publication,
    DraftField::PubType,
    DraftField::Arxiv,
    DraftField::Doi,
  ];

  /// The field's name as used in configuration files.
  pub fn as_str(&self) -> &'static str {
    match self {
      DraftField::Title => "title",
      DraftField::Authors => "authors",
      DraftField::Year => "year",
      DraftField::Publication => "publication",
      DraftField::PubType => "pub_type",
      DraftField::Arxiv => "arxiv",
      DraftField::Doi => "doi",
    }
  }
}

impl Display for DraftField {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for DraftField {
  type Err = GleanerError;

  fn from_str(s: &str) -> Result<Self> {
    DraftField::ALL
      .into_iter()
      .find(|field| field.as_str() == s)
      .ok_or_else(|| GleanerError::Config(format!("Unknown draft field: {s}")))
  }
}

impl TryFrom<String> for DraftField {
  type Error = GleanerError;

  fn try_from(value: String) -> Result<Self> { Self::from_str(&value) }
}

impl From<DraftField> for String {
  fn from(field: DraftField) -> Self { field.as_str().to_string() }
}

impl PubType {
  /// Parses a venue kind leniently from BibTeX entry types, Crossref work types and plain names.
  ///
  /// Anything unrecognized maps to [`PubType::Other`].
  pub fn parse_lenient(value: &str) -> Self {
    match value.trim().to_lowercase().as_str() {
      "journal" | "article" | "journal-article" | "article-journal" | "journal articles" =>
        PubType::Journal,
      "conference" | "inproceedings" | "incollection" | "proceedings-article"
      | "paper-conference" | "conference and workshop papers" => PubType::Conference,
      "book" | "book-chapter" | "chapter" | "monograph" | "books and theses" => PubType::Book,
      _ => PubType::Other,
    }
  }
}

impl Display for PubType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      PubType::Journal => "journal",
      PubType::Conference => "conference",
      PubType::Book => "book",
      PubType::Other => "other",
    };
    f.write_str(name)
  }
}

impl EntityDraft {
  /// Creates an empty draft.
  pub fn new() -> Self { Self::default() }

  /// Creates a draft that only knows its title.
  pub fn with_title(title: impl Into<String>) -> Self {
    Self { title: title.into(), ..Self::default() }
  }

  /// Sets the DOI, builder style.
  pub fn doi(mut self, doi: impl Into<String>) -> Self {
    self.doi = Some(doi.into());
    self
  }

  /// Sets the arXiv identifier, builder style.
  pub fn arxiv(mut self, arxiv: impl Into<String>) -> Self {
    self.arxiv = Some(arxiv.into());
    self
  }

  /// Sets the source file, builder style.
  pub fn main_url(mut self, path: impl Into<PathBuf>) -> Self {
    self.main_url = Some(path.into());
    self
  }

  /// Adds a tag, builder style.
  pub fn tag(mut self, tag: impl Into<String>) -> Self {
    self.tags.insert(tag.into());
    self
  }

  /// Returns the value of a field, or `None` when it is empty.
  pub fn get(&self, field: DraftField) -> Option<String> {
    let value = match field {
      DraftField::Title => Some(self.title.clone()),
      DraftField::Authors => Some(self.authors.clone()),
      DraftField::Year => Some(self.year.clone()),
      DraftField::Publication => Some(self.publication.clone()),
      DraftField::PubType => self.pub_type.map(|pub_type| pub_type.to_string()),
      DraftField::Arxiv => self.arxiv.clone(),
      DraftField::Doi => self.doi.clone(),
    };
    value.filter(|v| !v.trim().is_empty())
  }

  /// Whether a field holds no meaningful value.
  pub fn is_empty(&self, field: DraftField) -> bool { self.get(field).is_none() }

  /// Writes a field from its string form.
  ///
  /// Empty (or whitespace-only) values are ignored so that a field can never regress from
  /// non-empty to empty.
  pub fn set(&mut self, field: DraftField, value: impl AsRef<str>) {
    let value = value.as_ref().trim();
    if value.is_empty() {
      return;
    }
    let value = value.to_string();
    match field {
      DraftField::Title => self.title = value,
      DraftField::Authors => self.authors = value,
      DraftField::Year => self.year = value,
      DraftField::Publication => self.publication = value,
      DraftField::PubType => self.pub_type = Some(PubType::parse_lenient(&value)),
      DraftField::Arxiv => self.arxiv = Some(value),
      DraftField::Doi => self.doi = Some(value),
    }
  }

  /// The fields `other` holds a non-empty value for that differs from this draft's value.
  ///
  /// Used to work out which fields a provider actually wrote.
  pub fn changed_fields(&self, other: &EntityDraft) -> Vec<DraftField> {
    DraftField::ALL
      .into_iter()
      .filter(|field| {
        let theirs = other.get(*field);
        theirs.is_some() && theirs != self.get(*field)
      })
      .collect()
  }

  /// Title normalized for fuzzy comparison between providers.
  pub fn normalized_title(&self) -> String { normalize_title(&self.title) }
}

/// Normalizes a title for comparison: drops HTML ampersand entities and symbols, collapses
/// whitespace and lowercases.
///
/// # Examples
///
/// ```
/// use gleaner::draft::normalize_title;
///
/// assert_eq!(normalize_title("Deep  Learning: A Survey!"), "deep learning a survey");
/// assert_eq!(normalize_title("Cats &amp; Dogs"), "cats dogs");
/// ```
pub fn normalize_title(title: &str) -> String {
  lazy_static! {
    static ref SYMBOLS: Regex = Regex::new(r"[^\p{L}\p{N}\s]").unwrap();
    static ref SPACES: Regex = Regex::new(r"\s+").unwrap();
  }
  let without_entities = title.replace("&amp;", " ").replace("&amp", " ");
  let without_symbols = SYMBOLS.replace_all(&without_entities, " ");
  SPACES.replace_all(without_symbols.trim(), " ").to_lowercase()
}
