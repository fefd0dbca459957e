//! Handing scraped drafts over to persistence.
//!
//! The library never owns a database. Once drafts are merged they are passed to an
//! [`EntitySink`], whose result does not influence the scrape itself.

use super::*;
use crate::merge::{merge_outputs, ExistingValues};

/// Receives the final drafts of a scrape.
#[async_trait]
pub trait EntitySink: Send + Sync {
  /// Stores `drafts`.
  ///
  /// # Arguments
  ///
  /// * `is_create` - Whether the drafts are new entities rather than updates of stored ones
  /// * `merge_existing` - Whether a draft matching a stored entity should be merged into it
  async fn update(
    &self,
    drafts: &[EntityDraft],
    is_create: bool,
    merge_existing: bool,
  ) -> Result<()>;
}

/// Stores drafts as a pretty-printed JSON array in a single file.
///
/// Stored entities are matched to drafts by DOI, then arXiv id, then normalized title.
///
/// # Examples
///
/// ```no_run
/// use gleaner::{draft::EntityDraft, prelude::*, sink::JsonFileSink};
///
/// # async fn example() -> Result<(), GleanerError> {
/// let sink = JsonFileSink::new("library.json");
/// sink.update(&[EntityDraft::with_title("Neural Nets")], true, true).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileSink {
  /// File holding the JSON array
  path: PathBuf,
}

impl JsonFileSink {
  /// Creates a sink writing to `path`.
  pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

  /// The backing file.
  pub fn path(&self) -> &Path { &self.path }

  /// Reads every stored entity; a missing file holds none.
  pub async fn load(&self) -> Result<Vec<EntityDraft>> {
    match tokio::fs::read(&self.path).await {
      Ok(content) if content.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
      Ok(content) => Ok(serde_json::from_slice(&content)?),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
      Err(e) => Err(e.into()),
    }
  }

  /// Overwrites the file with `records`.
  async fn store(&self, records: &[EntityDraft]) -> Result<()> {
    if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
      tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&self.path, serde_json::to_vec_pretty(records)?).await?;
    Ok(())
  }
}

/// Whether `stored` and `draft` describe the same paper.
fn same_entity(stored: &EntityDraft, draft: &EntityDraft) -> bool {
  let same = |a: Option<String>, b: Option<String>| {
    matches!((a, b), (Some(a), Some(b)) if a.eq_ignore_ascii_case(&b))
  };
  same(stored.get(DraftField::Doi), draft.get(DraftField::Doi))
    || same(stored.get(DraftField::Arxiv), draft.get(DraftField::Arxiv))
    || (!draft.is_empty(DraftField::Title) && stored.normalized_title() == draft.normalized_title())
}

#[async_trait]
impl EntitySink for JsonFileSink {
  async fn update(
    &self,
    drafts: &[EntityDraft],
    is_create: bool,
    merge_existing: bool,
  ) -> Result<()> {
    let mut records = self.load().await?;
    let (mut created, mut updated) = (0, 0);

    for draft in drafts {
      let existing = records.iter().position(|stored| same_entity(stored, draft));
      match existing {
        Some(index) if merge_existing => {
          let update = vec![(0.0, draft.clone())];
          records[index] = merge_outputs(&records[index], update, ExistingValues::Replace);
          updated += 1;
        },
        Some(index) if !is_create => {
          records[index] = draft.clone();
          updated += 1;
        },
        _ if is_create => {
          records.push(draft.clone());
          created += 1;
        },
        _ => debug!("No stored entity matches \"{}\", not updating", draft.title),
      }
    }

    debug!(
      "Storing {} entities in {} ({} new, {} updated)",
      records.len(),
      self.path.display(),
      created,
      updated
    );
    self.store(&records).await
  }
}
