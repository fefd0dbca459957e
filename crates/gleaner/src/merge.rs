//! Priority-based merging of provider results.
//!
//! Every provider for a draft works on its own copy of the input, concurrently. Afterwards the
//! outputs are folded into one draft here, highest priority first:
//!
//! - A provider *sets* a field when its value is non-empty and differs from the input draft's
//! - A set value is written if the field has no owner yet, or if the provider's priority is
//!   strictly greater than the owner's
//! - Tags are unioned
//!
//! The result therefore only depends on the priorities, never on the order in which responses
//! arrived, and a field can never go back to empty.
//!
//! # Examples
//!
//! ```
//! use gleaner::{
//!   draft::EntityDraft,
//!   merge::{merge_outputs, ExistingValues},
//! };
//!
//! let base = EntityDraft::with_title("Neural Nets");
//! let mut low = base.clone();
//! low.publication = "arXiv".into();
//! let mut high = base.clone();
//! high.publication = "NeurIPS".into();
//!
//! let merged = merge_outputs(&base, vec![(3.0, low), (9.0, high)], ExistingValues::Keep);
//! assert_eq!(merged.publication, "NeurIPS");
//! ```

use super::*;

/// How values already present in the input draft rank against providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExistingValues {
  /// Existing values win over every provider; only empty fields get filled
  #[default]
  Keep,
  /// Every provider may overwrite existing values, as in an explicit re-scrape
  Replace,
}

/// Folds provider outputs into a base draft.
#[derive(Debug, Clone)]
pub struct DraftMerger {
  /// The input draft every provider started from
  base:   EntityDraft,
  /// The merged draft so far
  merged: EntityDraft,
  /// Priority of whoever last wrote each field
  owners: HashMap<DraftField, f64>,
}

impl ExistingValues {
  /// Priority the input draft's own values hold.
  fn owner_priority(self) -> f64 {
    match self {
      ExistingValues::Keep => f64::INFINITY,
      ExistingValues::Replace => f64::NEG_INFINITY,
    }
  }
}

impl DraftMerger {
  /// Starts a merge from the draft every provider received.
  pub fn new(base: &EntityDraft, existing: ExistingValues) -> Self {
    let owners = DraftField::ALL
      .into_iter()
      .filter(|field| !base.is_empty(*field))
      .map(|field| (field, existing.owner_priority()))
      .collect();
    Self { base: base.clone(), merged: base.clone(), owners }
  }

  /// Applies one provider's output.
  ///
  /// Outputs must be applied in descending priority order for ties to resolve to the provider
  /// applied first.
  pub fn apply(&mut self, priority: f64, output: &EntityDraft) -> &mut Self {
    for field in self.base.changed_fields(output) {
      let writable = self.owners.get(&field).map_or(true, |owner| priority > *owner);
      if !writable {
        continue;
      }
      if let Some(value) = output.get(field) {
        trace!("Setting {} to \"{}\" at priority {}", field, value, priority);
        self.merged.set(field, value);
        self.owners.insert(field, priority);
      }
    }
    self.merged.tags.extend(output.tags.iter().cloned());
    self
  }

  /// The merged draft.
  pub fn finish(self) -> EntityDraft { self.merged }
}

/// Merges `(priority, output)` pairs into `base`.
///
/// The outputs are sorted by descending priority first; equal priorities keep their given order.
pub fn merge_outputs(
  base: &EntityDraft,
  mut outputs: Vec<(f64, EntityDraft)>,
  existing: ExistingValues,
) -> EntityDraft {
  outputs.sort_by(|(a, _), (b, _)| b.total_cmp(a));
  let mut merger = DraftMerger::new(base, existing);
  for (priority, output) in &outputs {
    merger.apply(*priority, output);
  }
  merger.finish()
}
