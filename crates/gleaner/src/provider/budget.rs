//! Daily request budgets for providers with usage caps.
//!
//! A [`RequestBudget`] counts requests against a [`UsageLedger`]. The ledger is shared by every
//! scraper of a registry and, when backed by a file, written after each spent request so the next
//! run starts from today's count:
//!
//! ```toml
//! [semanticscholar]
//! day = "2024-05-01"
//! spent = 42
//! ```

use std::sync::Mutex;

use chrono::{NaiveDate, Utc};

use super::*;

/// Requests a provider spent on one UTC day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsage {
  /// The day being counted
  pub day:   NaiveDate,
  /// Requests spent on it
  pub spent: u32,
}

/// Request counts of every capped provider, optionally persisted to a TOML file.
#[derive(Debug, Default)]
pub struct UsageLedger {
  /// File the counts are kept in; `None` keeps them in memory only
  path:  Option<PathBuf>,
  /// Counts keyed by provider name
  usage: Mutex<BTreeMap<String, DailyUsage>>,
}

/// Per-day request budget of one provider.
#[derive(Debug)]
pub struct RequestBudget {
  /// Provider the requests are counted for
  provider: String,
  /// Requests allowed per UTC day
  limit:    u32,
  /// Where the requests are counted
  ledger:   Arc<UsageLedger>,
}

impl UsageLedger {
  /// A ledger that forgets its counts when dropped.
  pub fn in_memory() -> Self { Self::default() }

  /// Loads the counts stored at `path`; a missing file holds none.
  ///
  /// # Errors
  ///
  /// Fails if the file exists but cannot be read or is not a valid ledger.
  pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
    let path = path.into();
    let usage = if path.exists() {
      toml::from_str(&std::fs::read_to_string(&path)?)?
    } else {
      trace!("No request usage recorded at {}", path.display());
      BTreeMap::new()
    };
    Ok(Self { path: Some(path), usage: Mutex::new(usage) })
  }

  /// The backing file, if any.
  pub fn path(&self) -> Option<&Path> { self.path.as_deref() }

  /// Requests `provider` spent today.
  pub fn spent(&self, provider: &str) -> u32 { self.spent_on(provider, Utc::now().date_naive()) }

  /// Requests `provider` spent on `day`.
  fn spent_on(&self, provider: &str, day: NaiveDate) -> u32 {
    let Ok(usage) = self.usage.lock() else {
      return 0;
    };
    usage.get(provider).filter(|usage| usage.day == day).map_or(0, |usage| usage.spent)
  }

  /// Spends one of `limit` requests for `provider` on `today`.
  fn try_spend(&self, provider: &str, limit: u32, today: NaiveDate) -> bool {
    let Ok(mut usage) = self.usage.lock() else {
      return false;
    };
    let entry = usage.entry(provider.to_string()).or_insert(DailyUsage { day: today, spent: 0 });
    if entry.day != today {
      *entry = DailyUsage { day: today, spent: 0 };
    }
    if entry.spent >= limit {
      return false;
    }
    entry.spent += 1;
    self.persist(&usage);
    true
  }

  /// Writes `usage` to the backing file; failures only cost the count of later runs.
  fn persist(&self, usage: &BTreeMap<String, DailyUsage>) {
    let Some(path) = &self.path else {
      return;
    };
    let written = toml::to_string(usage)
      .map_err(|e| GleanerError::Config(format!("Failed to serialize request usage: {e}")))
      .and_then(|content| {
        if let Some(parent) = path.parent() {
          std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
      });
    if let Err(e) = written {
      warn!("Failed to record request usage in {}: {}", path.display(), e);
    }
  }
}

impl RequestBudget {
  /// Creates a budget of `limit` requests per UTC day, counted in `ledger`.
  pub fn new(provider: impl Into<String>, limit: u32, ledger: Arc<UsageLedger>) -> Self {
    Self { provider: provider.into(), limit, ledger }
  }

  /// Spends one request, returning `false` once today's budget is exhausted.
  pub fn try_acquire(&self) -> bool { self.try_acquire_on(Utc::now().date_naive()) }

  /// [`RequestBudget::try_acquire`] for an explicit day.
  fn try_acquire_on(&self, today: NaiveDate) -> bool {
    self.ledger.try_spend(&self.provider, self.limit, today)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn day(d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2024, 1, d).unwrap() }

  #[test]
  fn budget_resets_each_day() {
    let budget = RequestBudget::new("capped", 2, Arc::new(UsageLedger::in_memory()));

    assert!(budget.try_acquire_on(day(1)));
    assert!(budget.try_acquire_on(day(1)));
    assert!(!budget.try_acquire_on(day(1)));
    assert!(budget.try_acquire_on(day(2)));
  }

  #[test]
  fn providers_are_counted_separately() {
    let ledger = Arc::new(UsageLedger::in_memory());
    let a = RequestBudget::new("a", 1, ledger.clone());
    let b = RequestBudget::new("b", 1, ledger.clone());

    assert!(a.try_acquire_on(day(1)));
    assert!(!a.try_acquire_on(day(1)));
    assert!(b.try_acquire_on(day(1)));
    assert_eq!(ledger.spent_on("a", day(1)), 1);
    assert_eq!(ledger.spent_on("a", day(2)), 0);
  }

  #[test]
  fn spent_requests_survive_a_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("usage.toml");

    let first = Arc::new(UsageLedger::load(&path).unwrap());
    let budget = RequestBudget::new("capped", 2, first);
    assert!(budget.try_acquire_on(day(1)));
    assert!(budget.try_acquire_on(day(1)));

    let reloaded = Arc::new(UsageLedger::load(&path).unwrap());
    assert_eq!(reloaded.spent_on("capped", day(1)), 2);
    let budget = RequestBudget::new("capped", 2, reloaded);
    assert!(!budget.try_acquire_on(day(1)));
    assert!(budget.try_acquire_on(day(2)));
  }

  #[test]
  fn malformed_ledgers_are_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("usage.toml");
    std::fs::write(&path, "capped = \"lots\"").unwrap();
    assert!(matches!(UsageLedger::load(&path), Err(GleanerError::TomlDe(_))));
  }
}
