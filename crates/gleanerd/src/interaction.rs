//! Terminal output and prompts.

use dialoguer::Confirm;
use gleaner::error::ScrapeFailure;

use super::*;
use crate::commands::scrapers::ScraperListing;

/// Prefix for information messages
pub static INFO_PREFIX: &str = "ℹ ";
/// Prefix for progress messages
pub static WORKING_PREFIX: &str = "» ";
/// Prefix for success messages
pub static SUCCESS_PREFIX: &str = "✓ ";
/// Prefix for error messages
pub static ERROR_PREFIX: &str = "✗ ";
/// Prefix for warning messages
pub static WARNING_PREFIX: &str = "! ";
/// Prefix for user prompts
pub static PROMPT_PREFIX: &str = "❯ ";
/// Prefix for an item in a tree
pub static ITEM_PREFIX: &str = "├─";
/// Prefix for the last item in a tree
pub static LAST_ITEM_PREFIX: &str = "└─";

/// Something a command wants to show the user.
#[derive(Debug)]
pub enum ResponseContent<'a> {
  /// Scraped drafts, one tree per draft
  Drafts(&'a [EntityDraft]),
  /// Provider failures of a scrape
  Failures(&'a [ScrapeFailure]),
  /// The configured scrapers
  Scrapers(&'a [ScraperListing]),
  /// An operation completed
  Success(&'a str),
  /// An operation failed
  Error(&'a GleanerdError),
  /// Something worth knowing
  Info(&'a str),
  /// Something that went wrong without failing the command
  Warning(&'a str),
}

/// The ways a command talks to the user.
pub trait UserInteraction {
  /// Asks a yes/no question.
  fn confirm(&self, message: &str) -> Result<bool>;
  /// Shows `content`.
  fn reply(&self, content: ResponseContent) -> Result<()>;
}

/// Interaction through stdout/stderr with `dialoguer` prompts.
#[derive(Debug, Clone, Copy)]
pub struct Terminal {
  /// Answer every question with yes instead of prompting
  accept_defaults: bool,
}

impl Terminal {
  /// Creates a terminal, optionally skipping all prompts.
  pub fn new(accept_defaults: bool) -> Self { Self { accept_defaults } }
}

impl UserInteraction for Terminal {
  fn confirm(&self, message: &str) -> Result<bool> {
    if self.accept_defaults {
      debug!("Accepting default for prompt: {}", message);
      return Ok(true);
    }
    Ok(Confirm::new().with_prompt(format!("{PROMPT_PREFIX}{message}")).default(false).interact()?)
  }

  fn reply(&self, content: ResponseContent) -> Result<()> {
    match content {
      ResponseContent::Drafts(drafts) =>
        for draft in drafts {
          print_draft(draft);
        },
      ResponseContent::Failures(failures) =>
        for failure in failures {
          println!("{} {}", style(WARNING_PREFIX).yellow(), failure);
        },
      ResponseContent::Scrapers(listings) => print_scrapers(listings),
      ResponseContent::Success(message) =>
        println!("{} {}", style(SUCCESS_PREFIX).green(), message),
      ResponseContent::Error(error) => eprintln!("{} {}", style(ERROR_PREFIX).red(), error),
      ResponseContent::Info(message) => println!("{} {}", style(INFO_PREFIX).blue(), message),
      ResponseContent::Warning(message) =>
        println!("{} {}", style(WARNING_PREFIX).yellow(), message),
    }
    Ok(())
  }
}

/// Prints a draft's non-empty fields as a tree under its title.
fn print_draft(draft: &EntityDraft) {
  println!("{} {}", style(SUCCESS_PREFIX).green(), style(&draft.title).bold());

  let mut lines: Vec<(String, String)> = DraftField::ALL
    .into_iter()
    .filter(|field| *field != DraftField::Title)
    .filter_map(|field| draft.get(field).map(|value| (field.to_string(), value)))
    .collect();
  if !draft.tags.is_empty() {
    lines.push(("tags".to_string(), draft.tags.iter().cloned().collect::<Vec<_>>().join(", ")));
  }

  let last = lines.len().saturating_sub(1);
  for (i, (field, value)) in lines.iter().enumerate() {
    let prefix = if i == last { LAST_ITEM_PREFIX } else { ITEM_PREFIX };
    println!("   {} {}: {}", style(prefix).dim(), style(field).cyan(), value);
  }
}

/// Prints one line per scraper, highest priority first.
fn print_scrapers(listings: &[ScraperListing]) {
  let last = listings.len().saturating_sub(1);
  for (i, listing) in listings.iter().enumerate() {
    let prefix = if i == last { LAST_ITEM_PREFIX } else { ITEM_PREFIX };
    let state = match (listing.registered, listing.preference.enable) {
      (false, _) => style("no definition").red(),
      (true, true) => style("enabled").green(),
      (true, false) => style("disabled").dim(),
    };
    println!(
      "{} {:<16} {:>6} {:<14} {}",
      style(prefix).dim(),
      style(&listing.preference.name).bold(),
      listing.preference.priority,
      state,
      style(&listing.preference.description).dim(),
    );
  }
}

/// Shows orchestrator progress in the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalStatus;

impl StatusReporter for TerminalStatus {
  fn set_status(&self, message: &str) { println!("{} {}", style(WORKING_PREFIX).cyan(), message); }
}
