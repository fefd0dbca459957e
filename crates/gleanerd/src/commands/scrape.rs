//! Module for scraping metadata from the command line.

use serde::Deserialize;

use super::*;

/// Arguments that can be used for the [`Commands::Scrape`]
#[derive(Args, Clone)]
pub struct ScrapeArgs {
  /// Paper titles, or glob patterns of JSON files holding one draft or an array of drafts
  pub inputs: Vec<String>,

  /// Re-scrape from this scraper only, replacing existing values
  #[arg(long)]
  pub from: Option<String>,

  /// Write the scraped drafts to this JSON file
  #[arg(long, short)]
  pub output: Option<PathBuf>,

  /// Store the scraped drafts in the configured library
  #[arg(long)]
  pub store: bool,

  /// Keep drafts unchanged for providers that fail instead of skipping them
  #[arg(long)]
  pub pass_through: bool,

  /// Number of requests dispatched at once, overriding the configuration
  #[arg(long)]
  pub chunk_size: Option<usize>,
}

/// Contents of a draft file.
#[derive(Deserialize)]
#[serde(untagged)]
enum DraftFile {
  /// An array of drafts
  Many(Vec<EntityDraft>),
  /// A single draft
  One(EntityDraft),
}

/// Turns the command line inputs into drafts.
///
/// An input matching at least one existing file is read as a draft file, anything else is taken
/// as a title. A single-draft file without a `main_url` gets the file's path as its source.
fn collect_drafts(inputs: &[String]) -> Result<Vec<EntityDraft>> {
  let mut drafts = Vec::new();
  for input in inputs {
    let paths = match glob::glob(input) {
      Ok(paths) => paths.collect::<core::result::Result<Vec<_>, _>>()?,
      Err(_) => Vec::new(),
    };
    let files: Vec<PathBuf> = paths.into_iter().filter(|path| path.is_file()).collect();

    if files.is_empty() {
      trace!("Treating {:?} as a title", input);
      drafts.push(EntityDraft::with_title(input.as_str()));
      continue;
    }
    for file in files {
      debug!("Reading drafts from {}", file.display());
      match serde_json::from_slice(&std::fs::read(&file)?)? {
        DraftFile::Many(many) => drafts.extend(many),
        DraftFile::One(draft) if draft.main_url.is_none() => drafts.push(draft.main_url(file)),
        DraftFile::One(draft) => drafts.push(draft),
      }
    }
  }
  Ok(drafts)
}

/// Function for the [`Commands::Scrape`] in the CLI.
pub async fn scrape<I: UserInteraction>(
  interaction: &I,
  config_dir: &Path,
  args: ScrapeArgs,
) -> Result<()> {
  let ScrapeArgs { inputs, from, output, store, pass_through, chunk_size } = args;

  let drafts = collect_drafts(&inputs)?;
  if drafts.is_empty() {
    return Err(GleanerdError::NoInput);
  }

  let mut config = Config::load(config_dir)?;
  if let Some(chunk_size) = chunk_size {
    config = config.with_chunk_size(chunk_size);
  }
  let mut orchestrator =
    config.orchestrator(Arc::new(HttpTransport::new()), Arc::new(TerminalStatus))?;
  if pass_through {
    orchestrator = orchestrator.with_failure_policy(FailurePolicy::PassThrough);
  }

  let count = drafts.len();
  let sink = store.then(|| JsonFileSink::new(&config.library_path));
  let mut report: ScrapeReport = match (&from, &sink) {
    (None, Some(sink)) => orchestrator.scrape_and_store(drafts, sink, true, true).await?,
    (None, None) => orchestrator.scrape_all(drafts).await?,
    (Some(name), Some(sink)) => {
      let report = orchestrator.scrape_from(drafts, name).await?;
      orchestrator.store(report, sink, true, true).await
    },
    (Some(name), None) => orchestrator.scrape_from(drafts, name).await?,
  };

  interaction.reply(ResponseContent::Drafts(&report.drafts))?;
  if !report.errors.is_empty() {
    interaction.reply(ResponseContent::Failures(&report.errors))?;
    interaction.reply(ResponseContent::Warning(&format!(
      "{} of {} drafts had provider failures",
      report.drafts_with_failures(),
      count
    )))?;
  }
  if report.stopped {
    interaction
      .reply(ResponseContent::Warning("Scrape was stopped before all drafts were processed"))?;
  }

  if let Some(output) = output {
    std::fs::write(&output, serde_json::to_vec_pretty(&report.drafts)?)?;
    interaction.reply(ResponseContent::Success(&format!(
      "Wrote {} drafts to {}",
      report.drafts.len(),
      output.display()
    )))?;
  }

  if let Some(sink) = sink {
    if let Some(error) = report.store_error.take() {
      return Err(error.into());
    }
    interaction.reply(ResponseContent::Success(&format!(
      "Stored {} drafts in {}",
      report.drafts.len(),
      sink.path().display()
    )))?;
  }
  Ok(())
}
