//! Module for listing the configured scrapers.

use super::*;

/// A preference entry together with whether a scraper was built for it.
#[derive(Debug, Clone)]
pub struct ScraperListing {
  /// The user's preference for this scraper
  pub preference: ScraperPreference,
  /// Whether a definition exists so the scraper can actually run
  pub registered: bool,
}

/// Function for the [`Commands::Scrapers`] in the CLI.
pub fn scrapers<I: UserInteraction>(interaction: &I, config_dir: &Path) -> Result<()> {
  let config = Config::load(config_dir)?;
  let registry = config.registry(Arc::new(HttpTransport::new()))?;
  let preferences = config.preferences()?;

  let mut listings: Vec<ScraperListing> = preferences
    .scraper_preferences()
    .into_iter()
    .map(|preference| {
      let registered = registry.get(&preference.name).is_some();
      ScraperListing { preference, registered }
    })
    .collect();
  listings.sort_by(|a, b| b.preference.priority.total_cmp(&a.preference.priority));

  if listings.is_empty() {
    interaction.reply(ResponseContent::Info("No scrapers configured, run `gleaner init` first"))?;
    return Ok(());
  }

  interaction.reply(ResponseContent::Scrapers(&listings))?;
  interaction.reply(ResponseContent::Info(&format!(
    "{} of {} scrapers enabled",
    registry.enabled().len(),
    listings.len()
  )))?;
  Ok(())
}
