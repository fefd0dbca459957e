//! Module for setting up a [`gleaner`] configuration directory.

use super::*;

/// Function for the [`Commands::Init`] in the CLI.
///
/// Files that already exist are only replaced with `force` or after confirmation.
pub fn init<I: UserInteraction>(interaction: &I, config_dir: &Path, force: bool) -> Result<()> {
  let config = Config::default().with_config_dir(config_dir);

  let overwrite = force
    || (config.config_file().exists()
      && interaction.confirm(&format!(
        "A configuration already exists in {:?}, do you want to reset it to the defaults?",
        config_dir
      ))?);

  let written = config.init(overwrite)?;
  if written.is_empty() {
    interaction.reply(ResponseContent::Info(&format!(
      "Configuration in {:?} is already complete, nothing written",
      config_dir
    )))?;
    return Ok(());
  }

  for path in &written {
    interaction.reply(ResponseContent::Info(&format!("Wrote {}", path.display())))?;
  }
  interaction.reply(ResponseContent::Success(&format!(
    "Initialized gleaner configuration with\nConfig path: {:?}\nLibrary path: {:?}",
    config.config_dir, config.library_path,
  )))?;
  Ok(())
}
