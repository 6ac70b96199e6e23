//! Module for writing a `tagger` configuration file.

use super::*;

/// Arguments that can be used for the [`Commands::Init`]
#[derive(Args, Clone)]
pub struct InitArgs {
  /// Directory browsers download into
  #[arg(long)]
  pub source:      Option<PathBuf>,
  /// Directory papers are filed into
  #[arg(long)]
  pub destination: Option<PathBuf>,
}

/// Function for the [`Commands::Init`] in the CLI.
pub fn init<I: UserInteraction>(cli: &Cli, interaction: &I, args: &InitArgs) -> Result<()> {
  let path = cli.config_path();

  if path.exists()
    && !interaction.confirm(&format!(
      "A configuration already exists at {}, do you want to overwrite it?",
      path.display()
    ))?
  {
    interaction.reply(ResponseContent::Info("Keeping the existing configuration"))?;
    return Ok(());
  }

  let mut config = Config::default();
  if let Some(source) = &args.source {
    config = config.with_source_dir(source);
  }
  if let Some(destination) = &args.destination {
    config = config.with_destination_dir(destination);
  }
  config.save(&path)?;

  interaction.reply(ResponseContent::Success(&format!(
    "Wrote configuration to {}\nWatching: {}\nFiling into: {}",
    path.display(),
    config.source_dir.display(),
    config.destination_dir.display(),
  )))?;
  Ok(())
}
