//! Module for filing a single, already downloaded paper.

use tagger::{dispatcher::Dispatcher, placement::Placer, tracker::PendingTransfers};

use super::*;

/// Arguments that can be used for the [`Commands::Place`]
#[derive(Args, Clone)]
pub struct PlaceArgs {
  /// The downloaded PDF, named after its arXiv identifier
  pub file: PathBuf,

  /// Directory to file into (overrides `TARGET_DIR` and the config file)
  #[arg(long)]
  pub destination: Option<PathBuf>,
}

/// Function for the [`Commands::Place`] in the CLI.
///
/// Runs the same classify, resolve and place pipeline the watcher runs for a completed
/// download.
pub async fn place<I: UserInteraction>(cli: &Cli, interaction: &I, args: &PlaceArgs) -> Result<()> {
  let mut config = load_config(cli)?;
  if let Some(destination) = &args.destination {
    config = config.with_destination_dir(destination);
  }

  let tracker = Arc::new(PendingTransfers::from_config(&config));
  let dispatcher = Dispatcher::new(tracker, resolver(&config)?, Placer::from_config(&config));

  match dispatcher.complete(&args.file).await {
    Outcome::Placed(placement) => interaction.reply(ResponseContent::Placement(&placement))?,
    Outcome::NotFound(identifier) => interaction.reply(ResponseContent::Warning(&format!(
      "No arXiv paper found for {identifier}, leaving {} in place",
      args.file.display()
    )))?,
    Outcome::NotCandidate(_) => return Err(TaggerError::InvalidIdentifier.into()),
    Outcome::SourceMissing(path) => return Err(TaggerError::SourceMissing(path).into()),
    Outcome::LookupFailed(e) | Outcome::PlacementFailed(e) => return Err(e.into()),
  }
  Ok(())
}
