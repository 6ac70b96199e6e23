//! Module for the long-running "watch" functionality.

use tagger::{
  dispatcher::Dispatcher, placement::Placer, tracker::PendingTransfers, watcher::DownloadWatcher,
};

use super::*;

/// Arguments that can be used for the [`Commands::Watch`]
#[derive(Args, Clone)]
pub struct WatchArgs {
  /// Directory browsers download into (overrides `SOURCE_DIR` and the config file)
  #[arg(long)]
  pub source: Option<PathBuf>,

  /// Directory papers are filed into (overrides `TARGET_DIR` and the config file)
  #[arg(long)]
  pub destination: Option<PathBuf>,

  /// Seconds after which an unfinished download is forgotten
  #[arg(long)]
  pub timeout: Option<f64>,

  /// Also write logs to a daily rolling file in this directory
  #[arg(long)]
  pub log_dir: Option<PathBuf>,
}

impl WatchArgs {
  /// Applies the command line overrides on top of `config`.
  fn apply(&self, mut config: Config) -> Config {
    if let Some(source) = &self.source {
      config = config.with_source_dir(source);
    }
    if let Some(destination) = &self.destination {
      config = config.with_destination_dir(destination);
    }
    if let Some(timeout) = self.timeout {
      config = config.with_stale_timeout_secs(timeout);
    }
    config
  }
}

/// Function for the [`Commands::Watch`] in the CLI.
///
/// Runs until Ctrl-C. Invalid configuration is reported before anything is watched.
pub async fn watch<I: UserInteraction>(cli: &Cli, interaction: &I, args: &WatchArgs) -> Result<()> {
  let config = args.apply(load_config(cli)?);
  config.validate()?;
  debug!(?config, "Starting watch");

  let tracker = Arc::new(PendingTransfers::from_config(&config));
  let placer = Placer::from_config(&config);
  let dispatcher = Arc::new(Dispatcher::new(tracker.clone(), resolver(&config)?, placer));

  let sweeper = tracker.spawn_sweeper(config.sweep_interval());
  let watcher = DownloadWatcher::start(&config.source_dir)?;
  interaction.reply(ResponseContent::Info(&format!(
    "Watching {} and filing papers into {} (Ctrl-C to stop)",
    config.source_dir.display(),
    config.destination_dir.display()
  )))?;

  let result = watcher
    .run(dispatcher, async {
      if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for Ctrl-C, stopping: {e}");
      }
    })
    .await;
  sweeper.abort();
  result?;

  interaction.reply(ResponseContent::Success("Stopped watching"))?;
  Ok(())
}
