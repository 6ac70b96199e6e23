use super::*;

pub mod init;
pub mod lookup;
pub mod place;
pub mod watch;

pub use init::{init, InitArgs};
pub use lookup::{lookup, LookupArgs};
pub use place::{place, PlaceArgs};
pub use watch::{watch, WatchArgs};

/// Available commands for the CLI
#[derive(Subcommand, Clone)]
pub enum Commands {
  /// Watch the download directory and file completed arXiv downloads until Ctrl-C
  Watch(WatchArgs),

  /// Write a configuration file
  Init(InitArgs),

  /// Look up the paper an identifier or filename refers to
  Lookup(LookupArgs),

  /// File an already downloaded paper into the destination directory
  Place(PlaceArgs),
}

/// Loads the configuration in effect: file, then `.env` and environment overrides.
///
/// Command line overrides are applied by each command.
fn load_config(cli: &Cli) -> Result<Config> {
  if Config::load_dotenv()? {
    debug!("Applied .env file");
  }
  Ok(Config::load_or_default(cli.config_path())?.with_env_overrides())
}

/// Builds the resolver described by `config`.
fn resolver(config: &Config) -> Result<tagger::retriever::Resolver> {
  let client = tagger::retriever::ArxivClient::from_config(config)?;
  Ok(tagger::retriever::Resolver::from_config(Arc::new(client), config))
}
