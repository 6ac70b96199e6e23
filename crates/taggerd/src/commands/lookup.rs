//! Module for one-off metadata lookups.

use tagger::{classifier, paper::Lookup};

use super::*;

/// Arguments that can be used for the [`Commands::Lookup`]
#[derive(Args, Clone)]
pub struct LookupArgs {
  /// arXiv identifier or download filename
  /// Examples: "2310.12345", "2310.12345v2.pdf"
  pub identifier: String,
}

/// Function for the [`Commands::Lookup`] in the CLI.
pub async fn lookup<I: UserInteraction>(
  cli: &Cli,
  interaction: &I,
  args: &LookupArgs,
) -> Result<()> {
  let identifier = classifier::normalize_identifier(&args.identifier)?;
  let config = load_config(cli)?;

  interaction.reply(ResponseContent::Info(&format!("Looking up {identifier}")))?;
  match resolver(&config)?.resolve(&identifier).await? {
    Lookup::Found(record) => interaction.reply(ResponseContent::Record(&record))?,
    Lookup::NotFound => interaction
      .reply(ResponseContent::Warning(&format!("No arXiv paper found for {identifier}")))?,
  }
  Ok(())
}
