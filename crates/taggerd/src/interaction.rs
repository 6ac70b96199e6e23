//! Terminal output and confirmation prompts.

use console::style;
use dialoguer::Confirm;

use super::*;

/// Prefix for information messages
pub static INFO_PREFIX: &str = "ℹ ";
/// Prefix for success messages
pub static SUCCESS_PREFIX: &str = "✓ ";
/// Prefix for warning messages
pub static WARNING_PREFIX: &str = "⚠️ ";
/// Prefix for error messages
pub static ERROR_PREFIX: &str = "✗ ";
/// Prefix for user prompts
pub static PROMPT_PREFIX: &str = "❯ ";
/// Branch character for detail lines
pub static ITEM_PREFIX: &str = "├─";
/// Branch character for the last detail line
pub static LAST_ITEM_PREFIX: &str = "└─";

/// Something to show the user.
#[derive(Debug)]
pub enum ResponseContent<'a> {
  /// Metadata of a paper
  Record(&'a MetadataRecord),
  /// A completed placement
  Placement(&'a Placement),
  /// Something worked
  Success(&'a str),
  /// Neutral information
  Info(&'a str),
  /// Something the user should look at
  Warning(&'a str),
  /// Something failed
  Error(&'a TaggerdError),
}

/// How commands talk to the user.
pub trait UserInteraction {
  /// Asks a yes/no question.
  fn confirm(&self, message: &str) -> Result<bool>;
  /// Shows `content`.
  fn reply(&self, content: ResponseContent) -> Result<()>;
}

/// The interactive terminal.
#[derive(Debug, Clone, Copy)]
pub struct Terminal {
  /// Answer every question with its default instead of prompting
  pub accept_defaults: bool,
}

impl UserInteraction for Terminal {
  fn confirm(&self, message: &str) -> Result<bool> {
    if self.accept_defaults {
      return Ok(true);
    }
    Ok(
      Confirm::new()
        .with_prompt(format!("{}{}", style(PROMPT_PREFIX).cyan(), message))
        .default(false)
        .interact()?,
    )
  }

  fn reply(&self, content: ResponseContent) -> Result<()> {
    match content {
      ResponseContent::Record(record) => {
        println!("{} {}", style(SUCCESS_PREFIX).green(), style(&record.title).white().bold());
        println!(
          "   {} {} {}",
          style(ITEM_PREFIX).dim(),
          style("Authors:").dim(),
          style(record.authors.join(", ")).white()
        );
        println!(
          "   {} {} {}",
          style(ITEM_PREFIX).dim(),
          style("Category:").dim(),
          style(&record.primary_category).white()
        );
        println!(
          "   {} {} {}",
          style(LAST_ITEM_PREFIX).dim(),
          style("Filename:").dim(),
          style(record.filename().display()).yellow()
        );
      },
      ResponseContent::Placement(placement) => println!(
        "{} Filed {} as {}",
        style(SUCCESS_PREFIX).green(),
        style(placement.source.display()).dim(),
        style(placement.destination.display()).yellow()
      ),
      ResponseContent::Success(message) => println!("{} {message}", style(SUCCESS_PREFIX).green()),
      ResponseContent::Info(message) => println!("{} {message}", style(INFO_PREFIX).cyan()),
      ResponseContent::Warning(message) => println!("{} {message}", style(WARNING_PREFIX).yellow()),
      ResponseContent::Error(error) =>
        eprintln!("{} {}", style(ERROR_PREFIX).red(), style(error).red()),
    }
    Ok(())
  }
}
