//! Command line interface and daemon for filing finished arXiv downloads.
//!
//! This crate provides the `tagger` binary on top of the `tagger` library. It supports:
//! - Watching a download directory and filing every completed arXiv PDF
//! - Writing a configuration file
//! - Looking up a single identifier
//! - Filing a single, already downloaded file
//!
//! # Usage
//!
//! ```bash
//! # Write a configuration file
//! tagger init --source ~/Downloads --destination ~/papers
//!
//! # Watch until Ctrl-C, logging at info level to the terminal and to a daily log file
//! tagger watch --log-dir ~/.local/state/tagger
//!
//! # Look up a paper
//! tagger lookup 1706.03762
//!
//! # File a download by hand
//! tagger place ~/Downloads/1706.03762.pdf
//! ```
//!
//! Configuration is read from the config file, then `SOURCE_DIR`/`TARGET_DIR` from the
//! environment (a `.env` file is honored), then command line flags, each overriding the last.

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::{path::PathBuf, sync::Arc};

use clap::{builder::ArgAction, Args, Parser, Subcommand};
use tagger::{
  configuration::Config, dispatcher::Outcome, error::TaggerError, paper::MetadataRecord,
  placement::Placement,
};
use thiserror::Error;
use tracing::{debug, trace};
use tracing_appender::{
  non_blocking::WorkerGuard,
  rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod commands;
pub mod error;
pub mod interaction;

use crate::{commands::*, error::*, interaction::*};

/// Command line interface configuration and argument parsing
#[derive(Parser)]
#[command(author, version, about = "Files finished arXiv downloads under their paper titles")]
pub struct Cli {
  /// Verbose mode (-v, -vv, -vvv) for different levels of logging detail
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity"
    )]
  verbose: u8,

  /// Path to the configuration file. If not specified, uses the default platform-specific
  /// configuration directory.
  #[arg(long, short, global = true)]
  config: Option<PathBuf>,

  /// The subcommand to execute
  #[command(subcommand)]
  command: Commands,

  /// Skip all prompts and accept defaults (mostly for testing)
  #[arg(long, hide = true, global = true)]
  accept_defaults: bool,
}

impl Cli {
  /// The configuration file in effect.
  fn config_path(&self) -> PathBuf { self.config.clone().unwrap_or_else(Config::default_path) }
}

/// Configures the logging system based on the verbosity level
///
/// The verbosity levels are:
/// - 0: error
/// - 1: warn
/// - 2: info
/// - 3: debug
/// - 4+: trace
///
/// `RUST_LOG` takes precedence when set. With `log_dir`, everything is additionally written to a
/// daily rolling `tagger.*.log` file there; the returned guard flushes it on drop.
fn setup_logging(verbosity: u8, log_dir: Option<&PathBuf>) -> Result<Option<WorkerGuard>> {
  let filter = match verbosity {
    0 => "error",
    1 => "warn",
    2 => "info",
    3 => "debug",
    _ => "trace",
  };

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

  let (file_layer, guard) = match log_dir {
    Some(dir) => {
      let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("tagger")
        .filename_suffix("log")
        .build(dir)?;
      let (writer, guard) = tracing_appender::non_blocking(appender);
      (Some(fmt::layer().with_writer(writer).with_ansi(false).with_target(true)), Some(guard))
    },
    None => (None, None),
  };

  tracing_subscriber::registry()
    .with(filter)
    .with(
      fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(true),
    )
    .with(file_layer)
    .init();

  Ok(guard)
}

/// Entry point for the `tagger` CLI application
///
/// Parses arguments, sets up logging, and runs the requested command. Errors are reported on
/// stderr and turn into a non-zero exit status.
#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  let (verbosity, log_dir) = match &cli.command {
    Commands::Watch(args) => (cli.verbose.max(2), args.log_dir.as_ref()),
    _ => (cli.verbose, None),
  };
  let _guard = setup_logging(verbosity, log_dir)?;
  trace!("Parsed command line");

  let terminal = Terminal { accept_defaults: cli.accept_defaults };
  let result = match &cli.command {
    Commands::Watch(args) => watch(&cli, &terminal, args).await,
    Commands::Init(args) => init(&cli, &terminal, args),
    Commands::Lookup(args) => lookup(&cli, &terminal, args).await,
    Commands::Place(args) => place(&cli, &terminal, args).await,
  };

  if let Err(e) = &result {
    terminal.reply(ResponseContent::Error(e))?;
  }
  result
}
