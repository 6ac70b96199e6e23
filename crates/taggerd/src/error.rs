//! Error types for the `tagger` command line.

use super::*;

/// Errors that end a `tagger` invocation.
#[derive(Error, Debug)]
pub enum TaggerdError {
  /// Any error from the tagger library.
  #[error(transparent)]
  Tagger(#[from] TaggerError),

  /// A confirmation prompt failed, e.g. because no terminal is attached.
  #[error(transparent)]
  Dialog(#[from] dialoguer::Error),

  /// Writing to the terminal failed.
  #[error(transparent)]
  Io(#[from] std::io::Error),

  /// The log file could not be opened.
  #[error(transparent)]
  LogFile(#[from] tracing_appender::rolling::InitError),
}

/// Result alias used throughout the binary.
pub type Result<T> = core::result::Result<T, TaggerdError>;
