//! Error types for the tagger library.
//!
//! Every fallible operation in this crate returns [`TaggerError`]. Errors fall into three
//! groups that callers treat differently:
//! - Lookup failures (network, HTTP status, timeouts, malformed responses), which are retried
//!   and never confused with a paper simply not existing
//! - Placement failures (missing source, unwritable or occupied destination), which end the
//!   processing of one file
//! - Configuration and startup failures, which are fatal to the process
//!
//! # Examples
//!
//! ```
//! use tagger::error::TaggerError;
//!
//! let err = TaggerError::HttpStatus(503);
//! assert!(err.is_lookup_failure());
//! assert!(err.is_transient());
//!
//! let err = TaggerError::SourceMissing("2310.12345.pdf".into());
//! assert!(!err.is_lookup_failure());
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Error type alias used for the [`tagger`](crate) crate.
pub type Result<T> = core::result::Result<T, TaggerError>;

/// Errors that can occur while detecting, resolving, and filing downloads.
#[derive(Error, Debug)]
pub enum TaggerError {
  /// The provided string is not an arXiv identifier.
  #[error("Invalid identifier format")]
  InvalidIdentifier,

  /// A network request failed.
  ///
  /// This can occur when:
  /// - The network is unavailable
  /// - The server is unreachable
  /// - TLS/SSL errors occur
  #[error(transparent)]
  Network(#[from] reqwest::Error),

  /// The metadata service answered with a non-success HTTP status.
  #[error("Metadata service returned HTTP status {0}")]
  HttpStatus(u16),

  /// The metadata service answered, but the response could not be understood.
  #[error("API error: {0}")]
  ApiError(String),

  /// The metadata lookup did not finish within the configured timeout.
  #[error("Metadata lookup timed out after {0:?}")]
  LookupTimeout(std::time::Duration),

  /// The XML response from the metadata service was malformed.
  #[error(transparent)]
  Xml(#[from] quick_xml::Error),

  /// The completed download disappeared before it could be placed.
  ///
  /// Terminal for the file in question: it is gone, so retrying cannot help.
  #[error("Source file {0:?} no longer exists")]
  SourceMissing(PathBuf),

  /// The destination directory could not be created or written to.
  #[error("Destination {path:?} is not writable: {source}")]
  DestinationUnwritable {
    /// The directory or file that could not be written.
    path:   PathBuf,
    /// The underlying I/O failure.
    source: std::io::Error,
  },

  /// A different paper already occupies the destination filename.
  #[error("Destination {0:?} already exists")]
  DestinationExists(PathBuf),

  /// A file system operation failed.
  #[error(transparent)]
  Path(#[from] std::io::Error),

  /// The filesystem watcher could not be created or failed to (un)register a directory.
  #[error(transparent)]
  Watch(#[from] notify::Error),

  /// The configuration file could not be parsed.
  #[error(transparent)]
  TomlDe(#[from] toml::de::Error),

  /// The configuration could not be serialized.
  #[error(transparent)]
  TomlSer(#[from] toml::ser::Error),

  /// The `.env` file could not be parsed.
  #[error(transparent)]
  DotEnv(#[from] dotenvy::Error),

  /// The configuration is invalid.
  #[error("{0}")]
  Config(String),
}

impl TaggerError {
  /// Whether this error came out of a metadata lookup, as opposed to the filesystem or config.
  pub fn is_lookup_failure(&self) -> bool {
    matches!(
      self,
      TaggerError::Network(_)
        | TaggerError::HttpStatus(_)
        | TaggerError::ApiError(_)
        | TaggerError::LookupTimeout(_)
        | TaggerError::Xml(_)
    )
  }

  /// Whether retrying the same lookup could reasonably succeed.
  ///
  /// Rate limiting and server-side errors are transient, as are timeouts and transport
  /// failures. Malformed responses and client errors are not.
  pub fn is_transient(&self) -> bool {
    match self {
      TaggerError::Network(e) => !e.is_builder() && !e.is_decode(),
      TaggerError::LookupTimeout(_) => true,
      TaggerError::HttpStatus(status) => *status == 429 || (500..600).contains(status),
      _ => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_lookup_failures_are_classified() {
    assert!(TaggerError::HttpStatus(404).is_lookup_failure());
    assert!(TaggerError::ApiError("garbled".into()).is_lookup_failure());
    assert!(TaggerError::LookupTimeout(std::time::Duration::from_secs(1)).is_lookup_failure());
    assert!(!TaggerError::SourceMissing(PathBuf::from("a.pdf")).is_lookup_failure());
    assert!(!TaggerError::Config("bad".into()).is_lookup_failure());
  }

  #[test]
  fn test_transient_statuses() {
    assert!(TaggerError::HttpStatus(429).is_transient());
    assert!(TaggerError::HttpStatus(503).is_transient());
    assert!(!TaggerError::HttpStatus(400).is_transient());
    assert!(!TaggerError::ApiError("garbled".into()).is_transient());
    assert!(TaggerError::LookupTimeout(std::time::Duration::from_secs(1)).is_transient());
  }
}
