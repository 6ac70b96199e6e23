//! Download-completion detection and arXiv-based filing of papers.
//!
//! `tagger` watches a download directory for browsers finishing a PDF download, recognizes
//! filenames that encode an arXiv identifier, looks the paper up, and moves the file into a
//! destination directory under a readable name derived from the paper's title.
//!
//! # Features
//!
//! - **Completion tracking**: browsers write to a temporary file (e.g. `.crdownload`) and
//!   rename it once finished. [`tracker::PendingTransfers`] remembers the temporary files and
//!   correlates the final rename back to them.
//! - **Cheap pre-filtering**: [`classifier`] rejects filenames that cannot be arXiv
//!   identifiers before any network request is made.
//! - **Metadata lookup**: [`retriever`] queries the arXiv API with a bounded timeout and
//!   retries transient failures, keeping "no such paper" distinct from transport errors.
//! - **Placement**: [`placement::Placer`] moves the file to `destination/<normalized_title>.pdf`.
//!
//! # Getting Started
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tagger::{
//!   configuration::Config,
//!   dispatcher::Dispatcher,
//!   placement::Placer,
//!   retriever::{ArxivClient, Resolver},
//!   tracker::PendingTransfers,
//!   watcher::DownloadWatcher,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!   let config = Config::default();
//!   config.validate()?;
//!
//!   let tracker = Arc::new(PendingTransfers::from_config(&config));
//!   let resolver = Resolver::from_config(Arc::new(ArxivClient::from_config(&config)?), &config);
//!   let placer = Placer::from_config(&config);
//!   let dispatcher = Arc::new(Dispatcher::new(tracker.clone(), resolver, placer));
//!
//!   let sweeper = tracker.spawn_sweeper(config.sweep_interval());
//!   let watcher = DownloadWatcher::start(&config.source_dir)?;
//!   watcher.run(dispatcher, async { tokio::signal::ctrl_c().await.ok(); }).await?;
//!   sweeper.abort();
//!   Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`classifier`]: filename pattern checks and identifier extraction
//! - [`paper`]: metadata records and lookup outcomes
//! - [`format`]: title normalization into filenames
//! - [`retriever`]: the arXiv client, Atom parsing, retries and the resolver
//! - [`tracker`]: the pending-transfer map and its stale-entry sweeper
//! - [`placement`]: moving finished files into the destination directory
//! - [`dispatcher`]: notification handling and the per-file pipeline
//! - [`watcher`]: bridging `notify` filesystem events into notifications
//! - [`configuration`]: configuration file, environment and validation
//! - [`error`]: the crate error type

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::{
  collections::HashMap,
  fmt::Display,
  path::{Path, PathBuf},
  sync::Arc,
  time::{Duration, Instant},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
#[cfg(test)]
use {tempfile::tempdir, tracing_test::traced_test};

pub mod classifier;
pub mod configuration;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod paper;
pub mod placement;
pub mod retriever;
pub mod tracker;
pub mod watcher;

use crate::{error::*, paper::*};

/// Common traits and types for ergonomic imports.
///
/// ```no_run
/// use tagger::prelude::*;
///
/// async fn lookup(source: &dyn MetadataSource) -> Result<(), TaggerError> {
///   match source.lookup("2310.12345").await? {
///     Lookup::Found(record) => println!("{}", record.title),
///     Lookup::NotFound => println!("not on arXiv"),
///   }
///   Ok(())
/// }
/// ```
pub mod prelude {
  pub use crate::{
    dispatcher::NotificationSink,
    error::TaggerError,
    paper::{Lookup, MetadataRecord},
    retriever::MetadataSource,
  };
}
