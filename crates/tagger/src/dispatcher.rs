//! Routing of filesystem notifications through the completion pipeline.
//!
//! The [`Dispatcher`] receives [`Notification`]s and feeds them to the
//! [`PendingTransfers`] tracker. When a rename completes a tracked download, the
//! dispatcher spawns a task that classifies the final filename, resolves its identifier, and
//! places the file. Delivery of the next notification never waits on the network or the disk.
//!
//! Every failure of a single file ends that file's pipeline; the dispatcher itself keeps going.

use tokio::task::JoinHandle;

use super::*;
use crate::{
  placement::{Placement, Placer},
  retriever::Resolver,
  tracker::{Correlation, PendingTransfers},
};

/// A filesystem event the dispatcher acts upon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
  /// A file or directory appeared.
  Created {
    /// The new entry
    path:   PathBuf,
    /// Whether the entry is a directory
    is_dir: bool,
  },
  /// An entry was renamed within the watched directory.
  Renamed {
    /// Old path
    from:   PathBuf,
    /// New path
    to:     PathBuf,
    /// Whether the entry is a directory
    is_dir: bool,
  },
}

/// Something that consumes notifications, typically a [`Dispatcher`].
///
/// The watcher depends on this capability rather than on a concrete dispatcher, so it can be
/// driven into any sink.
pub trait NotificationSink: Send + Sync {
  /// Accepts one notification. Must not block on I/O.
  fn notify(&self, notification: Notification);
}

/// How the pipeline ended for one completed download.
#[derive(Debug)]
pub enum Outcome {
  /// The final name does not look like an arXiv identifier.
  NotCandidate(PathBuf),
  /// No paper carries the identifier.
  NotFound(String),
  /// The lookup failed after retries.
  LookupFailed(TaggerError),
  /// The file was filed.
  Placed(Placement),
  /// The file disappeared before it could be placed.
  SourceMissing(PathBuf),
  /// The file could not be moved into the destination.
  PlacementFailed(TaggerError),
}

/// The stages run for a completed download.
struct Pipeline {
  /// Identifier to metadata
  resolver: Resolver,
  /// Metadata to destination
  placer:   Placer,
}

/// Routes notifications to the tracker and runs the pipeline for completed downloads.
#[derive(Clone)]
pub struct Dispatcher {
  /// In-flight downloads
  tracker:  Arc<PendingTransfers>,
  /// Shared with spawned completion tasks
  pipeline: Arc<Pipeline>,
}

impl Dispatcher {
  /// Creates a dispatcher over `tracker`, resolving with `resolver` and filing with `placer`.
  pub fn new(tracker: Arc<PendingTransfers>, resolver: Resolver, placer: Placer) -> Self {
    Self { tracker, pipeline: Arc::new(Pipeline { resolver, placer }) }
  }

  /// The tracker notifications are recorded in.
  pub fn tracker(&self) -> &Arc<PendingTransfers> { &self.tracker }

  /// Handles a notification observed now. See [`Dispatcher::handle_at`].
  pub fn handle(&self, notification: Notification) -> Option<JoinHandle<Outcome>> {
    self.handle_at(notification, Instant::now())
  }

  /// Handles a notification observed at `now`.
  ///
  /// Returns the spawned pipeline task when the notification completed a tracked download,
  /// and `None` otherwise. Must be called from within a tokio runtime.
  pub fn handle_at(
    &self,
    notification: Notification,
    now: Instant,
  ) -> Option<JoinHandle<Outcome>> {
    match notification {
      Notification::Created { path, is_dir } => {
        self.tracker.on_temporary_created(&path, is_dir, now);
        None
      },
      Notification::Renamed { from, to, is_dir } =>
        match self.tracker.on_renamed(&from, &to, is_dir) {
          Correlation::Completed(path) => {
            let pipeline = Arc::clone(&self.pipeline);
            Some(tokio::spawn(async move { pipeline.complete(&path).await }))
          },
          Correlation::Untracked => None,
        },
    }
  }

  /// Runs the pipeline for a download known to be complete, on the current task.
  pub async fn complete(&self, path: &Path) -> Outcome { self.pipeline.complete(path).await }
}

impl NotificationSink for Dispatcher {
  fn notify(&self, notification: Notification) {
    // Completion tasks run detached; their outcome is logged by the pipeline.
    let _ = self.handle(notification);
  }
}

impl Pipeline {
  /// Classifies, resolves, and places `path`, logging the outcome.
  async fn complete(&self, path: &Path) -> Outcome {
    let identifier = match classifier::identifier_from_path(path) {
      Ok(identifier) => identifier,
      Err(_) => {
        debug!("{path:?} is not an arXiv download, leaving it alone");
        return Outcome::NotCandidate(path.to_path_buf());
      },
    };

    let record = match self.resolver.resolve(&identifier).await {
      Ok(Lookup::Found(record)) => record,
      Ok(Lookup::NotFound) => {
        info!("No arXiv paper found for {identifier}, leaving {path:?} in place");
        return Outcome::NotFound(identifier);
      },
      Err(e) => {
        tracing::error!("Lookup of {identifier} failed: {e}");
        return Outcome::LookupFailed(e);
      },
    };
    debug!("Resolved {identifier} to {record}");

    match self.placer.place(path, &record, &identifier).await {
      Ok(placement) => Outcome::Placed(placement),
      Err(TaggerError::SourceMissing(missing)) => {
        warn!("{missing:?} disappeared before it could be filed");
        Outcome::SourceMissing(missing)
      },
      Err(e @ TaggerError::DestinationExists(_)) => {
        warn!("Not filing {path:?}: {e}");
        Outcome::PlacementFailed(e)
      },
      Err(e) => {
        tracing::error!("Failed to file {path:?}: {e}");
        Outcome::PlacementFailed(e)
      },
    }
  }
}
