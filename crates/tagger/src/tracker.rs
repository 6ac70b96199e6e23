//! Tracking of in-flight downloads.
//!
//! Browsers download into a temporary file (Chromium uses `<name>.crdownload`) and rename it
//! to its final name once the transfer finishes. [`PendingTransfers`] records every temporary
//! file it is told about and, when a rename arrives, decides whether the rename completes one of
//! them.
//!
//! The map of pending transfers is the only shared mutable state in the pipeline. Creation,
//! correlation, and eviction all take the same lock, so an entry is either correlated or
//! evicted, never both, and it is removed at most once.
//!
//! # Examples
//!
//! ```
//! use std::{
//!   path::Path,
//!   time::{Duration, Instant},
//! };
//!
//! use tagger::tracker::{Correlation, PendingTransfers};
//!
//! let tracker = PendingTransfers::new(Duration::from_secs(1));
//! let now = Instant::now();
//!
//! tracker.on_temporary_created(Path::new("dl/tmp1.crdownload"), false, now);
//! let outcome =
//!   tracker.on_renamed(Path::new("dl/tmp1.crdownload"), Path::new("dl/2310.12345.pdf"), false);
//! assert_eq!(outcome, Correlation::Completed("dl/2310.12345.pdf".into()));
//!
//! // The entry was consumed; a repeated rename is no longer recognized.
//! let outcome =
//!   tracker.on_renamed(Path::new("dl/tmp1.crdownload"), Path::new("dl/2310.12345.pdf"), false);
//! assert_eq!(outcome, Correlation::Untracked);
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::{task::JoinHandle, time::MissedTickBehavior};

use super::*;
use crate::configuration::Config;

/// Suffix Chromium-based browsers give to downloads in progress.
pub const CHROMIUM_SUFFIX: &str = ".crdownload";

/// Shortest period the sweeper ticks at.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// A temporary file currently being downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransfer {
  /// Path of the temporary file
  pub temporary_path: PathBuf,
  /// When the temporary file was (last) reported as created
  pub started_at:     Instant,
}

/// Result of matching a rename against the pending transfers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correlation {
  /// The rename finished a tracked download; carries the file's final path.
  Completed(PathBuf),
  /// The rename's source was never tracked, or was already consumed or evicted.
  Untracked,
}

/// The set of downloads in flight, keyed by temporary path.
#[derive(Debug)]
pub struct PendingTransfers {
  /// Start time of every tracked temporary file
  pending:  Mutex<HashMap<PathBuf, Instant>>,
  /// Age beyond which an uncompleted transfer is considered abandoned
  timeout:  Duration,
  /// Filename suffixes that mark a file as a download in progress
  suffixes: Vec<String>,
}

impl PendingTransfers {
  /// Creates an empty tracker recognizing Chromium's `.crdownload` suffix.
  pub fn new(timeout: Duration) -> Self {
    Self {
      pending: Mutex::new(HashMap::new()),
      timeout,
      suffixes: vec![CHROMIUM_SUFFIX.to_string()],
    }
  }

  /// Creates a tracker with the timeout and temporary suffixes from `config`.
  pub fn from_config(config: &Config) -> Self {
    Self::new(config.stale_timeout()).with_suffixes(config.temporary_suffixes.iter().cloned())
  }

  /// Replaces the set of suffixes that mark a temporary file.
  pub fn with_suffixes<S: Into<String>>(mut self, suffixes: impl IntoIterator<Item = S>) -> Self {
    self.suffixes = suffixes.into_iter().map(Into::into).collect();
    self
  }

  /// The age after which an uncompleted transfer is evicted.
  pub fn timeout(&self) -> Duration { self.timeout }

  /// Whether `path` names a download in progress.
  pub fn is_temporary(&self, path: &Path) -> bool {
    path
      .file_name()
      .and_then(|name| name.to_str())
      .is_some_and(|name| self.suffixes.iter().any(|suffix| name.ends_with(suffix.as_str())))
  }

  /// Records that a file was created.
  ///
  /// Only non-directory paths with a temporary suffix are tracked. Re-creating a tracked path
  /// refreshes its start time instead of adding a second entry. Returns whether the path is now
  /// tracked.
  pub fn on_temporary_created(&self, path: &Path, is_dir: bool, now: Instant) -> bool {
    if is_dir || !self.is_temporary(path) {
      trace!("Ignoring creation of {path:?}");
      return false;
    }
    let previous = self.lock().insert(path.to_path_buf(), now);
    debug!(refreshed = previous.is_some(), "Tracking download {path:?}");
    true
  }

  /// Matches a rename against the tracked transfers.
  ///
  /// Correlation depends only on whether `from` is tracked; the shape of `to` is not examined.
  /// A tracked entry is removed, so every transfer completes at most once.
  pub fn on_renamed(&self, from: &Path, to: &Path, is_dir: bool) -> Correlation {
    if is_dir {
      return Correlation::Untracked;
    }
    match self.lock().remove(from) {
      Some(started_at) => {
        debug!(elapsed = ?started_at.elapsed(), "Download {from:?} completed as {to:?}");
        Correlation::Completed(to.to_path_buf())
      },
      None => {
        trace!("Rename of untracked {from:?}");
        Correlation::Untracked
      },
    }
  }

  /// Drops every transfer older than the timeout and returns how many were dropped.
  pub fn evict_stale(&self, now: Instant) -> usize {
    let mut pending = self.lock();
    let before = pending.len();
    pending.retain(|path, started_at| {
      let keep = now.saturating_duration_since(*started_at) <= self.timeout;
      if !keep {
        debug!("Evicting stale download {path:?}");
      }
      keep
    });
    before - pending.len()
  }

  /// Whether `path` is currently tracked.
  pub fn is_tracked(&self, path: &Path) -> bool { self.lock().contains_key(path) }

  /// A copy of the tracked transfers, in no particular order.
  pub fn snapshot(&self) -> Vec<PendingTransfer> {
    self
      .lock()
      .iter()
      .map(|(path, started_at)| PendingTransfer {
        temporary_path: path.clone(),
        started_at:     *started_at,
      })
      .collect()
  }

  /// Number of tracked transfers.
  pub fn len(&self) -> usize { self.lock().len() }

  /// Whether no transfer is tracked.
  pub fn is_empty(&self) -> bool { self.lock().is_empty() }

  /// Spawns a task that evicts stale transfers every `interval`.
  ///
  /// The task runs until the returned handle is aborted. A zero `interval` is raised to one
  /// millisecond.
  pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
    let tracker = Arc::clone(self);
    let interval = interval.max(MIN_SWEEP_INTERVAL);
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(interval);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
      // The first tick completes immediately.
      ticker.tick().await;
      loop {
        ticker.tick().await;
        let evicted = tracker.evict_stale(Instant::now());
        if evicted > 0 {
          debug!(evicted, remaining = tracker.len(), "Swept stale downloads");
        }
      }
    })
  }

  /// Locks the map. A panic while holding the lock cannot leave the map half-updated, so a
  /// poisoned lock is recovered.
  fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Instant>> {
    self.pending.lock().unwrap_or_else(PoisonError::into_inner)
  }
}
