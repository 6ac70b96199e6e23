//! Bridging OS filesystem events into [`Notification`]s.
//!
//! [`DownloadWatcher`] registers a non-recursive watch on the download directory with the
//! platform's recommended `notify` backend. Its callback runs on a `notify` thread and forwards
//! raw events over a bounded channel; [`DownloadWatcher::run`] receives them on the runtime,
//! translates them, and hands the result to a [`NotificationSink`].
//!
//! Backends report renames differently. inotify emits a `From` half, a `To` half, and then a
//! combined event, all sharing a tracker cookie. Windows emits the two halves back to back
//! without a cookie. FSEvents reports each path with an unspecified rename mode. The
//! translation pairs halves so that every rename inside the directory reaches the sink exactly
//! once as [`Notification::Renamed`].

use std::{collections::VecDeque, future::Future};

use notify::{
  event::{CreateKind, ModifyKind, RenameMode},
  Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use tokio::sync::mpsc;

use super::*;
use crate::dispatcher::{Notification, NotificationSink};

/// Capacity of the channel between the `notify` thread and the runtime.
const CHANNEL_CAPACITY: usize = 256;

/// How many unpaired rename sources are remembered.
const UNPAIRED_RENAMES: usize = 64;

/// A running watch on a single directory.
pub struct DownloadWatcher {
  /// Keeps the OS watch alive
  watcher:   RecommendedWatcher,
  /// The watched directory
  directory: PathBuf,
  /// Raw events from the `notify` thread
  events:    mpsc::Receiver<notify::Result<Event>>,
}

impl DownloadWatcher {
  /// Starts watching `directory`, without descending into subdirectories.
  ///
  /// # Errors
  ///
  /// Returns [`TaggerError::Watch`] if the backend cannot be initialized or the directory
  /// cannot be watched.
  pub fn start(directory: impl AsRef<Path>) -> Result<Self> {
    let directory = directory.as_ref().to_path_buf();
    let (tx, events) = mpsc::channel(CHANNEL_CAPACITY);

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
      // Fails only once the receiver is gone, i.e. during shutdown.
      let _ = tx.blocking_send(res);
    })?;
    watcher.watch(&directory, RecursiveMode::NonRecursive)?;
    info!("Watching {directory:?} for completed downloads");

    Ok(Self { watcher, directory, events })
  }

  /// The watched directory.
  pub fn directory(&self) -> &Path { &self.directory }

  /// Delivers notifications to `sink` until `shutdown` completes, then stops watching.
  ///
  /// # Errors
  ///
  /// Returns [`TaggerError::Watch`] if the backend stops delivering events.
  pub async fn run<S>(mut self, sink: Arc<S>, shutdown: impl Future<Output = ()>) -> Result<()>
  where S: NotificationSink + ?Sized {
    tokio::pin!(shutdown);
    let mut pairer = RenamePairer::default();

    loop {
      tokio::select! {
        () = &mut shutdown => {
          info!("Stopping watch on {:?}", self.directory);
          break;
        },
        event = self.events.recv() => match event {
          Some(Ok(event)) => {
            trace!(?event, "Filesystem event");
            for notification in pairer.translate(event) {
              sink.notify(notification);
            }
          },
          Some(Err(e)) => warn!("Filesystem watcher error: {e}"),
          None => return Err(notify::Error::generic("filesystem event stream ended").into()),
        },
      }
    }

    if let Err(e) = self.watcher.unwatch(&self.directory) {
      debug!("Could not unwatch {:?}: {e}", self.directory);
    }
    Ok(())
  }
}

/// Turns raw `notify` events into notifications, pairing split renames.
#[derive(Debug, Default)]
struct RenamePairer {
  /// Rename sources still waiting for their destination, oldest first
  unpaired: VecDeque<(Option<usize>, PathBuf)>,
}

impl RenamePairer {
  /// Translates one event. Most events translate to nothing.
  fn translate(&mut self, event: Event) -> Vec<Notification> {
    match event.kind {
      EventKind::Create(kind) => event
        .paths
        .into_iter()
        .map(|path| {
          let is_dir = match kind {
            CreateKind::Folder => true,
            CreateKind::File => false,
            _ => path.is_dir(),
          };
          Notification::Created { path, is_dir }
        })
        .collect(),
      EventKind::Modify(ModifyKind::Name(mode)) => {
        let tracker = event.tracker();
        let mut paths = event.paths.into_iter();
        match (mode, paths.next(), paths.next()) {
          (RenameMode::Both, Some(from), Some(to)) => {
            if tracker.is_some() {
              self.unpaired.retain(|(cookie, _)| *cookie != tracker);
            }
            vec![renamed(from, to)]
          },
          (RenameMode::From, Some(from), _) => {
            self.remember(tracker, from);
            Vec::new()
          },
          // inotify follows a cookie-carrying `To` with a combined event.
          (RenameMode::To, Some(_), _) if tracker.is_some() => Vec::new(),
          (RenameMode::To, Some(to), _) => self.pair(to),
          (RenameMode::Any | RenameMode::Other, Some(path), _) =>
            if path.exists() {
              self.pair(path)
            } else {
              self.remember(tracker, path);
              Vec::new()
            },
          _ => Vec::new(),
        }
      },
      _ => Vec::new(),
    }
  }

  /// Stores a rename source until its destination arrives.
  fn remember(&mut self, tracker: Option<usize>, from: PathBuf) {
    if self.unpaired.len() == UNPAIRED_RENAMES {
      self.unpaired.pop_front();
    }
    self.unpaired.push_back((tracker, from));
  }

  /// Pairs a destination with the most recent source that has no cookie.
  fn pair(&mut self, to: PathBuf) -> Vec<Notification> {
    let index = self.unpaired.iter().rposition(|(cookie, _)| cookie.is_none());
    match index.and_then(|index| self.unpaired.remove(index)) {
      Some((_, from)) => vec![renamed(from, to)],
      None => {
        trace!("Rename into {to:?} from outside the watched directory");
        Vec::new()
      },
    }
  }
}

/// A rename notification, with the directory check made against the new path.
fn renamed(from: PathBuf, to: PathBuf) -> Notification {
  let is_dir = to.is_dir();
  Notification::Renamed { from, to, is_dir }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;

  fn rename_event(mode: RenameMode, paths: &[&str], tracker: Option<usize>) -> Event {
    let mut event = Event::new(EventKind::Modify(ModifyKind::Name(mode)));
    for path in paths {
      event = event.add_path(PathBuf::from(path));
    }
    match tracker {
      Some(cookie) => event.set_tracker(cookie),
      None => event,
    }
  }

  fn expected(from: &str, to: &str) -> Notification {
    Notification::Renamed { from: from.into(), to: to.into(), is_dir: false }
  }

  #[test]
  fn test_inotify_rename_is_reported_once() {
    let mut pairer = RenamePairer::default();
    let from = "/nonexistent/tmp1.crdownload";
    let to = "/nonexistent/2310.12345.pdf";

    assert!(pairer.translate(rename_event(RenameMode::From, &[from], Some(7))).is_empty());
    assert!(pairer.translate(rename_event(RenameMode::To, &[to], Some(7))).is_empty());
    assert_eq!(pairer.translate(rename_event(RenameMode::Both, &[from, to], Some(7))), vec![
      expected(from, to)
    ]);
    assert!(pairer.unpaired.is_empty());
  }

  #[test]
  fn test_split_rename_without_cookie() {
    let mut pairer = RenamePairer::default();
    let from = "/nonexistent/tmp1.crdownload";
    let to = "/nonexistent/2310.12345.pdf";

    assert!(pairer.translate(rename_event(RenameMode::From, &[from], None)).is_empty());
    assert_eq!(pairer.translate(rename_event(RenameMode::To, &[to], None)), vec![expected(
      from, to
    )]);
    assert!(pairer.translate(rename_event(RenameMode::To, &[to], None)).is_empty());
  }

  #[test]
  fn test_any_mode_pairs_by_existence() {
    let dir = tempdir().unwrap();
    let from = dir.path().join("tmp1.crdownload");
    let to = dir.path().join("2310.12345.pdf");
    std::fs::write(&to, b"%PDF").unwrap();

    let mut pairer = RenamePairer::default();
    let from_str = from.to_str().unwrap();
    let to_str = to.to_str().unwrap();
    assert!(pairer.translate(rename_event(RenameMode::Any, &[from_str], None)).is_empty());
    assert_eq!(pairer.translate(rename_event(RenameMode::Any, &[to_str], None)), vec![
      Notification::Renamed { from, to, is_dir: false }
    ]);
  }

  #[test]
  fn test_create_events() {
    let mut pairer = RenamePairer::default();
    let event = Event::new(EventKind::Create(CreateKind::File))
      .add_path(PathBuf::from("/nonexistent/tmp1.crdownload"));
    assert_eq!(pairer.translate(event), vec![Notification::Created {
      path:   PathBuf::from("/nonexistent/tmp1.crdownload"),
      is_dir: false,
    }]);

    let event = Event::new(EventKind::Create(CreateKind::Folder))
      .add_path(PathBuf::from("/nonexistent/sub.crdownload"));
    assert_eq!(pairer.translate(event), vec![Notification::Created {
      path:   PathBuf::from("/nonexistent/sub.crdownload"),
      is_dir: true,
    }]);
  }

  #[test]
  fn test_other_events_are_ignored() {
    let mut pairer = RenamePairer::default();
    let event = Event::new(EventKind::Modify(ModifyKind::Any))
      .add_path(PathBuf::from("/nonexistent/2310.12345.pdf"));
    assert!(pairer.translate(event).is_empty());
  }

  #[test]
  fn test_unpaired_sources_are_bounded() {
    let mut pairer = RenamePairer::default();
    for i in 0..UNPAIRED_RENAMES + 10 {
      let path = format!("/nonexistent/{i}.crdownload");
      pairer.translate(rename_event(RenameMode::From, &[path.as_str()], None));
    }
    assert_eq!(pairer.unpaired.len(), UNPAIRED_RENAMES);
  }

  /// Collects everything it is notified of.
  #[derive(Default)]
  struct Recorder(Mutex<Vec<Notification>>);

  impl NotificationSink for Recorder {
    fn notify(&self, notification: Notification) { self.0.lock().unwrap().push(notification); }
  }

  #[cfg(target_os = "linux")]
  #[traced_test]
  #[tokio::test(flavor = "multi_thread")]
  async fn test_watches_real_directory() {
    let dir = tempdir().unwrap();
    let directory = dir.path().canonicalize().unwrap();
    let watcher = DownloadWatcher::start(&directory).unwrap();
    let recorder = Arc::new(Recorder::default());
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();

    let task = tokio::spawn(watcher.run(recorder.clone(), async move {
      stopped.await.ok();
    }));

    let temporary = directory.join("tmp1.crdownload");
    let finished = directory.join("2310.12345.pdf");
    std::fs::write(&temporary, b"%PDF").unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    std::fs::rename(&temporary, &finished).unwrap();

    let expected_rename =
      Notification::Renamed { from: temporary.clone(), to: finished.clone(), is_dir: false };
    for _ in 0..50 {
      if recorder.0.lock().unwrap().contains(&expected_rename) {
        break;
      }
      tokio::time::sleep(Duration::from_millis(100)).await;
    }

    stop.send(()).unwrap();
    task.await.unwrap().unwrap();

    let seen = recorder.0.lock().unwrap().clone();
    assert!(seen.contains(&Notification::Created { path: temporary, is_dir: false }));
    assert_eq!(seen.iter().filter(|n| **n == expected_rename).count(), 1);
  }
}
