//! Filing completed downloads into the destination directory.
//!
//! [`Placer::place`] moves a finished download to `destination/<normalized title>.pdf`. The
//! move is a rename when source and destination share a volume, and a copy followed by removal
//! of the source otherwise.
//!
//! # Examples
//!
//! ```no_run
//! use std::path::Path;
//!
//! use tagger::{paper::MetadataRecord, placement::Placer};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let placer = Placer::new("papers");
//! let record = MetadataRecord {
//!   title:            "Attention Is All You Need".into(),
//!   authors:          vec!["Ashish Vaswani".into()],
//!   primary_category: "cs.CL".into(),
//! };
//! let source = Path::new("Downloads/1706.03762.pdf");
//! let placement = placer.place(source, &record, "1706.03762").await?;
//! assert_eq!(placement.destination, Path::new("papers/attention_is_all_you_need.pdf"));
//! # Ok(())
//! # }
//! ```

use std::io::ErrorKind;

use super::*;
use crate::configuration::{CollisionPolicy, Config};

/// Record of a file having been filed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
  /// Where the download was
  pub source:      PathBuf,
  /// Where it is now
  pub destination: PathBuf,
  /// The arXiv identifier the download was named after
  pub identifier:  String,
  /// Title of the paper
  pub title:       String,
  /// When the move finished
  pub placed_at:   DateTime<Utc>,
}

/// Moves completed downloads into a destination directory.
#[derive(Debug, Clone)]
pub struct Placer {
  /// Directory papers are filed into
  destination_dir: PathBuf,
  /// Behavior when the destination name is taken
  collision:       CollisionPolicy,
}

impl Placer {
  /// Creates a placer filing into `destination_dir`, refusing to overwrite existing files.
  pub fn new(destination_dir: impl AsRef<Path>) -> Self {
    Self {
      destination_dir: destination_dir.as_ref().to_path_buf(),
      collision:       CollisionPolicy::default(),
    }
  }

  /// Creates a placer with the destination and collision policy from `config`.
  pub fn from_config(config: &Config) -> Self {
    Self::new(&config.destination_dir).with_collision_policy(config.collision)
  }

  /// Sets the behavior for destination names that are already taken.
  pub fn with_collision_policy(mut self, collision: CollisionPolicy) -> Self {
    self.collision = collision;
    self
  }

  /// The directory papers are filed into.
  pub fn destination_dir(&self) -> &Path { &self.destination_dir }

  /// The path a paper would be filed under, ignoring collisions.
  ///
  /// Titles that normalize to nothing fall back to the identifier.
  pub fn destination_for(&self, record: &MetadataRecord, identifier: &str) -> PathBuf {
    let stem = format::format_title(&record.title);
    if stem.trim_matches('_').is_empty() {
      self.destination_dir.join(format!("{identifier}.pdf"))
    } else {
      self.destination_dir.join(format!("{stem}.pdf"))
    }
  }

  /// Moves `source` into the destination directory under the paper's normalized title.
  ///
  /// # Errors
  ///
  /// - [`TaggerError::SourceMissing`] if `source` is gone; the destination is left untouched.
  /// - [`TaggerError::DestinationUnwritable`] if the destination cannot be created or written.
  /// - [`TaggerError::DestinationExists`] if the name is taken and the policy forbids reuse.
  pub async fn place(
    &self,
    source: &Path,
    record: &MetadataRecord,
    identifier: &str,
  ) -> Result<Placement> {
    if !exists(source).await {
      return Err(TaggerError::SourceMissing(source.to_path_buf()));
    }

    ensure_directory_async(&self.destination_dir).await?;
    let preferred = self.destination_for(record, identifier);
    let destination = self.resolve_collision(preferred, identifier).await?;

    move_file(source, &destination).await?;

    let placement = Placement {
      source: source.to_path_buf(),
      destination,
      identifier: identifier.to_string(),
      title: record.title.clone(),
      placed_at: Utc::now(),
    };
    info!(
      source = ?placement.source,
      destination = ?placement.destination,
      identifier = %placement.identifier,
      "Filed \"{}\"",
      placement.title
    );
    Ok(placement)
  }

  /// Applies the collision policy to the preferred destination.
  async fn resolve_collision(&self, preferred: PathBuf, identifier: &str) -> Result<PathBuf> {
    if !exists(&preferred).await {
      return Ok(preferred);
    }
    match self.collision {
      CollisionPolicy::Fail => {
        warn!("Not overwriting existing {preferred:?}");
        Err(TaggerError::DestinationExists(preferred))
      },
      CollisionPolicy::Overwrite => {
        warn!("Overwriting existing {preferred:?}");
        Ok(preferred)
      },
      CollisionPolicy::SuffixIdentifier => {
        let stem = preferred.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        let suffixed = preferred.with_file_name(format!("{stem}_{identifier}.pdf"));
        if exists(&suffixed).await {
          warn!("Both {preferred:?} and {suffixed:?} already exist");
          Err(TaggerError::DestinationExists(suffixed))
        } else {
          debug!("{preferred:?} is taken, using {suffixed:?}");
          Ok(suffixed)
        }
      },
    }
  }
}

/// Creates `dir` and its parents if needed.
///
/// # Errors
///
/// Returns [`TaggerError::DestinationUnwritable`] when the directory cannot be created.
pub fn ensure_directory(dir: &Path) -> Result<()> {
  if dir.is_dir() {
    debug!("Destination directory {dir:?} found");
    return Ok(());
  }
  info!("Destination directory {dir:?} not found, creating it");
  std::fs::create_dir_all(dir)
    .map_err(|source| TaggerError::DestinationUnwritable { path: dir.to_path_buf(), source })
}

/// Async counterpart of [`ensure_directory`], used before every placement.
async fn ensure_directory_async(dir: &Path) -> Result<()> {
  if tokio::fs::metadata(dir).await.is_ok_and(|m| m.is_dir()) {
    return Ok(());
  }
  info!("Destination directory {dir:?} missing, recreating it");
  tokio::fs::create_dir_all(dir)
    .await
    .map_err(|source| TaggerError::DestinationUnwritable { path: dir.to_path_buf(), source })
}

/// Whether `path` exists. Errors while checking count as "does not exist".
async fn exists(path: &Path) -> bool { matches!(tokio::fs::try_exists(path).await, Ok(true)) }

/// Renames `source` to `destination`, copying and deleting across volumes.
async fn move_file(source: &Path, destination: &Path) -> Result<()> {
  let rename_err = match tokio::fs::rename(source, destination).await {
    Ok(()) => return Ok(()),
    Err(e) => e,
  };
  if !exists(source).await {
    return Err(TaggerError::SourceMissing(source.to_path_buf()));
  }
  debug!("Rename to {destination:?} failed ({rename_err}), copying instead");

  if let Err(source_err) = tokio::fs::copy(source, destination).await {
    discard_partial_copy(destination).await;
    if source_err.kind() == ErrorKind::NotFound && !exists(source).await {
      return Err(TaggerError::SourceMissing(source.to_path_buf()));
    }
    return Err(TaggerError::DestinationUnwritable {
      path:   destination.to_path_buf(),
      source: source_err,
    });
  }
  if let Err(e) = tokio::fs::remove_file(source).await {
    warn!("Copied {source:?} to {destination:?} but could not remove the original: {e}");
  }
  Ok(())
}

/// Removes whatever a failed copy left at `destination`, so a later attempt does not collide
/// with it.
async fn discard_partial_copy(destination: &Path) {
  match tokio::fs::symlink_metadata(destination).await {
    Ok(metadata) if metadata.is_file() => {
      if let Err(e) = tokio::fs::remove_file(destination).await {
        warn!("Could not remove partial copy {destination:?}: {e}");
      } else {
        debug!("Removed partial copy {destination:?}");
      }
    },
    _ => {},
  }
}
