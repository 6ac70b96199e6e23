//! Configuration of the watcher, the lookup, and placement.
//!
//! Configuration is layered. Defaults are overridden by a TOML file, which is overridden by
//! the environment (`SOURCE_DIR`, `TARGET_DIR`, optionally loaded from a `.env` file), which the
//! CLI overrides in turn. [`Config::validate`] must pass before the dispatcher starts.
//!
//! # Examples
//!
//! ```toml
//! source_dir = "/home/me/Downloads"
//! destination_dir = "/home/me/Documents/papers"
//! stale_timeout_secs = 1.0
//! temporary_suffixes = [".crdownload", ".part"]
//! collision = "suffix_identifier"
//! ```

use super::*;

/// Environment variable naming the directory to watch.
pub const SOURCE_DIR_VAR: &str = "SOURCE_DIR";
/// Environment variable naming the directory papers are filed into.
pub const TARGET_DIR_VAR: &str = "TARGET_DIR";
/// Query endpoint of the arXiv API; `{identifier}` is substituted per lookup.
pub const ARXIV_ENDPOINT: &str = "https://export.arxiv.org/api/query?id_list={identifier}";

lazy_static! {
  /// `$VAR`, `${VAR}`, and `%VAR%` references inside environment values.
  static ref ENV_REFERENCE: Regex = Regex::new(r"\$\{(\w+)\}|\$(\w+)|%(\w+)%").unwrap();
}

/// What to do when the destination filename is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
  /// Leave both files where they are and report the collision.
  #[default]
  Fail,
  /// Replace the existing file.
  Overwrite,
  /// Append the arXiv identifier to the new file's name.
  SuffixIdentifier,
}

/// Settings for one watcher instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Directory the browser downloads into
  pub source_dir:          PathBuf,
  /// Directory papers are filed into
  pub destination_dir:     PathBuf,
  /// Seconds after which a download that never completed is forgotten
  pub stale_timeout_secs:  f64,
  /// Seconds between sweeps for stale downloads
  pub sweep_interval_secs: f64,
  /// Seconds a single metadata lookup may take
  pub lookup_timeout_secs: f64,
  /// Attempts per lookup, including the first
  pub lookup_attempts:     u32,
  /// Filename suffixes marking a download in progress
  pub temporary_suffixes:  Vec<String>,
  /// Handling of destination names that are already taken
  pub collision:           CollisionPolicy,
  /// Lookup URL template containing `{identifier}`
  pub endpoint:            String,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      source_dir:          dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
      destination_dir:     Self::default_destination_dir(),
      stale_timeout_secs:  1.0,
      sweep_interval_secs: 1.0,
      lookup_timeout_secs: 30.0,
      lookup_attempts:     3,
      temporary_suffixes:  vec![tracker::CHROMIUM_SUFFIX.to_string()],
      collision:           CollisionPolicy::default(),
      endpoint:            ARXIV_ENDPOINT.to_string(),
    }
  }
}

impl Config {
  /// Returns the default location of the configuration file.
  ///
  /// - On Unix: `~/.config/tagger/config.toml`
  /// - On macOS: `~/Library/Application Support/tagger/config.toml`
  /// - On Windows: `%APPDATA%\tagger\config.toml`
  /// - Fallback: `./tagger/config.toml`
  pub fn default_path() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("tagger").join("config.toml")
  }

  /// Returns the default destination, a `papers` folder in the user's documents.
  pub fn default_destination_dir() -> PathBuf {
    dirs::document_dir().unwrap_or_else(|| PathBuf::from(".")).join("papers")
  }

  /// Reads a configuration file. Missing fields take their defaults.
  pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
  }

  /// Reads the configuration file at `path` if there is one, and the defaults otherwise.
  pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if path.exists() {
      debug!("Loading configuration from {path:?}");
      Self::from_path(path)
    } else {
      debug!("No configuration at {path:?}, using defaults");
      Ok(Self::default())
    }
  }

  /// Writes this configuration to `path`, creating parent directories.
  pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(self)?)?;
    Ok(())
  }

  /// Loads `.env` from the working directory (or an ancestor) into the process environment.
  ///
  /// A missing file is not an error. Returns whether a file was loaded.
  pub fn load_dotenv() -> Result<bool> {
    match dotenvy::dotenv() {
      Ok(path) => {
        debug!("Loaded environment from {path:?}");
        Ok(true)
      },
      Err(err) if err.not_found() => Ok(false),
      Err(err) => Err(err.into()),
    }
  }

  /// Applies `SOURCE_DIR` and `TARGET_DIR` from the process environment.
  pub fn with_env_overrides(self) -> Self {
    self.with_overrides_from(|key| std::env::var(key).ok())
  }

  /// Applies `SOURCE_DIR` and `TARGET_DIR` as returned by `lookup`, expanding variable
  /// references in their values through the same `lookup`.
  pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
    if let Some(source) = lookup(SOURCE_DIR_VAR) {
      self.source_dir = PathBuf::from(expand_env(&source, &lookup));
    }
    if let Some(target) = lookup(TARGET_DIR_VAR) {
      self.destination_dir = PathBuf::from(expand_env(&target, &lookup));
    }
    self
  }

  /// Sets the directory to watch.
  pub fn with_source_dir(mut self, dir: impl AsRef<Path>) -> Self {
    self.source_dir = dir.as_ref().to_path_buf();
    self
  }

  /// Sets the directory papers are filed into.
  pub fn with_destination_dir(mut self, dir: impl AsRef<Path>) -> Self {
    self.destination_dir = dir.as_ref().to_path_buf();
    self
  }

  /// Sets the stale-download timeout in seconds.
  pub fn with_stale_timeout_secs(mut self, secs: f64) -> Self {
    self.stale_timeout_secs = secs;
    self
  }

  /// The stale-download timeout.
  pub fn stale_timeout(&self) -> Duration { seconds(self.stale_timeout_secs) }

  /// The interval between stale-download sweeps.
  pub fn sweep_interval(&self) -> Duration { seconds(self.sweep_interval_secs) }

  /// The per-lookup timeout.
  pub fn lookup_timeout(&self) -> Duration { seconds(self.lookup_timeout_secs) }

  /// Checks the configuration and provisions the destination directory.
  ///
  /// # Errors
  ///
  /// Returns [`TaggerError::Config`] when a setting is out of range or the source directory
  /// cannot be read, and [`TaggerError::DestinationUnwritable`] when the destination cannot be
  /// created or is read-only.
  pub fn validate(&self) -> Result<()> {
    for (name, value) in [
      ("stale_timeout_secs", self.stale_timeout_secs),
      ("sweep_interval_secs", self.sweep_interval_secs),
      ("lookup_timeout_secs", self.lookup_timeout_secs),
    ] {
      if !matches!(Duration::try_from_secs_f64(value), Ok(d) if !d.is_zero()) {
        return Err(TaggerError::Config(format!(
          "{name} must be a positive number of seconds representable as a duration, got {value}"
        )));
      }
    }
    if self.lookup_attempts == 0 {
      return Err(TaggerError::Config("lookup_attempts must be at least 1".into()));
    }
    if self.temporary_suffixes.is_empty() {
      return Err(TaggerError::Config("at least one temporary suffix is required".into()));
    }
    if self.temporary_suffixes.iter().any(|suffix| suffix.is_empty()) {
      return Err(TaggerError::Config("temporary suffixes must not be empty".into()));
    }
    if !self.endpoint.contains("{identifier}") {
      return Err(TaggerError::Config(format!(
        "endpoint {:?} has no {{identifier}} placeholder",
        self.endpoint
      )));
    }

    if !self.source_dir.is_dir() {
      return Err(TaggerError::Config(format!(
        "source directory {:?} does not exist",
        self.source_dir
      )));
    }
    std::fs::read_dir(&self.source_dir).map_err(|e| {
      TaggerError::Config(format!("source directory {:?} is not readable: {e}", self.source_dir))
    })?;

    placement::ensure_directory(&self.destination_dir)?;
    let metadata = std::fs::metadata(&self.destination_dir).map_err(|source| {
      TaggerError::DestinationUnwritable { path: self.destination_dir.clone(), source }
    })?;
    if metadata.permissions().readonly() {
      return Err(TaggerError::DestinationUnwritable {
        path:   self.destination_dir.clone(),
        source: std::io::Error::new(
          std::io::ErrorKind::PermissionDenied,
          "directory is read-only",
        ),
      });
    }
    Ok(())
  }
}

/// Converts a number of seconds into a [`Duration`].
///
/// [`Config::validate`] rejects values this cannot represent or that round to zero; for
/// unvalidated values those fall back to one second.
fn seconds(secs: f64) -> Duration {
  match Duration::try_from_secs_f64(secs) {
    Ok(duration) if !duration.is_zero() => duration,
    _ => Duration::from_secs(1),
  }
}

/// Expands `$VAR`, `${VAR}`, and `%VAR%` references in `value`.
///
/// Unknown variables are left as written.
pub fn expand_env(value: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
  ENV_REFERENCE
    .replace_all(value, |caps: &regex::Captures| {
      let name =
        caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
      lookup(name).unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}
