//! Filename checks for finished downloads.
//!
//! A browser saves arXiv PDFs under the paper's identifier, e.g. `2310.12345.pdf` or
//! `2310.12345v2.pdf`. Anything else cannot be looked up, so the classifier rejects it before a
//! network request is made.

use super::*;

lazy_static! {
  /// Four ASCII digits, an optional dot, three to five ASCII digits, an optional version, then
  /// `.pdf`.
  static ref CANDIDATE: Regex =
    Regex::new(r"^[0-9]{4}\.?[0-9]{3,5}(?:[vV][0-9]+)?\.pdf$").unwrap();
}

/// Returns whether `filename` plausibly names an arXiv paper.
///
/// Only the basename is examined. The `.pdf` extension is case-sensitive and the whole name
/// must match; there are no partial matches.
///
/// # Examples
///
/// ```
/// use tagger::classifier::is_candidate_identifier;
///
/// assert!(is_candidate_identifier("2310.12345.pdf"));
/// assert!(is_candidate_identifier("/home/me/Downloads/2310.12345v2.pdf"));
/// assert!(!is_candidate_identifier("paper.pdf"));
/// assert!(!is_candidate_identifier("2310.12345.PDF"));
/// ```
pub fn is_candidate_identifier(filename: impl AsRef<Path>) -> bool {
  filename
    .as_ref()
    .file_name()
    .and_then(|name| name.to_str())
    .is_some_and(|name| CANDIDATE.is_match(name))
}

/// Extracts the identifier a candidate filename encodes by stripping its extension.
///
/// Returns [`TaggerError::InvalidIdentifier`] when the filename is not a candidate.
///
/// # Examples
///
/// ```
/// use tagger::classifier::identifier_from_path;
///
/// assert_eq!(identifier_from_path("downloads/2310.12345v2.pdf").unwrap(), "2310.12345v2");
/// assert!(identifier_from_path("downloads/notes.pdf").is_err());
/// ```
pub fn identifier_from_path(path: impl AsRef<Path>) -> Result<String> {
  let path = path.as_ref();
  if !is_candidate_identifier(path) {
    return Err(TaggerError::InvalidIdentifier);
  }
  path
    .file_stem()
    .and_then(|stem| stem.to_str())
    .map(str::to_owned)
    .ok_or(TaggerError::InvalidIdentifier)
}

/// Accepts either a bare identifier or a candidate filename and returns the identifier.
///
/// Used by the one-shot CLI commands, where users type `2310.12345` as readily as the
/// filename.
pub fn normalize_identifier(input: &str) -> Result<String> {
  let trimmed = input.trim();
  if trimmed.ends_with(".pdf") {
    identifier_from_path(trimmed)
  } else {
    identifier_from_path(format!("{trimmed}.pdf"))
  }
}
