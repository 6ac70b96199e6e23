//! Title to filename normalization.

/// Characters that cannot appear in a filename on at least one common platform.
const FORBIDDEN: &[char] = &['/', '\\', '\0', '<', '>', ':', '"', '|', '?', '*'];

/// Turns a paper title into a filename stem.
///
/// The title is lower-cased and every space becomes an underscore. Characters that would escape
/// the destination directory or are rejected by common filesystems are dropped. The mapping is
/// deterministic but not injective: different titles can normalize to the same stem.
///
/// # Examples
///
/// ```
/// use tagger::format::format_title;
///
/// assert_eq!(format_title("Attention Is All You Need"), "attention_is_all_you_need");
/// assert_eq!(format_title("TCP/IP: A Survey"), "tcpip_a_survey");
/// ```
pub fn format_title(title: &str) -> String {
  title
    .to_lowercase()
    .chars()
    .filter(|c| !FORBIDDEN.contains(c))
    .map(space_to_underscore)
    .collect()
}

/// Maps a single space to an underscore.
fn space_to_underscore(c: char) -> char {
  if c == ' ' {
    '_'
  } else {
    c
  }
}

/// Collapses every run of whitespace, including line breaks, into a single space.
///
/// arXiv wraps long titles across lines in its feed, so titles pass through this before they
/// are stored in a [`MetadataRecord`](crate::paper::MetadataRecord).
pub fn collapse_whitespace(text: &str) -> String {
  text.split_whitespace().collect::<Vec<_>>().join(" ")
}
