//! Paper metadata as returned by a lookup.
//!
//! A [`MetadataRecord`] carries just what filing a download needs: the title, the ordered
//! author names, and the primary arXiv category. A lookup yields a [`Lookup`], which keeps "no
//! such paper" as an ordinary outcome rather than an error.
//!
//! # Examples
//!
//! ```
//! use tagger::paper::{Lookup, MetadataRecord};
//!
//! let record = MetadataRecord {
//!   title:            "Attention Is All You Need".to_string(),
//!   authors:          vec!["Ashish Vaswani".to_string(), "Noam Shazeer".to_string()],
//!   primary_category: "cs.CL".to_string(),
//! };
//! assert_eq!(record.filename().to_str(), Some("attention_is_all_you_need.pdf"));
//!
//! let lookup = Lookup::Found(record);
//! assert!(lookup.into_record().is_some());
//! ```

use super::*;

/// Metadata for a single paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
  /// The paper's title, with whitespace runs collapsed to single spaces
  pub title:            String,
  /// Author names in the order the paper lists them
  pub authors:          Vec<String>,
  /// Primary classification, e.g. `cs.LG`
  pub primary_category: String,
}

/// Outcome of a successful metadata lookup.
///
/// Transport and service errors are not represented here; they surface as
/// [`TaggerError`] so they can be retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
  /// The identifier matched a paper.
  Found(MetadataRecord),
  /// The identifier is well formed but no paper carries it.
  NotFound,
}

impl MetadataRecord {
  /// The filename this paper is filed under, see [`format::format_title`](crate::format).
  pub fn filename(&self) -> PathBuf {
    PathBuf::from(format!("{}.pdf", format::format_title(&self.title)))
  }
}

impl Lookup {
  /// Returns the record if the lookup found one.
  pub fn into_record(self) -> Option<MetadataRecord> {
    match self {
      Lookup::Found(record) => Some(record),
      Lookup::NotFound => None,
    }
  }
}

impl Display for MetadataRecord {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "\"{}\" by {} [{}]", self.title, self.authors.join(", "), self.primary_category)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_display() {
    let record = MetadataRecord {
      title:            "Foo Bar".into(),
      authors:          vec!["Ada Lovelace".into(), "Alan Turing".into()],
      primary_category: "cs.LO".into(),
    };
    assert_eq!(record.to_string(), "\"Foo Bar\" by Ada Lovelace, Alan Turing [cs.LO]");
    assert_eq!(record.filename(), PathBuf::from("foo_bar.pdf"));
  }

  #[test]
  fn test_not_found_has_no_record() {
    assert_eq!(Lookup::NotFound.into_record(), None);
  }
}
