//! Parsing of arXiv Atom feeds.

use quick_xml::{
  events::{BytesStart, Event},
  Reader,
};

use super::*;

/// Fields collected from one `<entry>` while reading.
#[derive(Debug, Default)]
struct EntryFields {
  /// `<id>`, used to spot the API's error entries
  id:               String,
  /// `<title>` text, possibly spanning several text events
  title:            String,
  /// `<author><name>` values in document order
  authors:          Vec<String>,
  /// `term` of `<arxiv:primary_category>`
  primary_category: Option<String>,
  /// `term` of the first plain `<category>`
  first_category:   Option<String>,
}

impl EntryFields {
  /// Converts the entry into a record, or `None` for error and empty entries.
  fn into_record(self) -> Option<MetadataRecord> {
    if self.id.contains("api/errors") {
      debug!("Skipping error entry {}", self.id);
      return None;
    }
    let title = format::collapse_whitespace(&self.title);
    if title.is_empty() {
      return None;
    }
    Some(MetadataRecord {
      title,
      authors: self.authors,
      primary_category: self.primary_category.or(self.first_category).unwrap_or_default(),
    })
  }
}

/// Reads an Atom feed and returns the first usable entry.
///
/// An empty feed, or one holding only error entries, is [`Lookup::NotFound`].
pub(super) fn parse_feed(data: &[u8]) -> Result<Lookup> {
  let mut reader = Reader::from_reader(data);
  let mut buf = Vec::new();
  let mut path: Vec<String> = Vec::new();
  let mut entry: Option<EntryFields> = None;

  loop {
    match reader.read_event_into(&mut buf)? {
      Event::Start(e) => {
        if let Some(fields) = entry.as_mut() {
          read_category(fields, &e);
        }
        let name = local_name(&e);
        if name == "entry" && entry.is_none() {
          entry = Some(EntryFields::default());
        }
        path.push(name);
      },
      Event::Empty(e) =>
        if let Some(fields) = entry.as_mut() {
          read_category(fields, &e);
        },
      Event::Text(e) =>
        if let (Some(fields), Ok(text)) = (entry.as_mut(), e.unescape()) {
          match element_in_entry(&path).as_slice() {
            ["id"] => fields.id.push_str(text.trim()),
            ["title"] => fields.title.push_str(&text),
            ["author", "name"] => fields.authors.push(format::collapse_whitespace(&text)),
            _ => (),
          }
        },
      Event::End(_) => {
        if path.pop().as_deref() == Some("entry") {
          if let Some(record) = entry.take().and_then(EntryFields::into_record) {
            return Ok(Lookup::Found(record));
          }
        }
      },
      Event::Eof => break,
      _ => (),
    }
    buf.clear();
  }

  Ok(Lookup::NotFound)
}

/// Element names below the innermost `entry` on `path`.
fn element_in_entry(path: &[String]) -> Vec<&str> {
  match path.iter().rposition(|name| name == "entry") {
    Some(index) => path[index + 1..].iter().map(String::as_str).collect(),
    None => Vec::new(),
  }
}

/// Local (namespace-stripped) name of an element.
fn local_name(e: &BytesStart) -> String {
  String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Records the `term` of a category element.
fn read_category(fields: &mut EntryFields, e: &BytesStart) {
  let name = local_name(e);
  if name != "primary_category" && name != "category" {
    return;
  }
  let term = e
    .attributes()
    .flatten()
    .find(|attr| attr.key.local_name().as_ref() == b"term")
    .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()));
  let Some(term) = term else { return };

  if name == "primary_category" {
    fields.primary_category.get_or_insert(term);
  } else {
    fields.first_category.get_or_insert(term);
  }
}
