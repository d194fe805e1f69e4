//! Clickable links and Deep Search deep links

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::json;

use crate::config::DisplayMode;
use crate::query::Coordinates;

/// Placeholder project used for public collection links
const PUBLIC_PROJECT_KEY: &str = "1234567890abcdefghijklmnopqrstvwyz123456";

/// Fields preselected in the deep-linked search view
const DEEP_LINK_SELECT: &[&str] = &[
  "_name",
  "description.collection",
  "prov",
  "description.title",
  "description.publication_date",
  "description.url_refs",
];

/// Anchor tag in notebooks, the bare URL everywhere else
pub fn make_clickable(url: &str, name: &str, display: DisplayMode) -> String {
  match display {
    DisplayMode::Notebook => format!("<a href=\"{url}\"  target=\"_blank\"> {name} </a>"),
    _ => url.to_string(),
  }
}

/// Everything outside unreserved characters and `/` is escaped
const QUOTE_SET: &AsciiSet =
  &NON_ALPHANUMERIC.remove(b'_').remove(b'.').remove(b'-').remove(b'~').remove(b'/');

pub fn quote(input: &str) -> String {
  utf8_percent_encode(input, QUOTE_SET).to_string()
}

/// Escape non-ASCII characters as `\uXXXX` so the payload stays 7-bit
fn ascii_json(json: &str) -> String {
  let mut out = String::with_capacity(json.len());
  for c in json.chars() {
    if c.is_ascii() {
      out.push(c);
    } else {
      let mut units = [0u16; 2];
      for unit in c.encode_utf16(&mut units) {
        out.push_str(&format!("\\u{unit:04x}"));
      }
    }
  }
  out
}

/// Link that opens a single document in the Deep Search web UI
pub fn generate_ds_url(host: &str, coordinates: &Coordinates, document_hash: &str) -> String {
  let host = host.trim_end_matches('/');
  let base = format!("{host}/projects/{PUBLIC_PROJECT_KEY}/library/public");

  let search = json!({
    "collections": [coordinates.index_key],
    "type": "Document",
    "expression": format!("file-info.document-hash: \"{document_hash}\""),
    "filters": [],
    "select": DEEP_LINK_SELECT,
    "itemIndex": 0,
    "pageSize": 10,
    "searchAfterHistory": [],
    "viewType": "snippets",
    "recordSelection": { "record": { "id": document_hash } },
  });

  let compact = ascii_json(&search.to_string());
  let encoded = quote(&STANDARD.encode(quote(&compact)));
  format!("{base}?search={encoded}")
}
