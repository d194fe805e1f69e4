//! Record flattening
//!
//! A search hit is turned into one flat row by a fixed sequence of
//! extraction steps. Each step reads one block of the record and returns a
//! [`Patch`] of columns to set or remove; the patches are applied in order,
//! so later steps may overwrite or drop what earlier steps produced. A step
//! whose source block is missing returns an empty patch.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::DisplayMode;
use crate::links::{generate_ds_url, make_clickable};
use crate::query::Coordinates;
use crate::record::{display_value, Record};

static SPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(" +").expect("space pattern is valid"));

/// Ordered column → value mapping; overwriting keeps the original position
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
  cells: Vec<(String, String)>,
}

impl Row {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
    let column = column.into();
    let value = value.into();
    match self.cells.iter_mut().find(|(c, _)| *c == column) {
      Some(cell) => cell.1 = value,
      None => self.cells.push((column, value)),
    }
  }

  pub fn remove(&mut self, column: &str) -> Option<String> {
    let pos = self.cells.iter().position(|(c, _)| c == column)?;
    Some(self.cells.remove(pos).1)
  }

  pub fn get(&self, column: &str) -> Option<&str> {
    self.cells.iter().find(|(c, _)| c == column).map(|(_, v)| v.as_str())
  }

  pub fn contains(&self, column: &str) -> bool {
    self.get(column).is_some()
  }

  pub fn columns(&self) -> impl Iterator<Item = &str> {
    self.cells.iter().map(|(c, _)| c.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.cells.iter().map(|(c, v)| (c.as_str(), v.as_str()))
  }

  pub fn len(&self) -> usize {
    self.cells.len()
  }

  pub fn is_empty(&self) -> bool {
    self.cells.is_empty()
  }

  pub fn apply(&mut self, patch: Patch) {
    for (column, value) in patch.set {
      self.insert(column, value);
    }
    for column in patch.remove {
      self.remove(&column);
    }
  }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut row = Row::new();
    for (column, value) in iter {
      row.insert(column, value);
    }
    row
  }
}

/// Columns produced by one extraction step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
  pub set: Vec<(String, String)>,
  pub remove: Vec<String>,
}

impl Patch {
  fn set(&mut self, column: &str, value: impl Into<String>) {
    self.set.push((column.to_string(), value.into()));
  }
}

/// Output target details some steps depend on
#[derive(Debug, Clone)]
pub struct FlattenContext {
  pub display: DisplayMode,
  pub return_data: bool,
  pub host: String,
  pub coordinates: Coordinates,
}

/// `Title`, `Authors` and `URLs` from the description block
pub fn description_columns(record: &Record) -> Patch {
  let mut patch = Patch::default();
  let Some(description) = &record.source.description else {
    return patch;
  };
  if let Some(title) = &description.title {
    patch.set("Title", title.clone());
  }
  if let Some(authors) = &description.authors {
    let names: Vec<&str> = authors.iter().map(|a| a.name.as_str()).collect();
    patch.set("Authors", names.join(","));
  }
  if let Some(urls) = &description.url_refs {
    patch.set("URLs", urls.join(" , "));
  }
  patch
}

/// The last highlighted fragment, with runs of spaces collapsed
pub fn snippet_columns(record: &Record) -> Patch {
  let mut patch = Patch::default();
  let last = record.highlights().into_iter().flat_map(|(_, fragments)| fragments).last();
  if let Some(snippet) = last {
    patch.set("Snippet", SPACE_RUNS.replace_all(&snippet, " "));
  }
  patch
}

/// `cid` for attribute-bearing records, then every identifier by its type
pub fn identifier_columns(record: &Record) -> Patch {
  let mut patch = Patch::default();
  let identifiers = record.source.identifiers.as_deref().unwrap_or_default();
  if record.source.attributes.is_some() {
    for identifier in identifiers.iter().filter(|i| i.kind == "cid") {
      patch.set("cid", identifier.value_text());
    }
  }
  for identifier in identifiers {
    patch.set(&identifier.kind, identifier.value_text());
  }
  patch
}

/// Well-known subject identifiers and the chemical name
pub fn subject_columns(record: &Record) -> Patch {
  let mut patch = Patch::default();
  let Some(subject) = &record.source.subject else {
    return patch;
  };
  for identifier in &subject.identifiers {
    let column = match identifier.kind.as_str() {
      "smiles" => "SMILES",
      "echa_ec_number" => "ec_number",
      "cas_number" => "cas_number",
      "patentid" => "Patent ID",
      _ => continue,
    };
    patch.set(column, identifier.value_text());
  }
  for name in subject.names.iter().filter(|n| n.kind == "chemical_name") {
    patch.set("chemical_name", name.value_text());
  }
  patch
}

/// arXiv and DOI identifiers as links, replacing their raw columns
pub fn link_columns(record: &Record, ctx: &FlattenContext) -> Patch {
  let mut patch = Patch::default();
  for identifier in record.source.identifiers.as_deref().unwrap_or_default() {
    let value = identifier.value_text();
    match identifier.kind.as_str() {
      "arxivid" => {
        let url = format!("https://arxiv.org/abs/{value}");
        patch.set("arXiv", make_clickable(&url, "arXiv", ctx.display));
        patch.remove.push("arxivid".to_string());
      }
      "doi" => {
        patch.set("DOI", make_clickable(&format!("https://doi.org/{value}"), "DOI", ctx.display));
        patch.remove.push("doi".to_string());
      }
      _ => {}
    }
  }
  patch
}

/// Deep link into the Deep Search UI, for notebook display only
pub fn deep_link_column(record: &Record, ctx: &FlattenContext) -> Patch {
  let mut patch = Patch::default();
  if ctx.display != DisplayMode::Notebook || ctx.return_data {
    return patch;
  }
  if let Some(id) = &record.id {
    let url = generate_ds_url(&ctx.host, &ctx.coordinates, id);
    patch.set("DS_URL", make_clickable(&url, "DS", ctx.display));
  }
  patch
}

/// Source filename and top-level field name of the highlighted match
pub fn report_columns(record: &Record) -> Patch {
  let mut patch = Patch::default();
  let filename = record.source.file_info.as_ref().and_then(|f| f.filename.clone());
  for (field, fragments) in record.highlights() {
    if fragments.is_empty() {
      continue;
    }
    if let Some(filename) = &filename {
      patch.set("Report", filename.clone());
    }
    let top = field.split('.').next().unwrap_or(field);
    patch.set("Field", top);
  }
  patch
}

/// Attribute predicates as `key name → value` columns
pub fn predicate_columns(record: &Record) -> Patch {
  let mut patch = Patch::default();
  for attribute in record.source.attributes.as_deref().unwrap_or_default() {
    for predicate in &attribute.predicates {
      if let Some(value) = predicate.resolved_value() {
        patch.set(&predicate.key.name, value);
      }
    }
  }
  patch
}

/// Flatten one record by applying every step in order
pub fn flatten_record(record: &Record, ctx: &FlattenContext) -> Row {
  let patches = [
    description_columns(record),
    snippet_columns(record),
    identifier_columns(record),
    subject_columns(record),
    link_columns(record, ctx),
    deep_link_column(record, ctx),
    report_columns(record),
    predicate_columns(record),
  ];

  let mut row = Row::new();
  for patch in patches {
    row.apply(patch);
  }
  row
}

/// Flatten a raw chemistry result, dropping its internal id
pub fn flatten_json(object: &serde_json::Map<String, serde_json::Value>) -> Row {
  object
    .iter()
    .filter(|(key, _)| key.as_str() != "persistent_id")
    .map(|(key, value)| (key.clone(), display_value(value)))
    .collect()
}
