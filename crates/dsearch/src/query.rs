//! Query builder for collection searches
//!
//! Turns the parsed `search-collection` inputs into a [`QueryPlan`]: the
//! collection is resolved against the live collection list, the `USING`
//! parameters are parsed with their legacy aliases, and the source fields,
//! highlighting and year aggregation are chosen from the show mode and
//! display mode.

use serde::Serialize;
use serde_json::{json, Value};

use crate::backend::Collection;
use crate::config::DisplayMode;
use crate::error::{DsError, Result};

pub const DEFAULT_COLLECTION: &str = "pubchem";
pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_ELASTIC_ID: &str = "default";
pub const DEFAULT_SLOP: u32 = 3;

const NOTEBOOK_PRE_TAG: &str = "<span style='font-weight: bold; background-color: #FFFF00'>";
const NOTEBOOK_POST_TAG: &str = "</span>";
const TERMINAL_PRE_TAG: &str = "<green>";
const TERMINAL_POST_TAG: &str = "</green>";

/// Canonical parameter names and the legacy alias each one accepts
const PARAMETERS: &[(&str, Option<&str>)] = &[
  ("elastic_page_size", Some("page_size")),
  ("elastic_id", Some("system_id")),
  ("slop", Some("edit_distance")),
  ("limit_results", None),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ShowMode {
  /// Structures and properties
  Data,
  /// Titles, authors and highlighted snippets
  Docs,
}

/// Parse `name=value` pairs, rejecting names outside the accepted set
pub fn parse_using_clause(pairs: &[String]) -> Result<Vec<(String, String)>> {
  let mut parsed = Vec::new();
  for pair in pairs {
    let Some((name, value)) = pair.split_once('=') else {
      return Err(DsError::invalid_parameter(format!("Expected name=value, got '{pair}'")));
    };
    let name = name.trim().to_lowercase();
    let value = value.trim().trim_matches(|c| c == '\'' || c == '"').to_string();

    let known = PARAMETERS
      .iter()
      .any(|(canonical, alias)| name == *canonical || Some(name.as_str()) == *alias);
    if !known {
      let accepted: Vec<&str> = PARAMETERS
        .iter()
        .flat_map(|(canonical, alias)| std::iter::once(*canonical).chain(*alias))
        .collect();
      return Err(DsError::invalid_parameter(format!(
        "Unknown parameter '{name}', expected one of: {}",
        accepted.join(", ")
      )));
    }
    parsed.push((name, value));
  }
  Ok(parsed)
}

/// Tunables for one collection search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
  pub page_size: usize,
  pub elastic_id: String,
  pub slop: u32,
  /// Row cap applied after collection; 0 keeps every row
  pub limit_results: usize,
}

impl Default for SearchParams {
  fn default() -> Self {
    Self {
      page_size: DEFAULT_PAGE_SIZE,
      elastic_id: DEFAULT_ELASTIC_ID.to_string(),
      slop: DEFAULT_SLOP,
      limit_results: 0,
    }
  }
}

impl SearchParams {
  /// Build from a `USING` clause; canonical names win over their aliases
  pub fn from_using(pairs: &[String]) -> Result<Self> {
    let parsed = parse_using_clause(pairs)?;
    let lookup = |canonical: &str| lookup_parameter(&parsed, canonical);

    let mut params = Self::default();
    if let Some(value) = lookup("elastic_page_size") {
      params.page_size = parse_number("elastic_page_size", value)?;
      if params.page_size == 0 {
        return Err(DsError::invalid_parameter("elastic_page_size must be greater than 0"));
      }
    }
    if let Some(value) = lookup("elastic_id") {
      params.elastic_id = value.to_string();
    }
    if let Some(value) = lookup("slop") {
      params.slop = parse_number("slop", value)?;
    }
    if let Some(value) = lookup("limit_results") {
      params.limit_results = parse_number("limit_results", value)?;
    }
    Ok(params)
  }
}

fn lookup_parameter<'a>(parsed: &'a [(String, String)], canonical: &str) -> Option<&'a str> {
  let alias = PARAMETERS.iter().find(|(name, _)| *name == canonical).and_then(|(_, alias)| *alias);
  let value_of = |wanted: &str| {
    parsed.iter().rev().find(|(name, _)| name == wanted).map(|(_, value)| value.as_str())
  };
  value_of(canonical).or_else(|| alias.and_then(value_of))
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
  value
    .parse()
    .map_err(|_| {
      DsError::invalid_parameter(format!("{name} expects a whole number, got '{value}'"))
    })
}

/// Which field groups a search pulls back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShowSelection {
  pub data: bool,
  pub docs: bool,
}

impl ShowSelection {
  pub fn from_modes(modes: &[ShowMode]) -> Self {
    Self { data: modes.contains(&ShowMode::Data), docs: modes.contains(&ShowMode::Docs) }
  }

  pub fn source_fields(&self) -> Vec<String> {
    let fields: Vec<&str> = match (self.data, self.docs) {
      (false, false) => vec!["subject", "attributes", "identifiers", "file-info.filename"],
      (data, docs) => {
        let mut fields = Vec::new();
        if data {
          fields.extend(["subject", "attributes", "identifiers"]);
        }
        if docs {
          fields.extend([
            "description.title",
            "description.authors",
            "file-info.filename",
            "identifiers",
          ]);
        }
        fields
      }
    };
    fields.into_iter().map(String::from).collect()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlight {
  pub fields: Value,
  pub fragment_size: u32,
  pub pre_tags: Vec<String>,
  pub post_tags: Vec<String>,
}

impl Highlight {
  /// Whole-field highlighting on every field
  pub fn new(pre_tag: &str, post_tag: &str) -> Self {
    Self {
      fields: json!({ "*": {} }),
      fragment_size: 0,
      pre_tags: vec![pre_tag.to_string()],
      post_tags: vec![post_tag.to_string()],
    }
  }
}

/// Opening and closing highlight markers for the output target
pub fn highlight_tags(
  display: DisplayMode,
  saving: bool,
  return_data: bool,
) -> (&'static str, &'static str) {
  if saving || return_data {
    return ("", "");
  }
  match display {
    DisplayMode::Notebook => (NOTEBOOK_PRE_TAG, NOTEBOOK_POST_TAG),
    _ => (TERMINAL_PRE_TAG, TERMINAL_POST_TAG),
  }
}

/// Where a query runs: an index inside an elastic system
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coordinates {
  pub elastic_id: String,
  pub index_key: String,
}

/// Year histogram over publication dates, requested with every data query
pub fn year_aggregation() -> Value {
  json!({
    "by_year": {
      "date_histogram": {
        "field": "description.publication_date",
        "calendar_interval": "year",
        "format": "yyyy",
        "min_doc_count": 0
      }
    }
  })
}

/// A free-text query against one collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQuery {
  pub query: String,
  pub source: Vec<String>,
  pub limit: usize,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub highlight: Option<Highlight>,
  #[serde(skip)]
  pub coordinates: Coordinates,
  pub aggregations: Value,
}

impl DataQuery {
  pub fn new(query: impl Into<String>, coordinates: Coordinates) -> Self {
    Self {
      query: query.into(),
      source: ShowSelection::default().source_fields(),
      limit: DEFAULT_PAGE_SIZE,
      highlight: None,
      coordinates,
      aggregations: year_aggregation(),
    }
  }

  /// Same query with a zero page size, used to read the total count
  pub fn count_only(&self) -> Self {
    Self { limit: 0, ..self.clone() }
  }
}

/// Append the edit-distance suffix to raw query text
pub fn fuzzy_text(query: &str, slop: u32) -> String {
  format!("{query} ~{slop}")
}

/// Sort collections by case-insensitive name
pub fn sort_collections(collections: &mut [Collection]) {
  collections.sort_by_key(|c| c.name.to_lowercase());
}

/// Find a collection by exact key, falling back to exact name
pub fn resolve_collection<'a>(
  collections: &'a [Collection],
  name_or_key: &str,
) -> Result<&'a Collection> {
  collections
    .iter()
    .find(|c| c.index_key == name_or_key)
    .or_else(|| collections.iter().find(|c| c.name == name_or_key))
    .ok_or_else(|| DsError::invalid_collection(name_or_key, collections))
}

/// Parsed inputs of a collection search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
  pub collection: Option<String>,
  pub query: String,
  pub using: Vec<String>,
  pub show: Vec<ShowMode>,
  pub estimate_only: bool,
  pub return_as_data: bool,
  pub save_as: Option<String>,
}

/// Everything the collector and presenter need to run a search
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
  pub query: DataQuery,
  pub collection: Collection,
  pub params: SearchParams,
  pub is_docs: bool,
  pub return_data: bool,
  pub estimate_only: bool,
}

/// Validate a search request against the live collections and build its query
pub fn plan_search(
  request: &SearchRequest,
  collections: &[Collection],
  display: DisplayMode,
) -> Result<QueryPlan> {
  let params = SearchParams::from_using(&request.using)?;

  let name_or_key = request.collection.as_deref().unwrap_or(DEFAULT_COLLECTION);
  let collection = resolve_collection(collections, name_or_key)?.clone();

  if !collections.iter().any(|c| c.elastic_id == params.elastic_id) {
    return Err(DsError::invalid_system_id(&params.elastic_id, collections));
  }

  let return_data = display == DisplayMode::Api || request.return_as_data;
  let show = ShowSelection::from_modes(&request.show);
  let highlight = show.docs.then(|| {
    let (pre, post) = highlight_tags(display, request.save_as.is_some(), return_data);
    Highlight::new(pre, post)
  });

  let coordinates =
    Coordinates { elastic_id: params.elastic_id.clone(), index_key: collection.index_key.clone() };
  let query = DataQuery {
    query: fuzzy_text(&request.query, params.slop),
    source: show.source_fields(),
    limit: params.page_size,
    highlight,
    coordinates,
    aggregations: year_aggregation(),
  };

  tracing::debug!(
    collection = %collection.index_key,
    query = %query.query,
    page_size = query.limit,
    "planned search"
  );
  Ok(QueryPlan {
    query,
    collection,
    params,
    is_docs: show.docs,
    return_data,
    estimate_only: request.estimate_only,
  })
}
