use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::credentials::Credentials;
use crate::error::Result;
use crate::query::DataQuery;
use crate::record::Record;

pub mod http;

/// A searchable document collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
  pub name: String,
  pub index_key: String,
  pub elastic_id: String,
  #[serde(default)]
  pub domain: Vec<String>,
  #[serde(default)]
  pub kind: String,
  #[serde(default)]
  pub documents: u64,
  #[serde(default)]
  pub created: Option<String>,
  #[serde(default)]
  pub description: String,
}

impl Collection {
  /// A bare collection in the `default` system with no metadata
  pub fn new(name: impl Into<String>, index_key: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      index_key: index_key.into(),
      elastic_id: "default".to_string(),
      domain: Vec::new(),
      kind: String::new(),
      documents: 0,
      created: None,
      description: String::new(),
    }
  }

  pub fn with_domains(mut self, domains: &[&str]) -> Self {
    self.domain = domains.iter().map(|d| d.to_string()).collect();
    self
  }

  pub fn with_elastic_id(mut self, elastic_id: impl Into<String>) -> Self {
    self.elastic_id = elastic_id.into();
    self
  }

  /// Domains joined the way collection tables show them
  pub fn domain_label(&self) -> String {
    self.domain.join(" / ")
  }
}

/// Opaque position in a paged result stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageCursor(pub Vec<Value>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearBucket {
  pub key_as_string: String,
  pub doc_count: u64,
}

/// One page of search hits plus that page's aggregation buckets
#[derive(Debug, Clone, Default)]
pub struct ResultPage {
  pub records: Vec<Record>,
  pub year_buckets: Vec<YearBucket>,
  pub cursor: Option<PageCursor>,
}

/// Structured chemistry queries
#[derive(Debug, Clone, PartialEq)]
pub enum ChemistryQuery {
  CompoundsBySimilarity { structure: String },
  CompoundsBySubstructure { structure: String },
  /// Documents mentioning compounds that contain the structure
  DocumentsHavingSubstructure { structure: String },
  /// Compounds mentioned in the given publications
  CompoundsInDocuments { publication_ids: Vec<String> },
}

impl ChemistryQuery {
  /// Wire form understood by the chemistry endpoint
  pub fn to_json(&self) -> Value {
    match self {
      Self::CompoundsBySimilarity { structure } => serde_json::json!({
        "type": "CompoundsBySimilarity",
        "structure": structure,
      }),
      Self::CompoundsBySubstructure { structure } => serde_json::json!({
        "type": "CompoundsBySubstructure",
        "structure": structure,
      }),
      Self::DocumentsHavingSubstructure { structure } => serde_json::json!({
        "type": "DocumentsHaving",
        "compounds": {
          "type": "CompoundsBySubstructure",
          "structure": structure,
        },
      }),
      Self::CompoundsInDocuments { publication_ids } => serde_json::json!({
        "type": "CompoundsIn",
        "documents": {
          "type": "DocumentsByIds",
          "publication_ids": publication_ids,
        },
      }),
    }
  }
}

/// Remote search operations used by commands
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchBackend: Send + Sync {
  /// List every collection across all elastic systems
  async fn list_collections(&self) -> Result<Vec<Collection>>;

  /// Total hit count for a query, without fetching any records
  async fn count(&self, query: &DataQuery) -> Result<u64>;

  /// Fetch one page of hits, continuing after `cursor` when given
  async fn fetch_page(&self, query: &DataQuery, cursor: Option<PageCursor>) -> Result<ResultPage>;

  /// Run a chemistry query, returning raw result rows
  async fn query_chemistry(
    &self,
    query: &ChemistryQuery,
    limit: Option<usize>,
  ) -> Result<Vec<Map<String, Value>>>;
}

/// An authenticated backend handle and the bearer token it was built with
pub struct Connection {
  pub backend: Arc<dyn SearchBackend>,
  pub token: String,
}

/// Turns credentials into backend handles
#[async_trait]
pub trait Connector: Send + Sync {
  /// True when the host answers a plain GET with 200
  async fn check_host(&self, host: &str) -> bool;

  /// Authenticate with username and API key
  async fn connect(&self, credentials: &Credentials) -> Result<Connection>;

  /// Rebuild a backend handle from a previously issued token
  fn resume(&self, credentials: &Credentials, token: &str) -> Result<Arc<dyn SearchBackend>>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_collection_builders() {
    let c = Collection::new("Patents", "patent-uspto")
      .with_domains(&["IP", "Chemistry"])
      .with_elastic_id("sys-2");
    assert_eq!(c.elastic_id, "sys-2");
    assert_eq!(c.domain_label(), "IP / Chemistry");
  }

  #[test]
  fn test_nested_chemistry_query_wire_form() {
    let query = ChemistryQuery::CompoundsInDocuments {
      publication_ids: vec!["US1234".to_string(), "EP99".to_string()],
    };
    let json = query.to_json();
    assert_eq!(json["type"], "CompoundsIn");
    assert_eq!(json["documents"]["type"], "DocumentsByIds");
    assert_eq!(json["documents"]["publication_ids"][1], "EP99");
  }

  #[test]
  fn test_documents_having_wraps_substructure() {
    let query = ChemistryQuery::DocumentsHavingSubstructure { structure: "CCO".to_string() };
    let json = query.to_json();
    assert_eq!(json["compounds"]["type"], "CompoundsBySubstructure");
    assert_eq!(json["compounds"]["structure"], "CCO");
  }
}
