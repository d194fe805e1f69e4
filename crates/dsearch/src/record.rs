//! Search hits as returned by the data query endpoint
//!
//! Every block is optional; the backend only returns the source fields a
//! query selected, so a record from a docs query has no `subject` and a
//! record from a data query usually has no `description`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
  #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  #[serde(rename = "_source", default)]
  pub source: Source,
  /// Field name → highlighted fragments, in backend order
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub highlight: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<Description>,
  #[serde(rename = "file-info", default, skip_serializing_if = "Option::is_none")]
  pub file_info: Option<FileInfo>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub attributes: Option<Vec<Attribute>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub identifiers: Option<Vec<Identifier>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub subject: Option<Subject>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Description {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub authors: Option<Vec<Author>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url_refs: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
  pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub filename: Option<String>,
  #[serde(rename = "document-hash", default, skip_serializing_if = "Option::is_none")]
  pub document_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
  #[serde(rename = "type")]
  pub kind: String,
  pub value: Value,
}

impl Identifier {
  pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
    Self { kind: kind.into(), value: Value::String(value.into()) }
  }

  pub fn value_text(&self) -> String {
    display_value(&self.value)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subject {
  #[serde(default)]
  pub identifiers: Vec<Identifier>,
  #[serde(default)]
  pub names: Vec<Identifier>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
  #[serde(default)]
  pub predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
  pub key: NameRef,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub value: Option<NameRef>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub nominal_value: Option<NominalValue>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub numerical_value: Option<NumericalValue>,
}

impl Predicate {
  /// Nominal value, then numerical value, then the value name
  pub fn resolved_value(&self) -> Option<String> {
    if let Some(nominal) = &self.nominal_value {
      return Some(display_value(&nominal.value));
    }
    if let Some(numerical) = &self.numerical_value {
      return Some(display_value(&numerical.val));
    }
    self.value.as_ref().map(|v| v.name.clone())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameRef {
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NominalValue {
  pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericalValue {
  pub val: Value,
}

impl Record {
  /// Highlighted fields with their fragments, skipping non-array entries
  pub fn highlights(&self) -> Vec<(&str, Vec<String>)> {
    let Some(map) = &self.highlight else {
      return Vec::new();
    };
    map
      .iter()
      .filter_map(|(field, fragments)| {
        let fragments = fragments.as_array()?;
        Some((field.as_str(), fragments.iter().map(display_value).collect()))
      })
      .collect()
  }
}

/// Render a JSON scalar the way it appears in a table cell
pub fn display_value(value: &Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::String(s) => s.clone(),
    Value::Bool(b) => b.to_string(),
    Value::Number(n) => n.to_string(),
    other => other.to_string(),
  }
}
