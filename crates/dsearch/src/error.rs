use std::path::PathBuf;
use thiserror::Error;

use crate::backend::Collection;

#[derive(Error, Debug)]
pub enum DsError {
  #[error("Invalid collection name or key: '{requested}'")]
  InvalidCollection { requested: String, collections: Vec<Collection> },

  #[error("Invalid elastic system id: '{requested}'")]
  InvalidSystemId { requested: String, collections: Vec<Collection> },

  #[error("Invalid molecule identifier: '{identifier}'")]
  InvalidMoleculeIdentifier { identifier: String },

  #[error("{message}")]
  NoResultsFound { message: String },

  #[error("Deep Search request failed: {message}")]
  Backend { message: String },

  #[error("{message}")]
  Credential { message: String },

  #[error("File not found: {}", path.display())]
  FileNotFound { path: PathBuf },

  #[error("Invalid parameter: {message}")]
  InvalidParameter { message: String },

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

impl DsError {
  pub fn invalid_collection(requested: impl Into<String>, collections: &[Collection]) -> Self {
    Self::InvalidCollection { requested: requested.into(), collections: collections.to_vec() }
  }

  pub fn invalid_system_id(requested: impl Into<String>, collections: &[Collection]) -> Self {
    Self::InvalidSystemId { requested: requested.into(), collections: collections.to_vec() }
  }

  pub fn invalid_molecule(identifier: impl Into<String>) -> Self {
    Self::InvalidMoleculeIdentifier { identifier: identifier.into() }
  }

  pub fn no_results(message: impl Into<String>) -> Self {
    Self::NoResultsFound { message: message.into() }
  }

  pub fn backend(message: impl Into<String>) -> Self {
    Self::Backend { message: message.into() }
  }

  pub fn credential(message: impl Into<String>) -> Self {
    Self::Credential { message: message.into() }
  }

  pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
    Self::FileNotFound { path: path.into() }
  }

  pub fn invalid_parameter(message: impl Into<String>) -> Self {
    Self::InvalidParameter { message: message.into() }
  }

  /// Collection list carried alongside collection-related errors
  pub fn collections(&self) -> Option<&[Collection]> {
    match self {
      Self::InvalidCollection { collections, .. } | Self::InvalidSystemId { collections, .. } => {
        Some(collections)
      }
      _ => None,
    }
  }

  /// Empty result sets are reported as warnings rather than failures
  pub fn is_warning(&self) -> bool {
    matches!(self, Self::NoResultsFound { .. })
  }
}

impl From<reqwest::Error> for DsError {
  fn from(err: reqwest::Error) -> Self {
    Self::backend(err.to_string())
  }
}

impl From<csv::Error> for DsError {
  fn from(err: csv::Error) -> Self {
    match err.into_kind() {
      csv::ErrorKind::Io(io) => Self::Io(io),
      other => Self::invalid_parameter(format!("{other:?}")),
    }
  }
}

impl From<dialoguer::Error> for DsError {
  fn from(err: dialoguer::Error) -> Self {
    Self::Io(std::io::Error::other(err.to_string()))
  }
}

pub type Result<T> = std::result::Result<T, DsError>;
