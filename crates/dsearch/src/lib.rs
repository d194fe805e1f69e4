//! Deep Search commands
//!
//! Collection listing and search, molecule similarity and substructure
//! lookups, and patent queries against the Deep Search service, rendered as
//! terminal tables, notebook HTML or raw JSON.

pub mod backend;
pub mod cli;
pub mod collector;
pub mod commands;
pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod flatten;
pub mod links;
pub mod present;
pub mod prompt;
pub mod query;
pub mod record;
pub mod session;
pub mod smiles;

// Re-exports used by the binary and integration tests
pub use backend::{Collection, Connection, Connector, SearchBackend};
pub use config::{DisplayMode, Settings};
pub use context::CommandContext;
pub use error::{DsError, Result};
pub use present::Table;
