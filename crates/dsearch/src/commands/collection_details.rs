use chrono::{DateTime, NaiveDateTime};

use crate::backend::Collection;
use crate::commands::{fetch_collections, Output};
use crate::config::DisplayMode;
use crate::context::CommandContext;
use crate::error::Result;
use crate::present::{pretty_date, pretty_number, wrap_cell, Table};
use crate::query::resolve_collection;
use crate::session::ensure_backend;

/// Creation time as a UTC timestamp, accepting offsets or naive ISO times
fn created_at(created: &str) -> Option<NaiveDateTime> {
  DateTime::parse_from_rfc3339(created)
    .map(|dt| dt.naive_utc())
    .or_else(|_| NaiveDateTime::parse_from_str(created, "%Y-%m-%dT%H:%M:%S%.f"))
    .ok()
}

/// The details card shown in the terminal and notebook
pub fn details_text(collection: &Collection) -> String {
  let created = collection.created.as_deref().map(pretty_date).unwrap_or_default();
  [
    format!("<h1>{}</h1>", collection.name),
    wrap_cell(&collection.description, 80),
    "<soft>---</soft>".to_string(),
    format!("<yellow>Name     </yellow> {}", collection.name),
    format!("<yellow>Key      </yellow> {}", collection.index_key),
    format!("<yellow>Domain   </yellow> {}", collection.domain_label()),
    format!("<yellow>Type     </yellow> {}", collection.kind),
    format!("<yellow>Entries  </yellow> {}", pretty_number(collection.documents)),
    format!("<yellow>Created  </yellow> {created}"),
  ]
  .join("\n")
}

/// Single-row table returned in API mode
pub fn details_table(collection: &Collection) -> Table {
  let created = collection.created.as_deref().and_then(created_at);
  let mut table = Table::new([
    "Collection Name",
    "Collection Key",
    "Description",
    "Domain",
    "Type",
    "Entries",
    "Created",
    "Created timestamp",
  ]);
  table.push_row([
    collection.name.clone(),
    collection.index_key.clone(),
    collection.description.clone(),
    collection.domain_label(),
    collection.kind.clone(),
    collection.documents.to_string(),
    created.map(|dt| dt.format("%Y-%m-%d").to_string()).unwrap_or_default(),
    created.map(|dt| dt.and_utc().timestamp().to_string()).unwrap_or_default(),
  ]);
  table
}

pub async fn handle(ctx: &mut CommandContext, name_or_key: &str) -> Result<Output> {
  let backend = ensure_backend(ctx).await?;
  let collections = fetch_collections(backend.as_ref()).await?;
  let collection = resolve_collection(&collections, name_or_key)?;

  if ctx.display() == DisplayMode::Api {
    return Ok(Some(details_table(collection)));
  }
  marquee::text(&format!("\n{}\n", details_text(collection)));
  Ok(None)
}
