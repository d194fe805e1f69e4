pub mod collection_details;
pub mod collections_containing;
pub mod collections_for_domain;
pub mod domains;
pub mod find_molecules;
pub mod list_collections;
pub mod login;
pub mod mols_in_patents;
pub mod patents_containing;
pub mod search_collection;

use serde_json::{Map, Value};

use crate::backend::{Collection, SearchBackend};
use crate::config::DisplayMode;
use crate::context::CommandContext;
use crate::error::Result;
use crate::flatten::flatten_json;
use crate::present::{save_csv, Table};
use crate::query::sort_collections;

/// Whatever a command hands back instead of printing
pub type Output = Option<Table>;

/// Live collection list, sorted by name
pub async fn fetch_collections(backend: &dyn SearchBackend) -> Result<Vec<Collection>> {
  let mut collections = backend.list_collections().await?;
  sort_collections(&mut collections);
  Ok(collections)
}

/// The overview shown by `list-collections` and alongside collection errors
pub fn collections_table(collections: &[Collection]) -> Table {
  let mut table = Table::new(["Domain", "Collection Name", "Collection Key", "elastic_id"]);
  for c in collections {
    table.push_row([c.domain_label(), c.name.clone(), c.index_key.clone(), c.elastic_id.clone()]);
  }
  table
}

/// Save when asked, then show or return the table
pub fn finish(
  ctx: &CommandContext,
  table: Table,
  save_as: Option<&str>,
  show_index: bool,
) -> Result<Output> {
  if let Some(name) = save_as {
    save_csv(&table, &ctx.settings, name)?;
  }
  Ok(ctx.presenter().deliver(table, false, show_index))
}

/// Chemistry query rows as a table, without the backend's `persistent_id`
pub fn chemistry_table(rows: &[Map<String, Value>]) -> Table {
  let rows: Vec<_> = rows.iter().map(flatten_json).collect();
  Table::from_rows(&rows)
}

/// Molecule and patent results: show first, then save, returning the table only in API mode
pub fn finish_chemistry(
  ctx: &CommandContext,
  table: Table,
  save_as: Option<&str>,
) -> Result<Output> {
  let presenter = ctx.presenter();
  presenter.show(&table, false);
  if let Some(name) = save_as {
    save_csv(&table, &ctx.settings, name)?;
  }
  Ok((ctx.display() == DisplayMode::Api).then_some(table))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_collections_table_columns() {
    let collections =
      vec![Collection::new("USPTO", "patent-uspto").with_domains(&["IP", "Chemistry"])];
    let table = collections_table(&collections);
    assert_eq!(table.columns(), &["Domain", "Collection Name", "Collection Key", "elastic_id"]);
    assert_eq!(table.rows()[0], vec!["IP / Chemistry", "USPTO", "patent-uspto", "default"]);
  }

  #[test]
  fn test_chemistry_table_drops_persistent_id() {
    let rows = vec![
      json!({ "persistent_id": "x", "SMILES": "CCO", "cas": null }).as_object().unwrap().clone(),
      json!({ "persistent_id": "y", "SMILES": "C", "cid": 297 }).as_object().unwrap().clone(),
    ];
    let table = chemistry_table(&rows);
    assert_eq!(table.columns(), &["SMILES", "cas", "cid"]);
    assert_eq!(table.rows()[1], vec!["C", "", "297"]);
  }
}
