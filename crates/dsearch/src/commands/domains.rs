use std::collections::BTreeSet;

use crate::backend::Collection;
use crate::commands::{fetch_collections, finish, Output};
use crate::context::CommandContext;
use crate::error::Result;
use crate::present::Table;
use crate::session::ensure_backend;

/// Distinct domains, sorted case-insensitively
pub fn distinct_domains(collections: &[Collection]) -> Vec<String> {
  let unique: BTreeSet<&str> =
    collections.iter().flat_map(|c| c.domain.iter().map(String::as_str)).collect();
  let mut domains: Vec<String> = unique.into_iter().map(String::from).collect();
  domains.sort_by_key(|d| d.to_lowercase());
  domains
}

pub async fn handle(ctx: &mut CommandContext, save_as: Option<&str>) -> Result<Output> {
  let backend = ensure_backend(ctx).await?;
  let collections = fetch_collections(backend.as_ref()).await?;

  let mut table = Table::new(["Domains"]);
  for domain in distinct_domains(&collections) {
    table.push_row([domain]);
  }
  finish(ctx, table, save_as, false)
}
