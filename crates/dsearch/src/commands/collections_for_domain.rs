use crate::backend::Collection;
use crate::commands::{fetch_collections, finish, Output};
use crate::context::CommandContext;
use crate::error::{DsError, Result};
use crate::present::Table;
use crate::session::ensure_backend;

/// Collections listing any of the given domains, compared case-insensitively
pub fn in_domains<'a>(collections: &'a [Collection], domains: &[String]) -> Vec<&'a Collection> {
  let wanted: Vec<String> = domains.iter().map(|d| d.trim().to_lowercase()).collect();
  collections
    .iter()
    .filter(|c| c.domain.iter().any(|d| wanted.contains(&d.to_lowercase())))
    .collect()
}

pub async fn handle(
  ctx: &mut CommandContext,
  domains: &[String],
  save_as: Option<&str>,
) -> Result<Output> {
  let backend = ensure_backend(ctx).await?;
  let collections = fetch_collections(backend.as_ref()).await?;

  let matches = in_domains(&collections, domains);
  if matches.is_empty() {
    let message = format!("No collections found for domain: {}", domains.join(", "));
    return Err(DsError::no_results(message));
  }

  let mut table = Table::new(["Domains", "Collection Name", "Collection Key"]);
  for c in matches {
    table.push_row([c.domain_label(), c.name.clone(), c.index_key.clone()]);
  }
  finish(ctx, table, save_as, false)
}
