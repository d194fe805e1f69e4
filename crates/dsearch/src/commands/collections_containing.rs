use crate::backend::{Collection, SearchBackend};
use crate::commands::{fetch_collections, finish, Output};
use crate::context::CommandContext;
use crate::error::{DsError, Result};
use crate::present::Table;
use crate::query::{Coordinates, DataQuery};
use crate::session::ensure_backend;

/// Match count per collection, dropping zero counts, highest first
pub async fn count_matches(
  backend: &dyn SearchBackend,
  collections: &[Collection],
  query: &str,
) -> Result<Vec<(Collection, u64)>> {
  let mut counts = Vec::new();
  for collection in collections {
    let coordinates = Coordinates {
      elastic_id: collection.elastic_id.clone(),
      index_key: collection.index_key.clone(),
    };
    let count = backend.count(&DataQuery::new(query, coordinates).count_only()).await?;
    tracing::debug!(collection = %collection.index_key, count, "counted matches");
    if count > 0 {
      counts.push((collection.clone(), count));
    }
  }
  counts.sort_by(|a, b| b.1.cmp(&a.1));
  Ok(counts)
}

pub async fn handle(
  ctx: &mut CommandContext,
  query: &str,
  save_as: Option<&str>,
) -> Result<Output> {
  let backend = ensure_backend(ctx).await?;
  let collections = fetch_collections(backend.as_ref()).await?;

  let counts = count_matches(backend.as_ref(), &collections, query).await?;
  if counts.is_empty() {
    return Err(DsError::no_results(format!("No collections contain '{query}'")));
  }

  marquee::text(&format!("Collections containing <yellow>{query}</yellow>"));
  let mut table = Table::new(["Domain", "Collection Name", "Collection Key", "Matches"]);
  for (c, count) in counts {
    table.push_row([c.domain_label(), c.name, c.index_key, count.to_string()]);
  }
  finish(ctx, table, save_as, false)
}
