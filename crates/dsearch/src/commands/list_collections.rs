use crate::commands::{collections_table, fetch_collections, finish, Output};
use crate::context::CommandContext;
use crate::error::Result;
use crate::session::ensure_backend;

pub async fn handle(ctx: &mut CommandContext, save_as: Option<&str>) -> Result<Output> {
  let backend = ensure_backend(ctx).await?;
  let collections = fetch_collections(backend.as_ref()).await?;
  finish(ctx, collections_table(&collections), save_as, false)
}
