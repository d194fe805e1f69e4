use crate::backend::ChemistryQuery;
use crate::commands::{chemistry_table, finish_chemistry, Output};
use crate::context::CommandContext;
use crate::error::{DsError, Result};
use crate::session::ensure_backend;
use crate::smiles;

pub const PATENT_LIMIT: usize = 20;

pub async fn handle(
  ctx: &mut CommandContext,
  smiles: &str,
  save_as: Option<&str>,
) -> Result<Output> {
  smiles::validate(smiles)?;
  let backend = ensure_backend(ctx).await?;

  let query = ChemistryQuery::DocumentsHavingSubstructure { structure: smiles.to_string() };
  let rows = backend.query_chemistry(&query, Some(PATENT_LIMIT)).await?;
  if rows.is_empty() {
    let message = format!("No patents found containing <yellow>{smiles}</yellow>");
    return Err(DsError::no_results(message));
  }

  marquee::success_block(&[
    &format!("We found <yellow>{}</yellow> patents containing the provided molecule", rows.len()),
    &format!("Input: {smiles}"),
  ]);
  finish_chemistry(ctx, chemistry_table(&rows), save_as)
}
