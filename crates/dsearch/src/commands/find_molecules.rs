use crate::backend::ChemistryQuery;
use crate::commands::{chemistry_table, finish_chemistry, Output};
use crate::context::CommandContext;
use crate::error::{DsError, Result};
use crate::session::ensure_backend;
use crate::smiles;

/// How a molecule search relates results to the input structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoleculeSearch {
  Similar,
  Substructure,
}

impl MoleculeSearch {
  pub fn query(self, smiles: &str) -> ChemistryQuery {
    let structure = smiles.to_string();
    match self {
      Self::Similar => ChemistryQuery::CompoundsBySimilarity { structure },
      Self::Substructure => ChemistryQuery::CompoundsBySubstructure { structure },
    }
  }

  fn found_message(self, count: usize) -> String {
    match self {
      Self::Similar => {
        format!("We found <yellow>{count}</yellow> molecules similar to the provided molecule")
      }
      Self::Substructure => format!(
        "We found <yellow>{count}</yellow> molecules that contain the provided substructure"
      ),
    }
  }

  fn empty_message(self) -> &'static str {
    match self {
      Self::Similar => "No similar molecules found",
      Self::Substructure => "No molecules found that contain the provided substructure",
    }
  }
}

pub async fn handle(
  ctx: &mut CommandContext,
  search: MoleculeSearch,
  smiles: &str,
  save_as: Option<&str>,
) -> Result<Output> {
  smiles::validate(smiles)?;
  let backend = ensure_backend(ctx).await?;

  let rows = backend.query_chemistry(&search.query(smiles), None).await?;
  if rows.is_empty() {
    return Err(DsError::no_results(search.empty_message()));
  }

  marquee::success_block(&[&search.found_message(rows.len()), &format!("Input: {smiles}")]);
  finish_chemistry(ctx, chemistry_table(&rows), save_as)
}
