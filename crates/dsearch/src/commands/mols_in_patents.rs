use crate::backend::ChemistryQuery;
use crate::commands::patents_containing::PATENT_LIMIT;
use crate::commands::{chemistry_table, finish_chemistry, Output};
use crate::config::Settings;
use crate::context::CommandContext;
use crate::error::{DsError, Result};
use crate::present::Table;
use crate::session::ensure_backend;

const PATENT_ID_COLUMNS: [&str; 3] = ["patent id", "patent_id", "patentid"];

/// Where the patent ids come from
#[derive(Debug, Clone, PartialEq)]
pub enum PatentSource {
  List(Vec<String>),
  /// CSV file in the workspace with a patent id column
  File(String),
}

/// First non-empty patent id column, matched case-insensitively
pub fn patent_ids_from_table(table: &Table) -> Result<Vec<String>> {
  for wanted in PATENT_ID_COLUMNS {
    let column = table.columns().iter().find(|c| c.trim().to_lowercase() == wanted);
    let Some(column) = column else {
      continue;
    };
    let ids: Vec<String> = table
      .column_values(column)
      .unwrap_or_default()
      .into_iter()
      .map(|id| id.trim().to_string())
      .filter(|id| !id.is_empty())
      .collect();
    if !ids.is_empty() {
      return Ok(ids);
    }
  }
  Err(DsError::invalid_parameter("No patent ID column found (patent id, patent_id, patentid)"))
}

pub fn resolve_ids(source: &PatentSource, settings: &Settings) -> Result<Vec<String>> {
  match source {
    PatentSource::List(ids) => Ok(ids.clone()),
    PatentSource::File(name) => {
      let path = settings.workspace_file(name);
      if !path.exists() {
        return Err(DsError::file_not_found(path));
      }
      let table = Table::read_csv(&path)?;
      patent_ids_from_table(&table)
    }
  }
}

pub async fn handle(
  ctx: &mut CommandContext,
  source: &PatentSource,
  save_as: Option<&str>,
) -> Result<Output> {
  let ids = resolve_ids(source, &ctx.settings)?;
  if ids.is_empty() {
    return Ok(None);
  }
  let backend = ensure_backend(ctx).await?;

  let query = ChemistryQuery::CompoundsInDocuments { publication_ids: ids.clone() };
  let rows = backend.query_chemistry(&query, Some(PATENT_LIMIT)).await?;
  let listing = format!("<reset>- {}</reset>", ids.join("\n- "));
  if rows.is_empty() {
    let message = format!("No molecules found in the provided patents.\n{listing}");
    return Err(DsError::no_results(message));
  }

  marquee::success_block(&[
    &format!("We found {} molecules mentioned in the following patents:", rows.len()),
    &listing,
  ]);
  finish_chemistry(ctx, chemistry_table(&rows), save_as)
}
