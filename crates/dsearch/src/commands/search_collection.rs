use crate::collector::{collect, CollectOptions, Collected, YearHistogram};
use crate::commands::{fetch_collections, Output};
use crate::config::DisplayMode;
use crate::context::CommandContext;
use crate::error::{DsError, Result};
use crate::flatten::FlattenContext;
use crate::present::{save_csv, wrap_cell, Table};
use crate::query::{plan_search, SearchRequest};
use crate::session::{current_host, ensure_backend};

const TITLE_WIDTH: usize = 50;
const AUTHORS_WIDTH: usize = 25;
const SNIPPET_WIDTH: usize = 70;

/// One-row table with a column per year, or nothing when fewer than two years are present
pub fn distribution_table(histogram: &YearHistogram) -> Option<Table> {
  if histogram.len() < 2 {
    return None;
  }
  let mut table = Table::new(histogram.iter().map(|(year, _)| year.to_string()));
  table.push_row(histogram.iter().map(|(_, count)| count.to_string()));
  Some(table)
}

/// Wrap the wide text columns and render highlight markup for the terminal
pub fn style_for_terminal(table: &mut Table) {
  table.map_column("Title", |title| wrap_cell(title, TITLE_WIDTH));
  table.map_column("Authors", |authors| wrap_cell(authors, AUTHORS_WIDTH));
  table.map_column("Snippet", |snippet| marquee::style(&wrap_cell(snippet, SNIPPET_WIDTH)));
}

pub async fn handle(ctx: &mut CommandContext, request: &SearchRequest) -> Result<Output> {
  let backend = ensure_backend(ctx).await?;
  let collections = fetch_collections(backend.as_ref()).await?;
  let display = ctx.display();
  let plan = plan_search(request, &collections, display)?;

  let flatten = FlattenContext {
    display,
    return_data: plan.return_data,
    host: current_host(ctx)?,
    coordinates: plan.query.coordinates.clone(),
  };
  let options = CollectOptions { display, estimate_only: plan.estimate_only, flatten: &flatten };

  let collected = collect(backend.as_ref(), ctx.prompter.as_ref(), &plan.query, &options).await?;
  let harvest = match collected {
    Collected::Complete(harvest) => harvest,
    Collected::Estimated { .. } => return Ok(None),
    Collected::Declined { total } => {
      tracing::debug!(total, "search declined");
      return Ok(None);
    }
  };

  if plan.is_docs && display.is_interactive() {
    if let Some(distribution) = distribution_table(&harvest.histogram) {
      marquee::text("\n<bold>Result distribution by year</bold>");
      ctx.presenter().show(&distribution, false);
    }
  }

  if harvest.rows.is_empty() {
    return Err(DsError::no_results("Search returned no result"));
  }

  let mut table = Table::from_rows(&harvest.rows);
  if plan.params.limit_results > 0 {
    table.truncate(plan.params.limit_results);
  }

  if let Some(name) = request.save_as.as_deref() {
    save_csv(&table, &ctx.settings, name)?;
  }

  if plan.return_data {
    table.map_column("Snippet", marquee::strip_tags);
    return Ok(Some(table));
  }

  if display == DisplayMode::Terminal && request.save_as.is_none() {
    style_for_terminal(&mut table);
  }
  ctx.presenter().show(&table, true);
  Ok(None)
}
