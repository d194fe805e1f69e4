//! Paginated result collection
//!
//! A zero-limit count query runs first. Its total decides how many pages to
//! request, whether to stop at the estimate, and whether to ask before
//! fetching a large result set. Pages are then fetched one after another,
//! each continuing from the cursor of the previous one.

use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;

use crate::backend::{SearchBackend, YearBucket};
use crate::config::DisplayMode;
use crate::error::{DsError, Result};
use crate::flatten::{flatten_record, FlattenContext, Row};
use crate::prompt::Prompter;
use crate::query::DataQuery;

/// Result counts above this ask for confirmation in interactive modes
pub const CONFIRM_THRESHOLD: u64 = 100;

pub const CONFIRM_MESSAGE: &str = "Your query may take some time, do you wish to proceed?";

/// Number of pages needed for `total` hits at `page_size` hits per page
pub fn expected_pages(total: u64, page_size: usize) -> u64 {
  if page_size == 0 {
    return 0;
  }
  total.div_ceil(page_size as u64)
}

/// Document counts per publication year
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearHistogram(BTreeMap<String, u64>);

impl YearHistogram {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add(&mut self, year: impl Into<String>, count: u64) {
    *self.0.entry(year.into()).or_insert(0) += count;
  }

  /// Histogram of one page's year aggregation
  pub fn from_buckets(buckets: &[YearBucket]) -> Self {
    let mut histogram = Self::new();
    for bucket in buckets {
      histogram.add(bucket.key_as_string.clone(), bucket.doc_count);
    }
    histogram
  }

  /// Sum counts for matching years
  pub fn merge(&mut self, other: &YearHistogram) {
    for (year, count) in &other.0 {
      self.add(year.clone(), *count);
    }
  }

  pub fn get(&self, year: &str) -> Option<u64> {
    self.0.get(year).copied()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
    self.0.iter().map(|(year, count)| (year.as_str(), *count))
  }
}

/// Rows and aggregations gathered from every page
#[derive(Debug, Clone, Default)]
pub struct Harvest {
  pub total: u64,
  pub pages: u64,
  pub rows: Vec<Row>,
  pub histogram: YearHistogram,
}

#[derive(Debug)]
pub enum Collected {
  /// Estimate-only run; nothing was fetched
  Estimated { total: u64 },
  /// The user declined to fetch a large result set
  Declined { total: u64 },
  Complete(Harvest),
}

pub struct CollectOptions<'a> {
  pub display: DisplayMode,
  pub estimate_only: bool,
  pub flatten: &'a FlattenContext,
}

fn progress_bar(pages: u64, display: DisplayMode) -> ProgressBar {
  if !display.is_interactive() {
    return ProgressBar::hidden();
  }
  let bar = ProgressBar::new(pages);
  let style = ProgressStyle::with_template("{percent:>3}%|{bar:40}| {pos}/{len}")
    .unwrap_or_else(|_| ProgressStyle::default_bar());
  bar.set_style(style);
  bar
}

fn as_backend_error(err: DsError) -> DsError {
  match err {
    DsError::Backend { .. } => err,
    other => DsError::backend(other.to_string()),
  }
}

/// Count, optionally confirm, then page through every result
pub async fn collect(
  backend: &dyn SearchBackend,
  prompter: &dyn Prompter,
  query: &DataQuery,
  options: &CollectOptions<'_>,
) -> Result<Collected> {
  let total = backend.count(&query.count_only()).await.map_err(as_backend_error)?;
  let pages = expected_pages(total, query.limit);
  marquee::info(&format!("Estimated results: {total}"));
  tracing::debug!(total, pages, "counted results");

  if options.estimate_only {
    return Ok(Collected::Estimated { total });
  }
  if total > CONFIRM_THRESHOLD
    && options.display.is_interactive()
    && !prompter.confirm(CONFIRM_MESSAGE)?
  {
    return Ok(Collected::Declined { total });
  }

  let bar = progress_bar(pages, options.display);
  let mut harvest = Harvest { total, ..Default::default() };
  let mut cursor = None;

  while harvest.pages < pages {
    let page = match backend.fetch_page(query, cursor.take()).await {
      Ok(page) => page,
      Err(err) => {
        bar.finish_and_clear();
        return Err(as_backend_error(err));
      }
    };
    harvest.pages += 1;
    bar.inc(1);

    harvest.histogram.merge(&YearHistogram::from_buckets(&page.year_buckets));
    harvest.rows.extend(page.records.iter().map(|record| flatten_record(record, options.flatten)));

    match page.cursor {
      Some(next) => cursor = Some(next),
      None => break,
    }
  }

  bar.finish_and_clear();
  tracing::debug!(pages = harvest.pages, rows = harvest.rows.len(), "collected results");
  Ok(Collected::Complete(harvest))
}
