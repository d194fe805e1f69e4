//! Result tables and how they reach the user

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, ContentArrangement};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::config::{DisplayMode, Settings};
use crate::error::Result;
use crate::flatten::Row;

/// Rectangular result set; missing cells are empty strings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
  columns: Vec<String>,
  rows: Vec<Vec<String>>,
}

impl Table {
  pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
    Self { columns: columns.into_iter().map(Into::into).collect(), rows: Vec::new() }
  }

  /// Union of every row's columns, in order of first appearance
  pub fn from_rows(rows: &[Row]) -> Self {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
      for column in row.columns() {
        if !columns.iter().any(|c| c == column) {
          columns.push(column.to_string());
        }
      }
    }

    let rows = rows
      .iter()
      .map(|row| columns.iter().map(|c| row.get(c).unwrap_or_default().to_string()).collect())
      .collect();
    Self { columns, rows }
  }

  /// Append a row, padding or cutting it to the column count
  pub fn push_row<S: Into<String>>(&mut self, cells: impl IntoIterator<Item = S>) {
    let mut cells: Vec<String> = cells.into_iter().map(Into::into).collect();
    cells.resize(self.columns.len(), String::new());
    self.rows.push(cells);
  }

  pub fn columns(&self) -> &[String] {
    &self.columns
  }

  pub fn rows(&self) -> &[Vec<String>] {
    &self.rows
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  fn column_index(&self, column: &str) -> Option<usize> {
    self.columns.iter().position(|c| c == column)
  }

  /// Single cell lookup, mostly for tests and batch input
  pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
    let index = self.column_index(column)?;
    self.rows.get(row).map(|r| r[index].as_str())
  }

  /// Values of one column, if present
  pub fn column_values(&self, column: &str) -> Option<Vec<String>> {
    let index = self.column_index(column)?;
    Some(self.rows.iter().map(|r| r[index].clone()).collect())
  }

  /// Keep only the first `limit` rows
  pub fn truncate(&mut self, limit: usize) {
    self.rows.truncate(limit);
  }

  /// Rewrite every cell of a column; no-op when the column is absent
  pub fn map_column<F>(&mut self, column: &str, f: F)
  where
    F: Fn(&str) -> String,
  {
    let Some(index) = self.column_index(column) else {
      return;
    };
    for row in &mut self.rows {
      row[index] = f(&row[index]);
    }
  }

  /// Rows as JSON objects keyed by column name
  pub fn to_json(&self) -> Value {
    let records = self
      .rows
      .iter()
      .map(|row| {
        let object: Map<String, Value> = self
          .columns
          .iter()
          .zip(row)
          .map(|(column, cell)| (column.clone(), Value::String(cell.clone())))
          .collect();
        Value::Object(object)
      })
      .collect();
    Value::Array(records)
  }

  pub fn write_csv(&self, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&self.columns)?;
    for row in &self.rows {
      writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
  }

  /// Read a CSV file with a header row
  pub fn read_csv(path: &Path) -> Result<Self> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut table = Table::new(reader.headers()?.iter());
    for record in reader.records() {
      table.push_row(record?.iter());
    }
    Ok(table)
  }

  /// Box-drawn table, with an index column for data tables
  pub fn render_terminal(&self, show_index: bool) -> String {
    let mut table = comfy_table::Table::new();
    table.load_preset(UTF8_FULL).set_content_arrangement(ContentArrangement::Dynamic);
    table.set_width(marquee::terminal_width() as u16);

    let mut header: Vec<Cell> = Vec::new();
    if show_index {
      header.push(Cell::new(""));
    }
    header.extend(self.columns.iter().map(|c| Cell::new(c).add_attribute(Attribute::Bold)));
    table.set_header(header);

    for (i, row) in self.rows.iter().enumerate() {
      let mut cells: Vec<Cell> = Vec::new();
      if show_index {
        cells.push(Cell::new(i));
      }
      cells.extend(row.iter().map(Cell::new));
      table.add_row(cells);
    }
    table.to_string()
  }

  /// Left-aligned HTML table; cell content is passed through as markup
  pub fn render_html(&self, show_index: bool) -> String {
    let mut html = String::from("<table style=\"text-align: left\">\n<thead><tr>");
    if show_index {
      html.push_str("<th></th>");
    }
    for column in &self.columns {
      html.push_str(&format!("<th style=\"text-align: left\">{}</th>", escape_html(column)));
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for (i, row) in self.rows.iter().enumerate() {
      html.push_str("<tr>");
      if show_index {
        html.push_str(&format!("<th>{i}</th>"));
      }
      for cell in row {
        html.push_str(&format!("<td style=\"text-align: left\">{cell}</td>"));
      }
      html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>");
    html
  }
}

fn escape_html(text: &str) -> String {
  text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Wrap text to a width, breaking words longer than the width
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
  let width = width.max(1);
  let mut lines = Vec::new();

  for paragraph in text.split('\n') {
    if paragraph.trim().is_empty() {
      lines.push(String::new());
      continue;
    }

    let mut current_line = String::new();
    let mut current_width = 0;

    for word in paragraph.split_whitespace() {
      let mut word: String = word.to_string();
      let mut word_width = visible_width(&word);

      if current_width > 0 && current_width + 1 + word_width <= width {
        current_line.push(' ');
        current_line.push_str(&word);
        current_width += 1 + word_width;
        continue;
      }
      if current_width > 0 {
        lines.push(std::mem::take(&mut current_line));
      }

      while word_width > width {
        let (head, tail) = split_visible(&word, width);
        lines.push(head);
        word = tail;
        word_width = visible_width(&word);
      }
      current_line = word;
      current_width = word_width;
    }

    if !current_line.is_empty() {
      lines.push(current_line);
    }
  }

  lines
}

/// Wrapped text joined back into one multi-line cell
pub fn wrap_cell(text: &str, width: usize) -> String {
  wrap_text(text, width).join("\n")
}

fn visible_width(text: &str) -> usize {
  marquee::strip_tags(text).chars().count()
}

/// Split after `width` visible characters, keeping markup tags whole
fn split_visible(word: &str, width: usize) -> (String, String) {
  let tags = marquee::tag_spans(word);
  let mut visible = 0;
  for (i, _) in word.char_indices() {
    if tags.iter().any(|span| span.contains(&i)) {
      continue;
    }
    if visible == width {
      return (word[..i].to_string(), word[i..].to_string());
    }
    visible += 1;
  }
  (word.to_string(), String::new())
}

/// Thousands separators: 1234567 → "1,234,567"
pub fn pretty_number(n: u64) -> String {
  let digits = n.to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push(',');
    }
    out.push(c);
  }
  out
}

/// Parse an ISO timestamp or date into "Jan 02, 2024"; unparseable input is returned as is
pub fn pretty_date(timestamp: &str) -> String {
  let date = DateTime::parse_from_rfc3339(timestamp)
    .map(|dt| dt.date_naive())
    .or_else(|_| {
      NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date())
    })
    .or_else(|_| NaiveDate::parse_from_str(timestamp, "%Y-%m-%d"));
  match date {
    Ok(date) => date.format("%b %d, %Y").to_string(),
    Err(_) => timestamp.to_string(),
  }
}

/// Write a table as CSV into the workspace, appending `.csv` when missing
pub fn save_csv(table: &Table, settings: &Settings, name: &str) -> Result<PathBuf> {
  let name = if name.to_lowercase().ends_with(".csv") {
    name.to_string()
  } else {
    format!("{name}.csv")
  };
  let path = settings.workspace_file(&name);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  table.write_csv(&path)?;
  marquee::success(&format!("Saved results to <yellow>{}</yellow>", path.display()));
  Ok(path)
}

/// Chooses between showing a table and handing it back as data
#[derive(Debug, Clone, Copy)]
pub struct Presenter {
  pub display: DisplayMode,
}

impl Presenter {
  pub fn new(display: DisplayMode) -> Self {
    Self { display }
  }

  /// Print a table for the current display mode
  pub fn show(&self, table: &Table, show_index: bool) {
    match self.display {
      DisplayMode::Notebook => println!("{}", table.render_html(show_index)),
      DisplayMode::Terminal => println!("{}", table.render_terminal(show_index)),
      DisplayMode::Api => {}
    }
  }

  /// Return the table in API mode or when data was requested, else print it
  pub fn deliver(&self, table: Table, return_data: bool, show_index: bool) -> Option<Table> {
    if return_data || self.display == DisplayMode::Api {
      return Some(table);
    }
    self.show(&table, show_index);
    None
  }
}
