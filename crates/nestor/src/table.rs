//! In-memory property table
//!
//! Columns are discovered from the source files, so nothing here is
//! statically typed. A record only holds the cells that were present.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
  Number(f64),
  Text(String),
}

impl Value {
  /// Build a value from a raw cell, treating blank cells as absent
  pub fn parse(raw: &str) -> Option<Self> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
      return None;
    }

    match trimmed.parse::<f64>() {
      Ok(number) if number.is_finite() => Some(Value::Number(number)),
      _ => Some(Value::Text(trimmed.to_string())),
    }
  }

  pub fn as_text(&self) -> String {
    self.to_string()
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Number(number) if number.fract() == 0.0 && number.abs() < 1e15 => {
        write!(f, "{}", *number as i64)
      }
      Value::Number(number) => write!(f, "{number}"),
      Value::Text(text) => write!(f, "{text}"),
    }
  }
}

/// One row of the table, keyed by normalized column name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
  cells: BTreeMap<String, Value>,
}

impl Record {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, column: &str) -> Option<&Value> {
    self.cells.get(column)
  }

  pub fn insert(&mut self, column: impl Into<String>, value: Value) {
    self.cells.insert(column.into(), value);
  }

  /// Copy cells from `other` for columns this record does not have yet
  pub fn absorb(&mut self, other: &Record) {
    for (column, value) in &other.cells {
      self.cells.entry(column.clone()).or_insert_with(|| value.clone());
    }
  }

  pub fn values(&self) -> impl Iterator<Item = &Value> {
    self.cells.values()
  }

  /// Move a cell to a new column name, unless that name is taken
  pub fn rename(&mut self, from: &str, to: &str) {
    if self.cells.contains_key(to) {
      return;
    }
    if let Some(value) = self.cells.remove(from) {
      self.cells.insert(to.to_string(), value);
    }
  }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
  fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
    let mut record = Record::new();
    for (column, value) in iter {
      record.insert(column, value);
    }
    record
  }
}

/// Ordered columns plus ordered rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
  columns: Vec<String>,
  rows: Vec<Record>,
}

impl Table {
  pub fn new(columns: Vec<String>, rows: Vec<Record>) -> Self {
    Self { columns: dedup_columns(columns), rows }
  }

  pub fn empty() -> Self {
    Self::default()
  }

  pub fn columns(&self) -> &[String] {
    &self.columns
  }

  pub fn rows(&self) -> &[Record] {
    &self.rows
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  pub fn has_column(&self, column: &str) -> bool {
    self.columns.iter().any(|c| c == column)
  }

  /// First column whose name contains any of the given fragments
  pub fn find_column(&self, fragments: &[&str]) -> Option<&str> {
    self
      .columns
      .iter()
      .find(|column| fragments.iter().any(|fragment| column.contains(fragment)))
      .map(String::as_str)
  }

  /// Rename a column in the header and every row. A no-op when `from` is
  /// missing or `to` already exists.
  pub fn rename_column(mut self, from: &str, to: &str) -> Self {
    if !self.has_column(from) || self.has_column(to) {
      return self;
    }

    for column in &mut self.columns {
      if column == from {
        *column = to.to_string();
      }
    }
    for row in &mut self.rows {
      row.rename(from, to);
    }
    self
  }

  pub fn head(&self, count: usize) -> &[Record] {
    &self.rows[..count.min(self.rows.len())]
  }
}

/// Render rows as a left-aligned text grid without an index column.
///
/// Absent cells render as blanks.
pub fn render_grid(columns: &[&str], rows: &[Record]) -> String {
  let cells: Vec<Vec<String>> = rows
    .iter()
    .map(|row| {
      columns
        .iter()
        .map(|column| row.get(column).map(Value::as_text).unwrap_or_default())
        .collect()
    })
    .collect();

  let widths: Vec<usize> = columns
    .iter()
    .enumerate()
    .map(|(i, column)| {
      cells.iter().map(|row| row[i].chars().count()).chain([column.chars().count()]).max().unwrap_or(0)
    })
    .collect();

  let format_line = |values: Vec<&str>| -> String {
    values
      .iter()
      .zip(&widths)
      .map(|(value, width)| format!("{value:<width$}", width = *width))
      .collect::<Vec<_>>()
      .join("  ")
      .trim_end()
      .to_string()
  };

  let mut lines = vec![format_line(columns.to_vec())];
  for row in &cells {
    lines.push(format_line(row.iter().map(String::as_str).collect()));
  }
  lines.join("\n")
}

/// Trim and lower-case a header
pub fn normalize_column(name: &str) -> String {
  name.trim().to_lowercase()
}

/// Drop repeated column names, keeping the first occurrence
pub fn dedup_columns(columns: Vec<String>) -> Vec<String> {
  let mut seen = Vec::with_capacity(columns.len());
  for column in columns {
    if !seen.contains(&column) {
      seen.push(column);
    }
  }
  seen
}
