//! Property search and rendering
//!
//! Applies a [`Filter`] to a [`Table`], orders the matches according to the
//! query intent, and renders a Markdown reply. Nothing in here fails on odd
//! data: missing columns just make the output less informative.

use serde::Serialize;
use tracing::debug;

use crate::matching::{bhk_pattern, AnyColumnContains};
use crate::price;
use crate::query::{Filter, Intent};
use crate::ranking::{
  PriceAscending, PriceDescending, RandomShuffle, RankedRow, RankingStrategy, TableOrder,
};
use crate::table::{Record, Table};

pub const NO_MATCHES_MESSAGE: &str =
  "No matches found for your query. Try a different city, budget, or BHK.";

pub const DEFAULT_DESCRIPTION_WIDTH: usize = 100;

const PRICE_COLUMN_HINTS: &[&str] = &["price", "amount"];

/// Matched rows after ranking and truncation
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
  pub rows: Vec<RankedRow>,
  pub total_matches: usize,
  pub strategy: &'static str,
}

/// What the user sees plus the data behind it
#[derive(Debug, Clone, Serialize)]
pub struct Reply {
  pub text: String,
  pub filter: Filter,
  pub result: Option<SearchResult>,
}

impl Reply {
  pub fn is_empty(&self) -> bool {
    self.result.is_none()
  }
}

pub struct SearchEngine {
  matcher: AnyColumnContains,
  best: Box<dyn RankingStrategy>,
  description_width: usize,
}

impl Default for SearchEngine {
  fn default() -> Self {
    Self::new()
  }
}

impl SearchEngine {
  pub fn new() -> Self {
    Self {
      matcher: AnyColumnContains,
      best: Box::new(RandomShuffle::new()),
      description_width: DEFAULT_DESCRIPTION_WIDTH,
    }
  }

  /// Replace the ordering used for the "best" intent
  pub fn with_best_strategy(mut self, strategy: Box<dyn RankingStrategy>) -> Self {
    self.best = strategy;
    self
  }

  pub fn with_description_width(mut self, width: usize) -> Self {
    self.description_width = width;
    self
  }

  /// Ordering for a filter: cheap, then luxury, then best, else table order
  pub fn strategy_for(&self, filter: &Filter) -> &dyn RankingStrategy {
    if filter.has(Intent::Cheap) {
      &PriceAscending
    } else if filter.has(Intent::Luxury) {
      &PriceDescending
    } else if filter.has(Intent::Best) {
      self.best.as_ref()
    } else {
      &TableOrder
    }
  }

  /// Filter, rank and truncate. `None` when nothing matched.
  pub fn search(&self, table: &Table, filter: &Filter) -> Option<SearchResult> {
    let price_column = table.find_column(PRICE_COLUMN_HINTS);
    let bhk = filter.bhk.map(bhk_pattern);

    let mut matches: Vec<RankedRow> = table
      .rows()
      .iter()
      .filter(|record| filter.city.as_deref().map_or(true, |city| self.matcher.text(record, city)))
      .filter(|record| bhk.as_ref().map_or(true, |pattern| self.matcher.pattern(record, pattern)))
      .map(|record| RankedRow { record: record.clone(), price: derive_price(record, price_column) })
      .filter(|row| within_budget(row.price, filter.max_price))
      .collect();

    debug!(
      matches = matches.len(),
      rows = table.len(),
      price_column = price_column.unwrap_or("none"),
      "filtered table"
    );

    if matches.is_empty() {
      return None;
    }

    let total_matches = matches.len();
    let strategy = self.strategy_for(filter);
    strategy.rank(&mut matches);
    matches.truncate(filter.limit);

    Some(SearchResult { rows: matches, total_matches, strategy: strategy.name() })
  }

  /// Search and render a reply for the presentation layer
  pub fn answer(&self, table: &Table, filter: &Filter) -> Reply {
    let result = self.search(table, filter);
    let text = match &result {
      Some(found) => render(table, filter, found, self.description_width),
      None => NO_MATCHES_MESSAGE.to_string(),
    };

    Reply { text, filter: filter.clone(), result }
  }
}

/// Normalized price of a row, read from the detected price column
pub fn derive_price(record: &Record, price_column: Option<&str>) -> Option<f64> {
  price_column.and_then(|column| record.get(column)).and_then(|value| price::normalize(&value.as_text()))
}

fn within_budget(price: Option<f64>, max_price: Option<f64>) -> bool {
  match (max_price, price) {
    (None, _) => true,
    (Some(max), Some(price)) => price <= max,
    (Some(_), None) => false,
  }
}

/// Intro line for a reply, picked by the same precedence as the ranking
pub fn banner(filter: &Filter) -> &'static str {
  if filter.has(Intent::Cheap) {
    "💰 Most affordable matches"
  } else if filter.has(Intent::Luxury) {
    "✨ Premium picks"
  } else if filter.has(Intent::Best) {
    "⭐ A few picks worth a look"
  } else {
    "🏠 Matching properties"
  }
}

/// Columns used when rendering a row, detected once per table
#[derive(Debug, Default)]
pub struct DisplayColumns<'a> {
  pub name: Option<&'a str>,
  pub price: Option<&'a str>,
  pub city: Option<&'a str>,
  pub address: Option<&'a str>,
  pub description: Option<&'a str>,
}

impl<'a> DisplayColumns<'a> {
  pub fn detect(table: &'a Table) -> Self {
    Self {
      name: pick_column(table, &["projectname", "name", "title"], &["name", "title"]),
      price: table.find_column(PRICE_COLUMN_HINTS),
      city: pick_column(table, &["city", "cityname", "location"], &["city", "location", "locality"]),
      address: pick_column(table, &["fulladdress", "address"], &["address"]),
      description: pick_column(table, &["aboutproperty", "description"], &["about", "desc"]),
    }
  }
}

/// Exact column name first, then the first column containing a fragment
fn pick_column<'a>(table: &'a Table, exact: &[&str], fragments: &[&str]) -> Option<&'a str> {
  exact
    .iter()
    .find_map(|name| table.columns().iter().find(|column| column == name))
    .map(String::as_str)
    .or_else(|| table.find_column(fragments))
}

fn render(table: &Table, filter: &Filter, result: &SearchResult, description_width: usize) -> String {
  let columns = DisplayColumns::detect(table);
  let mut text = format!(
    "### {}\nShowing {} of {} matching properties.\n",
    banner(filter),
    result.rows.len(),
    result.total_matches
  );

  for (index, row) in result.rows.iter().enumerate() {
    text.push('\n');
    text.push_str(&render_row(index + 1, row, &columns, description_width));
  }

  text
}

fn render_row(position: usize, row: &RankedRow, columns: &DisplayColumns, description_width: usize) -> String {
  let cell = |column: Option<&str>| column.and_then(|c| row.record.get(c)).map(|value| value.as_text());

  let name = cell(columns.name).unwrap_or_else(|| format!("Property {position}"));
  let mut block = format!("**{position}. {name}**\n");

  let price = row.price.map(price::format_amount).or_else(|| cell(columns.price));
  if let Some(price) = price {
    block.push_str(&format!("- Price: {price}\n"));
  }
  if let Some(city) = cell(columns.city) {
    block.push_str(&format!("- City: {city}\n"));
  }
  if let Some(address) = cell(columns.address) {
    block.push_str(&format!("- Address: {address}\n"));
  }
  if let Some(description) = cell(columns.description) {
    block.push_str(&format!("- About: {}\n", truncate(&description, description_width)));
  }

  block
}

/// Cut text to `width` characters, marking the cut with an ellipsis
pub fn truncate(text: &str, width: usize) -> String {
  if text.chars().count() <= width {
    text.to_string()
  } else {
    let kept: String = text.chars().take(width).collect();
    format!("{}...", kept.trim_end())
  }
}
