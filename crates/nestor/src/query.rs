//! Free-text query parsing
//!
//! Turns "cheapest 2bhk in mumbai under 1cr" into a [`Filter`]. Every
//! heuristic is optional: when a pattern is not found the matching
//! constraint is simply left out.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::city;
use crate::price;

pub const DEFAULT_LIMIT: usize = 5;

static BHK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)\s*bhk").unwrap());

static MAX_PRICE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?i)\b(?:under|below|upto|up to|less than|within|max)\s+(?:rs\.?|inr|₹)?\s*(\d[\d,]*(?:\.\d+)?\s*(?:crores|crore|cr|lakhs|lakh|lacs|lac|l)?)\b",
  )
  .unwrap()
});

static LIMIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(?:top|best)\s*(\d+)").unwrap());

/// Coarse user intent derived from keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
  Cheap,
  Luxury,
  Best,
  Near,
  Family,
  Investment,
}

impl Intent {
  pub const ALL: [Intent; 6] =
    [Intent::Cheap, Intent::Luxury, Intent::Best, Intent::Near, Intent::Family, Intent::Investment];

  pub fn as_str(&self) -> &'static str {
    match self {
      Intent::Cheap => "cheap",
      Intent::Luxury => "luxury",
      Intent::Best => "best",
      Intent::Near => "near",
      Intent::Family => "family",
      Intent::Investment => "investment",
    }
  }

  fn keywords(&self) -> &'static [&'static str] {
    match self {
      Intent::Cheap => &["cheap", "cheapest", "cheaper", "affordable", "budget", "low cost", "lowest"],
      Intent::Luxury => &["luxury", "luxurious", "premium", "high end", "upscale", "expensive"],
      Intent::Best => &["best", "recommended", "recommend"],
      Intent::Near => &["near", "nearby", "close to", "around"],
      Intent::Family => &["family", "families", "kids", "school"],
      Intent::Investment => &["investment", "invest", "rental", "returns", "roi"],
    }
  }
}

impl fmt::Display for Intent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

static INTENT_PATTERNS: Lazy<Vec<(Intent, Regex)>> = Lazy::new(|| {
  Intent::ALL
    .iter()
    .map(|intent| {
      let alternatives: Vec<String> =
        intent.keywords().iter().map(|keyword| regex::escape(keyword)).collect();
      let pattern = format!(r"(?i)\b(?:{})\b", alternatives.join("|"));
      (*intent, Regex::new(&pattern).unwrap())
    })
    .collect()
});

/// Structured constraints extracted from a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
  pub city: Option<String>,
  pub bhk: Option<u32>,
  pub max_price: Option<f64>,
  pub intents: BTreeSet<Intent>,
  pub limit: usize,
}

impl Default for Filter {
  fn default() -> Self {
    Self { city: None, bhk: None, max_price: None, intents: BTreeSet::new(), limit: DEFAULT_LIMIT }
  }
}

impl Filter {
  pub fn has(&self, intent: Intent) -> bool {
    self.intents.contains(&intent)
  }
}

impl fmt::Display for Filter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let or_any = |value: Option<String>| value.unwrap_or_else(|| "any".to_string());
    let intents: Vec<&str> = self.intents.iter().map(Intent::as_str).collect();

    writeln!(f, "city:      {}", or_any(self.city.clone()))?;
    writeln!(f, "bhk:       {}", or_any(self.bhk.map(|n| n.to_string())))?;
    writeln!(f, "max price: {}", or_any(self.max_price.map(price::format_amount)))?;
    writeln!(f, "intents:   {}", if intents.is_empty() { "none".to_string() } else { intents.join(", ") })?;
    write!(f, "limit:     {}", self.limit)
  }
}

/// Parse a query with the stock default limit
pub fn parse(query: &str) -> Filter {
  parse_with_limit(query, DEFAULT_LIMIT)
}

/// Parse a query, falling back to `default_limit` when none is requested
pub fn parse_with_limit(query: &str, default_limit: usize) -> Filter {
  Filter {
    city: city::match_city(query).map(str::to_string),
    bhk: extract_bhk(query),
    max_price: extract_max_price(query),
    intents: extract_intents(query),
    limit: extract_limit(query).unwrap_or(default_limit.max(1)),
  }
}

pub fn extract_bhk(query: &str) -> Option<u32> {
  BHK
    .captures(query)
    .and_then(|captures| captures[1].parse::<u32>().ok())
    .filter(|count| *count > 0)
}

pub fn extract_max_price(query: &str) -> Option<f64> {
  MAX_PRICE.captures(query).and_then(|captures| price::normalize(&captures[1]))
}

pub fn extract_intents(query: &str) -> BTreeSet<Intent> {
  INTENT_PATTERNS
    .iter()
    .filter(|(_, pattern)| pattern.is_match(query))
    .map(|(intent, _)| *intent)
    .collect()
}

pub fn extract_limit(query: &str) -> Option<usize> {
  LIMIT
    .captures(query)
    .and_then(|captures| captures[1].parse::<usize>().ok())
    .filter(|limit| *limit > 0)
}
