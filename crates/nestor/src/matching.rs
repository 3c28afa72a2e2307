//! Row matching policies

use regex::Regex;

use crate::table::Record;

/// Matches a row when any of its cells satisfies the check.
///
/// No column is singled out, so a city named in a project description
/// matches just like one in an address column. Listing schemas differ a
/// lot between sources and this keeps working across them, at the cost of
/// the occasional false positive.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyColumnContains;

impl AnyColumnContains {
  /// Any cell contains `needle`, ignoring case
  pub fn text(&self, record: &Record, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    record.values().any(|value| value.as_text().to_lowercase().contains(&needle))
  }

  /// Any cell matches `pattern`
  pub fn pattern(&self, record: &Record, pattern: &Regex) -> bool {
    record.values().any(|value| pattern.is_match(&value.as_text()))
  }
}

/// Case-insensitive, word-bounded pattern for "<count> bhk"
pub fn bhk_pattern(count: u32) -> Regex {
  // Only digits are interpolated so the pattern is always valid
  Regex::new(&format!(r"(?i)\b{count}\s*bhk\b")).unwrap()
}
