//! Price token normalization
//!
//! Listings and queries write prices as "1.2 Cr", "50L", "75,00,000" or a
//! bare "80". Everything is normalized to rupees.

use once_cell::sync::Lazy;
use regex::Regex;

pub const CRORE: f64 = 10_000_000.0;
pub const LAKH: f64 = 100_000.0;

/// Bare numbers below this are read as lakhs
pub const BARE_LAKH_THRESHOLD: f64 = 1000.0;

static PRICE_TOKEN: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(\d+(?:\.\d+)?)(crores|crore|cr|lakhs|lakh|lacs|lac|l)?").unwrap()
});

/// Normalize a price fragment to rupees.
///
/// Returns `None` when the fragment holds no number.
pub fn normalize(fragment: &str) -> Option<f64> {
  let compact: String = fragment
    .to_lowercase()
    .chars()
    .filter(|c| *c != ',' && !c.is_whitespace())
    .collect();

  let captures = PRICE_TOKEN.captures(&compact)?;
  let number: f64 = captures.get(1)?.as_str().parse().ok()?;

  let amount = match captures.get(2).map(|suffix| suffix.as_str()) {
    Some("crores" | "crore" | "cr") => number * CRORE,
    Some(_) => number * LAKH,
    None if number < BARE_LAKH_THRESHOLD => number * LAKH,
    None => number,
  };

  Some(amount)
}

/// Render an amount the way listings usually quote it
pub fn format_amount(amount: f64) -> String {
  if amount >= CRORE {
    format!("₹{:.2} Cr", amount / CRORE)
  } else if amount >= LAKH {
    format!("₹{:.2} L", amount / LAKH)
  } else {
    format!("₹{amount:.0}")
  }
}
