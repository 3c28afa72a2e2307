//! Result ordering strategies

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::cmp::Ordering;

use crate::table::Record;

/// A matched row together with its derived price
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRow {
  pub record: Record,
  pub price: Option<f64>,
}

/// Orders matched rows before they are truncated to the result limit
pub trait RankingStrategy {
  fn name(&self) -> &'static str;
  fn rank(&self, rows: &mut [RankedRow]);
}

/// Keeps table order
pub struct TableOrder;

impl RankingStrategy for TableOrder {
  fn name(&self) -> &'static str {
    "table-order"
  }

  fn rank(&self, _rows: &mut [RankedRow]) {}
}

/// Cheapest first; rows without a price go last
pub struct PriceAscending;

impl RankingStrategy for PriceAscending {
  fn name(&self) -> &'static str {
    "price-ascending"
  }

  fn rank(&self, rows: &mut [RankedRow]) {
    rows.sort_by(|a, b| compare_prices(a.price, b.price, false));
  }
}

/// Most expensive first; rows without a price go last
pub struct PriceDescending;

impl RankingStrategy for PriceDescending {
  fn name(&self) -> &'static str {
    "price-descending"
  }

  fn rank(&self, rows: &mut [RankedRow]) {
    rows.sort_by(|a, b| compare_prices(a.price, b.price, true));
  }
}

/// Random permutation of the matches.
///
/// Stands in for "best" until listings carry a quality signal; it ranks
/// nothing.
#[derive(Default)]
pub struct RandomShuffle {
  seed: Option<u64>,
}

impl RandomShuffle {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reproducible shuffle, mainly for tests
  pub fn seeded(seed: u64) -> Self {
    Self { seed: Some(seed) }
  }
}

impl RankingStrategy for RandomShuffle {
  fn name(&self) -> &'static str {
    "random-shuffle"
  }

  fn rank(&self, rows: &mut [RankedRow]) {
    let mut rng = match self.seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
    };
    rows.shuffle(&mut rng);
  }
}

fn compare_prices(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
  match (a, b) {
    (Some(a), Some(b)) => {
      let ordering = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
      if descending {
        ordering.reverse()
      } else {
        ordering
      }
    }
    (Some(_), None) => Ordering::Less,
    (None, Some(_)) => Ordering::Greater,
    (None, None) => Ordering::Equal,
  }
}
