//! Fuzzy city matching against a fixed vocabulary

use strsim::normalized_damerau_levenshtein;

/// Scores must be strictly above this to count as a match
pub const CITY_MATCH_THRESHOLD: f64 = 70.0;

/// Cities the matcher knows about. Extending this needs a rebuild.
pub const KNOWN_CITIES: &[&str] = &[
  "mumbai", "pune", "delhi", "bangalore", "bengaluru", "hyderabad", "chennai", "kolkata",
  "ahmedabad", "gurgaon", "noida", "thane", "nagpur", "jaipur", "lucknow", "indore", "kochi",
  "chandigarh", "surat", "nashik",
];

/// Query words that belong to the query grammar, never to a place name.
/// "than" would otherwise read as "thane".
const GRAMMAR_WORDS: &[&str] = &[
  "in", "at", "for", "with", "and", "the", "under", "below", "upto", "up", "to", "less", "than",
  "within", "max", "top", "best", "rs", "inr", "bhk", "cr", "crore", "lakh", "lakhs", "lac", "near",
  "cheap", "cheapest", "affordable", "budget", "luxury", "premium", "flat", "flats", "home", "homes",
];

/// Best vocabulary entry for a query along with its 0-100 score
#[derive(Debug, Clone, PartialEq)]
pub struct CityMatch {
  pub city: &'static str,
  pub score: f64,
}

/// Score how well `city` appears somewhere inside `query` (0-100).
///
/// The city is compared with the whole query and with every run of
/// consecutive place words as long as the city name, keeping the best.
pub fn score(query: &str, city: &str) -> f64 {
  let query = query.to_lowercase();
  let city = city.to_lowercase();

  let words: Vec<&str> = query
    .split(|c: char| !c.is_alphanumeric())
    .filter(|word| is_place_word(word))
    .collect();
  let window = city.split_whitespace().count().max(1);

  let mut best = normalized_damerau_levenshtein(&query, &city);
  for run in words.windows(window) {
    let candidate = run.join(" ");
    best = best.max(normalized_damerau_levenshtein(&candidate, &city));
  }

  best * 100.0
}

/// Numbers, "2bhk", "50l" and grammar words are skipped when windowing
fn is_place_word(word: &str) -> bool {
  !word.is_empty() && !word.chars().any(|c| c.is_ascii_digit()) && !GRAMMAR_WORDS.contains(&word)
}

/// Highest-scoring known city, regardless of threshold
pub fn best_match(query: &str) -> Option<CityMatch> {
  let mut best: Option<CityMatch> = None;
  for city in KNOWN_CITIES.iter().copied() {
    let candidate = score(query, city);
    if best.as_ref().map_or(true, |current| candidate > current.score) {
      best = Some(CityMatch { city, score: candidate });
    }
  }
  best
}

/// Known city mentioned in the query, if any scores above the threshold
pub fn match_city(query: &str) -> Option<&'static str> {
  best_match(query).filter(|found| found.score > CITY_MATCH_THRESHOLD).map(|found| found.city)
}
