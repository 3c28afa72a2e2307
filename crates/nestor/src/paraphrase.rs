//! Optional model-written replies
//!
//! A paraphraser gets the user's query plus a few listing rows and writes
//! a conversational answer. It is never required: the rendered search
//! reply is always shown, and a failing model only adds a short notice.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::ParaphraserConfig;
use crate::error::{NestorError, Result};
use crate::table::{render_grid, Record, Table};

/// Columns given to the model when the table has them
pub const CONTEXT_COLUMNS: &[&str] = &[
  "projectname",
  "projecttype",
  "projectcategory",
  "price",
  "cityid",
  "fulladdress",
  "aboutproperty",
];

pub const EMPTY_REPLY: &str = "Sorry, I couldn't find anything relevant right now.";

pub trait Paraphraser {
  fn paraphrase(&self, query: &str, context: &str) -> Result<String>;
}

/// Prompt sent to the model
pub fn build_prompt(query: &str, context: &str) -> String {
  format!(
    "User wants: {query}\nHere are some property listings:\n{context}\n\nGive a short, clear, helpful response based on the listings."
  )
}

/// Text grid of up to `limit` rows restricted to the context columns.
///
/// Falls back to every table column when none of the known ones exist.
pub fn build_context(table: &Table, rows: &[Record], limit: usize) -> String {
  let mut columns: Vec<&str> =
    CONTEXT_COLUMNS.iter().copied().filter(|column| table.has_column(column)).collect();
  if columns.is_empty() {
    columns = table.columns().iter().map(String::as_str).collect();
  }

  render_grid(&columns, &rows[..limit.min(rows.len())])
}

/// Model output, or the stock apology when the model said nothing
pub fn reply_or_fallback(generated: &str) -> String {
  let trimmed = generated.trim();
  if trimmed.is_empty() {
    EMPTY_REPLY.to_string()
  } else {
    trimmed.to_string()
  }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
  model: &'a str,
  prompt: String,
  stream: bool,
  options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
  temperature: f32,
  num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
  #[serde(default)]
  response: String,
}

/// Paraphraser backed by an Ollama-compatible `/api/generate` endpoint
pub struct OllamaParaphraser {
  client: Client,
  config: ParaphraserConfig,
}

impl OllamaParaphraser {
  pub fn new(config: ParaphraserConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| NestorError::paraphrase(format!("Failed to create HTTP client: {e}")))?;

    Ok(Self { client, config })
  }

  fn generate_url(&self) -> String {
    format!("{}/api/generate", self.config.endpoint.trim_end_matches('/'))
  }
}

impl Paraphraser for OllamaParaphraser {
  fn paraphrase(&self, query: &str, context: &str) -> Result<String> {
    let request = GenerateRequest {
      model: &self.config.model,
      prompt: build_prompt(query, context),
      stream: false,
      options: GenerateOptions {
        temperature: self.config.temperature,
        num_predict: self.config.max_tokens,
      },
    };

    let url = self.generate_url();
    debug!(url = %url, model = %self.config.model, "requesting paraphrase");

    let response = self
      .client
      .post(&url)
      .json(&request)
      .send()
      .map_err(|e| NestorError::paraphrase(e.to_string()))?;

    if !response.status().is_success() {
      let status = response.status();
      let body = response.text().unwrap_or_default();
      return Err(NestorError::paraphrase(format!("{status}: {body}")));
    }

    let generated: GenerateResponse =
      response.json().map_err(|e| NestorError::paraphrase(e.to_string()))?;
    Ok(reply_or_fallback(&generated.response))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::table::Value;

  fn row(cells: &[(&str, &str)]) -> Record {
    cells.iter().map(|(column, raw)| (*column, Value::Text(raw.to_string()))).collect()
  }

  #[test]
  fn test_prompt_layout() {
    let prompt = build_prompt("2bhk in pune", "projectname\nHill Crest");
    assert!(prompt.starts_with("User wants: 2bhk in pune\nHere are some property listings:\n"));
    assert!(prompt.contains("projectname\nHill Crest\n\n"));
    assert!(prompt.ends_with("based on the listings."));
  }

  #[test]
  fn test_context_keeps_known_columns_and_limit() {
    let table = Table::new(
      vec!["projectname".into(), "internal_code".into(), "price".into()],
      (0..15)
        .map(|i| {
          let name = format!("P{i}");
          row(&[("projectname", name.as_str()), ("internal_code", "x"), ("price", "45 L")])
        })
        .collect(),
    );

    let context = build_context(&table, table.rows(), 10);
    assert!(context.starts_with("projectname  price"));
    assert!(!context.contains("internal_code"));
    assert_eq!(context.lines().count(), 11);
  }

  #[test]
  fn test_context_falls_back_to_all_columns() {
    let table = Table::new(vec!["title".into(), "cost".into()], vec![row(&[("title", "A"), ("cost", "1")])]);
    let context = build_context(&table, table.rows(), 10);
    assert!(context.starts_with("title  cost"));
  }

  #[test]
  fn test_empty_generation_uses_fallback() {
    assert_eq!(reply_or_fallback("   "), EMPTY_REPLY);
    assert_eq!(reply_or_fallback(" Try Hill Crest. "), "Try Hill Crest.");
  }

  #[test]
  fn test_unreachable_endpoint_is_an_error() {
    let config = ParaphraserConfig {
      endpoint: "http://127.0.0.1:9".to_string(),
      timeout_secs: 2,
      ..ParaphraserConfig::default()
    };
    let paraphraser = OllamaParaphraser::new(config).unwrap();
    let result = paraphraser.paraphrase("2bhk in pune", "");
    assert!(matches!(result, Err(NestorError::Paraphrase { .. })));
  }
}
