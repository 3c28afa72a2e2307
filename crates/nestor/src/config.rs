//! Configuration management for Nestor
//!
//! Settings come from a JSON file; every field has a default, so a
//! partial file (or none at all) is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::engine::DEFAULT_DESCRIPTION_WIDTH;
use crate::error::Result;
use crate::loader::{default_table_links, JoinPlan, TableLink, DEFAULT_JOIN_KEYS};
use crate::query::DEFAULT_LIMIT;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "NESTOR_DATA_DIR";

const CONFIG_PATHS: &[&str] = &[".nestor.json", "nestor.json"];

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
  /// Directory holding the listing tables
  #[serde(default)]
  pub data_dir: Option<PathBuf>,
  /// Column names that link tables together, in order of preference
  #[serde(default = "default_join_keys")]
  pub join_keys: Vec<String>,
  /// Per-table `id` renames and join columns for known file names
  #[serde(default = "default_table_links")]
  pub tables: Vec<TableLink>,
  /// Results shown when the query does not ask for a count
  #[serde(default = "default_limit")]
  pub default_limit: usize,
  /// Rows shown by `preview`
  #[serde(default = "default_preview_rows")]
  pub preview_rows: usize,
  /// Characters of description kept per result
  #[serde(default = "default_description_width")]
  pub description_width: usize,
  #[serde(default)]
  pub paraphraser: ParaphraserConfig,
}

/// Settings for the optional model-backed paraphraser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParaphraserConfig {
  #[serde(default = "default_endpoint")]
  pub endpoint: String,
  #[serde(default = "default_model")]
  pub model: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  /// Listing rows included in the prompt
  #[serde(default = "default_context_rows")]
  pub context_rows: usize,
  #[serde(default = "default_max_tokens")]
  pub max_tokens: u32,
  #[serde(default = "default_temperature")]
  pub temperature: f32,
}

fn default_join_keys() -> Vec<String> {
  DEFAULT_JOIN_KEYS.iter().map(|key| key.to_string()).collect()
}
fn default_limit() -> usize {
  DEFAULT_LIMIT
}
fn default_preview_rows() -> usize {
  5
}
fn default_description_width() -> usize {
  DEFAULT_DESCRIPTION_WIDTH
}
fn default_endpoint() -> String {
  "http://localhost:11434".to_string()
}
fn default_model() -> String {
  "flan-t5-small".to_string()
}
fn default_timeout_secs() -> u64 {
  30
}
fn default_context_rows() -> usize {
  10
}
fn default_max_tokens() -> u32 {
  150
}
fn default_temperature() -> f32 {
  0.7
}

impl Default for ParaphraserConfig {
  fn default() -> Self {
    Self {
      endpoint: default_endpoint(),
      model: default_model(),
      timeout_secs: default_timeout_secs(),
      context_rows: default_context_rows(),
      max_tokens: default_max_tokens(),
      temperature: default_temperature(),
    }
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      data_dir: None,
      join_keys: default_join_keys(),
      tables: default_table_links(),
      default_limit: default_limit(),
      preview_rows: default_preview_rows(),
      description_width: default_description_width(),
      paraphraser: ParaphraserConfig::default(),
    }
  }
}

impl Config {
  /// Load configuration from a file
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
  }

  /// Load from the current directory, then `~/.nestor/config.json`, else defaults
  pub fn load() -> Result<Self> {
    for path in CONFIG_PATHS {
      if Path::new(path).exists() {
        return Self::load_from_file(path);
      }
    }

    if let Some(path) = user_config_path() {
      if path.exists() {
        return Self::load_from_file(path);
      }
    }

    Ok(Config::default())
  }

  /// How loaded tables are merged
  pub fn join_plan(&self) -> JoinPlan {
    JoinPlan { keys: self.join_keys.clone(), links: self.tables.clone() }
  }

  /// Data directory: explicit argument, then env var, then config, then cwd
  pub fn resolve_data_dir(&self, explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
      return dir.to_path_buf();
    }
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
      if !dir.trim().is_empty() {
        return PathBuf::from(dir);
      }
    }
    self.data_dir.clone().unwrap_or_else(|| PathBuf::from("."))
  }
}

fn user_config_path() -> Option<PathBuf> {
  dirs::home_dir().map(|home| home.join(".nestor").join("config.json"))
}
