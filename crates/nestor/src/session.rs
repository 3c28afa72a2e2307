//! Conversation state for the CLI
//!
//! A session holds the cached table, the search engine, the optional
//! paraphraser and the transcript of the conversation so far.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::warn;

use crate::config::Config;
use crate::engine::{Reply, SearchEngine};
use crate::error::Result;
use crate::loader::TableCache;
use crate::paraphrase::{build_context, Paraphraser};
use crate::query;
use crate::table::Table;

pub const EMPTY_STATE_MESSAGE: &str =
  "No property data loaded. Make sure the listing CSV files are in the data directory.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  User,
  Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct Turn {
  pub role: Role,
  pub text: String,
  pub at: DateTime<Utc>,
}

/// Append-only conversation log
#[derive(Debug, Default, Serialize)]
pub struct Transcript {
  turns: Vec<Turn>,
}

impl Transcript {
  pub fn push(&mut self, role: Role, text: impl Into<String>) {
    self.turns.push(Turn { role, text: text.into(), at: Utc::now() });
  }

  pub fn turns(&self) -> &[Turn] {
    &self.turns
  }

  pub fn len(&self) -> usize {
    self.turns.len()
  }

  pub fn is_empty(&self) -> bool {
    self.turns.is_empty()
  }
}

pub struct Session {
  config: Config,
  cache: TableCache,
  engine: SearchEngine,
  paraphraser: Option<Box<dyn Paraphraser>>,
  transcript: Transcript,
}

impl Session {
  pub fn new(config: Config, data_dir: &Path) -> Self {
    let cache = TableCache::new(data_dir, config.join_plan());
    let engine = SearchEngine::new().with_description_width(config.description_width);
    Self { config, cache, engine, paraphraser: None, transcript: Transcript::default() }
  }

  pub fn with_engine(mut self, engine: SearchEngine) -> Self {
    self.engine = engine;
    self
  }

  pub fn with_paraphraser(mut self, paraphraser: Box<dyn Paraphraser>) -> Self {
    self.paraphraser = Some(paraphraser);
    self
  }

  pub fn data_dir(&self) -> &Path {
    self.cache.dir()
  }

  pub fn table(&mut self) -> Result<&Table> {
    self.cache.get_or_load()
  }

  /// Force the next query to re-read the data directory
  pub fn reload(&mut self) {
    self.cache.invalidate();
  }

  pub fn transcript(&self) -> &Transcript {
    &self.transcript
  }

  /// Parse and run a query without touching the transcript
  pub fn search(&mut self, query: &str) -> Result<Reply> {
    let filter = query::parse_with_limit(query, self.config.default_limit);
    let table = self.cache.get_or_load()?;
    Ok(self.engine.answer(table, &filter))
  }

  /// Answer a user query and record both sides in the transcript.
  ///
  /// Blank queries are ignored. A missing table answers with the
  /// empty-state message instead of failing.
  pub fn ask(&mut self, query: &str) -> Option<String> {
    let query = query.trim();
    if query.is_empty() {
      return None;
    }

    self.transcript.push(Role::User, query);

    let text = match self.search(query) {
      Ok(reply) => {
        let mut text = reply.text.clone();
        if let Some(extra) = self.paraphrased(query, &reply) {
          text.push_str("\n\n");
          text.push_str(&extra);
        }
        text
      }
      Err(e) => {
        warn!("{e}");
        EMPTY_STATE_MESSAGE.to_string()
      }
    };

    self.transcript.push(Role::Assistant, text.clone());
    Some(text)
  }

  fn paraphrased(&mut self, query: &str, reply: &Reply) -> Option<String> {
    let context_rows = self.config.paraphraser.context_rows;
    let paraphraser = self.paraphraser.as_ref()?;
    let table = self.cache.get_or_load().ok()?;

    let context = match &reply.result {
      Some(result) => {
        let rows: Vec<_> = result.rows.iter().map(|row| row.record.clone()).collect();
        build_context(table, &rows, context_rows)
      }
      None => build_context(table, table.rows(), context_rows),
    };

    let section = match paraphraser.paraphrase(query, &context) {
      Ok(generated) => format!("#### 🤖 AI Response\n{generated}"),
      Err(e) => {
        warn!("{e}");
        format!("_Error generating response: {e}_")
      }
    };
    Some(section)
  }
}
