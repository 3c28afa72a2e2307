use thiserror::Error;

/// Errors surfaced by the nestor library.
///
/// Only loading and the optional paraphraser can fail. Query parsing and
/// searching degrade to less specific answers instead of erroring.
#[derive(Debug, Error)]
pub enum NestorError {
  #[error("No readable property table found: {message}")]
  DataLoad { message: String },

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("CSV error: {0}")]
  Csv(#[from] csv::Error),

  #[error("Invalid configuration: {0}")]
  Config(#[from] serde_json::Error),

  #[error("Paraphraser failed: {message}")]
  Paraphrase { message: String },
}

impl NestorError {
  pub fn data_load(message: impl Into<String>) -> Self {
    NestorError::DataLoad { message: message.into() }
  }

  pub fn paraphrase(message: impl Into<String>) -> Self {
    NestorError::Paraphrase { message: message.into() }
  }
}

pub type Result<T> = std::result::Result<T, NestorError>;
