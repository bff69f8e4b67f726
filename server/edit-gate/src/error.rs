//! Structured error types for the edit gate.
//!
//! None of these cross the public pipeline boundary: the log, context, and
//! enrichment paths log them and degrade to an absence.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
  #[error("io: {0}")]
  Io(#[from] std::io::Error),

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),

  #[error("write {path}: {source}")]
  Write {
    path: String,
    source: std::io::Error,
  },

  #[error("config: {field}: {reason}")]
  Config { field: String, reason: String },

  #[error("http: {0}")]
  Http(#[from] reqwest::Error),

  #[error("response: {0}")]
  Response(String),
}

impl GateError {
  pub fn write(path: &std::path::Path, source: std::io::Error) -> Self {
    Self::Write {
      path: path.display().to_string(),
      source,
    }
  }

  pub fn config(field: &str, reason: &str) -> Self {
    Self::Config {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn response(msg: impl Into<String>) -> Self {
    Self::Response(msg.into())
  }
}
