//! Gate configuration with sane defaults, overridable from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::GateError;

pub const DEFAULT_LOG_FILE: &str = ".edit-gate/events.json";
pub const DEFAULT_DIFF_FILE: &str = ".edit-gate/last-diff.json";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone)]
pub struct Config {
  /// Project root; relative file paths in edit records resolve against it.
  pub workspace: PathBuf,
  pub log_path: PathBuf,
  /// Diff sidecar written by the surrounding tooling.
  pub diff_path: PathBuf,
  pub session_id: String,
  /// Floor between consecutive reasoning-service calls (15 requests/minute).
  pub min_interval: Duration,
  /// Max characters of current file content sent for enrichment.
  pub max_content_chars: usize,
  pub request_timeout: Duration,
  /// Enrichment is disabled when unset.
  pub gemini_api_key: Option<String>,
  pub gemini_model: String,
}

impl Default for Config {
  fn default() -> Self {
    Self::for_workspace(".")
  }
}

impl Config {
  pub fn for_workspace(root: impl AsRef<Path>) -> Self {
    let root = root.as_ref();
    Self {
      workspace: root.to_path_buf(),
      log_path: root.join(DEFAULT_LOG_FILE),
      diff_path: root.join(DEFAULT_DIFF_FILE),
      session_id: uuid::Uuid::new_v4().to_string(),
      min_interval: Duration::from_secs(4),
      max_content_chars: 8000,
      request_timeout: Duration::from_secs(30),
      gemini_api_key: None,
      gemini_model: DEFAULT_MODEL.to_string(),
    }
  }

  /// Defaults, then `EDIT_GATE_*` / `GEMINI_*` overrides.
  pub fn from_env() -> Result<Self, GateError> {
    let mut config = match env("EDIT_GATE_WORKSPACE") {
      Some(root) => Self::for_workspace(root),
      None => Self::default(),
    };
    if let Some(p) = env("EDIT_GATE_LOG_PATH") {
      config.log_path = config.workspace.join(p);
    }
    if let Some(p) = env("EDIT_GATE_DIFF_PATH") {
      config.diff_path = config.workspace.join(p);
    }
    if let Some(id) = env("EDIT_GATE_SESSION_ID") {
      config.session_id = id;
    }
    if let Some(ms) = env("EDIT_GATE_MIN_INTERVAL_MS") {
      config.min_interval = Duration::from_millis(parse_num("EDIT_GATE_MIN_INTERVAL_MS", &ms)?);
    }
    if let Some(n) = env("EDIT_GATE_MAX_CONTENT_CHARS") {
      config.max_content_chars = parse_num("EDIT_GATE_MAX_CONTENT_CHARS", &n)? as usize;
    }
    config.gemini_api_key = env("GEMINI_API_KEY");
    if let Some(model) = env("GEMINI_MODEL") {
      config.gemini_model = model;
    }
    Ok(config)
  }
}

fn env(key: &str) -> Option<String> {
  std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_num(field: &str, raw: &str) -> Result<u64, GateError> {
  raw
    .trim()
    .parse()
    .map_err(|_| GateError::config(field, "expected a non-negative integer"))
}
