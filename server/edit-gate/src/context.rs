//! Best-effort context for enrichment: sidecar diff and bounded file content.
//!
//! Nothing here fails. A mismatched or absent sidecar yields an empty diff; a
//! missing file yields empty content.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::fs;

use risk_engine::paths::normalize_path;

pub const TRUNCATION_MARKER: &str = "\n... [truncated]";

/// Diff sidecar written by the surrounding tooling for the latest edit.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSidecar {
  pub file_path: String,
  pub diff: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditContext {
  pub diff: String,
  pub content: String,
}

#[derive(Debug, Clone)]
pub struct ContextSource {
  workspace: PathBuf,
  diff_path: PathBuf,
  max_content_chars: usize,
}

impl ContextSource {
  pub fn new(
    workspace: impl Into<PathBuf>,
    diff_path: impl Into<PathBuf>,
    max_content_chars: usize,
  ) -> Self {
    Self {
      workspace: workspace.into(),
      diff_path: diff_path.into(),
      max_content_chars,
    }
  }

  pub async fn gather(&self, file_path: &str) -> EditContext {
    EditContext {
      diff: self.diff_for(file_path).await,
      content: self.content_for(file_path).await,
    }
  }

  /// Sidecar diff when it belongs to `file_path`, else empty.
  pub async fn diff_for(&self, file_path: &str) -> String {
    let raw = match fs::read(&self.diff_path).await {
      Ok(raw) => raw,
      Err(_) => return String::new(),
    };
    let sidecar: DiffSidecar = match serde_json::from_slice(&raw) {
      Ok(s) => s,
      Err(e) => {
        tracing::debug!(error = %e, "diff sidecar malformed; ignoring");
        return String::new();
      }
    };
    if self.resolve(&sidecar.file_path) == self.resolve(file_path) {
      sidecar.diff
    } else {
      tracing::debug!(
        sidecar = %sidecar.file_path,
        event = %file_path,
        "diff sidecar is for another file"
      );
      String::new()
    }
  }

  /// Current file content, bounded to the character budget.
  pub async fn content_for(&self, file_path: &str) -> String {
    let path = self.workspace.join(file_path);
    match fs::read(&path).await {
      Ok(bytes) => truncate_chars(&String::from_utf8_lossy(&bytes), self.max_content_chars),
      Err(_) => String::new(),
    }
  }

  // Absolute paths stay as-is; relative ones are rooted at the workspace.
  fn resolve(&self, file_path: &str) -> String {
    let file_path = normalize_path(file_path);
    let p = Path::new(&file_path);
    let full = if p.is_absolute() {
      p.to_path_buf()
    } else {
      self.workspace.join(p)
    };
    normalize_path(&full.to_string_lossy())
  }
}

/// First `max` characters, with a marker when anything was cut.
pub fn truncate_chars(s: &str, max: usize) -> String {
  match s.char_indices().nth(max) {
    Some((byte_idx, _)) => format!("{}{}", &s[..byte_idx], TRUNCATION_MARKER),
    None => s.to_string(),
  }
}
