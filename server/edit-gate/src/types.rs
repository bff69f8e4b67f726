//! Core types for the edit gate (event log schema + stdin/stdout contracts).

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use risk_engine::{RiskLevel, RiskReason};

// ---------------------------------------------------------------------------
// Event log schema (read directly by external consumers)
// ---------------------------------------------------------------------------

/// One immutable log entry: `{id, timestamp, sessionId, type, data}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
  /// Random v4 uuid. Empty on entries written before ids existed.
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub id: String,
  /// RFC 3339, UTC, millisecond precision. Weak identity; not globally unique.
  pub timestamp: String,
  pub session_id: String,
  #[serde(flatten)]
  pub data: EventData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventData {
  SessionStarted(SessionStarted),
  SessionEnded(SessionEnded),
  SanityChecked(SanityChecked),
  RiskAssessed(RiskAssessed),
  RiskExplained(RiskExplained),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
  SessionStarted,
  SessionEnded,
  SanityChecked,
  RiskAssessed,
  RiskExplained,
}

impl EventType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::SessionStarted => "session_started",
      Self::SessionEnded => "session_ended",
      Self::SanityChecked => "sanity_checked",
      Self::RiskAssessed => "risk_assessed",
      Self::RiskExplained => "risk_explained",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStarted {
  pub workspace: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEnded {
  pub edits: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanityChecked {
  pub file_path: String,
  pub passed: bool,
  pub tools: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessed {
  pub file_path: String,
  pub score: u8,
  pub level: RiskLevel,
  pub reasons: Vec<RiskReason>,
  pub structural_change_percent: u32,
  pub deleted_functions: u32,
  #[serde(default)]
  pub added_functions: u32,
  pub deleted_exports: u32,
  pub sanity_passed: bool,
  pub diff_line_count: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub analyzer_error: Option<String>,
}

/// Enrichment follow-up. Links back by the origin event's id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskExplained {
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub origin_id: String,
  pub origin_timestamp: String,
  pub file_path: String,
  pub explanation: String,
  pub source: String,
  pub latency_ms: u64,
}

impl EventData {
  pub fn kind(&self) -> EventType {
    match self {
      Self::SessionStarted(_) => EventType::SessionStarted,
      Self::SessionEnded(_) => EventType::SessionEnded,
      Self::SanityChecked(_) => EventType::SanityChecked,
      Self::RiskAssessed(_) => EventType::RiskAssessed,
      Self::RiskExplained(_) => EventType::RiskExplained,
    }
  }
}

impl Event {
  /// Stamp `data` with the current time.
  pub fn new(session_id: impl Into<String>, data: EventData) -> Self {
    Self {
      id: Uuid::new_v4().to_string(),
      timestamp: now_timestamp(),
      session_id: session_id.into(),
      data,
    }
  }

  pub fn kind(&self) -> EventType {
    self.data.kind()
  }

  /// Stable key used to dedupe dispatch. Hashes the event id; id-less
  /// entries fall back to timestamp, session, type and file path.
  pub fn identity(&self) -> String {
    let mut hasher = blake3::Hasher::new();
    if self.id.is_empty() {
      hasher.update(self.timestamp.as_bytes());
      hasher.update(b"|");
      hasher.update(self.session_id.as_bytes());
      hasher.update(b"|");
      hasher.update(self.kind().as_str().as_bytes());
      if let Some(path) = self.file_path() {
        hasher.update(b"|");
        hasher.update(path.as_bytes());
      }
    } else {
      hasher.update(self.id.as_bytes());
    }
    let hex = hasher.finalize().to_hex();
    hex[..32].to_string()
  }

  pub fn file_path(&self) -> Option<&str> {
    match &self.data {
      EventData::SanityChecked(x) => Some(x.file_path.as_str()),
      EventData::RiskAssessed(x) => Some(x.file_path.as_str()),
      EventData::RiskExplained(x) => Some(x.file_path.as_str()),
      EventData::SessionStarted(_) | EventData::SessionEnded(_) => None,
    }
  }

  /// Whether `follow_up` is an enrichment of this event. Matches on id when
  /// the follow-up carries one, else on session, timestamp and file path.
  pub fn is_explained_by(&self, follow_up: &Event) -> bool {
    let x = match &follow_up.data {
      EventData::RiskExplained(x) => x,
      _ => return false,
    };
    if !x.origin_id.is_empty() {
      return x.origin_id == self.id;
    }
    follow_up.session_id == self.session_id
      && x.origin_timestamp == self.timestamp
      && self.file_path() == Some(x.file_path.as_str())
  }

  pub fn as_risk(&self) -> Option<&RiskAssessed> {
    match &self.data {
      EventData::RiskAssessed(r) => Some(r),
      _ => None,
    }
  }
}

pub fn now_timestamp() -> String {
  Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ---------------------------------------------------------------------------
// Stdin/stdout contracts
// ---------------------------------------------------------------------------

/// One edit, as reported by the surrounding tooling. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRecord {
  pub file_path: String,
  pub before_path: String,
  pub after_path: String,
  #[serde(default = "default_true")]
  pub sanity_passed: bool,
  #[serde(default)]
  pub sanity_tools: Vec<String>,
  #[serde(default)]
  pub diff_line_count: u32,
}

fn default_true() -> bool {
  true
}

pub use risk_engine::ErrorOutput;
