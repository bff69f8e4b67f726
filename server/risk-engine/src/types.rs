//! Input/output types for the risk engine (JSON contract with the edit gate).

use serde::{Deserialize, Serialize};

/// Per-edit scoring input. Built once per edit, discarded after scoring.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskInput {
  pub file_path: String,
  /// 0..=100, as produced by the analyzer.
  pub structural_change_percent: u32,
  pub deleted_functions: u32,
  pub sanity_passed: bool,
  pub diff_line_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
  Low,
  Medium,
  High,
}

impl RiskLevel {
  /// Step function over the clamped score: <=30 low, 31..=60 medium, >=61 high.
  pub fn from_score(score: u8) -> Self {
    match score {
      0..=30 => Self::Low,
      31..=60 => Self::Medium,
      _ => Self::High,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Low => "low",
      Self::Medium => "medium",
      Self::High => "high",
    }
  }
}

/// Identifier of a scoring rule; serialized as the snake_case rule id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
  ProtectedPath,
  StructuralChangeHigh,
  StructuralChangeMedium,
  DeletedFunctionsHigh,
  DeletedFunctionsLow,
  SanityFailed,
  LargeDiff,
  TestFile,
}

impl RuleId {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::ProtectedPath => "protected_path",
      Self::StructuralChangeHigh => "structural_change_high",
      Self::StructuralChangeMedium => "structural_change_medium",
      Self::DeletedFunctionsHigh => "deleted_functions_high",
      Self::DeletedFunctionsLow => "deleted_functions_low",
      Self::SanityFailed => "sanity_failed",
      Self::LargeDiff => "large_diff",
      Self::TestFile => "test_file",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskReason {
  pub rule: RuleId,
  pub points: i32,
  pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskResult {
  pub score: u8,
  pub level: RiskLevel,
  /// In rule-evaluation order.
  pub reasons: Vec<RiskReason>,
}

impl RiskResult {
  /// Sum of reason points before clamping.
  pub fn raw_score(&self) -> i32 {
    self.reasons.iter().map(|r| r.points).sum()
  }
}

/// Structural delta between two snapshots of one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
  pub structural_change_percent: u32,
  pub deleted_functions: u32,
  #[serde(default)]
  pub added_functions: u32,
  pub deleted_exports: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl Analysis {
  pub fn not_found(path: &str) -> Self {
    Self {
      error: Some(format!("File not found: {}", path)),
      ..Self::default()
    }
  }
}

/// Binary request: one JSON object on stdin.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
  pub file_path: String,
  pub before_path: String,
  pub after_path: String,
  #[serde(default = "default_true")]
  pub sanity_passed: bool,
  #[serde(default)]
  pub diff_line_count: u32,
}

fn default_true() -> bool {
  true
}

/// Binary response: one JSON object on stdout.
#[derive(Debug, Serialize)]
pub struct Output {
  pub analysis: Analysis,
  pub risk: RiskResult,
}

/// Binary response when the request cannot be read.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
    }
  }

  /// Compact JSON. Falls back to a fixed document if encoding fails.
  pub fn to_json(&self) -> String {
    serde_json::to_string(self)
      .unwrap_or_else(|_| r#"{"error":true,"message":"unencodable error"}"#.to_string())
  }
}
