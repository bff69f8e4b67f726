//! Deterministic risk score from analyzer output, sanity outcome, and diff size.
//!
//! Rules are evaluated in a fixed order; the reason list follows that order and
//! its point sum is the raw (pre-clamp) score.

use crate::paths::{is_test_file, ScoringPolicy};
use crate::types::{RiskInput, RiskLevel, RiskReason, RiskResult, RuleId};

const PROTECTED_PATH_POINTS: i32 = 30;
const STRUCTURAL_HIGH_POINTS: i32 = 40;
const STRUCTURAL_MEDIUM_POINTS: i32 = 25;
const DELETED_HIGH_POINTS: i32 = 35;
const DELETED_LOW_POINTS: i32 = 20;
const SANITY_FAILED_POINTS: i32 = 20;
const LARGE_DIFF_POINTS: i32 = 15;
const TEST_FILE_POINTS: i32 = -10;

const STRUCTURAL_HIGH_OVER: u32 = 75;
const STRUCTURAL_MEDIUM_OVER: u32 = 50;
const DELETED_HIGH_OVER: u32 = 3;
const LARGE_DIFF_OVER: u32 = 200;

/// Score with the default protected-path policy.
pub fn score(input: &RiskInput) -> RiskResult {
  score_with(input, &ScoringPolicy::default())
}

pub fn score_with(input: &RiskInput, policy: &ScoringPolicy) -> RiskResult {
  let mut reasons = Vec::new();
  let mut push = |rule: RuleId, points: i32, description: String| {
    reasons.push(RiskReason {
      rule,
      points,
      description,
    });
  };

  if policy.is_protected(&input.file_path) {
    push(
      RuleId::ProtectedPath,
      PROTECTED_PATH_POINTS,
      format!("{} is a protected path", input.file_path),
    );
  }

  let pct = input.structural_change_percent;
  if pct > STRUCTURAL_HIGH_OVER {
    push(
      RuleId::StructuralChangeHigh,
      STRUCTURAL_HIGH_POINTS,
      format!("{}% of function-level structure changed", pct),
    );
  } else if pct > STRUCTURAL_MEDIUM_OVER {
    push(
      RuleId::StructuralChangeMedium,
      STRUCTURAL_MEDIUM_POINTS,
      format!("{}% of function-level structure changed", pct),
    );
  }

  let deleted = input.deleted_functions;
  if deleted > DELETED_HIGH_OVER {
    push(
      RuleId::DeletedFunctionsHigh,
      DELETED_HIGH_POINTS,
      format!("{} functions deleted", deleted),
    );
  } else if deleted > 0 {
    push(
      RuleId::DeletedFunctionsLow,
      DELETED_LOW_POINTS,
      format!(
        "{} function{} deleted",
        deleted,
        if deleted == 1 { "" } else { "s" }
      ),
    );
  }

  if !input.sanity_passed {
    push(
      RuleId::SanityFailed,
      SANITY_FAILED_POINTS,
      "Sanity checks failed".to_string(),
    );
  }

  if input.diff_line_count > LARGE_DIFF_OVER {
    push(
      RuleId::LargeDiff,
      LARGE_DIFF_POINTS,
      format!("Large diff: {} lines", input.diff_line_count),
    );
  }

  // Applied last, even on top of other rules; may push the raw sum negative.
  if is_test_file(&input.file_path) {
    push(
      RuleId::TestFile,
      TEST_FILE_POINTS,
      "Test file; lower blast radius".to_string(),
    );
  }

  let raw: i32 = reasons.iter().map(|r| r.points).sum();
  let score = raw.clamp(0, 100) as u8;

  RiskResult {
    score,
    level: RiskLevel::from_score(score),
    reasons,
  }
}
