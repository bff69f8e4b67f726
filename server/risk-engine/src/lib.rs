//! Edit-safety risk engine: structural change analysis and rule-based scoring.
//! Used by the binary for stdin/stdout and by the edit gate as a library.

pub mod analyzer;
pub mod paths;
pub mod score;
pub mod symbols;
pub mod types;

pub use analyzer::{analyze_paths, analyze_sources};
pub use paths::ScoringPolicy;
pub use score::{score, score_with};
pub use symbols::{LexicalExtractor, SymbolExtractor, SymbolTable};
pub use types::{Analysis, ErrorOutput, Output, Request, RiskInput, RiskLevel, RiskReason, RiskResult, RuleId};

/// One raw request in, one JSON document out: an `Output`, or an
/// `ErrorOutput` when the bytes are not a valid request.
pub fn respond(raw: &[u8]) -> String {
  let result = serde_json::from_slice::<Request>(raw)
    .and_then(|req| serde_json::to_string(&run(&req)));
  match result {
    Ok(json) => json,
    Err(e) => ErrorOutput::new(format!("invalid request: {}", e)).to_json(),
  }
}

/// Analyze the request's snapshots and score the edit (no stdio).
pub fn run(req: &Request) -> Output {
  let analysis = analyze_paths(&req.before_path, &req.after_path);
  let risk = score(&RiskInput {
    file_path: req.file_path.clone(),
    structural_change_percent: analysis.structural_change_percent,
    deleted_functions: analysis.deleted_functions,
    sanity_passed: req.sanity_passed,
    diff_line_count: req.diff_line_count,
  });
  Output { analysis, risk }
}
