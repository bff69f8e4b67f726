//! Integration tests for the edit gate pipeline.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use edit_gate::reasoner::ExplainRequest;
use edit_gate::{Config, EditRecord, EventData, EventLog, EventType, Gate, Reasoner};
use risk_engine::RiskLevel;

#[derive(Default)]
struct Capture {
  requests: Mutex<Vec<ExplainRequest>>,
}

#[async_trait]
impl Reasoner for Capture {
  fn source(&self) -> &str {
    "capture"
  }

  async fn explain(&self, req: &ExplainRequest) -> Option<String> {
    self.requests.lock().push(req.clone());
    Some(format!("{} lost {} reasons worth of safety", req.file_path, req.reasons.len()))
  }
}

fn config(root: &Path) -> Config {
  let mut c = Config::for_workspace(root);
  c.min_interval = Duration::from_millis(5);
  c.max_content_chars = 64;
  c
}

fn write(root: &Path, rel: &str, body: &str) {
  let p = root.join(rel);
  std::fs::create_dir_all(p.parent().unwrap()).unwrap();
  std::fs::write(p, body).unwrap();
}

fn many_functions(n: usize) -> String {
  (0..n).map(|i| format!("export function f{}() {{}}\n", i)).collect()
}

fn record_json(file: &str, sanity: bool, diff_lines: u32) -> String {
  format!(
    r#"{{
      "filePath": "{}",
      "beforePath": ".snap/before.ts",
      "afterPath": ".snap/after.ts",
      "sanityPassed": {},
      "sanityTools": ["tsc"],
      "diffLineCount": {},
      "someUnknownField": true
    }}"#,
    file, sanity, diff_lines
  )
}

#[tokio::test]
async fn risky_edit_is_scored_recorded_and_enriched() {
  let dir = tempfile::tempdir().unwrap();
  let root = dir.path();
  write(root, ".snap/before.ts", &many_functions(10));
  write(root, ".snap/after.ts", "");
  write(root, "src/auth/index.ts", &"x".repeat(200));
  write(
    root,
    ".edit-gate/last-diff.json",
    r#"{"filePath": "src/auth/index.ts", "diff": "-export function f0() {}"}"#,
  );

  let capture = Arc::new(Capture::default());
  let mut gate = Gate::open(config(root), Some(capture.clone())).await;
  let log = gate.log().clone();

  let record: EditRecord = serde_json::from_str(&record_json("src/auth/index.ts", false, 500)).unwrap();
  let risk = gate.evaluate(&record).await;
  // 30 + 40 + 35 + 20 + 15 = 140, clamped
  assert_eq!(risk.score, 100);
  assert_eq!(risk.level, RiskLevel::High);
  assert_eq!(risk.reasons.iter().map(|r| r.points).sum::<i32>(), 140);

  // Level-triggered rescans never enqueue twice.
  assert_eq!(gate.scan().await, 0);
  assert_eq!(gate.scan().await, 0);
  gate.close().await;

  let requests = capture.requests.lock().clone();
  assert_eq!(requests.len(), 1);
  assert_eq!(requests[0].diff, "-export function f0() {}");
  assert!(requests[0].content.starts_with(&"x".repeat(64)));
  assert!(requests[0].content.ends_with("[truncated]"));

  let events = log.read().await;
  let kinds: Vec<_> = events.iter().map(|e| e.kind()).collect();
  assert_eq!(
    kinds[..3],
    [
      EventType::SessionStarted,
      EventType::SanityChecked,
      EventType::RiskAssessed,
    ]
  );
  // Enrichment runs concurrently with session close; either may land first.
  assert_eq!(kinds.len(), 5);
  assert!(kinds[3..].contains(&EventType::SessionEnded));
  assert!(kinds[3..].contains(&EventType::RiskExplained));

  let assessed = &events[2];
  let risk_data = assessed.as_risk().unwrap();
  assert_eq!(risk_data.deleted_functions, 10);
  assert_eq!(risk_data.deleted_exports, 10);
  assert_eq!(risk_data.structural_change_percent, 100);
  // Enrichment never rewrites the original assessment.
  assert_eq!(risk_data.score, 100);

  let explained = events
    .iter()
    .find_map(|e| match &e.data {
      EventData::RiskExplained(x) => Some(x),
      _ => None,
    })
    .unwrap();
  assert_eq!(explained.origin_timestamp, assessed.timestamp);
  assert_eq!(explained.source, "capture");
  assert_eq!(explained.file_path, "src/auth/index.ts");
}

#[tokio::test]
async fn low_risk_edits_are_not_enriched() {
  let dir = tempfile::tempdir().unwrap();
  let root = dir.path();
  write(root, ".snap/before.ts", &many_functions(3));
  write(root, ".snap/after.ts", &many_functions(3));

  let capture = Arc::new(Capture::default());
  let mut gate = Gate::open(config(root), Some(capture.clone())).await;
  let record: EditRecord = serde_json::from_str(&record_json("src/app.ts", true, 3)).unwrap();
  let risk = gate.evaluate(&record).await;
  assert_eq!(risk.score, 0);
  assert!(risk.reasons.is_empty());
  gate.close().await;

  assert!(capture.requests.lock().is_empty());
}

#[tokio::test]
async fn mismatched_sidecar_sends_empty_diff() {
  let dir = tempfile::tempdir().unwrap();
  let root = dir.path();
  write(root, ".snap/before.ts", &many_functions(5));
  write(root, ".snap/after.ts", &many_functions(1));
  write(
    root,
    ".edit-gate/last-diff.json",
    r#"{"filePath": "src/other.ts", "diff": "+unrelated"}"#,
  );

  let capture = Arc::new(Capture::default());
  let mut gate = Gate::open(config(root), Some(capture.clone())).await;
  let record: EditRecord = serde_json::from_str(&record_json("src/gone.ts", true, 0)).unwrap();
  let risk = gate.evaluate(&record).await;
  // 4 deleted of 6 -> 67% (+25), 4 deleted (+35)
  assert_eq!(risk.score, 60);
  assert_eq!(risk.level, RiskLevel::Medium);
  gate.close().await;

  let requests = capture.requests.lock().clone();
  assert_eq!(requests.len(), 1);
  assert_eq!(requests[0].diff, "");
  // The edited file does not exist on disk.
  assert_eq!(requests[0].content, "");
}

#[tokio::test]
async fn corrupted_log_is_recovered_by_the_next_session() {
  let dir = tempfile::tempdir().unwrap();
  let root = dir.path();
  write(root, ".edit-gate/events.json", "[{\"timestamp\": ");

  let gate = Gate::open(config(root), None).await;
  let log = EventLog::new(root.join(".edit-gate/events.json"));
  let events = log.read().await;
  assert_eq!(events.len(), 1);
  assert_eq!(events[0].kind(), EventType::SessionStarted);
  assert_eq!(events[0].session_id, gate.session_id());
}

#[tokio::test]
async fn sessions_share_one_log() {
  let dir = tempfile::tempdir().unwrap();
  let root = dir.path();

  let first = Gate::open(config(root), None).await;
  let first_id = first.session_id().to_string();
  first.close().await;
  let second = Gate::open(config(root), None).await;
  let second_id = second.session_id().to_string();
  let log = second.log().clone();
  second.close().await;

  assert_ne!(first_id, second_id);
  assert_eq!(log.read_by_session(&first_id).await.len(), 2);
  assert_eq!(log.read_by_session(&second_id).await.len(), 2);
  assert_eq!(log.read_by_type(EventType::SessionEnded).await.len(), 2);
}

#[tokio::test]
async fn a_new_session_does_not_redo_earlier_enrichment() {
  let dir = tempfile::tempdir().unwrap();
  let root = dir.path();
  write(root, ".snap/before.ts", &many_functions(10));
  write(root, ".snap/after.ts", "");

  let first_capture = Arc::new(Capture::default());
  let mut first = Gate::open(config(root), Some(first_capture.clone())).await;
  let record: EditRecord = serde_json::from_str(&record_json("src/auth/x.ts", true, 10)).unwrap();
  assert!(first.evaluate(&record).await.score > 60);
  first.close().await;
  assert_eq!(first_capture.requests.lock().len(), 1);

  // Same snapshots on both sides: nothing to score.
  write(root, ".snap/after.ts", &many_functions(10));
  let second_capture = Arc::new(Capture::default());
  let mut second = Gate::open(config(root), Some(second_capture.clone())).await;
  let log = second.log().clone();
  let record: EditRecord = serde_json::from_str(&record_json("src/app.ts", true, 10)).unwrap();
  assert_eq!(second.evaluate(&record).await.score, 0);
  assert_eq!(second.scan().await, 0);
  second.close().await;

  assert!(second_capture.requests.lock().is_empty());
  assert_eq!(log.read_by_type(EventType::RiskExplained).await.len(), 1);
}

#[test]
fn binary_answers_bad_lines_and_still_closes_the_session() {
  use std::io::Write;
  use std::process::{Command, Stdio};

  let dir = tempfile::tempdir().unwrap();
  let root = dir.path();
  write(root, ".snap/before.ts", "");
  write(root, ".snap/after.ts", "");

  let mut child = Command::new(env!("CARGO_BIN_EXE_edit-gate"))
    .current_dir(root)
    .env("EDIT_GATE_WORKSPACE", root)
    .env_remove("GEMINI_API_KEY")
    .env_remove("EDIT_GATE_LOG_PATH")
    .env_remove("EDIT_GATE_DIFF_PATH")
    .env_remove("EDIT_GATE_SESSION_ID")
    .stdin(Stdio::piped())
    .stdout(Stdio::piped())
    .stderr(Stdio::null())
    .spawn()
    .unwrap();

  let valid = record_json("src/a.ts", true, 1).replace('\n', " ");
  let mut input = Vec::new();
  input.extend_from_slice(valid.as_bytes());
  input.extend_from_slice(b"\n\xff\xfe\n\n");
  input.extend_from_slice(valid.as_bytes());
  input.push(b'\n');
  child.stdin.take().unwrap().write_all(&input).unwrap();

  let output = child.wait_with_output().unwrap();
  assert!(output.status.success());
  let lines: Vec<serde_json::Value> = String::from_utf8(output.stdout)
    .unwrap()
    .lines()
    .map(|l| serde_json::from_str(l).unwrap())
    .collect();
  assert_eq!(lines.len(), 3);
  assert_eq!(lines[0]["score"], 0);
  assert_eq!(lines[1]["error"], true);
  assert_eq!(lines[2]["score"], 0);

  let raw = std::fs::read(root.join(".edit-gate/events.json")).unwrap();
  let events: Vec<edit_gate::Event> = serde_json::from_slice(&raw).unwrap();
  let kinds: Vec<_> = events.iter().map(|e| e.kind()).collect();
  assert_eq!(
    kinds,
    vec![
      EventType::SessionStarted,
      EventType::SanityChecked,
      EventType::RiskAssessed,
      EventType::SanityChecked,
      EventType::RiskAssessed,
      EventType::SessionEnded,
    ]
  );
}
