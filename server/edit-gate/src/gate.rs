//! The gate service: owns the log, write queues, dispatcher, and scoring policy
//! for one session, and runs the per-edit pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use risk_engine::analyzer::analyze_paths_with;
use risk_engine::{score_with, LexicalExtractor, RiskInput, RiskResult, ScoringPolicy, SymbolExtractor};

use crate::config::Config;
use crate::context::ContextSource;
use crate::dispatch::{DispatchConfig, Dispatcher};
use crate::log::{EventLog, WriteQueues};
use crate::reasoner::Reasoner;
use crate::types::{
  EditRecord, ErrorOutput, Event, EventData, RiskAssessed, SanityChecked, SessionEnded,
  SessionStarted,
};

pub struct Gate {
  config: Config,
  queues: Arc<WriteQueues>,
  log: EventLog,
  policy: ScoringPolicy,
  extractor: Box<dyn SymbolExtractor + Send + Sync>,
  dispatcher: Option<Dispatcher>,
  edits: u64,
}

impl Gate {
  /// Start a session. Enrichment runs only when a reasoner is supplied.
  /// Must be called inside a tokio runtime.
  pub async fn open(config: Config, reasoner: Option<Arc<dyn Reasoner>>) -> Self {
    let queues = Arc::new(WriteQueues::new());
    let log = EventLog::with_queues(&config.log_path, &queues);

    let dispatcher = reasoner.map(|reasoner| {
      let dispatch_config = DispatchConfig {
        min_interval: config.min_interval,
        context: ContextSource::new(
          &config.workspace,
          &config.diff_path,
          config.max_content_chars,
        ),
      };
      Dispatcher::spawn(log.clone(), reasoner, dispatch_config)
    });

    let gate = Self {
      config,
      queues,
      log,
      policy: ScoringPolicy::default(),
      extractor: Box::new(LexicalExtractor),
      dispatcher,
      edits: 0,
    };
    gate
      .record(EventData::SessionStarted(SessionStarted {
        workspace: gate.config.workspace.display().to_string(),
      }))
      .await;
    tracing::info!(session = %gate.config.session_id, log = %gate.log.path().display(), "gate session started");
    gate
  }

  pub fn with_policy(mut self, policy: ScoringPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn with_extractor(mut self, extractor: impl SymbolExtractor + Send + Sync + 'static) -> Self {
    self.extractor = Box::new(extractor);
    self
  }

  pub fn session_id(&self) -> &str {
    &self.config.session_id
  }

  pub fn log(&self) -> &EventLog {
    &self.log
  }

  /// Another handle on a log file, queued behind this gate's own writes when
  /// it names the same path.
  pub fn log_at(&self, path: impl Into<PathBuf>) -> EventLog {
    EventLog::with_queues(path, &self.queues)
  }

  /// Analyze, score, record, then hand qualifying log entries to enrichment.
  /// Never fails; analyzer and log problems show up as zeroed fields or
  /// missing entries.
  pub async fn evaluate(&mut self, record: &EditRecord) -> RiskResult {
    let before = self.resolve(&record.before_path);
    let after = self.resolve(&record.after_path);
    let analysis = analyze_paths_with(self.extractor.as_ref(), &before, &after);
    if let Some(err) = &analysis.error {
      tracing::warn!(file = %record.file_path, error = %err, "analysis skipped");
    }

    let risk = score_with(
      &RiskInput {
        file_path: record.file_path.clone(),
        structural_change_percent: analysis.structural_change_percent,
        deleted_functions: analysis.deleted_functions,
        sanity_passed: record.sanity_passed,
        diff_line_count: record.diff_line_count,
      },
      &self.policy,
    );

    if !record.sanity_tools.is_empty() {
      self
        .record(EventData::SanityChecked(SanityChecked {
          file_path: record.file_path.clone(),
          passed: record.sanity_passed,
          tools: record.sanity_tools.clone(),
        }))
        .await;
    }

    self
      .record(EventData::RiskAssessed(RiskAssessed {
        file_path: record.file_path.clone(),
        score: risk.score,
        level: risk.level,
        reasons: risk.reasons.clone(),
        structural_change_percent: analysis.structural_change_percent,
        deleted_functions: analysis.deleted_functions,
        added_functions: analysis.added_functions,
        deleted_exports: analysis.deleted_exports,
        sanity_passed: record.sanity_passed,
        diff_line_count: record.diff_line_count,
        analyzer_error: analysis.error.clone(),
      }))
      .await;
    self.edits += 1;

    tracing::debug!(
      file = %record.file_path,
      score = risk.score,
      level = risk.level.as_str(),
      "edit scored"
    );

    self.scan().await;
    risk
  }

  /// Handle one raw stdin line. `None` for a blank line; otherwise one JSON
  /// line holding the `RiskResult`, or an `ErrorOutput` when the bytes are not
  /// UTF-8 or not an edit record.
  pub async fn respond(&mut self, raw: &[u8]) -> Option<String> {
    let line = match std::str::from_utf8(raw) {
      Ok(line) => line.trim(),
      Err(e) => return Some(ErrorOutput::new(format!("invalid utf-8: {}", e)).to_json()),
    };
    if line.is_empty() {
      return None;
    }
    let record = match serde_json::from_str::<EditRecord>(line) {
      Ok(record) => record,
      Err(e) => return Some(ErrorOutput::new(format!("json parse: {}", e)).to_json()),
    };
    let risk = self.evaluate(&record).await;
    Some(
      serde_json::to_string(&risk)
        .unwrap_or_else(|e| ErrorOutput::new(format!("encode: {}", e)).to_json()),
    )
  }

  /// Re-read this session's log entries and enqueue anything qualifying that
  /// enrichment has not seen yet. Returns how many were enqueued. Entries from
  /// other sessions sharing the log are left to their own process.
  pub async fn scan(&self) -> usize {
    match &self.dispatcher {
      Some(dispatcher) => {
        dispatcher.observe(&self.log.read_by_session(&self.config.session_id).await)
      }
      None => 0,
    }
  }

  /// End the session and wait for queued enrichment to finish.
  pub async fn close(mut self) {
    self
      .record(EventData::SessionEnded(SessionEnded { edits: self.edits }))
      .await;
    if let Some(dispatcher) = self.dispatcher.take() {
      dispatcher.drain().await;
    }
    tracing::info!(session = %self.config.session_id, edits = self.edits, "gate session ended");
  }

  async fn record(&self, data: EventData) -> bool {
    self
      .log
      .append(&Event::new(self.config.session_id.clone(), data))
      .await
  }

  fn resolve(&self, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
      p.to_path_buf()
    } else {
      self.config.workspace.join(p)
    }
  }
}
