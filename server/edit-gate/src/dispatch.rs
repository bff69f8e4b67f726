//! Enrichment dispatcher: one FIFO queue, one worker, a pacing floor between
//! external calls, and a dedup set so each event is enqueued at most once.
//!
//! Per event: new -> enqueued -> dispatched -> completed | failed (silently).
//! The log is observed by rescanning, so the same event is seen many times;
//! only the first sighting enqueues. Events that already have a
//! `risk_explained` follow-up in the observed log are marked seen without a
//! call. The dedup set and pacing clock live in memory and reset with the
//! process.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use risk_engine::RiskLevel;

use crate::context::ContextSource;
use crate::log::EventLog;
use crate::reasoner::{ExplainRequest, Reasoner};
use crate::types::{Event, EventData, RiskExplained};

#[derive(Debug, Clone)]
pub struct DispatchConfig {
  pub min_interval: Duration,
  pub context: ContextSource,
}

/// Handle to the dispatch worker. Dropping it closes the queue; the worker
/// finishes what is already enqueued and exits.
pub struct Dispatcher {
  tx: Option<mpsc::UnboundedSender<Event>>,
  seen: Arc<Mutex<HashSet<String>>>,
  worker: Option<JoinHandle<()>>,
}

/// Risk events at medium or high level are enriched.
pub fn qualifies(event: &Event) -> bool {
  event
    .as_risk()
    .is_some_and(|r| r.level >= RiskLevel::Medium)
}

impl Dispatcher {
  /// Start the worker on the current tokio runtime.
  pub fn spawn(log: EventLog, reasoner: Arc<dyn Reasoner>, config: DispatchConfig) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    let worker = tokio::spawn(run_worker(rx, log, reasoner, config));
    Self {
      tx: Some(tx),
      seen: Arc::new(Mutex::new(HashSet::new())),
      worker: Some(worker),
    }
  }

  /// Enqueue every qualifying, not-yet-seen, not-yet-explained event.
  /// Returns how many were enqueued.
  pub fn observe(&self, events: &[Event]) -> usize {
    self.mark_explained(events);
    events.iter().filter(|e| self.enqueue(e)).count()
  }

  /// Mark qualifying events whose follow-up is already in `events` as seen.
  fn mark_explained(&self, events: &[Event]) {
    let follow_ups: Vec<&Event> = events
      .iter()
      .filter(|e| matches!(e.data, EventData::RiskExplained(_)))
      .collect();
    if follow_ups.is_empty() {
      return;
    }
    let mut seen = self.seen.lock();
    for event in events.iter().filter(|e| qualifies(e)) {
      if follow_ups.iter().any(|f| event.is_explained_by(f)) {
        seen.insert(event.identity());
      }
    }
  }

  /// Enqueue one event if it qualifies and has never been seen.
  pub fn enqueue(&self, event: &Event) -> bool {
    if !qualifies(event) {
      return false;
    }
    let tx = match &self.tx {
      Some(tx) => tx,
      None => return false,
    };
    if !self.seen.lock().insert(event.identity()) {
      return false;
    }
    if tx.send(event.clone()).is_err() {
      tracing::warn!(timestamp = %event.timestamp, "dispatch worker gone; event not enqueued");
      return false;
    }
    tracing::debug!(timestamp = %event.timestamp, "enrichment enqueued");
    true
  }

  pub fn is_seen(&self, event: &Event) -> bool {
    self.seen.lock().contains(&event.identity())
  }

  /// Close the queue and wait until every enqueued job has run.
  pub async fn drain(mut self) {
    self.tx.take();
    if let Some(worker) = self.worker.take() {
      if let Err(e) = worker.await {
        tracing::warn!(error = %e, "dispatch worker ended abnormally");
      }
    }
  }

  /// Stop the worker now. Jobs still queued are dropped.
  pub fn shutdown(mut self) {
    self.tx.take();
    if let Some(worker) = self.worker.take() {
      worker.abort();
    }
  }
}

async fn run_worker(
  mut rx: mpsc::UnboundedReceiver<Event>,
  log: EventLog,
  reasoner: Arc<dyn Reasoner>,
  config: DispatchConfig,
) {
  let mut last_call: Option<Instant> = None;
  while let Some(event) = rx.recv().await {
    dispatch_one(&event, &log, reasoner.as_ref(), &config, &mut last_call).await;
  }
  tracing::debug!("dispatch worker stopped");
}

async fn dispatch_one(
  event: &Event,
  log: &EventLog,
  reasoner: &dyn Reasoner,
  config: &DispatchConfig,
  last_call: &mut Option<Instant>,
) {
  let risk = match event.as_risk() {
    Some(r) => r,
    None => return,
  };

  let ctx = config.context.gather(&risk.file_path).await;

  if let Some(prev) = *last_call {
    tokio::time::sleep_until(prev + config.min_interval).await;
  }
  let started = Instant::now();
  *last_call = Some(started);

  let req = ExplainRequest {
    file_path: risk.file_path.clone(),
    score: risk.score,
    level: risk.level,
    reasons: risk.reasons.clone(),
    diff: ctx.diff,
    content: ctx.content,
  };
  let explanation = reasoner.explain(&req).await;
  let latency_ms = started.elapsed().as_millis() as u64;

  let explanation = match explanation {
    Some(text) => text,
    None => {
      tracing::debug!(file = %risk.file_path, "no explanation; nothing appended");
      return;
    }
  };

  let follow_up = Event::new(
    event.session_id.clone(),
    EventData::RiskExplained(RiskExplained {
      origin_id: event.id.clone(),
      origin_timestamp: event.timestamp.clone(),
      file_path: risk.file_path.clone(),
      explanation,
      source: reasoner.source().to_string(),
      latency_ms,
    }),
  );
  if log.append(&follow_up).await {
    tracing::info!(file = %risk.file_path, latency_ms, "enrichment recorded");
  }
}
