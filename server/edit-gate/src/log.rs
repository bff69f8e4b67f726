//! Append-only event log persisted as one JSON array.
//!
//! Each append is a read-modify-write: load, push, write a uniquely named temp
//! file in the same directory, rename it over the log. The rename makes every
//! write atomic, so readers never see a partial array. Within a process, appends
//! to one path are serialized by a FIFO queue. Across processes there is no
//! coordination: two writers racing on the rename means the last one wins and
//! the other append is lost.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Mutex;

use crate::error::GateError;
use crate::types::{Event, EventType};

/// Per-path write queues shared by every log handle the owner hands out.
#[derive(Debug, Default)]
pub struct WriteQueues {
  queues: parking_lot::Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl WriteQueues {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn queue_for(&self, path: &Path) -> Arc<Mutex<()>> {
    self
      .queues
      .lock()
      .entry(path.to_path_buf())
      .or_default()
      .clone()
  }
}

#[derive(Debug, Clone)]
pub struct EventLog {
  path: PathBuf,
  // tokio's Mutex grants the lock in FIFO order.
  queue: Arc<Mutex<()>>,
}

impl EventLog {
  /// A log with its own write queue.
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      queue: Arc::new(Mutex::new(())),
    }
  }

  /// A log whose writes queue behind every other handle for the same path.
  pub fn with_queues(path: impl Into<PathBuf>, queues: &WriteQueues) -> Self {
    let path = path.into();
    let queue = queues.queue_for(&path);
    Self { path, queue }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Append, logging and swallowing any failure. Returns whether it landed.
  pub async fn append(&self, event: &Event) -> bool {
    match self.try_append(event).await {
      Ok(()) => true,
      Err(e) => {
        tracing::warn!(path = %self.path.display(), error = %e, "event log append failed");
        false
      }
    }
  }

  /// Append one event. A missing, unreadable, or malformed log is reset to
  /// empty first; the corruption is never propagated.
  pub async fn try_append(&self, event: &Event) -> Result<(), GateError> {
    let _turn = self.queue.lock().await;

    if let Some(dir) = self.path.parent() {
      if !dir.as_os_str().is_empty() {
        fs::create_dir_all(dir).await?;
      }
    }

    let mut events = self.load().await;
    events.push(event.clone());
    let json = serde_json::to_vec_pretty(&events)?;

    let tmp = self.temp_path();
    if let Err(e) = fs::write(&tmp, &json).await {
      let _ = fs::remove_file(&tmp).await;
      return Err(GateError::write(&tmp, e));
    }
    if let Err(e) = fs::rename(&tmp, &self.path).await {
      let _ = fs::remove_file(&tmp).await;
      return Err(GateError::write(&self.path, e));
    }
    Ok(())
  }

  /// Full sequence in append order; empty on any read or parse failure.
  pub async fn read(&self) -> Vec<Event> {
    self.load().await
  }

  pub async fn read_by_session(&self, session_id: &str) -> Vec<Event> {
    self
      .read()
      .await
      .into_iter()
      .filter(|e| e.session_id == session_id)
      .collect()
  }

  pub async fn read_by_type(&self, kind: EventType) -> Vec<Event> {
    self
      .read()
      .await
      .into_iter()
      .filter(|e| e.kind() == kind)
      .collect()
  }

  async fn load(&self) -> Vec<Event> {
    let raw = match fs::read(&self.path).await {
      Ok(raw) => raw,
      Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
      Err(e) => {
        tracing::warn!(path = %self.path.display(), error = %e, "event log unreadable; treating as empty");
        return Vec::new();
      }
    };
    match serde_json::from_slice::<Vec<Event>>(&raw) {
      Ok(events) => events,
      Err(e) => {
        tracing::warn!(path = %self.path.display(), error = %e, "event log malformed; treating as empty");
        Vec::new()
      }
    }
  }

  fn temp_path(&self) -> PathBuf {
    let name = self
      .path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| "events.json".to_string());
    self
      .path
      .with_file_name(format!("{}.{}.tmp", name, uuid::Uuid::new_v4().simple()))
  }
}
