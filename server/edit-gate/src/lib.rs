//! Edit gate: durable record of edit-safety decisions plus best-effort
//! enrichment of risky edits by an external reasoning service.
//!
//! Scoring itself lives in `risk-engine`; this crate owns the event log, the
//! enrichment dispatcher, and the session service that wires them together.
//! Nothing here is allowed to fail an edit: every error degrades to an absence.

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod log;
pub mod reasoner;
pub mod types;

pub use config::Config;
pub use dispatch::{DispatchConfig, Dispatcher};
pub use error::GateError;
pub use gate::Gate;
pub use log::{EventLog, WriteQueues};
pub use reasoner::{GeminiReasoner, Reasoner};
pub use types::{EditRecord, Event, EventData, EventType};
