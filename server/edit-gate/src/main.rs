//! Binary entrypoint: read edit records as JSON lines from stdin, write JSON lines to stdout.
//!
//! Each input line is an EditRecord. Output lines are either:
//! - A RiskResult (one per valid record)
//! - An ErrorOutput (when the line is not UTF-8 or not a valid record)
//!
//! Blank lines produce nothing. At end of input, or on a stdio failure, the
//! session is closed and queued enrichment is drained.

use std::io::{self, Write};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use edit_gate::{Config, Gate, GeminiReasoner, Reasoner};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  dotenvy::dotenv().ok();
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("edit_gate=info")),
    )
    .with_writer(io::stderr)
    .init();

  let config = Config::from_env()?;
  let reasoner: Option<Arc<dyn Reasoner>> = match &config.gemini_api_key {
    Some(key) => Some(Arc::new(GeminiReasoner::new(
      key.clone(),
      &config.gemini_model,
      config.request_timeout,
    )?)),
    None => {
      tracing::info!("GEMINI_API_KEY not set; enrichment disabled");
      None
    }
  };

  let mut gate = Gate::open(config, reasoner).await;
  let mut input = BufReader::new(tokio::io::stdin());
  let mut buf = Vec::new();

  loop {
    buf.clear();
    match input.read_until(b'\n', &mut buf).await {
      Ok(0) => break,
      Ok(_) => {}
      Err(e) => {
        tracing::error!(error = %e, "stdin read failed; closing session");
        break;
      }
    }

    if let Some(json) = gate.respond(&buf).await {
      let mut out = io::stdout().lock();
      if let Err(e) = writeln!(out, "{}", json).and_then(|_| out.flush()) {
        tracing::error!(error = %e, "stdout write failed; closing session");
        break;
      }
    }
  }

  gate.close().await;
  Ok(())
}
