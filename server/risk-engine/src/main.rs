//! Binary entrypoint for one edit.
//!
//! Stdin carries a single `Request` (`filePath`, `beforePath`, `afterPath`,
//! optional `sanityPassed` and `diffLineCount`). Stdout gets exactly one JSON
//! object: `{analysis, risk}` on success, `{error, message}` when the request
//! is unreadable. Only a stdio failure exits non-zero.

use std::io::{self, Read, Write};

fn main() {
  let mut raw = Vec::new();
  let result = io::stdin()
    .lock()
    .read_to_end(&mut raw)
    .and_then(|_| {
      let mut out = io::stdout().lock();
      out.write_all(risk_engine::respond(&raw).as_bytes())?;
      out.flush()
    });
  if let Err(e) = result {
    let _ = writeln!(io::stderr(), "risk-engine: {}", e);
    std::process::exit(1);
  }
}
