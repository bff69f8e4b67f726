//! External reasoning service: turns a scored edit into a short explanation.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use risk_engine::{RiskLevel, RiskReason};

use crate::error::GateError;

/// Everything the service sees about one edit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainRequest {
  pub file_path: String,
  pub score: u8,
  pub level: RiskLevel,
  pub reasons: Vec<RiskReason>,
  pub diff: String,
  pub content: String,
}

#[async_trait]
pub trait Reasoner: Send + Sync {
  /// Identifier recorded on enrichment events.
  fn source(&self) -> &str;

  /// `None` on any failure; never errors.
  async fn explain(&self, req: &ExplainRequest) -> Option<String>;
}

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct GeminiReasoner {
  source: String,
  api_key: String,
  model: String,
  base_url: String,
  http_client: reqwest::Client,
}

impl GeminiReasoner {
  pub fn new(api_key: String, model: &str, timeout: Duration) -> Result<Self, GateError> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self {
      source: format!("gemini:{}", model),
      api_key,
      model: model.to_string(),
      base_url: GEMINI_BASE_URL.to_string(),
      http_client,
    })
  }

  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into();
    self
  }

  fn endpoint(&self) -> String {
    format!(
      "{}/models/{}:generateContent",
      self.base_url.trim_end_matches('/'),
      self.model
    )
  }

  async fn request(&self, req: &ExplainRequest) -> Result<String, GateError> {
    let body = GeminiRequest {
      contents: vec![GeminiContent {
        role: "user".to_string(),
        parts: vec![GeminiPart {
          text: build_prompt(req),
        }],
      }],
      generation_config: GeminiGenerationConfig {
        temperature: 0.2,
        response_mime_type: "application/json".to_string(),
      },
    };

    let response = self
      .http_client
      .post(self.endpoint())
      .header("x-goog-api-key", &self.api_key)
      .json(&body)
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      let text = response.text().await.unwrap_or_default();
      return Err(GateError::response(format!("status {}: {}", status, text)));
    }

    let payload: Value = response.json().await?;
    parse_explanation(&payload)
      .ok_or_else(|| GateError::response("no explanation string in response"))
  }
}

#[async_trait]
impl Reasoner for GeminiReasoner {
  fn source(&self) -> &str {
    &self.source
  }

  async fn explain(&self, req: &ExplainRequest) -> Option<String> {
    match self.request(req).await {
      Ok(text) => Some(text),
      Err(e) => {
        tracing::warn!(file = %req.file_path, error = %e, "enrichment call failed");
        None
      }
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
  contents: Vec<GeminiContent>,
  generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
  role: String,
  parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
  text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
  temperature: f64,
  response_mime_type: String,
}

/// One prompt carrying score, reasons, path, diff, and content.
pub fn build_prompt(req: &ExplainRequest) -> String {
  let mut prompt = String::from(
    "You review edits made by an AI coding agent. A deterministic gate scored the \
     edit below. In two or three sentences, explain to the developer what the edit \
     appears to do and why it may be risky. Respond with a JSON object of the form \
     {\"explanation\": \"...\"} and nothing else.\n\n",
  );
  prompt.push_str(&format!("File: {}\n", req.file_path));
  prompt.push_str(&format!(
    "Risk score: {}/100 ({})\n",
    req.score,
    req.level.as_str()
  ));
  prompt.push_str("Reasons:\n");
  if req.reasons.is_empty() {
    prompt.push_str("- none\n");
  }
  for r in &req.reasons {
    prompt.push_str(&format!(
      "- {} ({:+}): {}\n",
      r.rule.as_str(),
      r.points,
      r.description
    ));
  }
  prompt.push_str("\nDiff:\n");
  prompt.push_str(if req.diff.is_empty() {
    "(unavailable)"
  } else {
    req.diff.as_str()
  });
  prompt.push_str("\n\nCurrent file content:\n");
  prompt.push_str(if req.content.is_empty() {
    "(unavailable)"
  } else {
    req.content.as_str()
  });
  prompt.push('\n');
  prompt
}

/// First candidate's text, parsed as a JSON object with a non-empty string
/// `explanation`. Any other shape is `None`.
pub fn parse_explanation(payload: &Value) -> Option<String> {
  let text = payload
    .get("candidates")?
    .get(0)?
    .get("content")?
    .get("parts")?
    .get(0)?
    .get("text")?
    .as_str()?;
  let inner: Value = serde_json::from_str(strip_code_fence(text)).ok()?;
  let explanation = inner.as_object()?.get("explanation")?.as_str()?.trim();
  if explanation.is_empty() {
    None
  } else {
    Some(explanation.to_string())
  }
}

fn strip_code_fence(text: &str) -> &str {
  let t = text.trim();
  match t.strip_prefix("```") {
    Some(rest) => {
      let rest = rest.strip_prefix("json").unwrap_or(rest);
      rest.strip_suffix("```").unwrap_or(rest).trim()
    }
    None => t,
  }
}
