//! Minimal OpenAI chat-completions client used as an oracle transport.
//!
//! We send the whole prompt as a single user message and return the plain text
//! answer. Extraction and validation of the JSON inside it is `parser`'s job.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::OracleError;
use crate::oracle::{Oracle, DEFAULT_MODEL_TIER};

#[derive(Clone)]
pub struct OpenAiOracle {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  /// Model resolved from the tier at construction time.
  pub model: String,
  pub temperature: f32,
}

impl OpenAiOracle {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  ///
  /// The `smart` tier maps to OPENAI_STRONG_MODEL (default "gpt-4o"),
  /// anything else to OPENAI_FAST_MODEL (default "gpt-4o-mini").
  pub fn from_env(tier: &str, timeout: Duration) -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = model_for_tier(
      tier,
      std::env::var("OPENAI_STRONG_MODEL").ok(),
      std::env::var("OPENAI_FAST_MODEL").ok(),
    );

    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, model, temperature: 0.7 })
  }
}

fn model_for_tier(tier: &str, strong: Option<String>, fast: Option<String>) -> String {
  if tier == DEFAULT_MODEL_TIER {
    strong.unwrap_or_else(|| "gpt-4o".into())
  } else {
    fast.unwrap_or_else(|| "gpt-4o-mini".into())
  }
}

#[async_trait]
impl Oracle for OpenAiOracle {
  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
  async fn send(&self, prompt: &str) -> Result<String, OracleError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![ChatMessageReq { role: "user".into(), content: prompt.into() }],
      temperature: self.temperature,
    };

    let start = std::time::Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "lingo-drill/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await
      .map_err(|e| {
        error!(target: "oracle", error = %e, "OpenAI unreachable");
        OracleError::Unavailable(e.to_string())
      })?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or(body);
      error!(target: "oracle", status, %message, "OpenAI returned an error status");
      return Err(OracleError::Rejected { status, message });
    }

    let body: ChatCompletionResponse = res.json().await
      .map_err(|e| OracleError::Unavailable(format!("unreadable response: {e}")))?;
    if let Some(usage) = &body.usage {
      info!(target: "oracle", prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.into_iter().next()
      .and_then(|c| c.message.content)
      .unwrap_or_default();
    info!(target: "oracle", elapsed = ?start.elapsed(), response_len = text.len(), "OpenAI responded");
    Ok(text)
  }

  fn name(&self) -> &'static str {
    "openai"
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
