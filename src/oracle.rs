//! The oracle seam: text in, text out.
//!
//! The session engine only depends on `Oracle`. Transports live behind it:
//!   - `ChatEndpointOracle`: POST `{message, modelTier}` → `{response}`
//!   - `crate::openai::OpenAiOracle`: direct chat-completions client
//!   - `UnconfiguredOracle`: fails every call (no transport configured)

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::OracleError;
use crate::openai::OpenAiOracle;
use crate::util::trunc_for_log;

/// Tier requested when the caller does not say otherwise.
pub const DEFAULT_MODEL_TIER: &str = "smart";

#[async_trait]
pub trait Oracle: Send + Sync {
  /// Send one prompt and return the raw response text.
  async fn send(&self, prompt: &str) -> Result<String, OracleError>;

  /// Short name for logs.
  fn name(&self) -> &'static str;
}

/// Client for a chat relay endpoint that forwards prompts to the model provider.
#[derive(Clone)]
pub struct ChatEndpointOracle {
  client: reqwest::Client,
  pub url: String,
  pub model_tier: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest<'a> {
  message: &'a str,
  model_tier: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
  response: String,
}

impl ChatEndpointOracle {
  pub fn new(url: String, model_tier: String, timeout: Duration) -> Result<Self, OracleError> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| OracleError::Unavailable(e.to_string()))?;
    Ok(Self { client, url, model_tier })
  }
}

#[async_trait]
impl Oracle for ChatEndpointOracle {
  #[instrument(level = "info", skip(self, prompt), fields(url = %self.url, tier = %self.model_tier, prompt_len = prompt.len()))]
  async fn send(&self, prompt: &str) -> Result<String, OracleError> {
    let start = std::time::Instant::now();
    let req = ChatRequest { message: prompt, model_tier: &self.model_tier };
    let res = self.client.post(&self.url)
      .header(USER_AGENT, "lingo-drill/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(&req).send().await
      .map_err(|e| {
        error!(target: "oracle", error = %e, "Chat endpoint unreachable");
        OracleError::Unavailable(e.to_string())
      })?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      error!(target: "oracle", status, body = %trunc_for_log(&body, 200), "Chat endpoint returned an error status");
      return Err(OracleError::Rejected { status, message: trunc_for_log(&body, 500) });
    }

    let body: ChatResponse = res.json().await.map_err(|e| OracleError::Unavailable(format!("unreadable response: {e}")))?;
    info!(target: "oracle", elapsed = ?start.elapsed(), response_len = body.response.len(), "Chat endpoint responded");
    Ok(body.response)
  }

  fn name(&self) -> &'static str {
    "chat_endpoint"
  }
}

/// Stand-in used when neither ORACLE_URL nor OPENAI_API_KEY is set.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnconfiguredOracle;

#[async_trait]
impl Oracle for UnconfiguredOracle {
  async fn send(&self, _prompt: &str) -> Result<String, OracleError> {
    Err(OracleError::Unavailable("no oracle configured".into()))
  }

  fn name(&self) -> &'static str {
    "unconfigured"
  }
}

/// Pick a transport from the environment.
///
///   ORACLE_URL           : chat relay endpoint (takes precedence)
///   ORACLE_MODEL_TIER    : default "smart"
///   ORACLE_TIMEOUT_SECS  : default 30
///   OPENAI_API_KEY       : direct OpenAI client when no ORACLE_URL
pub fn oracle_from_env() -> Arc<dyn Oracle> {
  let tier = std::env::var("ORACLE_MODEL_TIER").unwrap_or_else(|_| DEFAULT_MODEL_TIER.into());
  let timeout = std::env::var("ORACLE_TIMEOUT_SECS")
    .ok()
    .and_then(|s| s.parse::<u64>().ok())
    .map(Duration::from_secs)
    .unwrap_or_else(|| Duration::from_secs(30));

  if let Ok(url) = std::env::var("ORACLE_URL") {
    match ChatEndpointOracle::new(url.clone(), tier.clone(), timeout) {
      Ok(o) => {
        info!(target: "lingo_drill", %url, %tier, "Oracle: chat endpoint");
        return Arc::new(o);
      }
      Err(e) => error!(target: "lingo_drill", %url, error = %e, "Failed to build chat endpoint client"),
    }
  }

  if let Some(oa) = OpenAiOracle::from_env(&tier, timeout) {
    info!(target: "lingo_drill", base_url = %oa.base_url, model = %oa.model, "Oracle: OpenAI");
    return Arc::new(oa);
  }

  info!(target: "lingo_drill", "No oracle configured (set ORACLE_URL or OPENAI_API_KEY); every request will fail.");
  Arc::new(UnconfiguredOracle)
}


#[cfg(test)]
mod tests {
  use super::testing::ScriptedOracle;
  use super::*;

  #[tokio::test]
  async fn unconfigured_oracle_is_unavailable() {
    let err = UnconfiguredOracle.send("hi").await.unwrap_err();
    assert!(matches!(err, OracleError::Unavailable(_)));
  }

  #[tokio::test]
  async fn scripted_oracle_replays_in_order() {
    let oracle = ScriptedOracle::new()
      .reply("first")
      .fail(OracleError::Rejected { status: 500, message: "boom".into() });
    assert_eq!(oracle.send("a").await.unwrap(), "first");
    assert!(matches!(oracle.send("b").await, Err(OracleError::Rejected { status: 500, .. })));
    assert!(matches!(oracle.send("c").await, Err(OracleError::Unavailable(_))));
    assert_eq!(oracle.prompts(), vec!["a", "b", "c"]);
  }

  #[test]
  fn chat_request_uses_camel_case() {
    let body = serde_json::to_value(ChatRequest { message: "m", model_tier: "smart" }).unwrap();
    assert_eq!(body, serde_json::json!({ "message": "m", "modelTier": "smart" }));
  }

  #[tokio::test]
  async fn unreachable_endpoint_maps_to_unavailable() {
    // Port 9 (discard) on localhost is closed in test environments.
    let oracle = ChatEndpointOracle::new("http://127.0.0.1:9/api/chat".into(), "smart".into(), Duration::from_secs(2)).unwrap();
    let err = oracle.send("hello").await.unwrap_err();
    assert!(matches!(err, OracleError::Unavailable(_)));
  }
}
