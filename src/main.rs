//! Lingo Drill · language exercise session engine
//!
//! - Generates translation / fill-blank / multiple-choice / conversation
//!   exercises through a language-model oracle and grades answers with it
//! - Axum HTTP + WebSocket API around per-user exercise sessions
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   ORACLE_URL          : chat relay endpoint taking {message, modelTier}
//!   ORACLE_MODEL_TIER   : default "smart"
//!   ORACLE_TIMEOUT_SECS : default 30
//!   OPENAI_API_KEY      : direct OpenAI transport when ORACLE_URL is unset
//!   OPENAI_BASE_URL     : default "https://api.openai.com/v1"
//!   OPENAI_FAST_MODEL   : default "gpt-4o-mini"
//!   OPENAI_STRONG_MODEL : default "gpt-4o"
//!   LINGO_CONFIG_PATH   : path to TOML config (defaults, catalog, prompt preambles)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod prompt;
mod parser;
mod history;
mod oracle;
mod openai;
mod session;
mod logic;
mod state;
mod protocol;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared application state (session store, oracle transport, prompts).
  let state = Arc::new(AppState::new());

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "lingo_drill", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal(state))
    .await?;
  Ok(())
}

/// Ctrl-C: close every live session so late oracle replies are dropped.
async fn shutdown_signal(state: Arc<AppState>) {
  if tokio::signal::ctrl_c().await.is_err() {
    return;
  }
  let ids: Vec<String> = state.sessions.read().await.keys().cloned().collect();
  for id in &ids {
    state.remove_session(id).await;
  }
  info!(target: "lingo_drill", closed = ids.len(), "Shutdown requested");
}
