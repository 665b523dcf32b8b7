//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! Each operation locks the session only around the state transitions and
//! releases it while the oracle is awaited, so teardown and rejections stay
//! responsive during the round trip.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::error::SessionError;
use crate::oracle::Oracle;
use crate::session::{ExerciseSession, SessionSnapshot};

pub type SessionHandle = Arc<Mutex<ExerciseSession>>;

/// Sessions have no separate start action: the first exercise is requested right away.
#[instrument(level = "info", skip(handle, oracle), fields(oracle = oracle.name()))]
pub async fn start_session(handle: &SessionHandle, oracle: &dyn Oracle) -> Result<SessionSnapshot, SessionError> {
  generate_exercise(handle, oracle).await
}

/// New or next exercise.
#[instrument(level = "info", skip(handle, oracle), fields(oracle = oracle.name()))]
pub async fn generate_exercise(handle: &SessionHandle, oracle: &dyn Oracle) -> Result<SessionSnapshot, SessionError> {
  let ticket = handle.lock().await.begin_generation()?;
  let reply = oracle.send(ticket.prompt()).await;
  debug!(target: "session", ok = reply.is_ok(), "Generation reply received");

  let mut session = handle.lock().await;
  session.complete_generation(ticket, reply)?;
  Ok(session.snapshot())
}

/// Evaluate the current answer, optionally replacing it first.
#[instrument(level = "info", skip(handle, oracle, answer), fields(oracle = oracle.name(), has_answer = answer.is_some()))]
pub async fn submit_answer(
  handle: &SessionHandle,
  oracle: &dyn Oracle,
  answer: Option<String>,
) -> Result<SessionSnapshot, SessionError> {
  let ticket = {
    let mut session = handle.lock().await;
    if let Some(answer) = answer {
      session.set_answer(answer)?;
    }
    session.begin_evaluation()?
  };
  let reply = oracle.send(ticket.prompt()).await;
  debug!(target: "session", ok = reply.is_ok(), "Evaluation reply received");

  let mut session = handle.lock().await;
  session.complete_evaluation(ticket, reply)?;
  Ok(session.snapshot())
}

pub async fn snapshot(handle: &SessionHandle) -> SessionSnapshot {
  handle.lock().await.snapshot()
}
