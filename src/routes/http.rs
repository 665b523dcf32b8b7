//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};

use crate::error::SessionError;
use crate::logic::{self, SessionHandle};
use crate::protocol::*;
use crate::session::SessionSnapshot;
use crate::state::AppState;

/// Handler failures mapped onto status codes.
#[derive(Debug)]
pub enum ApiError {
  UnknownSession(String),
  /// Transition failed; carries the session state after rollback.
  Session { error: SessionError, session: Option<SessionSnapshot> },
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match self {
      ApiError::UnknownSession(id) => (
        StatusCode::NOT_FOUND,
        ErrorOut { message: format!("Unknown session: {id}"), session: None },
      ),
      ApiError::Session { error, session } => {
        let status = if error.is_rejection() { StatusCode::CONFLICT } else { StatusCode::BAD_GATEWAY };
        (status, ErrorOut { message: error.user_message(), session })
      }
    };
    (status, Json(body)).into_response()
  }
}

async fn lookup(state: &AppState, id: &str) -> Result<SessionHandle, ApiError> {
  state.get_session(id).await.ok_or_else(|| ApiError::UnknownSession(id.to_string()))
}

async fn failed(handle: &SessionHandle, error: SessionError) -> ApiError {
  ApiError::Session { error, session: Some(logic::snapshot(handle).await) }
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_catalog(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(CatalogOut::new(
    state.catalog.languages.clone(),
    state.catalog.topics.clone(),
    state.defaults.clone(),
  ))
}

/// Create a session and immediately request its first exercise.
#[instrument(level = "info", skip(state, body))]
pub async fn http_create_session(
  State(state): State<Arc<AppState>>,
  body: Option<Json<CreateSessionIn>>,
) -> Result<(StatusCode, Json<SessionSnapshot>), ApiError> {
  let config = body.and_then(|Json(b)| b.config);
  let (id, handle) = state.create_session(config).await;
  match logic::start_session(&handle, state.oracle.as_ref()).await {
    Ok(snap) => {
      info!(target: "session", %id, "HTTP session started");
      Ok((StatusCode::CREATED, Json(snap)))
    }
    Err(e) => Err(failed(&handle, e).await),
  }
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
  let handle = lookup(&state, &id).await?;
  Ok(Json(logic::snapshot(&handle).await))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_delete_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
  if state.remove_session(&id).await {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::UnknownSession(id))
  }
}

#[instrument(level = "info", skip(state, config), fields(%id))]
pub async fn http_put_config(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(config): Json<crate::domain::Configuration>,
) -> Result<Json<SessionSnapshot>, ApiError> {
  let handle = lookup(&state, &id).await?;
  let mut session = handle.lock().await;
  session.configure(config);
  Ok(Json(session.snapshot()))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_post_exercise(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
  let handle = lookup(&state, &id).await?;
  match logic::generate_exercise(&handle, state.oracle.as_ref()).await {
    Ok(snap) => Ok(Json(snap)),
    Err(e) => {
      warn!(target: "session", %id, error = %e, "HTTP new exercise failed");
      Err(failed(&handle, e).await)
    }
  }
}

#[instrument(level = "info", skip(state, body), fields(%id, answer_len = body.answer.len()))]
pub async fn http_put_answer(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<AnswerIn>,
) -> Result<Json<SessionSnapshot>, ApiError> {
  let handle = lookup(&state, &id).await?;
  let mut session = handle.lock().await;
  match session.set_answer(body.answer) {
    Ok(()) => Ok(Json(session.snapshot())),
    Err(error) => Err(ApiError::Session { error, session: Some(session.snapshot()) }),
  }
}

#[instrument(level = "info", skip(state, body), fields(%id))]
pub async fn http_post_submit(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  body: Option<Json<SubmitIn>>,
) -> Result<Json<SessionSnapshot>, ApiError> {
  let handle = lookup(&state, &id).await?;
  let answer = body.and_then(|Json(b)| b.answer);
  match logic::submit_answer(&handle, state.oracle.as_ref(), answer).await {
    Ok(snap) => {
      info!(target: "session", %id, correct = ?snap.result.as_ref().map(|r| r.is_correct), "HTTP answer evaluated");
      Ok(Json(snap))
    }
    Err(e) => Err(failed(&handle, e).await),
  }
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_history(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<HistoryOut>, ApiError> {
  let handle = lookup(&state, &id).await?;
  let session = handle.lock().await;
  Ok(Json(HistoryOut::from_history(session.history())))
}
