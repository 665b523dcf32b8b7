//! WebSocket upgrade + message loop. Each connection owns one session: it is
//! created (and its first exercise requested) on connect and closed on disconnect.
//! We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::error::SessionError;
use crate::logic::{self, SessionHandle};
use crate::protocol::{ClientWsMessage, HistoryOut, ServerWsMessage};
use crate::session::SessionSnapshot;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "lingo_drill", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  let (id, handle) = state.create_session(None).await;
  info!(target: "lingo_drill", %id, "WebSocket connected");

  let first = reply_for(&handle, logic::start_session(&handle, state.oracle.as_ref()).await).await;
  if send_json(&mut socket, &first).await.is_ok() {
    while let Some(Ok(msg)) = socket.recv().await {
      match msg {
        Message::Text(txt) => {
          // Parse, dispatch, serialize response.
          let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
            Ok(incoming) => {
              debug!(target: "lingo_drill", "WS received: {:?}", &incoming);
              handle_client_ws(incoming, &handle, &state).await
            }
            Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e), session: None },
          };

          if send_json(&mut socket, &reply_msg).await.is_err() {
            break;
          }
        }
        Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
        Message::Close(_) => break,
        _ => {}
      }
    }
  }

  state.remove_session(&id).await;
  info!(target: "lingo_drill", %id, "WebSocket disconnected");
}

async fn send_json(socket: &mut WebSocket, msg: &ServerWsMessage) -> Result<(), axum::Error> {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  socket.send(Message::Text(out)).await.map_err(|e| {
    error!(target: "lingo_drill", error = %e, "WS send error");
    e
  })
}

async fn reply_for(handle: &SessionHandle, outcome: Result<SessionSnapshot, SessionError>) -> ServerWsMessage {
  match outcome {
    Ok(session) => ServerWsMessage::Session { session },
    Err(e) => ServerWsMessage::Error { message: e.user_message(), session: Some(logic::snapshot(handle).await) },
  }
}

#[instrument(level = "info", skip(handle, state))]
async fn handle_client_ws(msg: ClientWsMessage, handle: &SessionHandle, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::Configure { config } => {
      let mut session = handle.lock().await;
      session.configure(config);
      ServerWsMessage::Session { session: session.snapshot() }
    }

    ClientWsMessage::NewExercise => {
      let outcome = logic::generate_exercise(handle, state.oracle.as_ref()).await;
      reply_for(handle, outcome).await
    }

    ClientWsMessage::SetAnswer { answer } => {
      let outcome = {
        let mut session = handle.lock().await;
        session.set_answer(answer).map(|()| session.snapshot())
      };
      reply_for(handle, outcome).await
    }

    ClientWsMessage::SubmitAnswer { answer } => {
      let outcome = logic::submit_answer(handle, state.oracle.as_ref(), answer).await;
      if let Ok(snap) = &outcome {
        tracing::info!(target: "session", id = %snap.id, correct = ?snap.result.as_ref().map(|r| r.is_correct), "WS submit_answer evaluated");
      }
      reply_for(handle, outcome).await
    }

    ClientWsMessage::History => {
      let HistoryOut { entries, stats } = HistoryOut::from_history(handle.lock().await.history());
      ServerWsMessage::History { entries, stats }
    }

    ClientWsMessage::Snapshot => ServerWsMessage::Session { session: logic::snapshot(handle).await },
  }
}
