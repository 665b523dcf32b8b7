//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{Configuration, Difficulty, ExerciseResult, ExerciseType};
use crate::history::{History, Stats};
use crate::session::SessionSnapshot;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Configure {
        config: Configuration,
    },
    NewExercise,
    SetAnswer {
        answer: String,
    },
    SubmitAnswer {
        #[serde(default)]
        answer: Option<String>,
    },
    History,
    Snapshot,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Session {
        session: SessionSnapshot,
    },
    History {
        entries: Vec<ExerciseResult>,
        stats: Stats,
    },
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        session: Option<SessionSnapshot>,
    },
}

/// History entries (newest first) plus aggregates.
#[derive(Debug, Serialize)]
pub struct HistoryOut {
    pub entries: Vec<ExerciseResult>,
    pub stats: Stats,
}

impl HistoryOut {
    pub fn from_history(history: &History) -> Self {
        Self { entries: history.iter().cloned().collect(), stats: history.stats() }
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionIn {
    #[serde(default)]
    pub config: Option<Configuration>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerIn {
    pub answer: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmitIn {
    #[serde(default)]
    pub answer: Option<String>,
}

/// Body returned when an operation fails; carries the state after rollback.
#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct LabelOut {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogOut {
    pub languages: Vec<String>,
    pub topics: Vec<String>,
    pub difficulties: Vec<LabelOut>,
    pub exercise_types: Vec<LabelOut>,
    pub defaults: Configuration,
}

impl CatalogOut {
    pub fn new(languages: Vec<String>, topics: Vec<String>, defaults: Configuration) -> Self {
        Self {
            languages,
            topics,
            difficulties: Difficulty::ALL
                .iter()
                .map(|d| LabelOut { value: d.as_str(), label: d.label() })
                .collect(),
            exercise_types: ExerciseType::ALL
                .iter()
                .map(|t| LabelOut { value: t.as_str(), label: t.label() })
                .collect(),
            defaults,
        }
    }
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
