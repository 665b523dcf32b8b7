//! Exercise session state machine.
//!
//! A session owns the configuration, the current exercise/answer/result and the
//! history. Oracle calls are split into two phases so no borrow is held across
//! the network round trip:
//!
//! ```text
//!   begin_generation()  -> OracleTicket   (Idle/Ready/Result -> Generating)
//!   complete_generation(ticket, reply)    (Generating -> Ready | Idle)
//!   begin_evaluation()  -> OracleTicket   (Ready -> Evaluating)
//!   complete_evaluation(ticket, reply)    (Evaluating -> Result | Ready)
//! ```
//!
//! At most one ticket is outstanding. A completion whose ticket is no longer
//! current (session closed, or a newer request was issued) is discarded
//! without touching state.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::domain::{Configuration, EvaluationOutcome, Exercise, ExerciseResult};
use crate::error::{OracleError, SessionError};
use crate::history::{History, Stats};
use crate::parser::{parse_evaluation, parse_exercise};
use crate::prompt::PromptBuilder;
use crate::util::trunc_for_log;

/// How many history entries a snapshot carries.
const RECENT_IN_SNAPSHOT: usize = 5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
  #[default]
  Idle,
  Generating,
  Ready,
  Evaluating,
  Result,
}

impl SessionPhase {
  pub fn as_str(&self) -> &'static str {
    match self {
      SessionPhase::Idle => "idle",
      SessionPhase::Generating => "generating",
      SessionPhase::Ready => "ready",
      SessionPhase::Evaluating => "evaluating",
      SessionPhase::Result => "result",
    }
  }

  /// An oracle call is outstanding.
  pub fn is_busy(&self) -> bool {
    matches!(self, SessionPhase::Generating | SessionPhase::Evaluating)
  }
}

impl fmt::Display for SessionPhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TicketKind {
  Generation,
  Evaluation,
}

/// Handed out when an oracle call begins; required to apply its outcome.
#[derive(Debug)]
pub struct OracleTicket {
  seq: u64,
  kind: TicketKind,
  prompt: String,
}

impl OracleTicket {
  pub fn prompt(&self) -> &str {
    &self.prompt
  }
}

/// Serializable view for clients.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
  pub id: String,
  pub phase: SessionPhase,
  pub config: Configuration,
  pub exercise: Option<Exercise>,
  pub answer: String,
  pub can_submit: bool,
  pub result: Option<ExerciseResult>,
  pub stats: Stats,
  /// Newest results first, as listed under the exercise.
  pub recent: Vec<ExerciseResult>,
  pub last_error: Option<String>,
}

pub struct ExerciseSession {
  id: String,
  config: Configuration,
  prompts: Arc<PromptBuilder>,
  phase: SessionPhase,
  exercise: Option<Exercise>,
  answer: String,
  result: Option<ExerciseResult>,
  history: History,
  in_flight: Option<u64>,
  next_seq: u64,
  last_error: Option<String>,
  closed: bool,
}

impl ExerciseSession {
  pub fn new(id: impl Into<String>, config: Configuration, prompts: Arc<PromptBuilder>) -> Self {
    Self {
      id: id.into(),
      config,
      prompts,
      phase: SessionPhase::Idle,
      exercise: None,
      answer: String::new(),
      result: None,
      history: History::default(),
      in_flight: None,
      next_seq: 0,
      last_error: None,
      closed: false,
    }
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn phase(&self) -> SessionPhase {
    self.phase
  }

  pub fn config(&self) -> &Configuration {
    &self.config
  }

  pub fn exercise(&self) -> Option<&Exercise> {
    self.exercise.as_ref()
  }

  pub fn answer(&self) -> &str {
    &self.answer
  }

  pub fn result(&self) -> Option<&ExerciseResult> {
    self.result.as_ref()
  }

  pub fn history(&self) -> &History {
    &self.history
  }

  pub fn last_error(&self) -> Option<&str> {
    self.last_error.as_deref()
  }

  pub fn is_closed(&self) -> bool {
    self.closed
  }

  /// Submit is possible: an exercise is shown and the answer is not blank.
  pub fn can_submit(&self) -> bool {
    !self.closed && self.phase == SessionPhase::Ready && !self.answer.trim().is_empty()
  }

  /// Replace the configuration. Allowed in every phase; an in-flight
  /// generation keeps the prompt it was started with.
  pub fn configure(&mut self, config: Configuration) {
    if config.is_same_language() {
      warn!(target: "session", id = %self.id, language = %config.source_language, "Source and target language are identical; accepting as same-language task");
    }
    info!(target: "session", id = %self.id, source_language = %config.source_language, target_language = %config.target_language, difficulty = config.difficulty.as_str(), topic = %config.topic, kind = config.exercise_type.as_str(), "Configuration updated");
    self.config = config;
  }

  fn guard(&self, action: &'static str) -> Result<(), SessionError> {
    if self.closed {
      return Err(SessionError::Closed);
    }
    if self.in_flight.is_some() || self.phase.is_busy() {
      warn!(target: "session", id = %self.id, phase = %self.phase, action, "Rejected: request already in flight");
      return Err(SessionError::Busy);
    }
    Ok(())
  }

  fn issue(&mut self, kind: TicketKind, prompt: String) -> OracleTicket {
    self.next_seq += 1;
    self.in_flight = Some(self.next_seq);
    OracleTicket { seq: self.next_seq, kind, prompt }
  }

  /// Is this ticket still the one we are waiting for?
  fn accept(&mut self, ticket: &OracleTicket, expected: TicketKind) -> Result<(), SessionError> {
    if self.closed || ticket.kind != expected || self.in_flight != Some(ticket.seq) {
      warn!(target: "session", id = %self.id, seq = ticket.seq, current = ?self.in_flight, closed = self.closed, "Discarding stale oracle response");
      return Err(SessionError::Stale);
    }
    self.in_flight = None;
    Ok(())
  }

  /// Start generating a new exercise from the current configuration.
  pub fn begin_generation(&mut self) -> Result<OracleTicket, SessionError> {
    self.guard("generate an exercise")?;
    let prompt = self.prompts.generation(&self.config);
    self.answer.clear();
    self.result = None;
    self.last_error = None;
    self.phase = SessionPhase::Generating;
    let ticket = self.issue(TicketKind::Generation, prompt);
    info!(target: "session", id = %self.id, seq = ticket.seq, kind = self.config.exercise_type.as_str(), topic = %self.config.topic, "Generation started");
    Ok(ticket)
  }

  /// Apply the oracle's reply to a generation request.
  pub fn complete_generation(
    &mut self,
    ticket: OracleTicket,
    reply: Result<String, OracleError>,
  ) -> Result<&Exercise, SessionError> {
    self.accept(&ticket, TicketKind::Generation)?;

    let parsed = reply
      .map_err(SessionError::from)
      .and_then(|raw| parse_exercise(&raw).map_err(|e| {
        warn!(target: "session", id = %self.id, raw = %trunc_for_log(&raw, 300), "Unusable generation output");
        SessionError::from(e)
      }));

    match parsed {
      Ok(exercise) => {
        if exercise.exercise_type != self.config.exercise_type {
          warn!(target: "session", id = %self.id, requested = self.config.exercise_type.as_str(), got = exercise.exercise_type.as_str(), "Oracle returned a different exercise type");
        }
        info!(target: "session", id = %self.id, exercise_id = %exercise.id, kind = exercise.exercise_type.as_str(), text_preview = %trunc_for_log(&exercise.text, 40), "Exercise ready");
        self.answer.clear();
        self.result = None;
        self.phase = SessionPhase::Ready;
        Ok(&*self.exercise.insert(exercise))
      }
      Err(e) => {
        error!(target: "session", id = %self.id, error = %e, "Generation failed");
        self.exercise = None;
        self.phase = SessionPhase::Idle;
        self.last_error = Some(e.user_message());
        Err(e)
      }
    }
  }

  /// Store the user's current answer. Only meaningful while an exercise is open.
  pub fn set_answer(&mut self, answer: impl Into<String>) -> Result<(), SessionError> {
    if self.closed {
      return Err(SessionError::Closed);
    }
    if self.phase != SessionPhase::Ready {
      return Err(SessionError::InvalidPhase { action: "change the answer", phase: self.phase });
    }
    self.answer = answer.into();
    Ok(())
  }

  /// Start evaluating the current answer.
  pub fn begin_evaluation(&mut self) -> Result<OracleTicket, SessionError> {
    self.guard("submit an answer")?;
    let exercise = match (&self.exercise, self.phase) {
      (Some(ex), SessionPhase::Ready) => ex,
      _ => return Err(SessionError::InvalidPhase { action: "submit an answer", phase: self.phase }),
    };
    if self.answer.trim().is_empty() {
      return Err(SessionError::EmptyAnswer);
    }
    let prompt = self.prompts.evaluation(exercise, &self.answer);
    self.last_error = None;
    self.phase = SessionPhase::Evaluating;
    let ticket = self.issue(TicketKind::Evaluation, prompt);
    info!(target: "session", id = %self.id, seq = ticket.seq, answer_len = self.answer.len(), "Evaluation started");
    Ok(ticket)
  }

  /// Apply the oracle's reply to an evaluation request.
  pub fn complete_evaluation(
    &mut self,
    ticket: OracleTicket,
    reply: Result<String, OracleError>,
  ) -> Result<&ExerciseResult, SessionError> {
    self.accept(&ticket, TicketKind::Evaluation)?;

    let parsed: Result<EvaluationOutcome, SessionError> = reply
      .map_err(SessionError::from)
      .and_then(|raw| parse_evaluation(&raw).map_err(|e| {
        warn!(target: "session", id = %self.id, raw = %trunc_for_log(&raw, 300), "Unusable evaluation output");
        SessionError::from(e)
      }));

    let (outcome, exercise) = match (parsed, self.exercise.clone()) {
      (Ok(outcome), Some(exercise)) => (outcome, exercise),
      (Err(e), _) => {
        error!(target: "session", id = %self.id, error = %e, "Evaluation failed");
        self.phase = SessionPhase::Ready;
        self.last_error = Some(e.user_message());
        return Err(e);
      }
      (Ok(_), None) => {
        // Unreachable through the public API: Evaluating implies an exercise.
        self.phase = SessionPhase::Idle;
        return Err(SessionError::InvalidPhase { action: "record a result", phase: SessionPhase::Idle });
      }
    };

    let result = ExerciseResult::new(exercise, self.answer.clone(), outcome);
    info!(target: "session", id = %self.id, exercise_id = %result.exercise.id, correct = result.is_correct, score = result.score, "Answer evaluated");
    self.history.record(result.clone());
    self.phase = SessionPhase::Result;
    Ok(&*self.result.insert(result))
  }

  /// Teardown. Any response still on its way will be discarded.
  pub fn close(&mut self) {
    if !self.closed {
      info!(target: "session", id = %self.id, phase = %self.phase, in_flight = self.in_flight.is_some(), "Session closed");
    }
    self.closed = true;
    self.in_flight = None;
  }

  pub fn snapshot(&self) -> SessionSnapshot {
    SessionSnapshot {
      id: self.id.clone(),
      phase: self.phase,
      config: self.config.clone(),
      exercise: self.exercise.clone(),
      answer: self.answer.clone(),
      can_submit: self.can_submit(),
      result: self.result.clone(),
      stats: self.history.stats(),
      recent: self.history.recent(RECENT_IN_SNAPSHOT).cloned().collect(),
      last_error: self.last_error.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Difficulty, ExerciseType};
  use crate::error::{ParseError, RETRY_MESSAGE};

  const SCENARIO: &str = "Hier is je oefening: {\"type\":\"translate\",\"sourceLanguage\":\"Nederlands\",\"targetLanguage\":\"Engels\",\"text\":\"Waar is het station?\",\"correctAnswer\":\"Where is the station?\",\"difficulty\":\"beginner\",\"topic\":\"reizen\"}";
  const VERDICT: &str = "{\"isCorrect\": true, \"score\": 95, \"feedback\": \"Prima!\"}";

  fn scenario_config() -> Configuration {
    Configuration {
      source_language: "Nederlands".into(),
      target_language: "Engels".into(),
      difficulty: Difficulty::Beginner,
      topic: "reizen".into(),
      exercise_type: ExerciseType::Translate,
    }
  }

  fn session() -> ExerciseSession {
    ExerciseSession::new("s1", scenario_config(), Arc::new(PromptBuilder::default()))
  }

  fn ready_session() -> ExerciseSession {
    let mut s = session();
    let t = s.begin_generation().unwrap();
    s.complete_generation(t, Ok(SCENARIO.into())).unwrap();
    s
  }

  #[test]
  fn scenario_generation_reaches_ready() {
    let mut s = session();
    assert_eq!(s.phase(), SessionPhase::Idle);
    let t = s.begin_generation().unwrap();
    assert_eq!(s.phase(), SessionPhase::Generating);
    assert!(t.prompt().contains("reizen"));
    let ex = s.complete_generation(t, Ok(SCENARIO.into())).unwrap().clone();
    assert_eq!(ex.text, "Waar is het station?");
    assert_eq!(ex.correct_answer, "Where is the station?");
    assert_eq!(s.phase(), SessionPhase::Ready);
    assert_eq!(s.exercise(), Some(&ex));
    assert_eq!(s.answer(), "");
  }

  #[test]
  fn second_request_while_in_flight_is_rejected() {
    let mut s = session();
    let _t = s.begin_generation().unwrap();
    assert_eq!(s.begin_generation().unwrap_err(), SessionError::Busy);
    assert_eq!(s.begin_evaluation().unwrap_err(), SessionError::Busy);
    assert_eq!(s.phase(), SessionPhase::Generating);

    let mut s = ready_session();
    s.set_answer("Where is the station?").unwrap();
    let _t = s.begin_evaluation().unwrap();
    assert_eq!(s.begin_evaluation().unwrap_err(), SessionError::Busy);
    assert_eq!(s.begin_generation().unwrap_err(), SessionError::Busy);
    assert_eq!(s.phase(), SessionPhase::Evaluating);
  }

  #[test]
  fn blank_answer_never_leaves_ready() {
    let mut s = ready_session();
    for blank in ["", "   ", "\n\t "] {
      s.set_answer(blank).unwrap();
      assert!(!s.can_submit());
      assert_eq!(s.begin_evaluation().unwrap_err(), SessionError::EmptyAnswer);
      assert_eq!(s.phase(), SessionPhase::Ready);
    }
  }

  #[test]
  fn successful_evaluation_records_history() {
    let mut s = ready_session();
    s.set_answer("Where is the station?").unwrap();
    let t = s.begin_evaluation().unwrap();
    assert!(t.prompt().contains("Student answer: Where is the station?"));
    let r = s.complete_evaluation(t, Ok(VERDICT.into())).unwrap().clone();
    assert!(r.is_correct);
    assert_eq!(r.score, 95);
    assert_eq!(r.user_answer, "Where is the station?");
    assert_eq!(s.phase(), SessionPhase::Result);
    assert_eq!(s.history().len(), 1);
    assert_eq!(s.history().stats().average_score, 95);

    // Result -> Generating clears answer and result
    let _t = s.begin_generation().unwrap();
    assert!(s.result().is_none());
    assert_eq!(s.answer(), "");
    assert_eq!(s.history().len(), 1);
  }

  #[test]
  fn generation_failure_rolls_back_to_idle_without_exercise() {
    let mut s = ready_session();
    let t = s.begin_generation().unwrap();
    let err = s.complete_generation(t, Err(OracleError::Unavailable("timeout".into()))).unwrap_err();
    assert!(matches!(err, SessionError::Oracle(_)));
    assert_eq!(s.phase(), SessionPhase::Idle);
    assert!(s.exercise().is_none());
    assert_eq!(s.last_error(), Some(RETRY_MESSAGE));

    // retryable
    let t = s.begin_generation().unwrap();
    let err = s.complete_generation(t, Ok("geen json".into())).unwrap_err();
    assert_eq!(err, SessionError::Parse(ParseError::NoJsonFound));
    assert_eq!(s.phase(), SessionPhase::Idle);
  }

  #[test]
  fn evaluation_failure_returns_to_ready_with_answer() {
    let mut s = ready_session();
    s.set_answer("Where station?").unwrap();
    let t = s.begin_evaluation().unwrap();
    let err = s
      .complete_evaluation(t, Err(OracleError::Rejected { status: 502, message: "bad gateway".into() }))
      .unwrap_err();
    assert!(!err.is_rejection());
    assert_eq!(s.phase(), SessionPhase::Ready);
    assert_eq!(s.answer(), "Where station?");
    assert!(s.history().is_empty());
    assert!(s.can_submit());

    let t = s.begin_evaluation().unwrap();
    let err = s.complete_evaluation(t, Ok("{\"isCorrect\": 1, \"score\": 5, \"feedback\": \"\"}".into())).unwrap_err();
    assert!(matches!(err, SessionError::Parse(ParseError::SchemaMismatch { field: "isCorrect", .. })));
    assert_eq!(s.phase(), SessionPhase::Ready);
  }

  #[test]
  fn submit_outside_ready_is_invalid() {
    let mut s = session();
    assert!(matches!(s.begin_evaluation(), Err(SessionError::InvalidPhase { phase: SessionPhase::Idle, .. })));
    assert!(matches!(s.set_answer("x"), Err(SessionError::InvalidPhase { .. })));
  }

  #[test]
  fn response_after_close_is_discarded() {
    let mut s = session();
    let t = s.begin_generation().unwrap();
    s.close();
    assert_eq!(s.complete_generation(t, Ok(SCENARIO.into())).unwrap_err(), SessionError::Stale);
    assert!(s.exercise().is_none());
    assert_eq!(s.begin_generation().unwrap_err(), SessionError::Closed);
  }

  #[test]
  fn ticket_of_other_kind_is_stale() {
    let mut s = ready_session();
    s.set_answer("x").unwrap();
    let eval = s.begin_evaluation().unwrap();
    let forged = OracleTicket { seq: eval.seq, kind: TicketKind::Generation, prompt: String::new() };
    assert_eq!(s.complete_generation(forged, Ok(SCENARIO.into())).unwrap_err(), SessionError::Stale);
    assert_eq!(s.phase(), SessionPhase::Evaluating);
    s.complete_evaluation(eval, Ok(VERDICT.into())).unwrap();
  }

  #[test]
  fn configuration_change_mid_flight_applies_to_next_request() {
    let mut s = session();
    let t = s.begin_generation().unwrap();
    s.configure(Configuration { topic: "eten".into(), ..scenario_config() });
    assert!(t.prompt().contains("reizen"));
    s.complete_generation(t, Ok(SCENARIO.into())).unwrap();
    let next = s.begin_generation().unwrap();
    assert!(next.prompt().contains("eten"));
  }

  #[test]
  fn history_keeps_submission_order() {
    let mut s = session();
    for i in 0..12u8 {
      let t = s.begin_generation().unwrap();
      s.complete_generation(t, Ok(SCENARIO.into())).unwrap();
      s.set_answer(format!("answer {i}")).unwrap();
      let t = s.begin_evaluation().unwrap();
      let verdict = format!("{{\"isCorrect\": false, \"score\": {i}, \"feedback\": \"\"}}");
      s.complete_evaluation(t, Ok(verdict)).unwrap();
    }
    assert_eq!(s.history().len(), 10);
    let answers: Vec<_> = s.history().recent(3).map(|r| r.user_answer.clone()).collect();
    assert_eq!(answers, vec!["answer 11", "answer 10", "answer 9"]);
  }

  #[test]
  fn snapshot_serializes_phase_and_stats() {
    let s = ready_session();
    let v = serde_json::to_value(s.snapshot()).unwrap();
    assert_eq!(v["phase"], "ready");
    assert_eq!(v["canSubmit"], false);
    assert_eq!(v["exercise"]["text"], "Waar is het station?");
    assert_eq!(v["stats"]["averageScore"], 0);
    assert_eq!(v["recent"], serde_json::json!([]));
  }
}
