//! Error taxonomy for oracle calls, response parsing and session transitions.
//!
//! Oracle and parse failures are recoverable: the session rolls back and the
//! action stays retryable. Rejections (`Busy`, `InvalidPhase`, ...) never
//! change state at all.

use crate::session::SessionPhase;

/// Message surfaced to the user for any failed oracle round trip.
pub const RETRY_MESSAGE: &str = "The operation failed, please retry.";

/// Failures reported by an oracle transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
  /// Network/transport failure, or a response we could not read.
  #[error("oracle unavailable: {0}")]
  Unavailable(String),

  /// The oracle answered with a non-success status.
  #[error("oracle rejected the request (HTTP {status}): {message}")]
  Rejected { status: u16, message: String },
}

/// Failures turning raw oracle text into typed records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
  #[error("no JSON object found in oracle response")]
  NoJsonFound,

  #[error("malformed JSON in oracle response: {0}")]
  MalformedJson(String),

  /// First missing or invalid field, in validation order.
  #[error("field '{field}' is invalid: {reason}")]
  SchemaMismatch { field: &'static str, reason: String },
}

impl ParseError {
  pub(crate) fn mismatch(field: &'static str, reason: impl Into<String>) -> Self {
    ParseError::SchemaMismatch { field, reason: reason.into() }
  }
}

/// Everything a session transition can report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
  #[error(transparent)]
  Oracle(#[from] OracleError),

  #[error(transparent)]
  Parse(#[from] ParseError),

  /// Another oracle call is still in flight for this session.
  #[error("another request is already in progress")]
  Busy,

  #[error("cannot {action} while {phase}")]
  InvalidPhase { action: &'static str, phase: SessionPhase },

  #[error("answer is empty")]
  EmptyAnswer,

  /// The response belongs to a request that is no longer current.
  #[error("response discarded: request is no longer current")]
  Stale,

  #[error("session is closed")]
  Closed,
}

impl SessionError {
  /// Rejections leave the session untouched; everything else rolled it back.
  pub fn is_rejection(&self) -> bool {
    !matches!(self, SessionError::Oracle(_) | SessionError::Parse(_))
  }

  /// Text suitable for the user. Oracle and parse details stay in the logs.
  pub fn user_message(&self) -> String {
    if self.is_rejection() { self.to_string() } else { RETRY_MESSAGE.to_string() }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn failures_collapse_into_the_retry_message() {
    let e: SessionError = OracleError::Rejected { status: 503, message: "overloaded".into() }.into();
    assert!(!e.is_rejection());
    assert_eq!(e.user_message(), RETRY_MESSAGE);

    let e: SessionError = ParseError::mismatch("score", "out of range").into();
    assert_eq!(e.user_message(), RETRY_MESSAGE);
  }

  #[test]
  fn rejections_keep_their_own_message() {
    let e = SessionError::InvalidPhase { action: "submit an answer", phase: SessionPhase::Idle };
    assert!(e.is_rejection());
    assert_eq!(e.user_message(), "cannot submit an answer while idle");
    assert!(SessionError::Busy.is_rejection());
  }
}
