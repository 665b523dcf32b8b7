//! Turning raw oracle text into typed records.
//!
//! Extraction is tolerant: models like to wrap JSON in prose, so we take the
//! span from the first `{` to the last `}`. Validation after that is strict:
//! no coercion between types, and the first bad field is reported by name.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::{Difficulty, EvaluationOutcome, Exercise, ExerciseType, MULTIPLE_CHOICE_OPTIONS};
use crate::error::ParseError;

/// Greedy outermost object span: first `{` through last `}`.
pub fn extract_json_span(raw: &str) -> Option<&str> {
  let start = raw.find('{')?;
  let end = raw.rfind('}')?;
  if end < start {
    return None;
  }
  Some(&raw[start..=end])
}

fn decode_object(raw: &str) -> Result<Map<String, Value>, ParseError> {
  let span = extract_json_span(raw).ok_or(ParseError::NoJsonFound)?;
  let value: Value = serde_json::from_str(span).map_err(|e| ParseError::MalformedJson(e.to_string()))?;
  match value {
    Value::Object(map) => Ok(map),
    _ => Err(ParseError::mismatch("<root>", "expected a JSON object")),
  }
}

fn required_str<'a>(obj: &'a Map<String, Value>, field: &'static str) -> Result<&'a str, ParseError> {
  match obj.get(field) {
    None | Some(Value::Null) => Err(ParseError::mismatch(field, "missing")),
    Some(Value::String(s)) => Ok(s),
    Some(other) => Err(ParseError::mismatch(field, format!("expected a string, got {}", kind_of(other)))),
  }
}

fn required_text<'a>(obj: &'a Map<String, Value>, field: &'static str) -> Result<&'a str, ParseError> {
  let s = required_str(obj, field)?;
  if s.trim().is_empty() {
    return Err(ParseError::mismatch(field, "must not be empty"));
  }
  Ok(s)
}

fn kind_of(v: &Value) -> &'static str {
  match v {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

/// Parse a generated exercise. A fresh id is assigned here; the oracle never supplies one.
pub fn parse_exercise(raw: &str) -> Result<Exercise, ParseError> {
  let obj = decode_object(raw)?;

  let type_str = required_str(&obj, "type")?;
  let exercise_type = ExerciseType::from_wire(type_str)
    .ok_or_else(|| ParseError::mismatch("type", format!("unknown exercise type '{type_str}'")))?;
  let source_language = required_text(&obj, "sourceLanguage")?;
  let target_language = required_text(&obj, "targetLanguage")?;
  let text = required_text(&obj, "text")?;
  let correct_answer = required_text(&obj, "correctAnswer")?;
  let diff_str = required_str(&obj, "difficulty")?;
  let difficulty = Difficulty::from_wire(diff_str)
    .ok_or_else(|| ParseError::mismatch("difficulty", format!("unknown difficulty '{diff_str}'")))?;
  let topic = required_str(&obj, "topic")?;
  let options = parse_options(&obj, exercise_type)?;

  Ok(Exercise {
    id: Uuid::new_v4().to_string(),
    exercise_type,
    source_language: source_language.to_string(),
    target_language: target_language.to_string(),
    text: text.to_string(),
    correct_answer: correct_answer.to_string(),
    options,
    difficulty,
    topic: topic.to_string(),
  })
}

fn parse_options(obj: &Map<String, Value>, kind: ExerciseType) -> Result<Option<Vec<String>>, ParseError> {
  let raw = obj.get("options").filter(|v| !v.is_null());
  if !kind.has_options() {
    return match raw {
      None => Ok(None),
      Some(_) => Err(ParseError::mismatch("options", format!("not allowed for type '{}'", kind.as_str()))),
    };
  }
  let items = match raw {
    None => return Err(ParseError::mismatch("options", "missing")),
    Some(Value::Array(items)) => items,
    Some(other) => return Err(ParseError::mismatch("options", format!("expected an array, got {}", kind_of(other)))),
  };
  if items.len() != MULTIPLE_CHOICE_OPTIONS {
    return Err(ParseError::mismatch(
      "options",
      format!("expected exactly {} entries, got {}", MULTIPLE_CHOICE_OPTIONS, items.len()),
    ));
  }
  items
    .iter()
    .map(|v| match v {
      Value::String(s) => Ok(s.clone()),
      other => Err(ParseError::mismatch("options", format!("entries must be strings, got {}", kind_of(other)))),
    })
    .collect::<Result<Vec<_>, _>>()
    .map(Some)
}

/// Parse an evaluation verdict.
pub fn parse_evaluation(raw: &str) -> Result<EvaluationOutcome, ParseError> {
  let obj = decode_object(raw)?;

  let is_correct = match obj.get("isCorrect") {
    None | Some(Value::Null) => return Err(ParseError::mismatch("isCorrect", "missing")),
    Some(Value::Bool(b)) => *b,
    Some(other) => return Err(ParseError::mismatch("isCorrect", format!("expected a boolean, got {}", kind_of(other)))),
  };
  let score = parse_score(obj.get("score"))?;
  let feedback = required_str(&obj, "feedback")?;

  Ok(EvaluationOutcome { is_correct, score, feedback: feedback.to_string() })
}

/// Any finite number, rounded to the nearest integer, within 0..=100.
fn parse_score(v: Option<&Value>) -> Result<u8, ParseError> {
  let n = match v {
    None | Some(Value::Null) => return Err(ParseError::mismatch("score", "missing")),
    Some(Value::Number(n)) => n,
    Some(other) => return Err(ParseError::mismatch("score", format!("expected a number, got {}", kind_of(other)))),
  };
  let rounded = if let Some(i) = n.as_i64() {
    i as f64
  } else if let Some(u) = n.as_u64() {
    u as f64
  } else {
    n.as_f64().map(f64::round).unwrap_or(f64::NAN)
  };
  if !rounded.is_finite() || !(0.0..=100.0).contains(&rounded) {
    return Err(ParseError::mismatch("score", format!("{n} is outside 0..=100")));
  }
  Ok(rounded as u8)
}
