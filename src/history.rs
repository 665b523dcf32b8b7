//! Bounded log of recent results and the statistics derived from it.

use std::collections::VecDeque;

use serde::Serialize;

use crate::domain::ExerciseResult;

/// How many results are kept per session.
pub const HISTORY_CAPACITY: usize = 10;

/// Aggregates over the current history. Recomputed on every call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
  pub completed: usize,
  pub average_score: u32,
  pub correct_percentage: u32,
}

/// Most-recent-first, write-once-per-entry.
#[derive(Clone, Debug)]
pub struct History {
  entries: VecDeque<ExerciseResult>,
  capacity: usize,
}

impl Default for History {
  fn default() -> Self {
    Self::with_capacity(HISTORY_CAPACITY)
  }
}

impl History {
  pub fn with_capacity(capacity: usize) -> Self {
    Self { entries: VecDeque::with_capacity(capacity + 1), capacity }
  }

  /// Prepend a result, dropping the oldest one on overflow.
  pub fn record(&mut self, result: ExerciseResult) {
    self.entries.push_front(result);
    while self.entries.len() > self.capacity {
      self.entries.pop_back();
    }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Up to `n` entries, newest first.
  pub fn recent(&self, n: usize) -> impl Iterator<Item = &ExerciseResult> {
    self.entries.iter().take(n)
  }

  pub fn iter(&self) -> impl Iterator<Item = &ExerciseResult> {
    self.entries.iter()
  }

  pub fn stats(&self) -> Stats {
    let n = self.entries.len();
    if n == 0 {
      return Stats::default();
    }
    let total: u32 = self.entries.iter().map(|r| u32::from(r.score)).sum();
    let correct = self.entries.iter().filter(|r| r.is_correct).count();
    Stats {
      completed: n,
      average_score: round_ratio(total as u64, n as u64),
      correct_percentage: round_ratio(100 * correct as u64, n as u64),
    }
  }
}

/// Half-up rounding of `num / den` in integers (inputs are non-negative).
fn round_ratio(num: u64, den: u64) -> u32 {
  ((2 * num + den) / (2 * den)) as u32
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Difficulty, Exercise, ExerciseType};

  fn result(text: &str, score: u8, is_correct: bool) -> ExerciseResult {
    ExerciseResult {
      exercise: Exercise {
        id: text.into(),
        exercise_type: ExerciseType::Translate,
        source_language: "Nederlands".into(),
        target_language: "Engels".into(),
        text: text.into(),
        correct_answer: "-".into(),
        options: None,
        difficulty: Difficulty::Beginner,
        topic: "algemeen".into(),
      },
      user_answer: "-".into(),
      is_correct,
      feedback: String::new(),
      score,
    }
  }

  #[test]
  fn empty_history_has_zero_stats() {
    let h = History::default();
    assert!(h.is_empty());
    assert_eq!(h.stats(), Stats { completed: 0, average_score: 0, correct_percentage: 0 });
  }

  #[test]
  fn average_score_is_rounded_mean() {
    let mut h = History::default();
    for s in [80, 100, 60] {
      h.record(result("x", s, s >= 80));
    }
    let stats = h.stats();
    assert_eq!(stats.average_score, 80);
    assert_eq!(stats.correct_percentage, 67);
    assert_eq!(stats.completed, 3);
  }

  #[test]
  fn rounding_goes_half_up() {
    let mut h = History::default();
    h.record(result("a", 50, true));
    h.record(result("b", 51, false));
    // mean 50.5, one of two correct
    assert_eq!(h.stats().average_score, 51);
    assert_eq!(h.stats().correct_percentage, 50);
  }

  #[test]
  fn eleventh_entry_evicts_the_oldest() {
    let mut h = History::default();
    for i in 0..11 {
      h.record(result(&format!("ex{i}"), 10, false));
    }
    assert_eq!(h.len(), HISTORY_CAPACITY);
    assert_eq!(h.iter().next().map(|r| r.exercise.text.as_str()), Some("ex10"));
    assert!(h.iter().all(|r| r.exercise.text != "ex0"));
    assert_eq!(h.iter().last().map(|r| r.exercise.text.as_str()), Some("ex1"));
  }

  #[test]
  fn recent_lists_newest_first() {
    let mut h = History::default();
    for i in 0..7 {
      h.record(result(&format!("ex{i}"), 10, false));
    }
    let texts: Vec<_> = h.recent(5).map(|r| r.exercise.text.clone()).collect();
    assert_eq!(texts, vec!["ex6", "ex5", "ex4", "ex3", "ex2"]);
  }
}
