//! Domain models used by the engine: configuration, exercises, evaluations and results.

use serde::{Deserialize, Serialize};

/// How hard the generated exercise should be.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  #[default]
  Beginner,
  Intermediate,
  Advanced,
}

impl Difficulty {
  pub const ALL: [Difficulty; 3] = [Difficulty::Beginner, Difficulty::Intermediate, Difficulty::Advanced];

  /// Name used on the wire and inside prompts.
  pub fn as_str(&self) -> &'static str {
    match self {
      Difficulty::Beginner => "beginner",
      Difficulty::Intermediate => "intermediate",
      Difficulty::Advanced => "advanced",
    }
  }

  /// Human label shown in the settings panel.
  pub fn label(&self) -> &'static str {
    match self {
      Difficulty::Beginner => "Beginner",
      Difficulty::Intermediate => "Gemiddeld",
      Difficulty::Advanced => "Gevorderd",
    }
  }

  pub fn from_wire(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|d| d.as_str() == s)
  }
}

/// What kind of exercise is presented to the user?
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExerciseType {
  /// Translate a sentence from the source into the target language.
  #[default]
  Translate,
  /// Target-language sentence with one word replaced by `___`.
  FillBlank,
  /// Pick the right translation out of four options.
  MultipleChoice,
  /// Reply to a short dialogue situation.
  Conversation,
}

impl ExerciseType {
  pub const ALL: [ExerciseType; 4] = [
    ExerciseType::Translate,
    ExerciseType::FillBlank,
    ExerciseType::MultipleChoice,
    ExerciseType::Conversation,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      ExerciseType::Translate => "translate",
      ExerciseType::FillBlank => "fill-blank",
      ExerciseType::MultipleChoice => "multiple-choice",
      ExerciseType::Conversation => "conversation",
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      ExerciseType::Translate => "Vertalen",
      ExerciseType::FillBlank => "Invullen",
      ExerciseType::MultipleChoice => "Meerkeuzevraag",
      ExerciseType::Conversation => "Gesprek",
    }
  }

  pub fn from_wire(s: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|t| t.as_str() == s)
  }

  /// Only multiple-choice exercises carry answer options.
  pub fn has_options(&self) -> bool {
    matches!(self, ExerciseType::MultipleChoice)
  }
}

/// Number of options a multiple-choice exercise must offer.
pub const MULTIPLE_CHOICE_OPTIONS: usize = 4;

/// User-chosen settings feeding the prompt builder.
/// Mutable at any time; a change only affects the next generation request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
  pub source_language: String,
  pub target_language: String,
  #[serde(default)] pub difficulty: Difficulty,
  pub topic: String,
  #[serde(default)] pub exercise_type: ExerciseType,
}

impl Default for Configuration {
  fn default() -> Self {
    Self {
      source_language: "Nederlands".into(),
      target_language: "Engels".into(),
      difficulty: Difficulty::Beginner,
      topic: "algemeen".into(),
      exercise_type: ExerciseType::Translate,
    }
  }
}

impl Configuration {
  /// Identical source and target languages are accepted as a same-language task.
  pub fn is_same_language(&self) -> bool {
    self.source_language.trim().eq_ignore_ascii_case(self.target_language.trim())
  }
}

/// A single generated learning task. Immutable once parsed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
  pub id: String,
  #[serde(rename = "type")]
  pub exercise_type: ExerciseType,
  pub source_language: String,
  pub target_language: String,
  pub text: String,
  pub correct_answer: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub options: Option<Vec<String>>,
  pub difficulty: Difficulty,
  pub topic: String,
}

/// What the oracle said about a submitted answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationOutcome {
  pub is_correct: bool,
  /// Always within 0..=100.
  pub score: u8,
  /// May contain lightweight markdown; rendering is up to the client.
  pub feedback: String,
}

/// One graded attempt. Created once per successful evaluation and never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseResult {
  pub exercise: Exercise,
  pub user_answer: String,
  pub is_correct: bool,
  pub feedback: String,
  pub score: u8,
}

impl ExerciseResult {
  pub fn new(exercise: Exercise, user_answer: String, outcome: EvaluationOutcome) -> Self {
    Self {
      exercise,
      user_answer,
      is_correct: outcome.is_correct,
      feedback: outcome.feedback,
      score: outcome.score,
    }
  }
}
