//! Prompt construction for the two oracle calls: exercise generation and answer evaluation.
//!
//! The schema blocks at the end of each prompt are the contract with `parser`:
//! every field is named exactly as the parser expects it. Bump the version tag
//! whenever either side changes.

use std::fmt::Write;

use crate::config::Prompts;
use crate::domain::{Configuration, Exercise, ExerciseType, MULTIPLE_CHOICE_OPTIONS};
use crate::util::fill_template;

pub const EXERCISE_SCHEMA_VERSION: &str = "exercise.v1";
pub const EVALUATION_SCHEMA_VERSION: &str = "evaluation.v1";

const HR_FOCUS: &[&str] = &[
  "job interviews",
  "personnel policy",
  "terms of employment",
  "performance reviews",
  "team building",
  "recruitment",
  "onboarding",
  "feedback conversations",
  "leave and sick leave",
  "diversity and inclusion",
];

/// Builds prompt text from configurable preambles plus the fixed schema blocks.
#[derive(Clone, Debug, Default)]
pub struct PromptBuilder {
  prompts: Prompts,
}

impl PromptBuilder {
  pub fn new(prompts: Prompts) -> Self {
    Self { prompts }
  }

  pub fn generation(&self, config: &Configuration) -> String {
    let source = config.source_language.as_str();
    let target = config.target_language.as_str();
    let kind = config.exercise_type;
    let difficulty = config.difficulty.as_str();

    let mut out = fill_template(&self.prompts.generation_preamble, &[("source", source), ("target", target)]);
    out.push_str("\n\n");
    let _ = writeln!(out, "Generate one {} exercise ({}) from {} to {}.", kind.label(), kind.as_str(), source, target);
    out.push('\n');
    out.push_str("Specification:\n");
    let _ = writeln!(out, "- Level: {}", difficulty);
    let _ = writeln!(out, "- Topic: {}", config.topic);
    let _ = writeln!(out, "- Type: {}", kind.as_str());
    out.push('\n');
    out.push_str(&task_instructions(kind, source, target));

    if config.topic.trim().eq_ignore_ascii_case("hr") {
      out.push_str("\n\nFocus on HR-related subjects such as:\n");
      for subject in HR_FOCUS {
        let _ = writeln!(out, "- {}", subject);
      }
    }

    out.push_str("\n\n");
    let _ = writeln!(
      out,
      "Respond with exactly one JSON object (schema {}) and nothing else. Use exactly these field names:",
      EXERCISE_SCHEMA_VERSION
    );
    out.push_str("{\n");
    let _ = writeln!(out, "  \"type\": \"{}\",", kind.as_str());
    let _ = writeln!(out, "  \"sourceLanguage\": \"{}\",", json_escape(source));
    let _ = writeln!(out, "  \"targetLanguage\": \"{}\",", json_escape(target));
    out.push_str("  \"text\": \"the sentence or question shown to the learner\",\n");
    out.push_str("  \"correctAnswer\": \"the correct answer\",\n");
    if kind.has_options() {
      out.push_str("  \"options\": [\"option 1\", \"option 2\", \"option 3\", \"option 4\"],\n");
    }
    let _ = writeln!(out, "  \"difficulty\": \"{}\",", difficulty);
    let _ = writeln!(out, "  \"topic\": \"{}\"", json_escape(&config.topic));
    out.push('}');
    if kind.has_options() {
      let _ = write!(
        out,
        "\n\"options\" must contain exactly {} strings and \"correctAnswer\" must be one of them.",
        MULTIPLE_CHOICE_OPTIONS
      );
    }
    out
  }

  pub fn evaluation(&self, exercise: &Exercise, user_answer: &str) -> String {
    let source = exercise.source_language.as_str();
    let target = exercise.target_language.as_str();

    let mut out = fill_template(&self.prompts.evaluation_preamble, &[("source", source), ("target", target)]);
    out.push_str("\n\nEvaluate this answer to a language exercise.\n\n");
    let _ = writeln!(out, "Exercise type: {}", exercise.exercise_type.as_str());
    let _ = writeln!(out, "From {} to {}", source, target);
    let _ = writeln!(out, "Exercise: {}", exercise.text);
    if let Some(options) = &exercise.options {
      for (i, option) in options.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", option_letter(i), option);
      }
    }
    let _ = writeln!(out, "Correct answer: {}", exercise.correct_answer);
    let _ = writeln!(out, "Student answer: {}", user_answer);
    out.push('\n');
    let _ = writeln!(
      out,
      "Respond with exactly one JSON object (schema {}) and nothing else. Use exactly these field names:",
      EVALUATION_SCHEMA_VERSION
    );
    out.push_str("{\n");
    out.push_str("  \"isCorrect\": true or false,\n");
    out.push_str("  \"score\": integer from 0 to 100,\n");
    out.push_str("  \"feedback\": \"detailed feedback explaining why the answer is right or wrong, with points for improvement (markdown allowed)\"\n");
    out.push('}');
    out
  }
}

/// Generation prompt with the default preambles.
pub fn build_generation_prompt(config: &Configuration) -> String {
  PromptBuilder::default().generation(config)
}

/// Evaluation prompt with the default preambles.
pub fn build_evaluation_prompt(exercise: &Exercise, user_answer: &str) -> String {
  PromptBuilder::default().evaluation(exercise, user_answer)
}

fn task_instructions(kind: ExerciseType, source: &str, target: &str) -> String {
  match kind {
    ExerciseType::Translate => {
      format!("Give one sentence in {source} that the learner must translate into {target}.")
    }
    ExerciseType::FillBlank => format!(
      "Give one sentence in {target} with exactly one word left out and replaced by ___. \
       Include the {source} version of the sentence in the text as context. \
       The correct answer is the missing word."
    ),
    ExerciseType::MultipleChoice => format!(
      "Give one sentence in {source} and {MULTIPLE_CHOICE_OPTIONS} possible translations in {target}, exactly one of which is correct."
    ),
    ExerciseType::Conversation => format!(
      "Describe a short dialogue situation in {source} and ask the learner for a fitting reply in {target}. \
       The correct answer is one good example reply."
    ),
  }
}

fn option_letter(i: usize) -> char {
  (b'A' + (i % 26) as u8) as char
}

/// Configuration strings are echoed inside a JSON example; keep it valid.
fn json_escape(s: &str) -> String {
  let quoted = serde_json::Value::String(s.to_string()).to_string();
  quoted[1..quoted.len() - 1].to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Difficulty;

  fn config(kind: ExerciseType, topic: &str) -> Configuration {
    Configuration {
      source_language: "Nederlands".into(),
      target_language: "Engels".into(),
      difficulty: Difficulty::Intermediate,
      topic: topic.into(),
      exercise_type: kind,
    }
  }

  #[test]
  fn generation_prompt_names_every_configured_value() {
    for kind in ExerciseType::ALL {
      for difficulty in Difficulty::ALL {
        let cfg = Configuration { difficulty, ..config(kind, "gezondheid") };
        let p = build_generation_prompt(&cfg);
        assert!(p.contains("Nederlands"));
        assert!(p.contains("Engels"));
        assert!(p.contains("gezondheid"));
        assert!(p.contains(difficulty.as_str()));
        assert!(p.contains(kind.as_str()));
        assert!(p.contains(EXERCISE_SCHEMA_VERSION));
      }
    }
  }

  #[test]
  fn generation_schema_lists_exact_field_names() {
    let p = build_generation_prompt(&config(ExerciseType::Translate, "reizen"));
    for field in ["\"type\"", "\"sourceLanguage\"", "\"targetLanguage\"", "\"text\"", "\"correctAnswer\"", "\"difficulty\"", "\"topic\""] {
      assert!(p.contains(field), "missing {field}");
    }
    assert!(!p.contains("\"options\""));
  }

  #[test]
  fn options_only_for_multiple_choice() {
    let p = build_generation_prompt(&config(ExerciseType::MultipleChoice, "eten"));
    assert!(p.contains("\"options\""));
    assert!(p.contains("exactly 4 strings"));
    for kind in [ExerciseType::Translate, ExerciseType::FillBlank, ExerciseType::Conversation] {
      assert!(!build_generation_prompt(&config(kind, "eten")).contains("\"options\""));
    }
  }

  #[test]
  fn hr_topic_adds_focus_block() {
    assert!(build_generation_prompt(&config(ExerciseType::Translate, "HR")).contains("onboarding"));
    assert!(!build_generation_prompt(&config(ExerciseType::Translate, "werk")).contains("onboarding"));
  }

  #[test]
  fn quotes_in_topic_stay_valid_json_in_the_example() {
    let p = build_generation_prompt(&config(ExerciseType::Translate, "hobby's \"buiten\""));
    assert!(p.contains(r#""topic": "hobby's \"buiten\"""#));
  }

  #[test]
  fn evaluation_prompt_carries_exercise_and_answer() {
    let ex = Exercise {
      id: "1".into(),
      exercise_type: ExerciseType::MultipleChoice,
      source_language: "Nederlands".into(),
      target_language: "Engels".into(),
      text: "Ik heb honger".into(),
      correct_answer: "I am hungry".into(),
      options: Some(vec!["I am hungry".into(), "I have hunger".into(), "I am angry".into(), "I was hungry".into()]),
      difficulty: Difficulty::Beginner,
      topic: "eten".into(),
    };
    let p = build_evaluation_prompt(&ex, "I am angry");
    assert!(p.contains("Exercise: Ik heb honger"));
    assert!(p.contains("Correct answer: I am hungry"));
    assert!(p.contains("Student answer: I am angry"));
    assert!(p.contains("  C. I am angry"));
    for field in ["\"isCorrect\"", "\"score\"", "\"feedback\""] {
      assert!(p.contains(field));
    }
    assert!(p.contains(EVALUATION_SCHEMA_VERSION));
    assert!(p.contains("Write the feedback in Nederlands."));
  }

  #[test]
  fn custom_preamble_is_templated() {
    let builder = PromptBuilder::new(Prompts {
      generation_preamble: "Make it fun: {source} -> {target}.".into(),
      ..Prompts::default()
    });
    let p = builder.generation(&config(ExerciseType::Conversation, "weer"));
    assert!(p.starts_with("Make it fun: Nederlands -> Engels."));
  }
}
