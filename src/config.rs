//! Loading application configuration (defaults, catalog, prompt preambles) from TOML.
//!
//! See `AppConfig` for the expected schema. Every table is optional.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::domain::Configuration;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  /// Configuration a new session starts with.
  #[serde(default)]
  pub defaults: Configuration,
  #[serde(default)]
  pub catalog: Catalog,
  #[serde(default)]
  pub prompts: Prompts,
}

/// Languages and topics offered to clients. Advisory only: sessions accept
/// configurations outside the catalog.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Catalog {
  pub languages: Vec<String>,
  pub topics: Vec<String>,
}

impl Default for Catalog {
  fn default() -> Self {
    let languages = ["Nederlands", "Engels", "Frans", "Duits", "Spaans", "Italiaans", "Portugees"];
    let topics = [
      "algemeen", "reizen", "eten", "werk", "familie", "hobby's", "school", "winkelen", "gezondheid", "weer", "HR",
    ];
    Self {
      languages: languages.iter().map(|s| s.to_string()).collect(),
      topics: topics.iter().map(|s| s.to_string()).collect(),
    }
  }
}

/// Preambles placed in front of the generated prompts. The JSON schema block
/// that follows them is fixed; only tone and framing are tunable here.
/// Placeholders: `{source}`, `{target}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub generation_preamble: String,
  pub evaluation_preamble: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      generation_preamble: "You are a language-learning content generator. You write short, natural exercises for learners translating from {source} to {target}.".into(),
      evaluation_preamble: "You are a fair but precise language teacher grading a learner's answer. Accept minor punctuation and capitalisation differences and alternative correct phrasings. Write the feedback in {source}.".into(),
    }
  }
}

/// Attempt to load `AppConfig` from LINGO_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("LINGO_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_app_config(&s) {
      Ok(cfg) => {
        info!(target: "lingo_drill", %path, "Loaded app config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "lingo_drill", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "lingo_drill", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_app_config(s: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str::<AppConfig>(s)
}
