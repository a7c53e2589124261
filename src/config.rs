//! Loading application configuration (prompts, progress rules, optional lesson bank) from TOML.
//!
//! See `AppConfig`, `Prompts` and `ProgressSettings` for the expected schema.

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::QuestionKind;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub progress: ProgressSettings,
  #[serde(default)]
  pub lessons: Vec<LessonCfg>,
}

/// Lesson entry accepted in the TOML bank.
#[derive(Clone, Debug, Deserialize)]
pub struct LessonCfg {
  #[serde(default)] pub id: Option<String>,
  pub level: String,
  pub topic: String,
  #[serde(default)] pub title: Option<String>,
  #[serde(default)] pub intro: String,
  #[serde(default)] pub questions: Vec<QuestionCfg>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct QuestionCfg {
  #[serde(default)] pub id: Option<String>,
  pub kind: QuestionKind,
  pub prompt: String,
  #[serde(default)] pub choices: Vec<String>,
  pub correct_answer: String,
  #[serde(default)] pub explanation: String,
}

/// Rules for XP, hearts and where progress is stored.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ProgressSettings {
  pub max_hearts: u32,
  pub xp_per_correct: u32,
  pub lesson_bonus_xp: u32,
  /// JSON file used as the progress store; in-memory when unset.
  /// BOLO_PROGRESS_PATH overrides it.
  pub store_path: Option<String>,
}

impl Default for ProgressSettings {
  fn default() -> Self {
    Self { max_hearts: 5, xp_per_correct: 10, lesson_bonus_xp: 20, store_path: None }
  }
}

/// Prompts used by the model client. Defaults target Bengali-speaking English learners.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  // Lesson generation
  pub lesson_system: String,
  pub lesson_user_template: String,
  // Dictionary
  pub dictionary_system: String,
  pub dictionary_user_template: String,
  // Translation helpers
  pub translate_to_en_system: String,
  pub translate_to_bn_system: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      lesson_system: "You write short English lessons for Bengali-speaking learners. Respond ONLY with strict JSON.".into(),
      lesson_user_template: "Create one English lesson about '{topic}' for a {level} learner whose native language is Bengali.\n\
Return JSON: {\"title\": string, \"intro\": string (teaching notes in Bengali), \"questions\": [ ... ]}.\n\
Each question: {\"kind\": one of translate_to_target|translate_to_source|fill_blank|pronunciation|word_builder, \"prompt\": string, \"choices\": [string], \"correctAnswer\": string, \"explanation\": string (Bengali)}.\n\
Rules: translate_to_target shows Bengali and offers 4 English options; translate_to_source shows English and offers 4 Bengali options; \
fill_blank uses ___ in the prompt and offers 4 words; pronunciation has choices = [the English sentence] and correctAnswer = that sentence; \
word_builder has correctAnswer = one UPPERCASE English word and choices = its letters, scrambled, one letter per entry.\n\
Write 6 to 8 questions and use every kind at least once.".into(),
      dictionary_system: "You are an English-Bengali dictionary. Respond ONLY with strict JSON.".into(),
      dictionary_user_template: "Word: {word}\nReturn JSON: {\"word\": string, \"meaningBn\": string, \"partOfSpeech\": string, \"pronunciation\": string (how to say it, written in Bengali script), \"examples\": [{\"en\": string, \"bn\": string}] (2 items), \"synonyms\": [string]}.".into(),
      translate_to_en_system: "Translate the user's Bengali text to natural English. Output ONLY the translation text.".into(),
      translate_to_bn_system: "Translate the user's English text to natural Bengali. Output ONLY the translation text.".into(),
    }
  }
}

/// Parse a TOML document into `AppConfig`.
pub fn parse_app_config(text: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str::<AppConfig>(text)
}

/// Attempt to load `AppConfig` from BOLO_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("BOLO_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_app_config(&s) {
      Ok(cfg) => {
        info!(target: "bolo_backend", %path, lessons = cfg.lessons.len(), "Loaded app config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "bolo_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "bolo_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_document_uses_defaults() {
    let cfg = parse_app_config("").unwrap();
    assert_eq!(cfg.progress.max_hearts, 5);
    assert_eq!(cfg.progress.xp_per_correct, 10);
    assert!(cfg.lessons.is_empty());
    assert!(cfg.prompts.lesson_user_template.contains("{topic}"));
  }

  #[test]
  fn partial_sections_keep_remaining_defaults() {
    let cfg = parse_app_config(
      r#"
      [progress]
      max_hearts = 3

      [prompts]
      dictionary_system = "Be brief."
      "#,
    )
    .unwrap();
    assert_eq!(cfg.progress.max_hearts, 3);
    assert_eq!(cfg.progress.lesson_bonus_xp, 20);
    assert_eq!(cfg.prompts.dictionary_system, "Be brief.");
    assert!(cfg.prompts.translate_to_en_system.starts_with("Translate"));
  }

  #[test]
  fn lesson_bank_entries() {
    let cfg = parse_app_config(
      r#"
      [[lessons]]
      level = "beginner"
      topic = "colours"
      intro = "রঙের নাম"

      [[lessons.questions]]
      kind = "word_builder"
      prompt = "লাল"
      choices = ["E", "R", "D"]
      correct_answer = "RED"
      "#,
    )
    .unwrap();
    assert_eq!(cfg.lessons.len(), 1);
    let q = &cfg.lessons[0].questions[0];
    assert_eq!(q.kind, QuestionKind::WordBuilder);
    assert_eq!(q.correct_answer, "RED");
    assert!(q.explanation.is_empty());
  }
}
