//! Domain models: questions, attempts, verdicts, lessons and dictionary entries.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EvalError;

/// What kind of exercise is presented to the learner?
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
  /// Bengali prompt, pick the English rendering.
  TranslateToTarget,
  /// English prompt, pick the Bengali rendering.
  TranslateToSource,
  /// Sentence with a blank marker, pick the missing word.
  FillBlank,
  /// Read the target sentence aloud; judged from the speech transcript.
  Pronunciation,
  /// Arrange scrambled letter tiles into the target word.
  WordBuilder,
}

/// One exercise unit. Created by the content provider and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub id: String,
  pub kind: QuestionKind,
  pub prompt: String,
  pub choices: Vec<String>,
  pub correct_answer: String,
  #[serde(default)]
  pub explanation: String,
}

impl Question {
  /// Checks that content coming from a provider has the shape its kind needs.
  /// The evaluator itself never calls this; it trusts well-formed questions.
  pub fn check_shape(&self) -> Result<(), String> {
    if self.correct_answer.trim().is_empty() {
      return Err("empty correct answer".into());
    }
    match self.kind {
      QuestionKind::TranslateToTarget | QuestionKind::TranslateToSource | QuestionKind::FillBlank => {
        if self.choices.len() != 4 {
          return Err(format!("expected 4 choices, got {}", self.choices.len()));
        }
        if !self.choices.iter().any(|c| c == &self.correct_answer) {
          return Err("correct answer is not among the choices".into());
        }
        Ok(())
      }
      QuestionKind::Pronunciation => {
        if self.choices.len() != 1 || self.choices[0] != self.correct_answer {
          return Err("pronunciation needs exactly the target sentence as its single choice".into());
        }
        Ok(())
      }
      QuestionKind::WordBuilder => {
        if self.choices.iter().any(|c| c.chars().count() != 1) {
          return Err("word builder tiles must be single characters".into());
        }
        let mut tiles: Vec<String> = self.choices.iter().map(|c| c.to_lowercase()).collect();
        let mut letters: Vec<String> = self
          .correct_answer
          .chars()
          .map(|c| c.to_lowercase().collect())
          .collect();
        tiles.sort();
        letters.sort();
        if tiles != letters {
          return Err("tiles do not spell the correct answer".into());
        }
        Ok(())
      }
    }
  }
}

/// Learner-selected strictness for pronunciation scoring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
  Lenient,
  #[default]
  Standard,
  Strict,
}

impl Sensitivity {
  /// Minimum similarity (0-100) that passes.
  pub fn threshold(self) -> f64 {
    match self {
      Sensitivity::Lenient => 50.0,
      Sensitivity::Standard => 80.0,
      Sensitivity::Strict => 95.0,
    }
  }
}

/// What the learner handed in. Exactly one shape per question kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Submission {
  /// A selected choice string (translation and fill-blank kinds).
  Choice(String),
  /// Tile indices into `choices`, in the order the learner picked them.
  Tiles(Vec<usize>),
  /// Recognised speech; `None` when the recogniser heard nothing.
  Transcript(Option<String>),
}

impl Submission {
  fn label(&self) -> &'static str {
    match self {
      Submission::Choice(_) => "choice",
      Submission::Tiles(_) => "tiles",
      Submission::Transcript(_) => "transcript",
    }
  }
}

/// One evaluation request against a borrowed question.
///
/// Only the constructors below can build one, and they reject submissions
/// that do not fit the question, so `evaluate` never has to guess.
#[derive(Clone, Debug)]
pub struct Attempt<'q> {
  question: &'q Question,
  submission: Submission,
  sensitivity: Sensitivity,
}

impl<'q> Attempt<'q> {
  pub fn new(question: &'q Question, submission: Submission, sensitivity: Sensitivity) -> Result<Self, EvalError> {
    let fits = matches!(
      (question.kind, &submission),
      (
        QuestionKind::TranslateToTarget | QuestionKind::TranslateToSource | QuestionKind::FillBlank,
        Submission::Choice(_)
      ) | (QuestionKind::WordBuilder, Submission::Tiles(_))
        | (QuestionKind::Pronunciation, Submission::Transcript(_))
    );
    if !fits {
      return Err(EvalError::KindMismatch { kind: question.kind, submitted: submission.label() });
    }

    if let Submission::Tiles(indices) = &submission {
      let len = question.choices.len();
      let mut seen = vec![false; len];
      for &index in indices {
        if index >= len {
          return Err(EvalError::TileOutOfRange { index, len });
        }
        if seen[index] {
          return Err(EvalError::DuplicateTile { index });
        }
        seen[index] = true;
      }
    }

    Ok(Self { question, submission, sensitivity })
  }

  #[cfg(test)]
  pub fn choice(question: &'q Question, selected: impl Into<String>) -> Result<Self, EvalError> {
    Self::new(question, Submission::Choice(selected.into()), Sensitivity::default())
  }

  #[cfg(test)]
  pub fn tiles(question: &'q Question, indices: Vec<usize>) -> Result<Self, EvalError> {
    Self::new(question, Submission::Tiles(indices), Sensitivity::default())
  }

  #[cfg(test)]
  pub fn spoken(question: &'q Question, transcript: Option<String>, sensitivity: Sensitivity) -> Result<Self, EvalError> {
    Self::new(question, Submission::Transcript(transcript), sensitivity)
  }

  pub fn question(&self) -> &'q Question {
    self.question
  }

  pub fn submission(&self) -> &Submission {
    &self.submission
  }

  pub fn sensitivity(&self) -> Sensitivity {
    self.sensitivity
  }
}

/// Result of evaluating one attempt.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
  pub correct: bool,
  pub feedback_text: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub similarity_score: Option<f64>,
}

/// Where did a lesson come from?
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LessonSource {
  LocalBank, // from the TOML lesson bank
  Generated, // produced by the model and cached in memory
  Seed,      // built-in seeds (last resort)
}

impl fmt::Display for LessonSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      LessonSource::LocalBank => "local_bank",
      LessonSource::Generated => "generated",
      LessonSource::Seed => "seed",
    })
  }
}

/// A short teaching text followed by a run of questions.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
  pub id: String,
  pub level: String, // free-form (e.g. "beginner", "intermediate")
  pub topic: String,
  pub title: String,
  /// Teaching notes in Bengali shown before the first question.
  #[serde(default)]
  pub intro: String,
  pub source: LessonSource,
  pub questions: Vec<Question>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UsageExample {
  pub en: String,
  pub bn: String,
}

/// Dictionary content for one English word, explained for Bengali speakers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryEntry {
  #[serde(default)]
  pub word: String,
  pub meaning_bn: String,
  #[serde(default)]
  pub part_of_speech: String,
  /// Pronunciation guide written in Bengali script.
  #[serde(default)]
  pub pronunciation: String,
  #[serde(default)]
  pub examples: Vec<UsageExample>,
  #[serde(default)]
  pub synonyms: Vec<String>,
}
