//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Evaluating submissions and folding verdicts into progress
//!   - Lesson completion and progress management (refill, reset, import/export)
//!   - Dictionary lookups and translation
//!   - Speech-to-text and text-to-speech through the injected capabilities

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use chrono::{Local, NaiveDate};
use tracing::{debug, error, info, instrument};

use crate::domain::{Attempt, DictionaryEntry, Sensitivity, Submission};
use crate::evaluator::evaluate;
use crate::error::ApiError;
use crate::progress::Progress;
use crate::protocol::{AnswerOut, SpeechOut};
use crate::state::AppState;
use crate::util::{is_bengali, trunc_for_log};

const DEFAULT_SPEECH_LOCALE: &str = "en-US";

fn today() -> NaiveDate {
  Local::now().date_naive()
}

#[instrument(level = "info", skip(state, submission), fields(%question_id, ?sensitivity))]
pub async fn submit_answer(
  state: &AppState,
  question_id: &str,
  submission: Submission,
  sensitivity: Sensitivity,
) -> Result<AnswerOut, ApiError> {
  let question = state
    .get_question(question_id)
    .await
    .ok_or_else(|| ApiError::NotFound(format!("question {}", question_id)))?;

  let attempt = Attempt::new(&question, submission, sensitivity)?;
  let verdict = evaluate(&attempt);
  debug!(target: "answer", kind = ?question.kind, correct = verdict.correct, score = ?verdict.similarity_score, "Attempt evaluated");

  let progress = state.progress.lock().await.record_answer(verdict.correct, today())?;
  if progress.is_out_of_hearts() {
    info!(target: "progress", "Learner is out of hearts");
  }

  Ok(AnswerOut {
    question_id: question.id.clone(),
    correct: verdict.correct,
    feedback_text: verdict.feedback_text,
    similarity_score: verdict.similarity_score,
    expected: question.correct_answer.clone(),
    progress,
  })
}

#[instrument(level = "info", skip(state), fields(%lesson_id))]
pub async fn complete_lesson(state: &AppState, lesson_id: &str) -> Result<Progress, ApiError> {
  if state.get_lesson(lesson_id).await.is_none() {
    return Err(ApiError::NotFound(format!("lesson {}", lesson_id)));
  }
  Ok(state.progress.lock().await.complete_lesson(today())?)
}

pub async fn get_progress(state: &AppState) -> Progress {
  state.progress.lock().await.load()
}

pub async fn export_progress(state: &AppState) -> Result<String, ApiError> {
  Ok(state.progress.lock().await.export_json()?)
}

#[instrument(level = "info", skip(state, data), fields(data_len = data.len()))]
pub async fn import_progress(state: &AppState, data: &str) -> Result<Progress, ApiError> {
  state
    .progress
    .lock()
    .await
    .import_json(data)
    .map_err(|e| ApiError::BadRequest(format!("progress import rejected: {}", e)))
}

pub async fn refill_hearts(state: &AppState) -> Result<Progress, ApiError> {
  Ok(state.progress.lock().await.refill_hearts()?)
}

pub async fn reset_progress(state: &AppState) -> Result<Progress, ApiError> {
  info!(target: "progress", "Progress reset requested");
  Ok(state.progress.lock().await.reset()?)
}

#[instrument(level = "info", skip(state), fields(%word))]
pub async fn do_dictionary(state: &AppState, word: &str) -> Result<(DictionaryEntry, &'static str), ApiError> {
  state
    .lookup_word(word)
    .await
    .ok_or_else(|| ApiError::NotFound(format!("dictionary entry for '{}'", word.trim())))
}

#[instrument(level = "info", skip(state, text), fields(text_len = text.len()))]
pub async fn do_translate(state: &AppState, text: &str) -> String {
  if let Some(oa) = &state.openai {
    match oa.translate(&state.prompts, text).await {
      Ok(t) => return t,
      Err(e) => error!(target: "bolo_backend", error = %e, "OpenAI translate failed; using stub fallback."),
    }
  }
  translate_stub(state, text)
}

#[instrument(level = "info", skip(state, audio_base64), fields(b64_len = audio_base64.len(), %mime))]
pub async fn do_speech_to_text(state: &AppState, audio_base64: &str, mime: &str) -> Result<Option<String>, ApiError> {
  let transcriber = state
    .transcriber
    .as_ref()
    .ok_or_else(|| ApiError::Unavailable("speech recognition is not configured".into()))?;

  let audio = B64
    .decode(audio_base64.trim())
    .map_err(|e| ApiError::BadRequest(format!("audio is not valid base64: {}", e)))?;
  if audio.is_empty() {
    return Ok(None);
  }

  let text = transcriber.transcribe(audio, mime).await?;
  debug!(target: "bolo_backend", heard = %text.as_deref().map(|t| trunc_for_log(t, 80)).unwrap_or_default(), "Transcript");
  Ok(text)
}

#[instrument(level = "info", skip(state, text), fields(text_len = text.len()))]
pub async fn do_text_to_speech(state: &AppState, text: &str, locale: Option<&str>) -> Result<SpeechOut, ApiError> {
  let speaker = state
    .speaker
    .as_ref()
    .ok_or_else(|| ApiError::Unavailable("speech synthesis is not configured".into()))?;

  let input = text.trim();
  if input.is_empty() {
    return Err(ApiError::BadRequest("nothing to speak".into()));
  }
  let locale = locale.unwrap_or(DEFAULT_SPEECH_LOCALE);
  let audio = speaker.speak(input, locale).await?;
  Ok(SpeechOut { audio_base64: B64.encode(&audio.bytes), mime: audio.mime })
}

// -------- Local fallbacks --------

/// Single English words found in the built-in dictionary translate to their
/// Bengali meaning; everything else gets a stub notice.
fn translate_stub(state: &AppState, text: &str) -> String {
  let s = text.trim();
  if s.is_empty() { return String::new(); }

  if !s.chars().any(is_bengali) {
    if let Some(entry) = state.seed_dictionary.get(&s.to_lowercase()) {
      return entry.meaning_bn.clone();
    }
  } else if let Some(entry) = state.seed_dictionary.values().find(|e| e.meaning_bn.split(", ").any(|m| m == s)) {
    return entry.word.clone();
  }

  "Translation not available (stub).".into()
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;

  use async_trait::async_trait;

  use crate::capabilities::{Speaker, SpokenAudio, Transcriber};
  use crate::error::ProviderError;
  use crate::state::tests::offline_state;

  struct FixedTranscriber(Option<&'static str>);

  #[async_trait]
  impl Transcriber for FixedTranscriber {
    async fn transcribe(&self, _audio: Vec<u8>, _mime: &str) -> Result<Option<String>, ProviderError> {
      Ok(self.0.map(String::from))
    }
  }

  struct EchoSpeaker;

  #[async_trait]
  impl Speaker for EchoSpeaker {
    async fn speak(&self, text: &str, locale: &str) -> Result<SpokenAudio, ProviderError> {
      Ok(SpokenAudio { mime: "audio/test".into(), bytes: format!("{locale}:{text}").into_bytes() })
    }
  }

  #[tokio::test]
  async fn correct_choice_earns_xp() {
    let state = offline_state();
    let out = submit_answer(&state, "g1", Submission::Choice("Good morning".into()), Sensitivity::Standard)
      .await
      .unwrap();
    assert!(out.correct);
    assert_eq!(out.expected, "Good morning");
    assert_eq!(out.progress.xp, 10);
    assert_eq!(out.progress.hearts, 5);
  }

  #[tokio::test]
  async fn wrong_tiles_cost_a_heart() {
    let state = offline_state();
    // THANKS from [N, K, T, H, A, S]; this spells "NKTHAS"
    let out = submit_answer(&state, "g5", Submission::Tiles(vec![0, 1, 2, 3, 4, 5]), Sensitivity::Standard)
      .await
      .unwrap();
    assert!(!out.correct);
    assert_eq!(out.progress.hearts, 4);

    let out = submit_answer(&state, "g5", Submission::Tiles(vec![2, 3, 4, 0, 1, 5]), Sensitivity::Standard)
      .await
      .unwrap();
    assert!(out.correct);
  }

  #[tokio::test]
  async fn pronunciation_reports_score() {
    let state = offline_state();
    let out = submit_answer(
      &state,
      "g4",
      Submission::Transcript(Some("Good morning how are you?".into())),
      Sensitivity::Strict,
    )
    .await
    .unwrap();
    assert!(out.correct);
    assert_eq!(out.similarity_score, Some(100.0));
    assert_eq!(out.feedback_text, "Perfect pronunciation!");
  }

  #[tokio::test]
  async fn bad_attempts_are_rejected_before_evaluation() {
    let state = offline_state();
    let err = submit_answer(&state, "g5", Submission::Tiles(vec![9]), Sensitivity::Standard).await.unwrap_err();
    assert!(matches!(err, ApiError::Attempt(_)));
    let err = submit_answer(&state, "nope", Submission::Choice("x".into()), Sensitivity::Standard).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    // rejected attempts never touch progress
    assert_eq!(get_progress(&state).await.answered, 0);
  }

  #[tokio::test]
  async fn lesson_completion_and_import() {
    let state = offline_state();
    assert!(matches!(complete_lesson(&state, "missing").await, Err(ApiError::NotFound(_))));
    let p = complete_lesson(&state, "l-routine").await.unwrap();
    assert_eq!(p.lessons_completed, 1);

    let exported = export_progress(&state).await.unwrap();
    reset_progress(&state).await.unwrap();
    assert_eq!(get_progress(&state).await.lessons_completed, 0);
    assert_eq!(import_progress(&state, &exported).await.unwrap().lessons_completed, 1);
    assert!(matches!(import_progress(&state, "[]").await, Err(ApiError::BadRequest(_))));
  }

  #[tokio::test]
  async fn speech_needs_configured_capabilities() {
    let state = offline_state();
    assert!(matches!(do_speech_to_text(&state, "AAAA", "audio/webm").await, Err(ApiError::Unavailable(_))));
    assert!(matches!(do_text_to_speech(&state, "hi", None).await, Err(ApiError::Unavailable(_))));
  }

  #[tokio::test]
  async fn speech_round_trip_through_fakes() {
    let mut state = offline_state();
    state.transcriber = Some(Arc::new(FixedTranscriber(Some("I am happy"))));
    state.speaker = Some(Arc::new(EchoSpeaker));

    let text = do_speech_to_text(&state, &B64.encode(b"RIFF"), "audio/wav").await.unwrap();
    assert_eq!(text.as_deref(), Some("I am happy"));
    assert!(matches!(do_speech_to_text(&state, "%%%", "audio/wav").await, Err(ApiError::BadRequest(_))));

    let out = do_text_to_speech(&state, " Hello ", None).await.unwrap();
    assert_eq!(out.mime, "audio/test");
    assert_eq!(B64.decode(out.audio_base64).unwrap(), b"en-US:Hello".to_vec());
  }

  #[tokio::test]
  async fn translate_stub_uses_builtin_dictionary() {
    let state = offline_state();
    assert_eq!(do_translate(&state, "Book").await, "বই");
    assert_eq!(do_translate(&state, "বই").await, "book");
    assert_eq!(do_translate(&state, "a whole sentence").await, "Translation not available (stub).");
  }
}
