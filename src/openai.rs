//! Minimal OpenAI client for our use-cases.
//!
//! Chat completions (plain text or a strict JSON object) drive lesson and
//! dictionary generation plus translation. The audio endpoints back the
//! `Transcriber` and `Speaker` capabilities.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::capabilities::{Speaker, SpokenAudio, Transcriber};
use crate::config::Prompts;
use crate::domain::{DictionaryEntry, Lesson, LessonSource, Question, QuestionKind};
use crate::error::ProviderError;
use crate::util::{fill_template, is_bengali};

const UA: &str = "bolo-backend/0.1";

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub fast_model: String,
  pub strong_model: String,
  pub transcribe_model: String,
  pub tts_model: String,
  pub tts_voice: String,
}

/// Lesson as the model returns it, before validation.
#[derive(Deserialize)]
struct GenLesson {
  title: String,
  #[serde(default)]
  intro: String,
  #[serde(default)]
  questions: Vec<GenQuestion>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenQuestion {
  kind: QuestionKind,
  prompt: String,
  #[serde(default)]
  choices: Vec<String>,
  correct_answer: String,
  #[serde(default)]
  explanation: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let var = |name: &str, default: &str| std::env::var(name).unwrap_or_else(|_| default.into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .ok()?;

    Some(Self {
      client,
      api_key,
      base_url: var("OPENAI_BASE_URL", "https://api.openai.com/v1"),
      fast_model: var("OPENAI_FAST_MODEL", "gpt-4o-mini"),
      strong_model: var("OPENAI_STRONG_MODEL", "gpt-4o"),
      transcribe_model: var("OPENAI_TRANSCRIBE_MODEL", "whisper-1"),
      tts_model: var("OPENAI_TTS_MODEL", "tts-1"),
      tts_voice: var("OPENAI_TTS_VOICE", "alloy"),
    })
  }

  async fn post_chat(&self, req: &ChatCompletionRequest) -> Result<String, ProviderError> {
    let url = format!("{}/chat/completions", self.base_url);
    let res = self.client.post(&url)
      .header(USER_AGENT, UA)
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(req).send().await?;
    let res = check_status(res).await?;

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    Ok(body.choices.into_iter().next()
      .and_then(|c| c.message.content)
      .unwrap_or_default())
  }

  /// Plain-text chat completion. Used for translation.
  #[instrument(level = "info", skip(self, system, user), fields(model = %model))]
  async fn chat_plain(&self, model: &str, system: &str, user: &str, temperature: f32) -> Result<String, ProviderError> {
    let req = ChatCompletionRequest::new(model, system, user, temperature, None);
    Ok(self.post_chat(&req).await?.trim().to_string())
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "info", skip(self, system, user), fields(model = %model))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(
    &self,
    model: &str,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<T, ProviderError> {
    let format = ResponseFormat { r#type: "json_object".into() };
    let req = ChatCompletionRequest::new(model, system, user, temperature, Some(format));
    let text = self.post_chat(&req).await?;
    Ok(serde_json::from_str::<T>(&text)?)
  }

  // --- High-level helpers (domain-specialized) ---

  /// Generate a lesson and keep only the questions that pass shape checks.
  #[instrument(level = "info", skip(self, prompts, topic, level), fields(%topic, %level, model = %self.strong_model))]
  pub async fn generate_lesson(&self, prompts: &Prompts, topic: &str, level: &str) -> Result<Lesson, ProviderError> {
    let user = fill_template(&prompts.lesson_user_template, &[("topic", topic), ("level", level)]);
    let start = Instant::now();
    let result = self.chat_json::<GenLesson>(&self.strong_model, &prompts.lesson_system, &user, 0.8).await;
    let elapsed = start.elapsed();

    let gen = match result {
      Ok(g) => {
        info!(?elapsed, "Model response received successfully");
        g
      }
      Err(e) => {
        error!(?elapsed, error = %e, "Model call failed during lesson generation");
        return Err(e);
      }
    };

    let lesson = lesson_from_generated(gen, topic, level)?;
    info!(
      lesson_id = %lesson.id,
      questions = lesson.questions.len(),
      title_preview = %lesson.title.chars().take(40).collect::<String>(),
      "Lesson successfully generated"
    );
    Ok(lesson)
  }

  #[instrument(level = "info", skip(self, prompts, word), fields(%word))]
  pub async fn lookup_word(&self, prompts: &Prompts, word: &str) -> Result<DictionaryEntry, ProviderError> {
    let user = fill_template(&prompts.dictionary_user_template, &[("word", word)]);
    let mut entry: DictionaryEntry = self.chat_json(&self.fast_model, &prompts.dictionary_system, &user, 0.2).await?;
    if entry.meaning_bn.trim().is_empty() {
      return Err(ProviderError::InvalidContent(format!("no meaning returned for '{word}'")));
    }
    entry.word = word.to_string();
    Ok(entry)
  }

  /// Bengali in → English out, anything else → Bengali.
  #[instrument(level = "info", skip(self, prompts, text), fields(text_len = text.len()))]
  pub async fn translate(&self, prompts: &Prompts, text: &str) -> Result<String, ProviderError> {
    let input = text.trim();
    if input.is_empty() { return Ok(String::new()); }
    let system = if input.chars().any(is_bengali) {
      &prompts.translate_to_en_system
    } else {
      &prompts.translate_to_bn_system
    };
    self.chat_plain(&self.fast_model, system, input, 0.0).await
  }
}

#[async_trait]
impl Transcriber for OpenAI {
  #[instrument(level = "info", skip(self, audio, mime), fields(audio_len = audio.len(), %mime, model = %self.transcribe_model))]
  async fn transcribe(&self, audio: Vec<u8>, mime: &str) -> Result<Option<String>, ProviderError> {
    #[derive(Deserialize)]
    struct Transcript { #[serde(default)] text: String }

    let url = format!("{}/audio/transcriptions", self.base_url);
    let file = reqwest::multipart::Part::bytes(audio)
      .file_name(format!("speech.{}", extension_for(mime)))
      .mime_str(mime)?;
    let form = reqwest::multipart::Form::new()
      .part("file", file)
      .text("model", self.transcribe_model.clone())
      .text("language", "en");

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, UA)
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .multipart(form).send().await?;
    let res = check_status(res).await?;
    let t: Transcript = res.json().await?;
    info!(elapsed = ?start.elapsed(), text_len = t.text.len(), "Transcription received");

    let text = t.text.trim().to_string();
    Ok(if text.is_empty() { None } else { Some(text) })
  }
}

#[async_trait]
impl Speaker for OpenAI {
  // Voices are multilingual, so the locale only matters for logging here.
  #[instrument(level = "info", skip(self, text, locale), fields(text_len = text.len(), %locale, model = %self.tts_model))]
  async fn speak(&self, text: &str, locale: &str) -> Result<SpokenAudio, ProviderError> {
    #[derive(Serialize)]
    struct SpeechRequest<'a> { model: &'a str, voice: &'a str, input: &'a str, response_format: &'a str }

    let url = format!("{}/audio/speech", self.base_url);
    let req = SpeechRequest { model: &self.tts_model, voice: &self.tts_voice, input: text, response_format: "mp3" };
    let res = self.client.post(&url)
      .header(USER_AGENT, UA)
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;
    let res = check_status(res).await?;
    let bytes = res.bytes().await?.to_vec();
    info!(audio_len = bytes.len(), "Speech synthesized");
    Ok(SpokenAudio { mime: "audio/mpeg".into(), bytes })
  }
}

/// Turn a generated lesson into a validated `Lesson`.
///
/// Word-builder tiles that do not spell the answer are rebuilt from the answer
/// and shuffled; a pronunciation question always carries its target as the
/// single choice. Anything still malformed is dropped.
fn lesson_from_generated(gen: GenLesson, topic: &str, level: &str) -> Result<Lesson, ProviderError> {
  let mut questions = Vec::with_capacity(gen.questions.len());
  for g in gen.questions {
    let mut question = Question {
      id: Uuid::new_v4().to_string(),
      kind: g.kind,
      prompt: g.prompt,
      choices: g.choices,
      correct_answer: g.correct_answer.trim().to_string(),
      explanation: g.explanation,
    };
    match question.kind {
      QuestionKind::WordBuilder => {
        question.correct_answer = question.correct_answer.to_uppercase();
        question.choices = question.choices.iter().map(|c| c.trim().to_uppercase()).collect();
        if question.check_shape().is_err() {
          question.choices = scrambled_tiles(&question.correct_answer);
        }
      }
      QuestionKind::Pronunciation => {
        question.choices = vec![question.correct_answer.clone()];
      }
      _ => {}
    }
    match question.check_shape() {
      Ok(()) => questions.push(question),
      Err(reason) => warn!(target: "lesson", kind = ?question.kind, %reason, "Dropping malformed generated question"),
    }
  }

  if questions.is_empty() {
    return Err(ProviderError::InvalidContent("lesson has no usable questions".into()));
  }

  Ok(Lesson {
    id: Uuid::new_v4().to_string(),
    level: level.to_string(),
    topic: topic.to_string(),
    title: gen.title,
    intro: gen.intro,
    source: LessonSource::Generated,
    questions,
  })
}

fn scrambled_tiles(word: &str) -> Vec<String> {
  let mut tiles: Vec<String> = word.chars().map(String::from).collect();
  tiles.shuffle(&mut rand::thread_rng());
  tiles
}

fn extension_for(mime: &str) -> &'static str {
  match mime.split(';').next().unwrap_or_default().trim() {
    "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
    "audio/mpeg" | "audio/mp3" => "mp3",
    "audio/ogg" => "ogg",
    "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "m4a",
    _ => "webm",
  }
}

async fn check_status(res: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
  if res.status().is_success() {
    return Ok(res);
  }
  let status = res.status().as_u16();
  let body = res.text().await.unwrap_or_default();
  let message = extract_openai_error(&body).unwrap_or(body);
  Err(ProviderError::Status { status, message })
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}

impl ChatCompletionRequest {
  fn new(model: &str, system: &str, user: &str, temperature: f32, response_format: Option<ResponseFormat>) -> Self {
    Self {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format,
    }
  }
}

#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn generated(json: &str) -> GenLesson {
    serde_json::from_str(json).unwrap()
  }

  #[test]
  fn keeps_valid_and_repairs_fixable_questions() {
    let gen = generated(r#"{
      "title": "Food",
      "intro": "খাবার",
      "questions": [
        {"kind": "fill_blank", "prompt": "I ___ rice.", "choices": ["eat","eats","ate","eaten"], "correctAnswer": "eat", "explanation": "x"},
        {"kind": "word_builder", "prompt": "ভাত", "choices": ["R","I","C"], "correctAnswer": "rice"},
        {"kind": "pronunciation", "prompt": "Say it", "choices": [], "correctAnswer": "I like fish."},
        {"kind": "translate_to_target", "prompt": "মাছ", "choices": ["fish","meat"], "correctAnswer": "fish"}
      ]
    }"#);
    let lesson = lesson_from_generated(gen, "food", "beginner").unwrap();

    assert_eq!(lesson.source, LessonSource::Generated);
    assert_eq!(lesson.questions.len(), 3);

    let wb = &lesson.questions[1];
    assert_eq!(wb.correct_answer, "RICE");
    assert_eq!(wb.choices.len(), 4);
    assert_eq!(wb.check_shape(), Ok(()));

    assert_eq!(lesson.questions[2].choices, vec!["I like fish.".to_string()]);
  }

  #[test]
  fn rejects_lesson_without_usable_questions() {
    let gen = generated(r#"{"title": "Empty", "questions": [
      {"kind": "fill_blank", "prompt": "?", "choices": ["a"], "correctAnswer": "b"}
    ]}"#);
    assert!(matches!(lesson_from_generated(gen, "t", "l"), Err(ProviderError::InvalidContent(_))));
  }

  #[test]
  fn error_body_extraction() {
    assert_eq!(extract_openai_error(r#"{"error":{"message":"bad key"}}"#), Some("bad key".into()));
    assert_eq!(extract_openai_error("gateway timeout"), None);
  }

  #[test]
  fn upload_extension_follows_mime() {
    assert_eq!(extension_for("audio/webm;codecs=opus"), "webm");
    assert_eq!(extension_for("audio/wav"), "wav");
    assert_eq!(extension_for("audio/mpeg"), "mp3");
  }
}
