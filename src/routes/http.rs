//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Query, State},
  http::header,
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

const DEFAULT_LEVEL: &str = "beginner";

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state), fields(level = %q.level.as_deref().unwrap_or(DEFAULT_LEVEL), topic = ?q.topic))]
pub async fn http_get_lesson(
  State(state): State<Arc<AppState>>,
  Query(q): Query<LessonQuery>,
) -> impl IntoResponse {
  let level = q.level.unwrap_or_else(|| DEFAULT_LEVEL.into());
  let (lesson, origin) = state.choose_lesson(q.topic.as_deref(), &level).await;
  info!(target: "lesson", %level, id = %lesson.id, %origin, "HTTP lesson served");
  Json(to_out(&lesson))
}

#[instrument(level = "info", skip(state, body), fields(%body.lesson_id))]
pub async fn http_post_complete_lesson(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CompleteLessonIn>,
) -> Result<impl IntoResponse, ApiError> {
  let progress = complete_lesson(&state, &body.lesson_id).await?;
  Ok(Json(progress))
}

#[instrument(level = "info", skip(state, body), fields(%body.question_id, sensitivity = ?body.sensitivity))]
pub async fn http_post_answer(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AnswerIn>,
) -> Result<impl IntoResponse, ApiError> {
  let out = submit_answer(&state, &body.question_id, body.submission, body.sensitivity).await?;
  info!(target: "answer", id = %out.question_id, correct = %out.correct, score = ?out.similarity_score, "HTTP answer evaluated");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state), fields(%q.word))]
pub async fn http_get_dictionary(
  State(state): State<Arc<AppState>>,
  Query(q): Query<DictionaryQuery>,
) -> Result<impl IntoResponse, ApiError> {
  let (entry, source) = do_dictionary(&state, &q.word).await?;
  Ok(Json(DictionaryOut { entry, source }))
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len()))]
pub async fn http_post_translate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<TranslateIn>,
) -> impl IntoResponse {
  let translation = do_translate(&state, &body.text).await;
  Json(TranslateOut { translation })
}

#[instrument(level = "info", skip(state, body), fields(b64_len = body.audio_base64.len(), mime = %body.mime))]
pub async fn http_post_speech_to_text(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SpeechToTextIn>,
) -> Result<impl IntoResponse, ApiError> {
  let text = do_speech_to_text(&state, &body.audio_base64, &body.mime).await?;
  Ok(Json(SpeechToTextOut { text }))
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len()))]
pub async fn http_post_text_to_speech(
  State(state): State<Arc<AppState>>,
  Json(body): Json<TextToSpeechIn>,
) -> Result<impl IntoResponse, ApiError> {
  let out = do_text_to_speech(&state, &body.text, body.locale.as_deref()).await?;
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_progress(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(get_progress(&state).await)
}

/// Progress as a downloadable JSON file.
#[instrument(level = "info", skip(state))]
pub async fn http_get_progress_export(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
  let data = export_progress(&state).await?;
  Ok((
    [
      (header::CONTENT_TYPE, "application/json"),
      (header::CONTENT_DISPOSITION, "attachment; filename=\"bolo-progress.json\""),
    ],
    data,
  ))
}

/// Accepts the body of a previous export as-is.
#[instrument(level = "info", skip(state, body), fields(body_len = body.len()))]
pub async fn http_post_progress_import(
  State(state): State<Arc<AppState>>,
  body: String,
) -> Result<impl IntoResponse, ApiError> {
  let progress = import_progress(&state, &body).await?;
  Ok(Json(progress))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_progress_refill(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(refill_hearts(&state).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_progress_reset(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(reset_progress(&state).await?))
}
