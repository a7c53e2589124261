//! Error types: attempt contract violations, provider failures, and the HTTP-facing error.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::domain::QuestionKind;

/// A caller tried to build an `Attempt` that breaks the question's contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
  #[error("a {submitted} submission cannot answer a {kind:?} question")]
  KindMismatch { kind: QuestionKind, submitted: &'static str },

  #[error("tile index {index} is out of range ({len} tiles available)")]
  TileOutOfRange { index: usize, len: usize },

  #[error("tile index {index} was selected more than once")]
  DuplicateTile { index: usize },
}

/// Failures talking to the content/speech provider or to a progress store.
#[derive(Debug, Error)]
pub enum ProviderError {
  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("provider returned {status}: {message}")]
  Status { status: u16, message: String },

  #[error("JSON parse error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("generated content rejected: {0}")]
  InvalidContent(String),

  #[error("storage error: {0}")]
  Storage(#[from] std::io::Error),
}

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Bad request: {0}")]
  BadRequest(String),

  #[error("Invalid attempt: {0}")]
  Attempt(#[from] EvalError),

  #[error("Unavailable: {0}")]
  Unavailable(String),

  #[error("Upstream error: {0}")]
  Provider(#[from] ProviderError),
}

#[derive(Serialize)]
struct ErrorResponse {
  error: String,
  message: String,
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, error_type) = match &self {
      ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
      ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
      ApiError::Attempt(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_attempt"),
      ApiError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
      ApiError::Provider(_) => (StatusCode::BAD_GATEWAY, "provider_error"),
    };

    let body = Json(ErrorResponse {
      error: error_type.to_string(),
      message: self.to_string(),
    });

    (status, body).into_response()
  }
}
