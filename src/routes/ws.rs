//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::error::ApiError;
use crate::logic::*;
use crate::protocol::{to_out, ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "bolo_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "bolo_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = reply_to_text(&txt, &state).await;

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "bolo_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "bolo_backend", "WebSocket disconnected");
}

/// Parse, dispatch, and build the reply for one text frame.
async fn reply_to_text(txt: &str, state: &AppState) -> ServerWsMessage {
  match serde_json::from_str::<ClientWsMessage>(txt) {
    Ok(incoming) => {
      debug!(target: "bolo_backend", "WS received: {:?}", &incoming);
      handle_client_ws(incoming, state).await.unwrap_or_else(|e| ServerWsMessage::Error { message: e.to_string() })
    }
    Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
  }
}

#[instrument(level = "info", skip(msg, state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> Result<ServerWsMessage, ApiError> {
  let reply = match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::NewLesson { topic, level } => {
      let (lesson, origin) = state.choose_lesson(topic.as_deref(), &level).await;
      info!(target: "lesson", %level, id = %lesson.id, %origin, "WS new_lesson served");
      ServerWsMessage::Lesson { lesson: to_out(&lesson) }
    }

    ClientWsMessage::SubmitAnswer { question_id, submission, sensitivity } => {
      let out = submit_answer(state, &question_id, submission, sensitivity).await?;
      info!(target: "answer", id = %question_id, correct = %out.correct, "WS submit_answer evaluated");
      ServerWsMessage::AnswerResult(out)
    }

    ClientWsMessage::CompleteLesson { lesson_id } => {
      ServerWsMessage::Progress { progress: complete_lesson(state, &lesson_id).await? }
    }

    ClientWsMessage::Dictionary { word } => {
      let (entry, _) = do_dictionary(state, &word).await?;
      ServerWsMessage::Dictionary { entry }
    }

    ClientWsMessage::TranslateInput { text } => {
      let translation = do_translate(state, &text).await;
      ServerWsMessage::Translate { text, translation }
    }

    ClientWsMessage::SpeechToTextInput { audio_base64, mime } => {
      ServerWsMessage::SpeechToText { text: do_speech_to_text(state, &audio_base64, &mime).await? }
    }

    ClientWsMessage::TextToSpeech { text, locale } => {
      ServerWsMessage::Speech(do_text_to_speech(state, &text, locale.as_deref()).await?)
    }

    ClientWsMessage::GetProgress => ServerWsMessage::Progress { progress: get_progress(state).await },
    ClientWsMessage::RefillHearts => ServerWsMessage::Progress { progress: refill_hearts(state).await? },
    ClientWsMessage::ResetProgress => ServerWsMessage::Progress { progress: reset_progress(state).await? },
    ClientWsMessage::ImportProgress { data } => {
      ServerWsMessage::Progress { progress: import_progress(state, &data).await? }
    }
  };
  Ok(reply)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::Value;

  use crate::state::tests::offline_state;

  async fn roundtrip(state: &AppState, msg: &str) -> Value {
    serde_json::to_value(reply_to_text(msg, state).await).unwrap()
  }

  #[tokio::test]
  async fn ping_pong() {
    let state = offline_state();
    assert_eq!(roundtrip(&state, r#"{"type":"ping"}"#).await["type"], "pong");
  }

  #[tokio::test]
  async fn submit_answer_over_ws() {
    let state = offline_state();
    let reply = roundtrip(
      &state,
      r#"{"type":"submit_answer","questionId":"r2","submission":{"type":"choice","value":"goes"}}"#,
    )
    .await;
    assert_eq!(reply["type"], "answer_result");
    assert_eq!(reply["correct"], true);
    assert_eq!(reply["progress"]["xp"], 10);
  }

  #[tokio::test]
  async fn errors_become_error_messages() {
    let state = offline_state();
    let reply = roundtrip(&state, "not json").await;
    assert_eq!(reply["type"], "error");
    assert!(reply["message"].as_str().unwrap().starts_with("Invalid JSON"));

    let reply = roundtrip(&state, r#"{"type":"dictionary","word":"qwertyuiop"}"#).await;
    assert_eq!(reply["type"], "error");
  }

  #[tokio::test]
  async fn progress_messages() {
    let state = offline_state();
    let reply = roundtrip(&state, r#"{"type":"complete_lesson","lessonId":"l-greetings"}"#).await;
    assert_eq!(reply["type"], "progress");
    assert_eq!(reply["progress"]["lessonsCompleted"], 1);
    let reply = roundtrip(&state, r#"{"type":"reset_progress"}"#).await;
    assert_eq!(reply["progress"]["xp"], 0);
  }
}
