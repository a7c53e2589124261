//! Bolo · English trainer backend for Bengali speakers
//!
//! - Axum HTTP + WebSocket API
//! - Answer evaluation (exact choice checks, word-builder tiles, scored pronunciation)
//! - Optional OpenAI integration for lessons, dictionary, translation and speech
//! - Learner progress (XP, streak, hearts) in a key-value store
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                    : u16 (default 3000)
//!   OPENAI_API_KEY          : enables OpenAI integration if present
//!   OPENAI_BASE_URL         : default "https://api.openai.com/v1"
//!   OPENAI_FAST_MODEL       : default "gpt-4o-mini"
//!   OPENAI_STRONG_MODEL     : default "gpt-4o"
//!   OPENAI_TRANSCRIBE_MODEL : default "whisper-1"
//!   OPENAI_TTS_MODEL        : default "tts-1"
//!   OPENAI_TTS_VOICE        : default "alloy"
//!   BOLO_CONFIG_PATH        : path to TOML config (prompts, progress rules, lesson bank)
//!   BOLO_PROGRESS_PATH      : JSON file for progress (in-memory if unset)
//!   LOG_LEVEL               : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT              : "pretty" (default) or "json"

mod telemetry;
mod util;
mod error;
mod domain;
mod normalize;
mod similarity;
mod evaluator;
mod capabilities;
mod config;
mod progress;
mod seeds;
mod state;
mod protocol;
mod logic;
mod openai;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared application state (stores, progress, OpenAI client, prompts).
  let state = Arc::new(AppState::new());

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "bolo_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "bolo_backend", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "bolo_backend", "Shutdown signal received");
}
