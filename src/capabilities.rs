//! Speech capabilities injected into the application state.
//!
//! The answer evaluator never touches these: a `Transcriber` turns recorded
//! audio into the transcript that becomes a pronunciation submission, and a
//! `Speaker` reads prompts aloud for the learner.

use async_trait::async_trait;

use crate::error::ProviderError;

/// Synthesised speech ready to hand to a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpokenAudio {
  pub mime: String,
  pub bytes: Vec<u8>,
}

#[async_trait]
pub trait Transcriber: Send + Sync {
  /// Best-guess transcript of the audio; `None` when nothing was recognised.
  async fn transcribe(&self, audio: Vec<u8>, mime: &str) -> Result<Option<String>, ProviderError>;
}

#[async_trait]
pub trait Speaker: Send + Sync {
  /// Speak `text` in the given BCP-47 locale (e.g. "en-US", "bn-BD").
  async fn speak(&self, text: &str, locale: &str) -> Result<SpokenAudio, ProviderError>;
}
