use crate::errors::Result;
use async_trait::async_trait;

/// Speech-to-text engine. `audio_ref` is the opaque reference handed over by
/// the upload collaborator.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_ref: &str) -> Result<String>;
    fn engine_name(&self) -> &'static str;
}

pub mod fake;
pub mod whisper;

pub use fake::FakeTranscriber;
pub use whisper::WhisperCli;
