use super::Transcriber;
use crate::errors::{InterviewError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Scripted transcriber. Unscripted references transcribe to
/// `"answer for <audio_ref>"`.
#[derive(Default)]
pub struct FakeTranscriber {
    scripted: HashMap<String, std::result::Result<String, String>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeTranscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transcript(mut self, audio_ref: &str, text: &str) -> Self {
        self.scripted.insert(audio_ref.to_string(), Ok(text.to_string()));
        self
    }

    pub fn with_failure(mut self, audio_ref: &str, reason: &str) -> Self {
        self.scripted
            .insert(audio_ref.to_string(), Err(reason.to_string()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, audio_ref: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        match self.scripted.get(audio_ref) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(reason)) => Err(InterviewError::TranscriptionFailed(reason.clone())),
            None => Ok(format!("answer for {}", audio_ref)),
        }
    }

    fn engine_name(&self) -> &'static str {
        "fake"
    }
}
