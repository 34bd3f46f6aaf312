use super::Transcriber;
use crate::errors::{InterviewError, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

const STDERR_TAIL: usize = 512;

/// Runs a whisper-compatible command line per audio file and reads the
/// transcript from stdout.
#[derive(Debug, Clone)]
pub struct WhisperCli {
    pub binary: String,
    pub args: Vec<String>,
    pub audio_root: PathBuf,
}

impl WhisperCli {
    pub fn new(binary: impl Into<String>, args: Vec<String>, audio_root: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            args,
            audio_root: audio_root.into(),
        }
    }

    /// Maps an upload reference such as `/uploads/audio/x.webm` below the
    /// audio root. References escaping the root are rejected.
    pub fn resolve(&self, audio_ref: &str) -> Result<PathBuf> {
        let rel = Path::new(audio_ref.trim_start_matches('/'));
        if rel.as_os_str().is_empty()
            || rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(InterviewError::TranscriptionFailed(format!(
                "invalid audio reference '{}'",
                audio_ref
            )));
        }
        Ok(self.audio_root.join(rel))
    }
}

#[async_trait]
impl Transcriber for WhisperCli {
    async fn transcribe(&self, audio_ref: &str) -> Result<String> {
        let path = self.resolve(audio_ref)?;

        let output = Command::new(&self.binary)
            .arg(&path)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                InterviewError::TranscriptionFailed(format!(
                    "failed to spawn {}: {}",
                    self.binary, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = {
                let chars: Vec<char> = stderr.trim().chars().collect();
                let start = chars.len().saturating_sub(STDERR_TAIL);
                chars[start..].iter().collect()
            };
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".into());
            return Err(InterviewError::TranscriptionFailed(format!(
                "{} exited with {}: {}",
                self.binary, code, tail
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Err(InterviewError::TranscriptionFailed(format!(
                "empty transcript for {}",
                path.display()
            )));
        }
        Ok(text)
    }

    fn engine_name(&self) -> &'static str {
        "whisper"
    }
}
