use crate::engine::PipelinePolicy;
use crate::errors::{InterviewError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub version: u32,
    pub database: PathBuf,
    pub audio_root: PathBuf,
    pub transcription: TranscriptionSettings,
    pub scoring: ScoringSettings,
    pub pipeline: PipelineSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            database: PathBuf::from(".viva/viva.db"),
            audio_root: PathBuf::from("public"),
            transcription: TranscriptionSettings::default(),
            scoring: ScoringSettings::default(),
            pipeline: PipelineSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    pub binary: String,
    pub args: Vec<String>,
    pub timeout_seconds: u64,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            binary: "whisper".into(),
            args: vec!["--output_format".into(), "txt".into()],
            timeout_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringProvider {
    Openai,
    Huggingface,
    Fake,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub provider: ScoringProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            provider: ScoringProvider::Huggingface,
            model: None,
            temperature: 0.2,
            max_tokens: 512,
            timeout_seconds: 60,
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub parallel: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self { parallel: 4 }
    }
}

impl AppConfig {
    pub fn pipeline_policy(&self) -> PipelinePolicy {
        PipelinePolicy {
            parallel: self.pipeline.parallel.max(1),
            transcription_timeout: Duration::from_secs(self.transcription.timeout_seconds),
            scoring_timeout: Duration::from_secs(self.scoring.timeout_seconds),
        }
    }

    /// `VIVA_DB` overrides the database path.
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("VIVA_DB") {
            if !v.trim().is_empty() {
                self.database = PathBuf::from(v);
            }
        }
    }
}

/// Parses a YAML config. Unknown keys are reported on stderr, or rejected
/// when `strict` is set.
pub fn parse_config(raw: &str, origin: &str, strict: bool) -> Result<AppConfig> {
    let mut ignored_keys = std::collections::BTreeSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(raw);

    let cfg: AppConfig = serde_ignored::deserialize(deserializer, |path| {
        ignored_keys.insert(path.to_string());
    })
    .map_err(|e| InterviewError::Config(format!("failed to parse YAML ({}): {}", origin, e)))?;

    let meaningful_unknowns: Vec<_> = ignored_keys
        .iter()
        .filter(|k| !k.starts_with('_') && !k.starts_with("x-"))
        .collect();
    if !meaningful_unknowns.is_empty() {
        if strict {
            return Err(InterviewError::Config(format!(
                "Unknown fields detected in strict mode: {:?} (file: {})",
                meaningful_unknowns, origin
            )));
        }
        tracing::warn!(
            event = "viva.config.unknown_fields",
            fields = ?meaningful_unknowns,
            file = %origin,
        );
    }

    if cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(InterviewError::Config(format!(
            "unsupported config version {} (supported: {})",
            cfg.version, SUPPORTED_CONFIG_VERSION
        )));
    }
    if cfg.transcription.binary.trim().is_empty() {
        return Err(InterviewError::Config("transcription.binary must be set".into()));
    }

    Ok(cfg)
}

pub fn load_config(path: &Path, strict: bool) -> Result<AppConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        InterviewError::Config(format!("failed to read config {}: {}", path.display(), e))
    })?;
    let mut cfg = parse_config(&raw, &path.display().to_string(), strict)?;

    // Relative audio roots are taken from the config file's directory.
    if cfg.audio_root.is_relative() {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            cfg.audio_root = dir.join(&cfg.audio_root);
        }
    }
    Ok(cfg)
}

/// Loads `path` if it exists, otherwise returns defaults. Env overrides are
/// applied in both cases.
pub fn load_or_default(path: &Path, strict: bool) -> Result<AppConfig> {
    let mut cfg = if path.exists() {
        load_config(path, strict)?
    } else {
        AppConfig::default()
    };
    cfg.apply_env();
    Ok(cfg)
}

pub fn write_sample_config(path: &Path) -> Result<()> {
    std::fs::write(
        path,
        r#"version: 1
database: .viva/viva.db
audio_root: public
transcription:
  binary: whisper
  args: ["--output_format", "txt"]
  timeout_seconds: 300
scoring:
  # openai | huggingface | fake
  provider: huggingface
  model: mistralai/Mistral-7B-Instruct-v0.2
  temperature: 0.2
  max_tokens: 512
  timeout_seconds: 60
pipeline:
  parallel: 4
"#,
    )
    .map_err(|e| InterviewError::Config(format!("failed to write sample config: {}", e)))?;
    Ok(())
}
