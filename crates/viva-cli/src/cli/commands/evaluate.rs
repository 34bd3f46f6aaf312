use super::{exit_codes, print_json, Context};
use crate::cli::args::EvaluateArgs;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use viva_core::config::{AppConfig, ScoringProvider};
use viva_core::providers::llm::{huggingface, FakeClient, HuggingFaceClient, LlmClient, OpenAIClient};
use viva_core::providers::transcription::{Transcriber, WhisperCli};
use viva_core::report::console::print_summary;
use viva_core::scoring::Scorer;
use viva_core::{EvaluationPipeline, InterviewError};

const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
const FAKE_REPLY: &str = "Score: 7\nJustification: Scripted reply from the fake scorer.";

pub async fn cmd_evaluate(ctx: &Context, args: EvaluateArgs) -> anyhow::Result<i32> {
    let provider = match args.scorer.as_deref() {
        Some(name) => parse_provider(name)?,
        None => ctx.cfg.scoring.provider,
    };
    let client = build_client(&ctx.cfg, provider)?;
    let transcriber = build_transcriber(&ctx.cfg);

    let pipeline = EvaluationPipeline::new(
        ctx.lifecycle.clone(),
        transcriber,
        Scorer::new(client),
        ctx.cfg.pipeline_policy(),
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!(event = "viva.cli.interrupted");
            on_signal.cancel();
        }
    });

    let summary = if args.retry {
        pipeline.retry_unresolved(&args.session_id, cancel).await?
    } else {
        pipeline.run(&args.session_id, cancel).await?
    };

    print_summary(&summary);
    print_json(&summary)?;

    if summary.failed > 0 {
        Ok(exit_codes::DOMAIN_ERROR)
    } else {
        Ok(exit_codes::OK)
    }
}

fn parse_provider(name: &str) -> anyhow::Result<ScoringProvider> {
    match name {
        "openai" => Ok(ScoringProvider::Openai),
        "huggingface" => Ok(ScoringProvider::Huggingface),
        "fake" => Ok(ScoringProvider::Fake),
        other => Err(InterviewError::Config(format!("unknown scoring provider '{}'", other)).into()),
    }
}

fn api_key(var: &str) -> anyhow::Result<String> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(InterviewError::Config(format!("{} is not set", var)).into()),
    }
}

fn build_client(cfg: &AppConfig, provider: ScoringProvider) -> anyhow::Result<Arc<dyn LlmClient>> {
    let s = &cfg.scoring;
    let client: Arc<dyn LlmClient> = match provider {
        ScoringProvider::Openai => {
            let model = s.model.clone().unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_string());
            let mut c = OpenAIClient::new(model, api_key("OPENAI_API_KEY")?, s.temperature, s.max_tokens);
            if let Some(endpoint) = &s.endpoint {
                c = c.with_endpoint(endpoint.clone());
            }
            Arc::new(c)
        }
        ScoringProvider::Huggingface => {
            let model = s
                .model
                .clone()
                .unwrap_or_else(|| huggingface::DEFAULT_MODEL.to_string());
            let mut c =
                HuggingFaceClient::new(model, api_key("HUGGINGFACE_API_KEY")?, s.temperature, s.max_tokens);
            if let Some(endpoint) = &s.endpoint {
                c = c.with_endpoint(endpoint.clone());
            }
            Arc::new(c)
        }
        ScoringProvider::Fake => Arc::new(FakeClient::new(FAKE_REPLY)),
    };
    Ok(client)
}

fn build_transcriber(cfg: &AppConfig) -> Arc<dyn Transcriber> {
    let t = &cfg.transcription;
    Arc::new(WhisperCli::new(
        t.binary.clone(),
        t.args.clone(),
        cfg.audio_root.clone(),
    ))
}
