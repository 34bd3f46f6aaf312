use super::{LlmClient, LlmResponse};
use async_trait::async_trait;
use serde_json::json;

pub const DEFAULT_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";
const INFERENCE_BASE: &str = "https://api-inference.huggingface.co/models";

/// Text-generation client for the Hugging Face inference API.
///
/// Instruct models expect the `[INST]` wrapper, so the prompt is framed here
/// rather than by the caller.
pub struct HuggingFaceClient {
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub endpoint: String,
    pub client: reqwest::Client,
}

impl HuggingFaceClient {
    pub fn new(model: String, api_key: String, temperature: f32, max_tokens: u32) -> Self {
        let endpoint = format!("{}/{}", INFERENCE_BASE, model);
        Self {
            model,
            api_key,
            temperature,
            max_tokens,
            endpoint,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl LlmClient for HuggingFaceClient {
    async fn complete(&self, prompt: &str) -> anyhow::Result<LlmResponse> {
        let body = json!({
            "inputs": format!("<s>[INST] {} [/INST]</s>", prompt),
            "parameters": {
                "max_new_tokens": self.max_tokens,
                "temperature": self.temperature,
                "return_full_text": false,
            }
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            anyhow::bail!("Hugging Face inference rate limited (429)");
        }
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Hugging Face inference error ({}): {}", status, error_text);
        }

        let json: serde_json::Value = resp.json().await?;
        let text = json
            .pointer("/0/generated_text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("Hugging Face response missing generated_text"))?
            .to_string();

        Ok(LlmResponse {
            text,
            provider: "huggingface".to_string(),
            model: self.model.clone(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "huggingface"
    }
}
