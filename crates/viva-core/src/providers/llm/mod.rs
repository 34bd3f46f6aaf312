use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<LlmResponse>;
    fn provider_name(&self) -> &'static str;
}

pub mod fake;
pub mod huggingface;
pub mod openai;

pub use fake::FakeClient;
pub use huggingface::HuggingFaceClient;
pub use openai::OpenAIClient;
