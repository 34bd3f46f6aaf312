use super::{LlmClient, LlmResponse};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

enum Rule {
    Reply(String),
    Fail(String),
}

/// Offline client with scripted replies. Rules are matched in insertion order
/// against the prompt; the first rule whose needle occurs in the prompt wins.
pub struct FakeClient {
    default_reply: String,
    rules: Mutex<Vec<(String, Rule)>>,
    calls: AtomicUsize,
}

impl FakeClient {
    pub fn new(default_reply: impl Into<String>) -> Self {
        Self {
            default_reply: default_reply.into(),
            rules: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn reply_when(self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.push(needle.into(), Rule::Reply(reply.into()));
        self
    }

    pub fn fail_when(self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.push(needle.into(), Rule::Fail(message.into()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn push(&self, needle: String, rule: Rule) {
        self.rules
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((needle, rule));
    }
}

#[async_trait]
impl LlmClient for FakeClient {
    async fn complete(&self, prompt: &str) -> anyhow::Result<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = {
            let rules = self.rules.lock().unwrap_or_else(|p| p.into_inner());
            match rules.iter().find(|(needle, _)| prompt.contains(needle.as_str())) {
                Some((_, Rule::Fail(msg))) => anyhow::bail!("{}", msg),
                Some((_, Rule::Reply(reply))) => reply.clone(),
                None => self.default_reply.clone(),
            }
        };
        Ok(LlmResponse {
            text,
            provider: "fake".into(),
            model: "fake".into(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
