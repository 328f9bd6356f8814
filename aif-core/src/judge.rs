use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Capability to send a prompt to an LLM judge.
///
/// Implementations own the vendor transport. Failures must be reported with the
/// matching [`AifError`](crate::AifError) variant (rate limits as `RateLimit`,
/// HTTP failures as `ExternalService` with their status) so callers can decide
/// whether to retry.
#[async_trait]
pub trait JudgeClient: Send + Sync {
    fn model_name(&self) -> &str;
    async fn call(&self, request: JudgeRequest) -> Result<JudgeResponse>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl JudgeRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), temperature: 0.3, max_tokens: 4000 }
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeResponse {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl JudgeResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), input_tokens: 0, output_tokens: 0 }
    }

    #[must_use]
    pub fn with_usage(mut self, input_tokens: u64, output_tokens: u64) -> Self {
        self.input_tokens = input_tokens;
        self.output_tokens = output_tokens;
        self
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}
