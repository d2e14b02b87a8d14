use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use super::error::LlmError;
use super::provider::LlmProvider;
use super::types::{ChatMessage, ChatRequest};
use crate::core::config::LlmSettings;

/// Wraps a provider with the model choice and the single-retry policy.
#[derive(Clone)]
pub struct LlmService {
    provider: Arc<dyn LlmProvider>,
    settings: LlmSettings,
}

impl LlmService {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: LlmSettings) -> Self {
        Self { provider, settings }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub fn embeddings_enabled(&self) -> bool {
        self.settings.embedding_model.is_some()
    }

    pub async fn health_check(&self) -> bool {
        match self.provider.health_check().await {
            Ok(ok) => ok,
            Err(err) => {
                tracing::debug!("LLM health probe failed: {}", err);
                false
            }
        }
    }

    /// Sends the chat request, retrying exactly once when the first attempt times out.
    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, LlmError> {
        let request = ChatRequest::new(messages).with_settings(&self.settings);
        let model = &self.settings.model;

        match self.provider.chat(&request, model).await {
            Err(err) if err.is_timeout() => {
                let delay = self.retry_delay();
                tracing::warn!(
                    "LLM call to {} timed out, retrying once in {}ms",
                    model,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                self.provider
                    .chat(&request, model)
                    .await
                    .map_err(|err| if err.is_timeout() { LlmError::Timeout(2) } else { err })
            }
            other => other,
        }
    }

    pub async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let model = self
            .settings
            .embedding_model
            .as_deref()
            .ok_or(LlmError::Disabled("embedding model"))?;
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        self.provider.embed(inputs, model).await
    }

    fn retry_delay(&self) -> Duration {
        let base = self.settings.retry_delay_ms;
        if base == 0 {
            return Duration::ZERO;
        }
        let jitter = rand::rng().random_range(0..=base / 4);
        Duration::from_millis(base + jitter)
    }
}
