use async_trait::async_trait;

use super::error::LlmError;
use super::types::ChatRequest;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// provider name for logs and health output
    fn name(&self) -> &str;

    /// check if the endpoint is reachable with the configured credentials
    async fn health_check(&self) -> Result<bool, LlmError>;

    /// chat completion (non-streaming)
    async fn chat(&self, request: &ChatRequest, model_id: &str) -> Result<String, LlmError>;

    /// generate embeddings, one vector per input
    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, LlmError>;
}
