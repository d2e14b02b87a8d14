use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::error::LlmError;
use super::provider::LlmProvider;
use super::types::ChatRequest;
use crate::core::config::LlmSettings;

/// Client for any OpenAI-compatible `/chat/completions` + `/embeddings` API.
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|err| LlmError::Transport(err.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    pub fn from_settings(settings: &LlmSettings, api_key: &str) -> Result<Self, LlmError> {
        Self::new(
            &settings.base_url,
            api_key,
            Duration::from_secs(settings.timeout_secs),
            Duration::from_secs(settings.connect_timeout_secs),
        )
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, LlmError> {
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: truncate_for_log(&text, 300),
            });
        }

        res.json::<Value>().await.map_err(LlmError::from)
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn health_check(&self) -> Result<bool, LlmError> {
        let url = format!("{}/models", self.base_url);
        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await;
        match res {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn chat(&self, request: &ChatRequest, model_id: &str) -> Result<String, LlmError> {
        let mut body = json!({
            "model": model_id,
            "messages": request.messages,
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(t) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(t));
            }
        }

        let payload = self.post_json("/chat/completions", &body).await?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        if content.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        Ok(content)
    }

    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, LlmError> {
        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let payload = self.post_json("/embeddings", &body).await?;

        let mut embeddings = Vec::new();
        if let Some(data) = payload["data"].as_array() {
            for item in data {
                if let Some(vals) = item["embedding"].as_array() {
                    let vec: Vec<f32> = vals
                        .iter()
                        .filter_map(|v| v.as_f64().map(|f| f as f32))
                        .collect();
                    embeddings.push(vec);
                }
            }
        }

        if embeddings.len() != inputs.len() {
            return Err(LlmError::Decode(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                embeddings.len()
            )));
        }

        Ok(embeddings)
    }
}

fn truncate_for_log(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let provider = OpenAiProvider::new(
            "http://localhost:1234/v1/",
            "sk",
            Duration::from_secs(1),
            Duration::from_secs(1),
        )
        .expect("client");
        assert_eq!(provider.base_url, "http://localhost:1234/v1");
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "错".repeat(400);
        let out = truncate_for_log(&body, 300);
        assert_eq!(out.chars().count(), 301);
        assert!(out.ends_with('…'));
    }
}
