use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::defaults;
use crate::core::errors::ApiError;
use crate::style::StyleGuide;

/// Typed view of the merged `config.yml` + `secrets.yaml` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub llm: LlmSettings,
    pub retrieval: RetrievalSettings,
    pub rewrite: RewriteSettings,
    pub protection: ProtectionSettings,
    pub style: StyleGuide,
    pub quality: QualitySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8081,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
    /// File name prefix of the daily log under `logs/`.
    pub file_prefix: String,
    pub stdout: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info,tower_http=debug".to_string(),
            file_prefix: "rewriter.log".to_string(),
            stdout: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    /// Embeddings are skipped entirely when unset.
    pub embedding_model: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub retry_delay_ms: u64,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com/v1".to_string(),
            model: "deepseek-chat".to_string(),
            embedding_model: None,
            api_key: None,
            timeout_secs: 120,
            connect_timeout_secs: 10,
            retry_delay_ms: 1000,
            temperature: 0.3,
            max_tokens: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub samples_path: String,
    pub top_k: usize,
    pub lexical_weight: f64,
    pub semantic_weight: f64,
    pub bm25_k1: f64,
    pub bm25_b: f64,
    pub title_dedup_threshold: f64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            samples_path: "data/samples/structured_articles.json".to_string(),
            top_k: 3,
            lexical_weight: 0.4,
            semantic_weight: 0.6,
            bm25_k1: 1.5,
            bm25_b: 0.75,
            title_dedup_threshold: 0.7,
        }
    }
}

/// Inclusive character-count bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthBounds {
    pub min: usize,
    pub max: usize,
}

impl LengthBounds {
    pub fn contains(&self, len: usize) -> bool {
        len >= self.min && len <= self.max
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteSettings {
    pub title: LengthBounds,
    pub lead: LengthBounds,
    pub default_column: String,
    pub max_input_chars: usize,
    pub sample_excerpt_chars: usize,
    pub golden_excerpt_chars: usize,
    pub golden_quality_threshold: f64,
}

impl Default for RewriteSettings {
    fn default() -> Self {
        Self {
            title: LengthBounds { min: 15, max: 30 },
            lead: LengthBounds { min: 60, max: 120 },
            default_column: "news_general".to_string(),
            max_input_chars: 20_000,
            sample_excerpt_chars: 1000,
            golden_excerpt_chars: 3000,
            golden_quality_threshold: 0.9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionSettings {
    pub org_whitelist: Vec<String>,
    pub org_patterns: Vec<String>,
    /// Numbers matching one of these are not reported as invented.
    pub number_whitelist_patterns: Vec<String>,
}

impl Default for ProtectionSettings {
    fn default() -> Self {
        Self {
            org_whitelist: defaults::default_org_whitelist(),
            org_patterns: defaults::default_org_patterns(),
            number_whitelist_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualitySettings {
    pub consistency_weight: f64,
    pub style_weight: f64,
    pub structure_weight: f64,
    pub review_threshold: f64,
    pub paragraph_min: usize,
    pub paragraph_max: usize,
    pub min_financial_terms: usize,
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            consistency_weight: 0.4,
            style_weight: 0.35,
            structure_weight: 0.25,
            review_threshold: 0.6,
            paragraph_min: 3,
            paragraph_max: 8,
            min_financial_terms: 3,
        }
    }
}

impl Settings {
    pub fn from_value(value: &Value) -> Result<Self, ApiError> {
        serde_json::from_value(value.clone())
            .map_err(|err| ApiError::BadRequest(format!("Invalid config: {}", err)))
    }

    /// Applies `OPENAI_*` and `REWRITER_*` overrides.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = non_empty("OPENAI_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = non_empty("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Some(model) = non_empty("OPENAI_EMBEDDING_MODEL") {
            self.llm.embedding_model = Some(model);
        }
        if let Some(host) = non_empty("REWRITER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = non_empty("REWRITER_PORT").and_then(|v| v.parse::<u16>().ok()) {
            self.server.port = port;
        }
    }

    pub fn api_key(&self) -> Result<&str, ApiError> {
        self.llm
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                ApiError::BadRequest(
                    "LLM API key is not configured (set OPENAI_API_KEY or llm.api_key)"
                        .to_string(),
                )
            })
    }
}
