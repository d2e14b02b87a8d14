use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::Settings;
use super::validation::{validate_config, validate_settings};
use crate::core::errors::ApiError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 12] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "private_key",
    "auth_",
    "_auth",
    "access_key",
    "access_token",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 4] = ["max_tokens", "total_tokens", "token_count", "tokens"];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("REWRITER_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Raw merged document; a broken YAML file is an error, a missing one is empty.
    pub fn load_config(&self) -> Result<Value, ApiError> {
        let public_config = load_yaml_file(&self.config_path())?;
        let secrets_config = load_yaml_file(&self.secrets_path())?;
        Ok(deep_merge(&public_config, &secrets_config))
    }

    /// Loads, validates and applies environment overrides.
    pub fn load_settings(&self) -> Result<Settings, ApiError> {
        self.load_settings_with(|key| env::var(key).ok())
    }

    pub fn load_settings_with<F>(&self, lookup: F) -> Result<Settings, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = self.load_config()?;
        validate_config(&raw)?;
        let mut settings = Settings::from_value(&raw)?;
        settings.apply_env(lookup);
        validate_settings(&settings)?;
        Ok(settings)
    }

    pub fn redacted(&self, settings: &Settings) -> Value {
        match serde_json::to_value(settings) {
            Ok(value) => redact_sensitive_values(&value),
            Err(err) => {
                tracing::warn!("Failed to serialize settings for display: {}", err);
                Value::Object(Map::new())
            }
        }
    }
}

fn load_yaml_file(path: &Path) -> Result<Value, ApiError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(|err| {
        ApiError::Internal(format!("Failed to read {}: {}", path.display(), err))
    })?;
    if contents.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let value = serde_yaml::from_str::<Value>(&contents).map_err(|err| {
        ApiError::BadRequest(format!("Failed to parse {}: {}", path.display(), err))
    })?;
    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(ApiError::BadRequest(format!(
            "Failed to parse {}: top level must be a mapping",
            path.display()
        ))),
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service_in(dir: &Path) -> ConfigService {
        ConfigService::new(Arc::new(AppPaths::from_root(dir)))
    }

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "a": 1,
            "b": { "c": 2, "d": 3 },
            "arr": [1, 2]
        });
        let override_value = json!({
            "b": { "c": 99 },
            "arr": [3],
            "e": "x"
        });

        let merged = deep_merge(&base, &override_value);

        assert_eq!(
            merged,
            json!({
                "a": 1,
                "b": { "c": 99, "d": 3 },
                "arr": [3],
                "e": "x"
            })
        );
    }

    #[test]
    fn redact_sensitive_values_replaces_secrets_only() {
        let input = json!({
            "llm": {
                "api_key": "secret",
                "max_tokens": 42
            },
            "items": [
                { "password": "pw" }
            ]
        });

        let redacted = redact_sensitive_values(&input);

        assert_eq!(
            redacted,
            json!({
                "llm": {
                    "api_key": "****",
                    "max_tokens": 42
                },
                "items": [
                    { "password": "****" }
                ]
            })
        );
    }

    #[test]
    fn secrets_file_overrides_public_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("config.yml"),
            "llm:\n  model: deepseek-chat\n  timeout_secs: 30\nretrieval:\n  top_k: 4\n",
        )
        .expect("write config");
        fs::write(dir.path().join("secrets.yaml"), "llm:\n  api_key: sk-file\n")
            .expect("write secrets");

        let settings = service_in(dir.path())
            .load_settings_with(|_| None)
            .expect("settings");

        assert_eq!(settings.llm.api_key.as_deref(), Some("sk-file"));
        assert_eq!(settings.llm.timeout_secs, 30);
        assert_eq!(settings.retrieval.top_k, 4);
    }

    #[test]
    fn malformed_yaml_fails_fast() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("config.yml"), "llm: [unclosed\n").expect("write config");

        assert!(service_in(dir.path()).load_settings_with(|_| None).is_err());
    }

    #[test]
    fn redacted_settings_hide_api_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service_in(dir.path());
        let mut settings = Settings::default();
        settings.llm.api_key = Some("sk-live".to_string());

        let shown = service.redacted(&settings);
        assert_eq!(shown["llm"]["api_key"], json!("****"));
        assert_eq!(shown["llm"]["max_tokens"], json!(2000));
    }
}
