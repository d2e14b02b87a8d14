use serde_json::{Map, Value};

use super::settings::{LengthBounds, Settings};
use crate::core::errors::ApiError;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 1, 65535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(logging) = expect_optional_object(root, "logging")? {
        validate_optional_string_field(logging, "logging.level", "level")?;
        validate_optional_string_field(logging, "logging.file_prefix", "file_prefix")?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_optional_string_field(llm, "llm.base_url", "base_url")?;
        validate_optional_string_field(llm, "llm.model", "model")?;
        validate_optional_string_field(llm, "llm.embedding_model", "embedding_model")?;
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_u64_field(llm, "llm.timeout_secs", "timeout_secs", 1, 3_600)?;
        validate_u64_field(
            llm,
            "llm.connect_timeout_secs",
            "connect_timeout_secs",
            1,
            600,
        )?;
        validate_u64_field(llm, "llm.retry_delay_ms", "retry_delay_ms", 0, 60_000)?;
        validate_u64_field(llm, "llm.max_tokens", "max_tokens", 1, 200_000)?;
        validate_f64_field(llm, "llm.temperature", "temperature", 0.0, 2.0)?;
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_optional_string_field(retrieval, "retrieval.samples_path", "samples_path")?;
        validate_u64_field(retrieval, "retrieval.top_k", "top_k", 1, 50)?;
        validate_f64_field(retrieval, "retrieval.lexical_weight", "lexical_weight", 0.0, 1.0)?;
        validate_f64_field(
            retrieval,
            "retrieval.semantic_weight",
            "semantic_weight",
            0.0,
            1.0,
        )?;
        validate_f64_field(retrieval, "retrieval.bm25_k1", "bm25_k1", 0.0, 10.0)?;
        validate_f64_field(retrieval, "retrieval.bm25_b", "bm25_b", 0.0, 1.0)?;
        validate_f64_field(
            retrieval,
            "retrieval.title_dedup_threshold",
            "title_dedup_threshold",
            0.0,
            1.0,
        )?;
    }

    if let Some(rewrite) = expect_optional_object(root, "rewrite")? {
        for key in ["title", "lead"] {
            if let Some(bounds) = expect_optional_object(rewrite, key)? {
                let path = format!("rewrite.{}", key);
                validate_u64_field(bounds, &format!("{}.min", path), "min", 0, 10_000)?;
                validate_u64_field(bounds, &format!("{}.max", path), "max", 1, 10_000)?;
            }
        }
        validate_optional_string_field(rewrite, "rewrite.default_column", "default_column")?;
        validate_u64_field(
            rewrite,
            "rewrite.max_input_chars",
            "max_input_chars",
            1,
            1_000_000,
        )?;
        validate_u64_field(
            rewrite,
            "rewrite.sample_excerpt_chars",
            "sample_excerpt_chars",
            1,
            100_000,
        )?;
        validate_u64_field(
            rewrite,
            "rewrite.golden_excerpt_chars",
            "golden_excerpt_chars",
            1,
            100_000,
        )?;
    }

    if let Some(protection) = expect_optional_object(root, "protection")? {
        validate_string_array_field(protection, "protection.org_whitelist", "org_whitelist")?;
        validate_string_array_field(protection, "protection.org_patterns", "org_patterns")?;
        validate_string_array_field(
            protection,
            "protection.number_whitelist_patterns",
            "number_whitelist_patterns",
        )?;
    }

    if let Some(style) = expect_optional_object(root, "style")? {
        validate_optional_string_field(style, "style.system_prompt", "system_prompt")?;
        validate_string_array_field(style, "style.negative_phrases", "negative_phrases")?;
        validate_string_array_field(
            style,
            "style.positive_alternatives",
            "positive_alternatives",
        )?;
        validate_string_array_field(style, "style.financial_terms", "financial_terms")?;
        if let Some(columns) = expect_optional_object(style, "columns")? {
            for (column_id, value) in columns {
                let path_prefix = format!("style.columns.{}", column_id);
                let entry = value
                    .as_object()
                    .ok_or_else(|| config_type_error(&path_prefix, "object"))?;
                validate_required_string_field(entry, &format!("{}.label", path_prefix), "label")?;
                validate_string_array_field(entry, &format!("{}.aliases", path_prefix), "aliases")?;
                validate_string_array_field(
                    entry,
                    &format!("{}.guidance", path_prefix),
                    "guidance",
                )?;
                validate_string_array_field(
                    entry,
                    &format!("{}.keywords", path_prefix),
                    "keywords",
                )?;
            }
        }
    }

    if let Some(quality) = expect_optional_object(root, "quality")? {
        for key in ["consistency_weight", "style_weight", "structure_weight", "review_threshold"] {
            validate_f64_field(quality, &format!("quality.{}", key), key, 0.0, 1.0)?;
        }
        validate_u64_field(quality, "quality.paragraph_min", "paragraph_min", 0, 1_000)?;
        validate_u64_field(quality, "quality.paragraph_max", "paragraph_max", 1, 1_000)?;
    }

    Ok(())
}

/// Cross-field checks that only make sense on the typed settings.
pub fn validate_settings(settings: &Settings) -> Result<(), ApiError> {
    if settings.logging.file_prefix.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Invalid config at 'logging.file_prefix': must not be empty".to_string(),
        ));
    }

    validate_bounds("rewrite.title", settings.rewrite.title)?;
    validate_bounds("rewrite.lead", settings.rewrite.lead)?;

    let retrieval = &settings.retrieval;
    if retrieval.lexical_weight + retrieval.semantic_weight <= 0.0 {
        return Err(ApiError::BadRequest(
            "Invalid config at 'retrieval': lexical_weight + semantic_weight must be positive"
                .to_string(),
        ));
    }

    let quality = &settings.quality;
    if quality.paragraph_min > quality.paragraph_max {
        return Err(ApiError::BadRequest(
            "Invalid config at 'quality': paragraph_min exceeds paragraph_max".to_string(),
        ));
    }
    if quality.consistency_weight + quality.style_weight + quality.structure_weight <= 0.0 {
        return Err(ApiError::BadRequest(
            "Invalid config at 'quality': weights must not all be zero".to_string(),
        ));
    }

    if !settings
        .style
        .columns
        .contains_key(&settings.rewrite.default_column)
    {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at 'rewrite.default_column': unknown column '{}'",
            settings.rewrite.default_column
        )));
    }

    Ok(())
}

fn validate_bounds(path: &str, bounds: LengthBounds) -> Result<(), ApiError> {
    if bounds.min > bounds.max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': min ({}) exceeds max ({})",
            path, bounds.min, bounds.max
        )));
    }
    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_required_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let value = section.get(key).ok_or_else(|| {
        ApiError::BadRequest(format!("Invalid config at '{}': value is required", path))
    })?;
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
