use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

/// Which strategy recovered the article from the model's reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    Json,
    Sections,
    Fields,
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArticle {
    pub title: String,
    pub lead: String,
    pub body: String,
    pub style_note: Option<String>,
    pub mode: ParseMode,
}

impl ParsedArticle {
    /// Anything other than a clean JSON answer needs a human look.
    pub fn is_degraded(&self) -> bool {
        self.mode != ParseMode::Json
    }
}

fn section_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"===\s*(标题|导语|正文|风格说明)\s*===").ok())
        .as_ref()
}

fn field_regex(field: &str) -> Option<Regex> {
    Regex::new(&format!(r#""{}"\s*:\s*"((?:[^"\\]|\\.)*)""#, field)).ok()
}

/// Recovers title/lead/body from a chat reply, falling back through
/// JSON, `===标题===` sections, per-field regexes and finally the raw text.
pub fn parse_article(raw: &str) -> ParsedArticle {
    let text = strip_code_fences(raw.trim());

    if let Some(parsed) = parse_json(&text) {
        return parsed;
    }
    if let Some(parsed) = parse_sections(&text) {
        return parsed;
    }
    if let Some(parsed) = parse_fields(&text) {
        return parsed;
    }

    tracing::warn!("LLM reply matched no known layout, using raw text as body");
    ParsedArticle {
        title: String::new(),
        lead: String::new(),
        body: text.trim().to_string(),
        style_note: None,
        mode: ParseMode::Raw,
    }
}

fn strip_code_fences(text: &str) -> String {
    let mut lines: Vec<&str> = text.lines().collect();
    if lines.first().is_some_and(|l| l.trim_start().starts_with("```")) {
        lines.remove(0);
        if lines.last().is_some_and(|l| l.trim() == "```") {
            lines.pop();
        }
        return lines.join("\n");
    }
    text.to_string()
}

fn parse_json(text: &str) -> Option<ParsedArticle> {
    let value = serde_json::from_str::<Value>(text)
        .ok()
        .filter(Value::is_object)
        .or_else(|| {
            let start = text.find('{')?;
            let end = text.rfind('}')?;
            if end <= start {
                return None;
            }
            serde_json::from_str::<Value>(&text[start..=end])
                .ok()
                .filter(Value::is_object)
        })?;

    let field = |key: &str| {
        value
            .get(key)
            .and_then(json_text)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };

    let title = field("title");
    let lead = field("lead");
    let body = field("body");
    if title.is_empty() && body.is_empty() {
        return None;
    }

    let style_note = Some(field("style_note")).filter(|s| !s.is_empty());

    Some(ParsedArticle {
        title,
        lead,
        body,
        style_note,
        mode: ParseMode::Json,
    })
}

/// Body may come back as an array of paragraphs.
fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("\n\n"),
        ),
        _ => None,
    }
}

fn parse_sections(text: &str) -> Option<ParsedArticle> {
    let re = section_regex()?;
    let markers: Vec<_> = re.captures_iter(text).collect();
    if markers.is_empty() {
        return None;
    }

    let mut title = String::new();
    let mut lead = String::new();
    let mut body = String::new();
    let mut style_note = None;

    for (idx, caps) in markers.iter().enumerate() {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let end = markers
            .get(idx + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(text.len());
        let content = text[whole.end()..end].trim().to_string();
        match name.as_str() {
            "标题" => title = content,
            "导语" => lead = content,
            "正文" => body = content,
            _ => style_note = Some(content).filter(|s| !s.is_empty()),
        }
    }

    if title.is_empty() && body.is_empty() {
        return None;
    }

    Some(ParsedArticle {
        title,
        lead,
        body,
        style_note,
        mode: ParseMode::Sections,
    })
}

fn parse_fields(text: &str) -> Option<ParsedArticle> {
    let extract = |field: &str| -> String {
        field_regex(field)
            .and_then(|re| re.captures(text))
            .and_then(|caps| caps.get(1))
            .map(|m| unescape(m.as_str()).trim().to_string())
            .unwrap_or_default()
    };

    let title = extract("title");
    let lead = extract("lead");
    let body = extract("body");
    if title.is_empty() && body.is_empty() {
        return None;
    }

    Some(ParsedArticle {
        title,
        lead,
        body,
        style_note: None,
        mode: ParseMode::Fields,
    })
}

fn unescape(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| {
        raw.replace("\\n", "\n")
            .replace("\\\"", "\"")
            .replace("\\\\", "\\")
    })
}
