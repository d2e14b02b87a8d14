use std::fmt;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Shape of a placeholder token, tolerant of spaces the model may add inside
/// the braces. Literal detection and restoration share it.
pub const PLACEHOLDER_PATTERN: &str = r"\{\{\s*([A-Z]+_\d+)\s*\}\}";

const DATE_PATTERN: &str = concat!(
    r"\d{4}年\d{1,2}月\d{1,2}日",
    r"|\d{4}-\d{1,2}-\d{1,2}",
    r"|\d{4}年\d{1,2}月",
    r"|\d{1,2}月\d{1,2}日",
    r"|\d{4}年",
);

const NUMBER_PATTERN: &str = concat!(
    r"\d{1,3}(?:,\d{3})+(?:\.\d+)?",
    r"|\d+(?:\.\d+)?",
);

const NUMBER_SUFFIX: &str = concat!(
    r"(?:万亿|亿|万|千)?",
    r"(?:个百分点|百分点|%|‰|元|箱|吨|公斤|千克|件|户|人|家|项|次|倍|条)?",
);

/// Bare numeric tokens, used for audits rather than protection.
pub const NUMERIC_TOKEN_PATTERN: &str = r"\d+(?:[.,]\d+)*";

#[derive(Debug, Error)]
pub enum ProtectError {
    #[error("invalid {kind} pattern '{pattern}': {source}")]
    InvalidPattern {
        kind: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// A placeholder-shaped token already present in the input.
    Literal,
    Date,
    Org,
    Number,
}

impl EntityKind {
    pub fn prefix(self) -> &'static str {
        match self {
            EntityKind::Literal => "LIT",
            EntityKind::Date => "DATE",
            EntityKind::Org => "ORG",
            EntityKind::Number => "NUM",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

pub(crate) fn compile(kind: &'static str, pattern: &str) -> Result<Regex, ProtectError> {
    Regex::new(pattern).map_err(|source| ProtectError::InvalidPattern {
        kind,
        pattern: pattern.to_string(),
        source,
    })
}

pub(crate) fn placeholder_regex() -> Result<Regex, ProtectError> {
    compile("placeholder", PLACEHOLDER_PATTERN)
}

pub(crate) fn date_regex() -> Result<Regex, ProtectError> {
    compile("date", DATE_PATTERN)
}

pub(crate) fn number_regex() -> Result<Regex, ProtectError> {
    compile(
        "number",
        &format!("(?:{}){}", NUMBER_PATTERN, NUMBER_SUFFIX),
    )
}

pub(crate) fn numeric_token_regex() -> Result<Regex, ProtectError> {
    compile("numeric token", NUMERIC_TOKEN_PATTERN)
}
