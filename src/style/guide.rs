use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::config::defaults;

/// Editorial rules for one column of the paper.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnGuide {
    pub label: String,
    pub aliases: Vec<String>,
    pub guidance: Vec<String>,
    /// Used to infer the column when the request does not name one.
    pub keywords: Vec<String>,
}

/// The `style` section of the configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleGuide {
    pub system_prompt: String,
    pub tone: String,
    pub negative_phrases: Vec<String>,
    pub positive_alternatives: Vec<String>,
    pub financial_terms: Vec<String>,
    /// Category (`background`, `action`, `result`) to cue keywords.
    pub discourse_cues: BTreeMap<String, Vec<String>>,
    pub columns: BTreeMap<String, ColumnGuide>,
}

impl Default for StyleGuide {
    fn default() -> Self {
        Self {
            system_prompt: defaults::default_system_prompt(),
            tone: defaults::default_tone(),
            negative_phrases: defaults::default_negative_phrases(),
            positive_alternatives: defaults::default_positive_alternatives(),
            financial_terms: defaults::default_financial_terms(),
            discourse_cues: defaults::default_discourse_cues(),
            columns: defaults::default_columns(),
        }
    }
}

impl StyleGuide {
    pub fn column(&self, id: &str) -> Option<&ColumnGuide> {
        self.columns.get(id)
    }

    pub fn column_keywords(&self) -> BTreeMap<String, Vec<String>> {
        self.columns
            .iter()
            .map(|(id, guide)| (id.clone(), guide.keywords.clone()))
            .collect()
    }
}
