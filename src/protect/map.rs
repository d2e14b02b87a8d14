use std::collections::HashMap;

use regex::{Captures, Regex};
use serde::Serialize;

use super::patterns::EntityKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityEntry {
    pub key: String,
    pub kind: EntityKind,
    pub value: String,
}

/// Per-request placeholder table. Insertion ordered; equal values share a key.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityMap {
    entries: Vec<EntityEntry>,
    #[serde(skip)]
    by_key: HashMap<String, usize>,
    #[serde(skip)]
    by_value: HashMap<(EntityKind, String), usize>,
    #[serde(skip)]
    counters: HashMap<EntityKind, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restoration {
    pub text: String,
    /// Placeholder keys that were not in the map and got stripped.
    pub leaked: Vec<String>,
}

impl EntityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the key for `value`, allocating `KIND_n` on first sight.
    pub fn key_for(&mut self, kind: EntityKind, value: &str) -> String {
        if let Some(&idx) = self.by_value.get(&(kind, value.to_string())) {
            return self.entries[idx].key.clone();
        }

        let counter = self.counters.entry(kind).or_insert(0);
        *counter += 1;
        let key = format!("{}_{}", kind.prefix(), counter);

        let idx = self.entries.len();
        self.entries.push(EntityEntry {
            key: key.clone(),
            kind,
            value: value.to_string(),
        });
        self.by_key.insert(key.clone(), idx);
        self.by_value.insert((kind, value.to_string()), idx);
        key
    }

    pub fn get(&self, key: &str) -> Option<&EntityEntry> {
        self.by_key.get(key).map(|&idx| &self.entries[idx])
    }

    pub fn entries(&self) -> &[EntityEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn values_of(&self, kind: EntityKind) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(move |entry| entry.kind == kind)
            .map(|entry| entry.value.as_str())
    }

    /// Single left-to-right substitution; restored values are never rescanned.
    pub fn restore(&self, text: &str, placeholder: &Regex) -> Restoration {
        let mut leaked = Vec::new();
        let restored = placeholder.replace_all(text, |caps: &Captures| {
            let key = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            match self.get(key) {
                Some(entry) => entry.value.clone(),
                None => {
                    leaked.push(key.to_string());
                    String::new()
                }
            }
        });

        Restoration {
            text: restored.into_owned(),
            leaked,
        }
    }
}
