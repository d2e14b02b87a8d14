use serde::{Deserialize, Serialize};

/// A hand-labelled example article. Immutable once the store is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub id: String,

    /// Target column id such as `economic_data`.
    #[serde(alias = "type")]
    pub column: String,

    pub title: String,

    #[serde(default)]
    pub lead: String,

    pub body: String,

    /// Precomputed sentence embedding, if the corpus ships one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Editorial rating in `[0, 1]`; golden samples are shown at full length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
}

impl Sample {
    /// Text indexed for lexical retrieval.
    pub fn full_text(&self) -> String {
        format!("{} {} {}", self.title, self.lead, self.body)
    }

    pub fn body_chars(&self) -> usize {
        self.body.chars().count()
    }
}

/// Accepts either a bare array or the `{"articles": [...]}` envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SampleFile {
    List(Vec<Sample>),
    Envelope { articles: Vec<Sample> },
}

impl SampleFile {
    pub(crate) fn into_samples(self) -> Vec<Sample> {
        match self {
            SampleFile::List(samples) => samples,
            SampleFile::Envelope { articles } => articles,
        }
    }
}
