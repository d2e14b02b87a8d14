use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::types::{Sample, SampleFile};
use crate::llm::LlmService;

#[derive(Debug, Error)]
pub enum SampleStoreError {
    #[error("failed to read sample file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse sample file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("sample file {0} contains no samples")]
    Empty(PathBuf),
    #[error("sample #{index} has an empty id")]
    MissingId { index: usize },
    #[error("duplicate sample id '{0}'")]
    DuplicateId(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleStats {
    pub total: usize,
    pub column_distribution: BTreeMap<String, usize>,
    pub avg_body_chars: f64,
    pub embedded: usize,
    pub golden: usize,
    pub fingerprint: String,
}

/// Read-only example corpus shared by every request.
#[derive(Debug, Clone)]
pub struct SampleStore {
    samples: Vec<Arc<Sample>>,
    fingerprint: String,
    source: PathBuf,
}

impl SampleStore {
    pub fn load(path: &Path) -> Result<Self, SampleStoreError> {
        let contents = fs::read_to_string(path).map_err(|source| SampleStoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: SampleFile =
            serde_json::from_str(&contents).map_err(|source| SampleStoreError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let samples = file.into_samples();
        if samples.is_empty() {
            return Err(SampleStoreError::Empty(path.to_path_buf()));
        }

        let mut store = Self::from_samples(samples)?;
        store.source = path.to_path_buf();
        tracing::info!(
            "Loaded {} samples from {} (fingerprint {})",
            store.len(),
            path.display(),
            &store.fingerprint[..12]
        );
        Ok(store)
    }

    pub fn from_samples(samples: Vec<Sample>) -> Result<Self, SampleStoreError> {
        let mut seen = HashSet::new();
        for (index, sample) in samples.iter().enumerate() {
            if sample.id.trim().is_empty() {
                return Err(SampleStoreError::MissingId { index });
            }
            if !seen.insert(sample.id.as_str()) {
                return Err(SampleStoreError::DuplicateId(sample.id.clone()));
            }
        }

        let fingerprint = fingerprint(&samples);
        Ok(Self {
            samples: samples.into_iter().map(Arc::new).collect(),
            fingerprint,
            source: PathBuf::new(),
        })
    }

    pub fn samples(&self) -> &[Arc<Sample>] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Sample>> {
        self.samples.iter().find(|sample| sample.id == id)
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Embeds samples that ship without a vector. Failures keep the store
    /// usable with lexical and concept scoring only.
    pub async fn attach_embeddings(&mut self, llm: &LlmService) -> usize {
        if !llm.embeddings_enabled() {
            return 0;
        }

        let pending: Vec<usize> = self
            .samples
            .iter()
            .enumerate()
            .filter(|(_, sample)| sample.embedding.is_none())
            .map(|(idx, _)| idx)
            .collect();
        if pending.is_empty() {
            return 0;
        }

        let inputs: Vec<String> = pending
            .iter()
            .map(|&idx| self.samples[idx].full_text())
            .collect();

        match llm.embed(&inputs).await {
            Ok(vectors) => {
                for (&idx, vector) in pending.iter().zip(vectors) {
                    let mut sample = (*self.samples[idx]).clone();
                    sample.embedding = Some(vector);
                    self.samples[idx] = Arc::new(sample);
                }
                tracing::info!("Embedded {} samples at startup", pending.len());
                pending.len()
            }
            Err(err) => {
                tracing::warn!(
                    "Sample embedding failed, semantic scoring falls back to concept overlap: {}",
                    err
                );
                0
            }
        }
    }

    pub fn stats(&self) -> SampleStats {
        let mut column_distribution = BTreeMap::new();
        for sample in &self.samples {
            *column_distribution.entry(sample.column.clone()).or_insert(0) += 1;
        }

        let total_chars: usize = self.samples.iter().map(|s| s.body_chars()).sum();
        let avg_body_chars = if self.samples.is_empty() {
            0.0
        } else {
            total_chars as f64 / self.samples.len() as f64
        };

        SampleStats {
            total: self.samples.len(),
            column_distribution,
            avg_body_chars,
            embedded: self
                .samples
                .iter()
                .filter(|s| s.embedding.is_some())
                .count(),
            golden: self
                .samples
                .iter()
                .filter(|s| s.quality_score.is_some_and(|q| q >= 0.9))
                .count(),
            fingerprint: self.fingerprint.clone(),
        }
    }
}

fn fingerprint(samples: &[Sample]) -> String {
    let mut hasher = Sha256::new();
    for sample in samples {
        hasher.update(sample.id.as_bytes());
        hasher.update([0u8]);
        hasher.update(sample.column.as_bytes());
        hasher.update([0u8]);
        hasher.update(sample.full_text().as_bytes());
        hasher.update([0xffu8]);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str, column: &str) -> Sample {
        Sample {
            id: id.to_string(),
            column: column.to_string(),
            title: format!("标题{}", id),
            lead: "导语".to_string(),
            body: "正文内容".to_string(),
            embedding: None,
            quality_score: None,
        }
    }

    #[test]
    fn loads_envelope_and_type_alias() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("samples.json");
        fs::write(
            &path,
            r#"{"articles": [
                {"id": "a1", "type": "economic_data", "title": "t", "lead": "l", "body": "b", "quality_score": 0.95},
                {"id": "a2", "column": "news_general", "title": "t2", "body": "b2"}
            ]}"#,
        )
        .expect("write");

        let store = SampleStore::load(&path).expect("store");
        assert_eq!(store.len(), 2);
        assert_eq!(store.samples()[0].column, "economic_data");
        assert_eq!(store.samples()[1].lead, "");
        assert_eq!(store.stats().golden, 1);
        assert_eq!(store.source(), path.as_path());
    }

    #[test]
    fn rejects_empty_and_duplicate_corpora() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("samples.json");
        fs::write(&path, "[]").expect("write");
        assert!(matches!(
            SampleStore::load(&path),
            Err(SampleStoreError::Empty(_))
        ));

        let dup = SampleStore::from_samples(vec![sample("x", "a"), sample("x", "b")]);
        assert!(matches!(dup, Err(SampleStoreError::DuplicateId(id)) if id == "x"));
    }

    #[test]
    fn stats_report_distribution_and_fingerprint() {
        let store = SampleStore::from_samples(vec![
            sample("1", "news_general"),
            sample("2", "economic_data"),
            sample("3", "economic_data"),
        ])
        .expect("store");

        let stats = store.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.column_distribution.get("economic_data"), Some(&2));
        assert_eq!(stats.avg_body_chars, 4.0);
        assert_eq!(stats.fingerprint.len(), 64);

        let reordered = SampleStore::from_samples(vec![
            sample("2", "economic_data"),
            sample("1", "news_general"),
            sample("3", "economic_data"),
        ])
        .expect("store");
        assert_ne!(store.fingerprint(), reordered.fingerprint());
    }

    #[test]
    fn shipped_corpus_covers_every_column() {
        let retrieval = crate::core::config::RetrievalSettings::default();
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(&retrieval.samples_path);
        let store = SampleStore::load(&path).expect("shipped corpus");
        let stats = store.stats();

        assert!(stats.total >= 30, "total = {}", stats.total);
        for column in crate::style::StyleGuide::default().columns.keys() {
            let count = stats.column_distribution.get(column).copied().unwrap_or(0);
            assert!(
                count >= retrieval.top_k,
                "column {} has {} samples, fewer than top_k = {}",
                column,
                count,
                retrieval.top_k
            );
        }
        assert_eq!(stats.column_distribution.len(), 4);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = SampleStore::load(&dir.path().join("nope.json")).expect_err("missing");
        assert!(matches!(err, SampleStoreError::Io { .. }));
    }
    struct FixedEmbedder;

    #[async_trait::async_trait]
    impl crate::llm::LlmProvider for FixedEmbedder {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn health_check(&self) -> Result<bool, crate::llm::LlmError> {
            Ok(true)
        }

        async fn chat(
            &self,
            _request: &crate::llm::ChatRequest,
            _model_id: &str,
        ) -> Result<String, crate::llm::LlmError> {
            Err(crate::llm::LlmError::EmptyResponse)
        }

        async fn embed(
            &self,
            inputs: &[String],
            _model_id: &str,
        ) -> Result<Vec<Vec<f32>>, crate::llm::LlmError> {
            Ok(inputs.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    #[tokio::test]
    async fn embeddings_fill_only_missing_vectors() {
        let mut preset = sample("2", "economic_data");
        preset.embedding = Some(vec![0.0, 1.0]);
        let mut store = SampleStore::from_samples(vec![sample("1", "news_general"), preset]).expect("store");

        let mut settings = crate::core::config::LlmSettings::default();
        let disabled = LlmService::new(Arc::new(FixedEmbedder), settings.clone());
        assert_eq!(store.attach_embeddings(&disabled).await, 0);

        settings.embedding_model = Some("text-embedding".to_string());
        let llm = LlmService::new(Arc::new(FixedEmbedder), settings);
        assert_eq!(store.attach_embeddings(&llm).await, 1);
        assert_eq!(store.samples()[0].embedding, Some(vec![1.0, 0.0]));
        assert_eq!(store.samples()[1].embedding, Some(vec![0.0, 1.0]));
        assert_eq!(store.stats().embedded, 2);
    }
}
