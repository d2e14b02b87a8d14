use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use super::bm25::Bm25Index;
use super::semantic::{concept_overlap, cosine_similarity};
use crate::core::config::RetrievalSettings;
use crate::samples::{Sample, SampleStore};

/// A retrieved example together with its score components.
#[derive(Debug, Clone)]
pub struct ScoredSample {
    pub sample: Arc<Sample>,
    pub lexical: f64,
    pub semantic: f64,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrievedRef {
    pub id: String,
    pub column: String,
    pub title: String,
    pub score: f64,
}

impl From<&ScoredSample> for RetrievedRef {
    fn from(scored: &ScoredSample) -> Self {
        Self {
            id: scored.sample.id.clone(),
            column: scored.sample.column.clone(),
            title: scored.sample.title.clone(),
            score: (scored.score * 1000.0).round() / 1000.0,
        }
    }
}

/// BM25 + embedding hybrid ranking over the sample store.
pub struct HybridRetriever {
    store: Arc<SampleStore>,
    index: Bm25Index,
    settings: RetrievalSettings,
    column_keywords: BTreeMap<String, Vec<String>>,
}

impl HybridRetriever {
    pub fn new(
        store: Arc<SampleStore>,
        settings: RetrievalSettings,
        column_keywords: BTreeMap<String, Vec<String>>,
    ) -> Self {
        let index = Bm25Index::build(
            store.samples().iter().map(|s| s.full_text()),
            settings.bm25_k1,
            settings.bm25_b,
        );
        tracing::info!(
            "BM25 index built over {} samples ({} terms)",
            index.len(),
            index.vocabulary_size()
        );
        Self {
            store,
            index,
            settings,
            column_keywords,
        }
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    pub fn vocabulary_size(&self) -> usize {
        self.index.vocabulary_size()
    }

    /// Returns exactly `min(k, store size)` samples, preferring `column`.
    pub fn retrieve(
        &self,
        query: &str,
        query_embedding: Option<&[f32]>,
        column: Option<&str>,
        k: usize,
    ) -> Vec<ScoredSample> {
        let samples = self.store.samples();
        if k == 0 || samples.is_empty() {
            return Vec::new();
        }

        let bm25 = self.index.score_all(query);
        let best = bm25.iter().cloned().fold(0.0_f64, f64::max);

        let mut candidates: Vec<ScoredSample> = samples
            .iter()
            .zip(bm25)
            .map(|(sample, raw)| {
                let lexical = if best > 0.0 { raw / best } else { 0.0 };
                let semantic = self.semantic_score(query, query_embedding, sample);
                let score = self.settings.lexical_weight * lexical
                    + self.settings.semantic_weight * semantic;
                ScoredSample {
                    sample: Arc::clone(sample),
                    lexical,
                    semantic,
                    score,
                }
            })
            .collect();

        candidates.sort_by(|a, b| {
            let a_match = column.is_some_and(|c| a.sample.column == c);
            let b_match = column.is_some_and(|c| b.sample.column == c);
            b_match
                .cmp(&a_match)
                .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
                .then_with(|| a.sample.id.cmp(&b.sample.id))
        });

        let selected = diversify(candidates, k, self.settings.title_dedup_threshold);
        tracing::debug!(
            "Retrieved {} samples: {:?}",
            selected.len(),
            selected.iter().map(|s| s.sample.id.as_str()).collect::<Vec<_>>()
        );
        selected
    }

    fn semantic_score(&self, query: &str, query_embedding: Option<&[f32]>, sample: &Sample) -> f64 {
        let cosine = query_embedding
            .zip(sample.embedding.as_deref())
            .and_then(|(q, s)| cosine_similarity(q, s));
        match cosine {
            Some(value) => value.clamp(0.0, 1.0),
            None => concept_overlap(
                query,
                &sample.full_text(),
                &sample.column,
                &self.column_keywords,
            ),
        }
    }
}

/// Skips near-duplicate titles first time round, then backfills from the
/// skipped candidates so the result length only depends on `k`.
fn diversify(candidates: Vec<ScoredSample>, k: usize, threshold: f64) -> Vec<ScoredSample> {
    let target = k.min(candidates.len());
    let mut selected: Vec<ScoredSample> = Vec::with_capacity(target);
    let mut skipped = Vec::new();

    for candidate in candidates {
        if selected.len() >= target {
            break;
        }
        let duplicate = selected
            .iter()
            .any(|chosen| title_similarity(&chosen.sample.title, &candidate.sample.title) > threshold);
        if duplicate {
            skipped.push(candidate);
        } else {
            selected.push(candidate);
        }
    }

    for candidate in skipped {
        if selected.len() >= target {
            break;
        }
        selected.push(candidate);
    }

    selected
}

/// Character-set Jaccard similarity of two titles.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let set_a: HashSet<char> = a.chars().collect();
    let set_b: HashSet<char> = b.chars().collect();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }
    set_a.intersection(&set_b).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str, column: &str, title: &str, body: &str) -> Sample {
        Sample {
            id: id.to_string(),
            column: column.to_string(),
            title: title.to_string(),
            lead: String::new(),
            body: body.to_string(),
            embedding: None,
            quality_score: None,
        }
    }

    fn retriever(samples: Vec<Sample>) -> HybridRetriever {
        let store = SampleStore::from_samples(samples).expect("store");
        HybridRetriever::new(
            Arc::new(store),
            RetrievalSettings::default(),
            BTreeMap::new(),
        )
    }

    fn corpus() -> Vec<Sample> {
        vec![
            sample("a", "economic_data", "全省卷烟销售同比增长", "卷烟销售收入同比增长百分之五"),
            sample("b", "news_general", "专卖局召开工作会议", "会议部署全年专卖监管工作"),
            sample("c", "case_observation", "某县烟叶种植典型经验", "烟叶种植创新实践"),
            sample("d", "economic_data", "全市卷烟市场运行平稳", "全市卷烟销售数据稳中有进"),
            sample("e", "policy_interpretation", "新规解读", "政策通知明确办法"),
        ]
    }

    #[test]
    fn returns_exactly_k_when_store_is_large_enough() {
        let retriever = retriever(corpus());
        for k in 1..=5 {
            assert_eq!(retriever.retrieve("卷烟销售", None, None, k).len(), k);
        }
        assert_eq!(retriever.retrieve("卷烟销售", None, None, 9).len(), 5);
        assert!(retriever.retrieve("卷烟销售", None, None, 0).is_empty());
    }

    #[test]
    fn requested_column_comes_first() {
        let retriever = retriever(corpus());
        let results = retriever.retrieve("专卖工作会议", None, Some("economic_data"), 3);
        assert_eq!(results[0].sample.column, "economic_data");
        assert_eq!(results[1].sample.column, "economic_data");
        assert_ne!(results[2].sample.column, "economic_data");
    }

    #[test]
    fn near_duplicate_titles_are_deferred() {
        let retriever = retriever(vec![
            sample("x", "economic_data", "全省卷烟销售同比增长", "卷烟销售同比增长"),
            sample("y", "economic_data", "全市卷烟销售同比增长", "卷烟销售同比增长"),
            sample("z", "news_general", "烟叶收购工作会议", "烟叶收购工作"),
        ]);
        let results = retriever.retrieve("卷烟销售同比增长", None, None, 2);
        let ids: Vec<&str> = results.iter().map(|r| r.sample.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"z"));

        let all = retriever.retrieve("卷烟销售同比增长", None, None, 3);
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].sample.id, "y");
    }

    #[test]
    fn embeddings_drive_semantic_score() {
        let mut samples = corpus();
        samples[4].embedding = Some(vec![1.0, 0.0]);
        samples[0].embedding = Some(vec![0.0, 1.0]);
        let retriever = retriever(samples);

        let results = retriever.retrieve("新规", Some(&[1.0, 0.0]), None, 5);
        let e = results.iter().find(|r| r.sample.id == "e").expect("e");
        let a = results.iter().find(|r| r.sample.id == "a").expect("a");
        assert!((e.semantic - 1.0).abs() < 1e-9);
        assert_eq!(a.semantic, 0.0);
    }

    #[test]
    fn ordering_is_deterministic() {
        let retriever = retriever(corpus());
        let first: Vec<String> = retriever
            .retrieve("无关内容", None, None, 5)
            .iter()
            .map(|r| r.sample.id.clone())
            .collect();
        let second: Vec<String> = retriever
            .retrieve("无关内容", None, None, 5)
            .iter()
            .map(|r| r.sample.id.clone())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn title_similarity_is_jaccard() {
        assert_eq!(title_similarity("abc", "abc"), 1.0);
        assert_eq!(title_similarity("ab", "cd"), 0.0);
        assert_eq!(title_similarity("", "cd"), 0.0);
    }
}
