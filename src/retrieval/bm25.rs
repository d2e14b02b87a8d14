use std::collections::{HashMap, HashSet};

use super::tokenizer::tokenize;

/// Okapi BM25 over a fixed document set.
#[derive(Debug, Clone)]
pub struct Bm25Index {
    k1: f64,
    b: f64,
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<usize>,
    avg_doc_len: f64,
    idf: HashMap<String, f64>,
}

impl Bm25Index {
    pub fn build<I, S>(documents: I, k1: f64, b: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut term_freqs = Vec::new();
        let mut doc_lens = Vec::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let tokens = tokenize(doc.as_ref());
            doc_lens.push(tokens.len());

            let mut tf: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *tf.entry(token).or_insert(0) += 1;
            }
            for term in tf.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(tf);
        }

        let n = term_freqs.len() as f64;
        let avg_doc_len = if doc_lens.is_empty() {
            0.0
        } else {
            doc_lens.iter().sum::<usize>() as f64 / n
        };

        let idf = doc_freq
            .into_iter()
            .map(|(term, df)| {
                let df = df as f64;
                (term, ((n - df + 0.5) / (df + 0.5) + 1.0).ln())
            })
            .collect();

        Self {
            k1,
            b,
            term_freqs,
            doc_lens,
            avg_doc_len,
            idf,
        }
    }

    pub fn len(&self) -> usize {
        self.term_freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.term_freqs.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.idf.len()
    }

    /// Scores every document; index `i` matches document `i` of `build`.
    pub fn score_all(&self, query: &str) -> Vec<f64> {
        let mut seen = HashSet::new();
        let terms: Vec<String> = tokenize(query)
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect();
        (0..self.len()).map(|idx| self.score(&terms, idx)).collect()
    }

    fn score(&self, terms: &[String], doc: usize) -> f64 {
        let doc_len = self.doc_lens[doc] as f64;
        if doc_len == 0.0 || self.avg_doc_len == 0.0 {
            return 0.0;
        }
        let norm = self.k1 * (1.0 - self.b + self.b * doc_len / self.avg_doc_len);

        terms
            .iter()
            .filter_map(|term| {
                let tf = *self.term_freqs[doc].get(term)? as f64;
                let idf = self.idf.get(term)?;
                Some(idf * tf * (self.k1 + 1.0) / (tf + norm))
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_document_scores_highest() {
        let index = Bm25Index::build(
            ["卷烟销售同比增长", "专卖执法检查行动", "烟叶收购工作会议"],
            1.5,
            0.75,
        );
        let scores = index.score_all("卷烟销售增长");
        assert!(scores[0] > scores[1]);
        assert!(scores[0] > scores[2]);
        assert_eq!(scores[1], 0.0);
    }

    #[test]
    fn idf_stays_positive_for_common_terms() {
        let index = Bm25Index::build(["会议召开", "会议部署", "会议总结"], 1.5, 0.75);
        let scores = index.score_all("会议");
        assert!(scores.iter().all(|s| *s > 0.0));
    }

    #[test]
    fn empty_query_scores_zero() {
        let index = Bm25Index::build(["一些文本"], 1.5, 0.75);
        assert_eq!(index.score_all("！！"), vec![0.0]);
        assert_eq!(index.len(), 1);
    }
}
