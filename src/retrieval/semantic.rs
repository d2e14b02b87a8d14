use std::collections::BTreeMap;

const TOBACCO_CONCEPTS: [&str; 7] = ["烟草", "卷烟", "烟叶", "专卖", "营销", "销售", "监管"];
const BUSINESS_CONCEPTS: [&str; 7] = ["会议", "活动", "工作", "发展", "建设", "管理", "部署"];
const DATA_CONCEPTS: [&str; 7] = ["增长", "下降", "同比", "环比", "数据", "统计", "分析"];

const COLUMN_BONUS: f64 = 0.3;

/// Cosine similarity of two embeddings, or `None` when they are not comparable.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Some(0.0);
    }

    Some((dot / (norm_a * norm_b)).clamp(-1.0, 1.0))
}

/// Keyword-group overlap used when no embeddings are available. Always in `[0, 1]`.
pub fn concept_overlap(
    query: &str,
    sample_text: &str,
    sample_column: &str,
    column_keywords: &BTreeMap<String, Vec<String>>,
) -> f64 {
    let query = query.to_lowercase();
    let sample_text = sample_text.to_lowercase();

    let mut similarity = 0.0;
    for group in [&TOBACCO_CONCEPTS, &BUSINESS_CONCEPTS, &DATA_CONCEPTS] {
        let in_query = group.iter().filter(|c| query.contains(*c)).count();
        let in_sample = group.iter().filter(|c| sample_text.contains(*c)).count();
        if in_query > 0 && in_sample > 0 {
            similarity += in_query.min(in_sample) as f64 / group.len() as f64;
        }
    }

    if let Some(keywords) = column_keywords.get(sample_column) {
        if keywords.iter().any(|kw| query.contains(kw.as_str())) {
            similarity += COLUMN_BONUS;
        }
    }

    similarity.min(1.0)
}
