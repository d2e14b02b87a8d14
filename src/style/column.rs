use serde::Serialize;

use super::guide::StyleGuide;

/// How the target column was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSource {
    Requested,
    Inferred,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedColumn {
    pub id: String,
    pub label: String,
    pub source: ColumnSource,
}

/// Matches a requested label against column ids, labels and aliases, then
/// falls back to keyword inference over `text`, then to `default_column`.
pub fn resolve_column(
    guide: &StyleGuide,
    requested: &[String],
    text: &str,
    default_column: &str,
) -> ResolvedColumn {
    for wanted in requested {
        let wanted = wanted.trim();
        if wanted.is_empty() {
            continue;
        }
        if let Some(id) = lookup(guide, wanted) {
            return resolved(guide, id, ColumnSource::Requested);
        }
        tracing::debug!("Unknown column '{}' requested, trying the next one", wanted);
    }

    if let Some(id) = infer_column(guide, text) {
        return resolved(guide, id, ColumnSource::Inferred);
    }

    resolved(guide, default_column.to_string(), ColumnSource::Default)
}

fn lookup(guide: &StyleGuide, wanted: &str) -> Option<String> {
    let lowered = wanted.to_lowercase();
    guide
        .columns
        .iter()
        .find(|(id, column)| {
            id.to_lowercase() == lowered
                || column.label == wanted
                || column
                    .aliases
                    .iter()
                    .any(|alias| alias.to_lowercase() == lowered)
        })
        .map(|(id, _)| id.clone())
}

/// Column whose keywords occur most often in `text`; ties go to the first id.
pub fn infer_column(guide: &StyleGuide, text: &str) -> Option<String> {
    let mut best: Option<(&String, usize)> = None;
    for (id, column) in &guide.columns {
        let hits: usize = column
            .keywords
            .iter()
            .map(|kw| text.matches(kw.as_str()).count())
            .sum();
        if hits == 0 {
            continue;
        }
        if best.map_or(true, |(_, top)| hits > top) {
            best = Some((id, hits));
        }
    }
    best.map(|(id, _)| id.clone())
}

fn resolved(guide: &StyleGuide, id: String, source: ColumnSource) -> ResolvedColumn {
    let label = guide
        .column(&id)
        .map(|column| column.label.clone())
        .unwrap_or_else(|| id.clone());
    ResolvedColumn { id, label, source }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requested(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_labels_ids_and_aliases() {
        let guide = StyleGuide::default();
        for label in ["经济运行", "economic_data", "Economy"] {
            let column = resolve_column(&guide, &requested(&[label]), "", "news_general");
            assert_eq!(column.id, "economic_data");
            assert_eq!(column.source, ColumnSource::Requested);
        }
        assert_eq!(
            resolve_column(&guide, &requested(&["案例"]), "", "news_general").label,
            "案例"
        );
    }

    #[test]
    fn skips_unknown_requests() {
        let guide = StyleGuide::default();
        let column = resolve_column(&guide, &requested(&["体育", "政策"]), "", "news_general");
        assert_eq!(column.id, "policy_interpretation");
    }

    #[test]
    fn infers_from_keywords_then_defaults() {
        let guide = StyleGuide::default();
        let inferred = resolve_column(&guide, &[], "卷烟销售收入同比增长8%，销售稳中有进", "news_general");
        assert_eq!(inferred.id, "economic_data");
        assert_eq!(inferred.source, ColumnSource::Inferred);

        let fallback = resolve_column(&guide, &[], "天气晴朗", "news_general");
        assert_eq!(fallback.id, "news_general");
        assert_eq!(fallback.source, ColumnSource::Default);
    }
}
