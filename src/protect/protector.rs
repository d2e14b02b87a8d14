use regex::Regex;
use serde::Serialize;

use super::map::{EntityMap, Restoration};
use super::patterns::{
    compile, date_regex, number_regex, numeric_token_regex, placeholder_regex, EntityKind,
    ProtectError,
};
use crate::core::config::ProtectionSettings;

/// A claimed, non-overlapping byte range of the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySpan {
    pub kind: EntityKind,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct ProtectedText {
    pub text: String,
    pub map: EntityMap,
}

/// Locks dates, numbers and organisation names behind `{{KIND_n}}` tokens.
///
/// Spans are claimed in priority order (existing placeholder literals, dates,
/// whitelisted organisations, organisation patterns, numbers); a later kind
/// never takes text already claimed by an earlier one.
pub struct EntityProtector {
    placeholder: Regex,
    date: Regex,
    number: Regex,
    numeric_token: Regex,
    org_whitelist: Vec<String>,
    org_patterns: Vec<Regex>,
    number_whitelist: Vec<Regex>,
}

impl EntityProtector {
    pub fn new(settings: &ProtectionSettings) -> Result<Self, ProtectError> {
        let mut org_whitelist: Vec<String> = settings
            .org_whitelist
            .iter()
            .map(|org| org.trim().to_string())
            .filter(|org| !org.is_empty())
            .collect();
        // longest first so "中国烟草总公司" beats a shorter listed prefix
        org_whitelist.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
        org_whitelist.dedup();

        let org_patterns = settings
            .org_patterns
            .iter()
            .map(|pattern| compile("organisation", pattern))
            .collect::<Result<Vec<_>, _>>()?;
        let number_whitelist = settings
            .number_whitelist_patterns
            .iter()
            .map(|pattern| compile("number whitelist", pattern))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            placeholder: placeholder_regex()?,
            date: date_regex()?,
            number: number_regex()?,
            numeric_token: numeric_token_regex()?,
            org_whitelist,
            org_patterns,
            number_whitelist,
        })
    }

    /// Finds protected spans, sorted by position.
    pub fn extract(&self, text: &str) -> Vec<EntitySpan> {
        let mut spans: Vec<EntitySpan> = Vec::new();

        claim_regex(&self.placeholder, EntityKind::Literal, text, &mut spans);
        claim_regex(&self.date, EntityKind::Date, text, &mut spans);
        for org in &self.org_whitelist {
            for (start, matched) in text.match_indices(org.as_str()) {
                try_claim(&mut spans, EntityKind::Org, start, start + matched.len(), text);
            }
        }
        for pattern in &self.org_patterns {
            claim_regex(pattern, EntityKind::Org, text, &mut spans);
        }
        claim_regex(&self.number, EntityKind::Number, text, &mut spans);

        spans.sort_by_key(|span| span.start);
        spans
    }

    pub fn protect(&self, text: &str) -> ProtectedText {
        let spans = self.extract(text);
        let mut map = EntityMap::new();
        let mut out = String::with_capacity(text.len() + spans.len() * 8);
        let mut cursor = 0;

        for span in &spans {
            out.push_str(&text[cursor..span.start]);
            let key = map.key_for(span.kind, &span.text);
            out.push_str("{{");
            out.push_str(&key);
            out.push_str("}}");
            cursor = span.end;
        }
        out.push_str(&text[cursor..]);

        tracing::debug!("Protected {} spans ({} distinct)", spans.len(), map.len());
        ProtectedText { text: out, map }
    }

    pub fn restore(&self, text: &str, map: &EntityMap) -> Restoration {
        map.restore(text, &self.placeholder)
    }

    /// Every bare numeric token of `text`, in order of appearance.
    pub fn numbers(&self, text: &str) -> Vec<String> {
        self.numeric_token
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    pub fn organisations(&self, text: &str) -> Vec<String> {
        let mut orgs: Vec<String> = Vec::new();
        for span in self.extract(text) {
            if span.kind == EntityKind::Org && !orgs.contains(&span.text) {
                orgs.push(span.text);
            }
        }
        orgs
    }

    pub(crate) fn is_whitelisted_number(&self, number: &str) -> bool {
        self.number_whitelist.iter().any(|re| re.is_match(number))
    }
}

/// Claims each leftmost match that does not collide with earlier claims,
/// resuming the search after the colliding claim.
fn claim_regex(re: &Regex, kind: EntityKind, text: &str, spans: &mut Vec<EntitySpan>) {
    let mut pos = 0;
    while pos <= text.len() {
        let Some(m) = re.find_at(text, pos) else {
            break;
        };
        if m.start() == m.end() {
            pos = next_boundary(text, m.end());
            continue;
        }
        match blocking_end(spans, m.start(), m.end()) {
            Some(end) => pos = end.max(next_boundary(text, m.start())),
            None => {
                spans.push(EntitySpan {
                    kind,
                    start: m.start(),
                    end: m.end(),
                    text: m.as_str().to_string(),
                });
                pos = m.end();
            }
        }
    }
}

fn try_claim(spans: &mut Vec<EntitySpan>, kind: EntityKind, start: usize, end: usize, text: &str) {
    if blocking_end(spans, start, end).is_none() {
        spans.push(EntitySpan {
            kind,
            start,
            end,
            text: text[start..end].to_string(),
        });
    }
}

fn blocking_end(spans: &[EntitySpan], start: usize, end: usize) -> Option<usize> {
    spans
        .iter()
        .filter(|span| span.start < end && start < span.end)
        .map(|span| span.end)
        .max()
}

fn next_boundary(text: &str, from: usize) -> usize {
    let mut idx = from + 1;
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protector() -> EntityProtector {
        EntityProtector::new(&ProtectionSettings::default()).expect("protector")
    }

    fn kinds(spans: &[EntitySpan]) -> Vec<(EntityKind, &str)> {
        spans.iter().map(|s| (s.kind, s.text.as_str())).collect()
    }

    #[test]
    fn extracts_by_priority_without_overlap() {
        let spans = protector()
            .extract("2024年10月15日，山东省烟草专卖局发布数据：全省销售卷烟45.2万箱，同比增长3.5%。");
        assert_eq!(
            kinds(&spans),
            vec![
                (EntityKind::Date, "2024年10月15日"),
                (EntityKind::Org, "山东省烟草专卖局"),
                (EntityKind::Number, "45.2万箱"),
                (EntityKind::Number, "3.5%"),
            ]
        );
    }

    #[test]
    fn org_pattern_resumes_after_claimed_date() {
        let spans = protector().extract("2024年山东省烟草专卖局");
        assert_eq!(
            kinds(&spans),
            vec![
                (EntityKind::Date, "2024年"),
                (EntityKind::Org, "山东省烟草专卖局"),
            ]
        );
    }

    #[test]
    fn whitelist_prefers_longest_entry() {
        let settings = ProtectionSettings {
            org_whitelist: vec!["国家烟草专卖局".to_string(), "烟草专卖局".to_string()],
            org_patterns: Vec::new(),
            number_whitelist_patterns: Vec::new(),
        };
        let protector = EntityProtector::new(&settings).expect("protector");
        let spans = protector.extract("国家烟草专卖局印发通知");
        assert_eq!(kinds(&spans), vec![(EntityKind::Org, "国家烟草专卖局")]);
    }

    #[test]
    fn protect_replaces_and_reuses_keys() {
        let protected = protector().protect("投入5000万元，再投入5000万元，覆盖12家");
        assert_eq!(protected.text, "投入{{NUM_1}}，再投入{{NUM_1}}，覆盖{{NUM_2}}");
        assert_eq!(protected.map.len(), 2);
    }

    #[test]
    fn round_trip_restores_original() {
        let protector = protector();
        let inputs = [
            "2024年10月15日，国家烟草专卖局召开会议，部署12项重点任务。",
            "销售收入1,234.5亿元，同比增长3.5个百分点。",
            "模板残留{{NUM_1}}与{{ ORG_2 }}需要原样保留，另有2025年目标。",
            "",
            "没有任何实体的一句话",
        ];
        for input in inputs {
            let protected = protector.protect(input);
            let restored = protector.restore(&protected.text, &protected.map);
            assert_eq!(restored.text, input);
            assert!(restored.leaked.is_empty());
        }
    }

    #[test]
    fn literal_placeholders_are_locked_first() {
        let protected = protector().protect("{{NUM_1}}和8箱");
        assert_eq!(protected.text, "{{LIT_1}}和{{NUM_1}}");
        let entry = protected.map.get("LIT_1").expect("literal");
        assert_eq!(entry.value, "{{NUM_1}}");
    }

    #[test]
    fn numbers_are_bare_tokens() {
        assert_eq!(
            protector().numbers("2024年销售3,000箱，增长5.5%"),
            vec!["2024", "3,000", "5.5"]
        );
    }
}
