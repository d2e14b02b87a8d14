use std::collections::BTreeSet;

use serde::Serialize;

use super::patterns::EntityKind;
use super::protector::EntityProtector;

/// Entity fidelity report comparing a source text with its rewrite.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityAudit {
    pub locked_dates: usize,
    pub locked_numbers: usize,
    pub locked_orgs: usize,
    /// Source entities whose exact text is absent from the rewrite.
    pub missing: Vec<String>,
    /// Numbers the rewrite introduced that the source never contained.
    pub new_numbers: Vec<String>,
    pub leaked_placeholders: Vec<String>,
    pub numbers_match: bool,
    pub orgs_retained: bool,
}

impl EntityAudit {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.new_numbers.is_empty() && self.leaked_placeholders.is_empty()
    }
}

impl EntityProtector {
    pub fn verify(&self, original: &str, rewritten: &str) -> EntityAudit {
        let spans = self.extract(original);
        let count = |kind: EntityKind| spans.iter().filter(|s| s.kind == kind).count();

        let mut missing: Vec<String> = Vec::new();
        for span in spans.iter().filter(|s| s.kind != EntityKind::Literal) {
            if !rewritten.contains(span.text.as_str()) && !missing.contains(&span.text) {
                missing.push(span.text.clone());
            }
        }

        let source_numbers = normalised_numbers(self, original);
        let output_numbers = normalised_numbers(self, rewritten);

        let mut new_numbers: Vec<String> = Vec::new();
        for number in self.numbers(rewritten) {
            let plain = strip_separators(&number);
            if source_numbers.contains(&plain)
                || self.is_whitelisted_number(&number)
                || new_numbers.contains(&number)
            {
                continue;
            }
            new_numbers.push(number);
        }

        let orgs_retained = spans
            .iter()
            .filter(|s| s.kind == EntityKind::Org)
            .all(|s| rewritten.contains(s.text.as_str()));

        EntityAudit {
            locked_dates: count(EntityKind::Date),
            locked_numbers: count(EntityKind::Number),
            locked_orgs: count(EntityKind::Org),
            missing,
            new_numbers,
            leaked_placeholders: Vec::new(),
            numbers_match: source_numbers == output_numbers,
            orgs_retained,
        }
    }

    /// Source numbers absent, verbatim, from the numeric tokens of `rewritten`.
    pub fn missing_numbers(&self, original: &str, rewritten: &str) -> Vec<String> {
        let present: BTreeSet<String> = self.numbers(rewritten).into_iter().collect();
        let mut missing: Vec<String> = Vec::new();
        for number in self.numbers(original) {
            if !present.contains(&number) && !missing.contains(&number) {
                missing.push(number);
            }
        }
        missing
    }
}

fn normalised_numbers(protector: &EntityProtector, text: &str) -> BTreeSet<String> {
    protector
        .numbers(text)
        .iter()
        .map(|n| strip_separators(n))
        .collect()
}

fn strip_separators(number: &str) -> String {
    number.replace(',', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ProtectionSettings;

    fn protector() -> EntityProtector {
        EntityProtector::new(&ProtectionSettings::default()).expect("protector")
    }

    #[test]
    fn faithful_rewrite_is_clean() {
        let source = "2024年，国家统计局公布卷烟产量3,000万箱。";
        let rewrite = "国家统计局数据显示，2024年卷烟产量达3,000万箱。";
        let audit = protector().verify(source, rewrite);
        assert!(audit.is_clean());
        assert!(audit.numbers_match);
        assert!(audit.orgs_retained);
        assert_eq!(audit.locked_dates, 1);
        assert_eq!(audit.locked_orgs, 1);
        assert_eq!(audit.locked_numbers, 1);
    }

    #[test]
    fn invented_and_dropped_figures_are_reported() {
        let source = "国家统计局公布增长5%";
        let rewrite = "增长约6%，创历史新高";
        let audit = protector().verify(source, rewrite);
        assert_eq!(audit.new_numbers, vec!["6".to_string()]);
        assert!(audit.missing.contains(&"国家统计局".to_string()));
        assert!(audit.missing.contains(&"5%".to_string()));
        assert!(!audit.numbers_match);
        assert!(!audit.orgs_retained);
    }

    #[test]
    fn separator_changes_are_not_new_numbers() {
        let audit = protector().verify("销量3,000箱", "销量3000箱");
        assert!(audit.new_numbers.is_empty());
        assert!(audit.numbers_match);
    }

    #[test]
    fn whitelisted_numbers_are_tolerated() {
        let settings = ProtectionSettings {
            number_whitelist_patterns: vec![r"^20\d{2}$".to_string()],
            ..ProtectionSettings::default()
        };
        let protector = EntityProtector::new(&settings).expect("protector");
        let audit = protector.verify("销量上升", "2025年销量上升");
        assert!(audit.new_numbers.is_empty());
    }

    #[test]
    fn missing_numbers_are_verbatim() {
        let missing = protector().missing_numbers("共15项，投入3,000万元", "共15项，投入3000万元");
        assert_eq!(missing, vec!["3,000".to_string()]);
    }
}
