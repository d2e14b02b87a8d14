//! Heuristic quality score of a rewrite.

use serde::Serialize;

use crate::core::config::{LengthBounds, QualitySettings, RewriteSettings};
use crate::postprocess::char_len;
use crate::protect::EntityAudit;
use crate::style::{cue_coverage, StyleGuide};

const LENGTH_PENALTY_PER_CHAR: f64 = 0.02;
const LENGTH_SCORE_FLOOR: f64 = 0.7;
const NEGATIVE_PHRASE_PENALTY: f64 = 0.1;
const NUMBER_MISMATCH_PENALTY: f64 = 0.3;
const ORG_LOSS_PENALTY: f64 = 0.2;
const PARAGRAPH_PENALTY_FACTOR: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityScores {
    pub overall: f64,
    pub consistency: f64,
    pub style: f64,
    pub structure: f64,
}

pub struct QualityScorer<'a> {
    settings: &'a QualitySettings,
    rewrite: &'a RewriteSettings,
    guide: &'a StyleGuide,
}

impl<'a> QualityScorer<'a> {
    pub fn new(settings: &'a QualitySettings, rewrite: &'a RewriteSettings, guide: &'a StyleGuide) -> Self {
        Self {
            settings,
            rewrite,
            guide,
        }
    }

    pub fn score(&self, title: &str, lead: &str, body: &str, audit: &EntityAudit) -> QualityScores {
        let consistency = consistency_score(audit);
        let style = self.style_score(title, lead, body);
        let structure = self.structure_score(body);

        let s = self.settings;
        let weight_sum = s.consistency_weight + s.style_weight + s.structure_weight;
        let weighted = if weight_sum > 0.0 {
            (s.consistency_weight * consistency + s.style_weight * style + s.structure_weight * structure)
                / weight_sum
        } else {
            0.0
        };

        QualityScores {
            overall: round2(weighted.clamp(0.0, 1.0)),
            consistency: round2(consistency),
            style: round2(style),
            structure: round2(structure),
        }
    }

    pub fn needs_review(&self, scores: &QualityScores) -> bool {
        scores.overall < self.settings.review_threshold
    }

    fn style_score(&self, title: &str, lead: &str, body: &str) -> f64 {
        let title_score = length_score(char_len(title), self.rewrite.title);
        let lead_score = length_score(char_len(lead), self.rewrite.lead);

        let full_text = format!("{}{}{}", title, lead, body);
        let terms = self
            .guide
            .financial_terms
            .iter()
            .filter(|term| full_text.contains(term.as_str()))
            .count();
        let wanted = self.settings.min_financial_terms;
        let term_score = if wanted == 0 || terms >= wanted {
            1.0
        } else {
            terms as f64 / wanted as f64
        };

        let negatives: usize = self
            .guide
            .negative_phrases
            .iter()
            .map(|phrase| full_text.matches(phrase.as_str()).count())
            .sum();
        let negative_score = (1.0 - NEGATIVE_PHRASE_PENALTY * negatives as f64).max(0.0);

        0.3 * title_score + 0.3 * lead_score + 0.3 * term_score + 0.1 * negative_score
    }

    fn structure_score(&self, body: &str) -> f64 {
        let categories = self.guide.discourse_cues.len();
        let mut score = if categories == 0 {
            1.0
        } else {
            cue_coverage(body, &self.guide.discourse_cues) as f64 / categories as f64
        };

        let paragraphs = body.lines().filter(|line| !line.trim().is_empty()).count();
        if paragraphs < self.settings.paragraph_min || paragraphs > self.settings.paragraph_max {
            score *= PARAGRAPH_PENALTY_FACTOR;
        }
        score
    }
}

fn consistency_score(audit: &EntityAudit) -> f64 {
    let mut score = 1.0;
    if !audit.numbers_match {
        score -= NUMBER_MISMATCH_PENALTY;
    }
    if !audit.orgs_retained {
        score -= ORG_LOSS_PENALTY;
    }
    score
}

/// 1.0 inside the bounds, losing 0.02 per char outside, never below 0.7.
fn length_score(len: usize, bounds: LengthBounds) -> f64 {
    let distance = if len < bounds.min {
        bounds.min - len
    } else if len > bounds.max {
        len - bounds.max
    } else {
        0
    };
    (1.0 - LENGTH_PENALTY_PER_CHAR * distance as f64).max(LENGTH_SCORE_FLOOR)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
