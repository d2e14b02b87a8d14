use crate::core::config::RewriteSettings;
use crate::samples::Sample;

/// Body text shown for a few-shot example. Golden samples keep their opening
/// at length; others are cut paragraph-wise.
pub fn sample_excerpt(sample: &Sample, settings: &RewriteSettings) -> String {
    let golden = sample
        .quality_score
        .is_some_and(|score| score >= settings.golden_quality_threshold);
    if golden {
        return take_chars(&sample.body, settings.golden_excerpt_chars);
    }
    truncate_by_paragraph(&sample.body, settings.sample_excerpt_chars)
}

/// Keeps the most informative paragraphs within `max_chars`: figures score
/// highest, then quotations and attributions, then earlier position.
/// Selected paragraphs stay in their original order.
pub fn truncate_by_paragraph(body: &str, max_chars: usize) -> String {
    let paragraphs: Vec<&str> = body
        .lines()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if paragraphs.is_empty() {
        return take_chars(body, max_chars);
    }

    let mut ranked: Vec<(f64, usize)> = paragraphs
        .iter()
        .enumerate()
        .map(|(idx, para)| (paragraph_score(para) - idx as f64 * 0.5, idx))
        .collect();
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut chosen = Vec::new();
    let mut total = 0;
    for (_, idx) in ranked {
        let len = paragraphs[idx].chars().count();
        if total + len > max_chars {
            continue;
        }
        chosen.push(idx);
        total += len;
    }

    if chosen.is_empty() {
        return take_chars(paragraphs[0], max_chars);
    }
    chosen.sort_unstable();
    chosen
        .into_iter()
        .map(|idx| paragraphs[idx])
        .collect::<Vec<_>>()
        .join("\n")
}

fn paragraph_score(paragraph: &str) -> f64 {
    let mut score = 0.0;
    if has_figure(paragraph) {
        score += 10.0;
    }
    if paragraph.contains('“') || paragraph.contains('"') || paragraph.contains("表示") {
        score += 5.0;
    }
    score
}

fn has_figure(text: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();
    chars
        .windows(2)
        .any(|pair| pair[0].is_ascii_digit() && (pair[1] == '.' || pair[1] == '%'))
}

pub fn take_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(body: &str, quality: Option<f64>) -> Sample {
        Sample {
            id: "s".to_string(),
            column: "economic_data".to_string(),
            title: "t".to_string(),
            lead: String::new(),
            body: body.to_string(),
            embedding: None,
            quality_score: quality,
        }
    }

    #[test]
    fn prefers_paragraphs_with_figures() {
        let body = "开头是一段平铺直叙的背景介绍。\n销量增长12.5%，创新高。\n负责人表示将继续努力。";
        let excerpt = truncate_by_paragraph(body, 30);
        assert_eq!(excerpt, "销量增长12.5%，创新高。\n负责人表示将继续努力。");
    }

    #[test]
    fn oversized_first_choice_falls_back_to_prefix() {
        let excerpt = truncate_by_paragraph("一二三四五六七八九十", 4);
        assert_eq!(excerpt, "一二三四");
    }

    #[test]
    fn golden_samples_keep_long_excerpt() {
        let settings = RewriteSettings {
            sample_excerpt_chars: 5,
            golden_excerpt_chars: 8,
            ..RewriteSettings::default()
        };
        let body = "第一段很长很长很长\n第二段";
        assert_eq!(sample_excerpt(&sample(body, Some(0.95)), &settings).chars().count(), 8);
        assert_eq!(sample_excerpt(&sample(body, Some(0.5)), &settings), "第二段");
    }
}
