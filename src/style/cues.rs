use std::collections::BTreeMap;

const MAX_CUES_PER_CATEGORY: usize = 2;

/// Splits on Chinese sentence enders and line breaks, keeping the ender.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for (idx, ch) in text.char_indices() {
        let end = idx + ch.len_utf8();
        match ch {
            '。' | '！' | '？' | '!' | '?' | '；' => {
                push_trimmed(&text[start..end], &mut sentences);
                start = end;
            }
            '\n' => {
                push_trimmed(&text[start..idx], &mut sentences);
                start = end;
            }
            _ => {}
        }
    }
    push_trimmed(&text[start..], &mut sentences);
    sentences
}

fn push_trimmed<'a>(fragment: &'a str, out: &mut Vec<&'a str>) {
    let trimmed = fragment.trim();
    if !trimmed.is_empty() {
        out.push(trimmed);
    }
}

/// Up to two source sentences per category that carry one of its cue words.
pub fn extract_discourse_cues(
    text: &str,
    cues: &BTreeMap<String, Vec<String>>,
) -> BTreeMap<String, Vec<String>> {
    let sentences = split_sentences(text);
    let mut found = BTreeMap::new();

    for (category, keywords) in cues {
        let hits: Vec<String> = sentences
            .iter()
            .filter(|sentence| keywords.iter().any(|kw| sentence.contains(kw.as_str())))
            .take(MAX_CUES_PER_CATEGORY)
            .map(|sentence| sentence.to_string())
            .collect();
        found.insert(category.clone(), hits);
    }

    found
}

/// Number of categories with at least one cue word anywhere in `text`.
pub fn cue_coverage(text: &str, cues: &BTreeMap<String, Vec<String>>) -> usize {
    cues.values()
        .filter(|keywords| keywords.iter().any(|kw| text.contains(kw.as_str())))
        .count()
}
