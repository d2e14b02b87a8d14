//! Deterministic clean-up of the model's title, lead and body.

use std::sync::OnceLock;

use regex::Regex;

use crate::core::config::{LengthBounds, RewriteSettings};
use crate::style::split_sentences;

const NUMBER_FIRST_COLUMN: &str = "economic_data";
const SENTENCE_ENDERS: [char; 3] = ['。', '！', '？'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostProcessed {
    pub title: String,
    pub lead: String,
    pub body: String,
    /// Bound violations that could not be repaired automatically.
    pub warnings: Vec<String>,
}

pub struct PostProcessor {
    title: LengthBounds,
    lead: LengthBounds,
}

impl PostProcessor {
    pub fn new(settings: &RewriteSettings) -> Self {
        Self {
            title: settings.title,
            lead: settings.lead,
        }
    }

    pub fn process(&self, title: &str, lead: &str, body: &str, column_id: &str) -> PostProcessed {
        let mut warnings = Vec::new();

        let body = self.process_body(body);
        let title = self.process_title(title, column_id);
        if char_len(&title) < self.title.min {
            tracing::warn!("Title too short ({} chars): {}", char_len(&title), title);
            warnings.push(format!(
                "title has {} chars, below the minimum of {}",
                char_len(&title),
                self.title.min
            ));
        }

        let lead = self.process_lead(lead, &body);
        if char_len(&lead) < self.lead.min {
            warnings.push(format!(
                "lead has {} chars, below the minimum of {}",
                char_len(&lead),
                self.lead.min
            ));
        }

        PostProcessed {
            title,
            lead,
            body,
            warnings,
        }
    }

    pub fn process_title(&self, title: &str, column_id: &str) -> String {
        let mut title: String = title
            .chars()
            .filter(|c| *c != '!' && *c != '！')
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        if column_id == NUMBER_FIRST_COLUMN {
            title = move_number_to_front(&title);
        }

        let title = title.trim();
        if char_len(title) > self.title.max {
            return title.chars().take(self.title.max).collect::<String>().trim_end().to_string();
        }
        title.to_string()
    }

    /// Collapses whitespace, borrows body sentences when too short and cuts
    /// at a sentence end when too long.
    pub fn process_lead(&self, lead: &str, body: &str) -> String {
        let mut lead = normalize_punctuation(&lead.split_whitespace().collect::<Vec<_>>().join(" "));

        if char_len(&lead) < self.lead.min {
            for sentence in split_sentences(body) {
                if char_len(&lead) >= self.lead.min {
                    break;
                }
                if lead.contains(sentence) {
                    continue;
                }
                append_sentence(&mut lead, sentence);
            }
        }

        smart_truncate(&lead, self.lead.max)
    }

    pub fn process_body(&self, body: &str) -> String {
        body.lines()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(normalize_punctuation)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn title_number_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\d+(?:,\d{3})*(?:\.\d+)?(?:万亿|亿|万|千|百)?(?:箱|元|件|人|吨|%|个百分点)?").ok()
    })
    .as_ref()
}

/// `山东卷烟销售45.2万箱` becomes `45.2万箱：山东卷烟销售`.
pub fn move_number_to_front(title: &str) -> String {
    let Some(re) = title_number_regex() else {
        return title.to_string();
    };
    // dates stay where they are
    let Some(m) = re.find_iter(title).find(|m| {
        !title[m.end()..].starts_with(['年', '月', '日', '-', '.'])
    }) else {
        return title.to_string();
    };
    if m.start() == 0 {
        return title.to_string();
    }

    let number = m.as_str();
    let rest = format!("{}{}", &title[..m.start()], &title[m.end()..]);
    let rest = rest.trim().trim_start_matches(['：', ':']).trim();
    if rest.is_empty() {
        return number.to_string();
    }
    format!("{}：{}", number, rest)
}

/// Cuts to at most `max_chars`, preferring a sentence end in the last 30%.
pub fn smart_truncate(text: &str, max_chars: usize) -> String {
    if char_len(text) <= max_chars {
        return text.to_string();
    }
    let chars: Vec<char> = text.chars().take(max_chars).collect();
    let last_end = chars.iter().rposition(|c| SENTENCE_ENDERS.contains(c));
    match last_end {
        Some(pos) if pos as f64 > max_chars as f64 * 0.7 => chars[..=pos].iter().collect(),
        _ if max_chars == 0 => String::new(),
        _ => {
            let mut out: String = chars[..max_chars - 1].iter().collect();
            out.push('…');
            out
        }
    }
}

/// Collapses repeated CJK punctuation and converts ASCII `, ; : ! ?` to
/// full width unless a neighbour is a digit, `:` or `/` (times, URLs, 3,000).
pub fn normalize_punctuation(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    for (idx, &c) in chars.iter().enumerate() {
        if matches!(c, '。' | '，' | '！' | '？') && out.ends_with(c) {
            continue;
        }

        let full_width = match c {
            ',' => Some('，'),
            ';' => Some('；'),
            ':' => Some('：'),
            '!' => Some('！'),
            '?' => Some('？'),
            _ => None,
        };

        match full_width {
            Some(fw) => {
                let prev = idx.checked_sub(1).and_then(|i| chars.get(i));
                let next = chars.get(idx + 1);
                if is_protected_context(prev) || is_protected_context(next) {
                    out.push(c);
                } else if !out.ends_with(fw) {
                    out.push(fw);
                }
            }
            None => out.push(c),
        }
    }

    out
}

fn is_protected_context(c: Option<&char>) -> bool {
    c.is_some_and(|c| c.is_ascii_digit() || *c == ':' || *c == '/')
}

/// Appends `sentence`, closing the previous fragment with `。` first when it
/// has no terminal punctuation, so figures at the seam never fuse.
pub fn append_sentence(out: &mut String, sentence: &str) {
    if !out.is_empty() && !out.ends_with(|c: char| SENTENCE_ENDERS.contains(&c) || matches!(c, '；' | '，' | '：')) {
        out.push('。');
    }
    out.push_str(sentence);
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
