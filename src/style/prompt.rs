use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::column::ResolvedColumn;
use super::excerpt::sample_excerpt;
use super::guide::StyleGuide;
use crate::core::config::RewriteSettings;
use crate::llm::ChatMessage;
use crate::retrieval::ScoredSample;

const MAX_NEGATIVE_PHRASES: usize = 10;
const MAX_ALTERNATIVES: usize = 5;
const CUE_PREVIEW_CHARS: usize = 50;

pub struct PromptInput<'a> {
    /// Source text, already protected in strict mode.
    pub text: &'a str,
    pub column: &'a ResolvedColumn,
    pub samples: &'a [ScoredSample],
    pub cues: &'a BTreeMap<String, Vec<String>>,
    pub strict: bool,
}

/// Assembles the system persona and the few-shot user instruction.
pub struct PromptBuilder<'a> {
    guide: &'a StyleGuide,
    rewrite: &'a RewriteSettings,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(guide: &'a StyleGuide, rewrite: &'a RewriteSettings) -> Self {
        Self { guide, rewrite }
    }

    pub fn build(&self, input: &PromptInput<'_>) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.guide.system_prompt.clone()),
            ChatMessage::user(self.user_prompt(input)),
        ]
    }

    fn user_prompt(&self, input: &PromptInput<'_>) -> String {
        let mut out = String::new();
        let title = self.rewrite.title;
        let lead = self.rewrite.lead;

        let _ = writeln!(out, "【{}栏目写作规范】", input.column.label);
        if let Some(column) = self.guide.column(&input.column.id) {
            for line in &column.guidance {
                let _ = writeln!(out, "- {}", line);
            }
        }
        let _ = writeln!(out, "- 标题{}-{}字，导语{}-{}字", title.min, title.max, lead.min, lead.max);
        let _ = writeln!(out, "- 语言风格：{}", self.guide.tone);
        out.push('\n');

        if !self.guide.negative_phrases.is_empty() {
            let phrases: Vec<&str> = self
                .guide
                .negative_phrases
                .iter()
                .take(MAX_NEGATIVE_PHRASES)
                .map(String::as_str)
                .collect();
            let _ = writeln!(out, "【严格禁止使用】\n{}\n以及其他空洞官腔表述。", phrases.join("、"));
        }
        if !self.guide.positive_alternatives.is_empty() {
            let alternatives: Vec<&str> = self
                .guide
                .positive_alternatives
                .iter()
                .take(MAX_ALTERNATIVES)
                .map(String::as_str)
                .collect();
            let _ = writeln!(out, "【推荐使用】\n{}", alternatives.join("、"));
        }
        out.push('\n');

        if input.strict {
            out.push_str(STRICT_RULES);
            out.push('\n');
        }

        if input.cues.values().any(|cues| !cues.is_empty()) {
            out.push_str("【原文结构线索】\n");
            for (category, cues) in input.cues {
                if let Some(first) = cues.first() {
                    let preview: String = first.chars().take(CUE_PREVIEW_CHARS).collect();
                    let _ = writeln!(out, "- {}: {}", category, preview);
                }
            }
            out.push('\n');
        }

        for (idx, scored) in input.samples.iter().enumerate() {
            let sample = &scored.sample;
            let _ = writeln!(
                out,
                "【示例{}】\n标题：{}\n导语：{}\n正文片段：\n{}\n",
                idx + 1,
                sample.title,
                sample.lead,
                sample_excerpt(sample, self.rewrite)
            );
        }

        let _ = writeln!(
            out,
            "【改写任务】\n请学习上述示例的风格特征，将以下原文改写为符合{}栏目标准的稿件。\n\n原文：\n{}\n",
            input.column.label, input.text
        );

        out.push_str(OUTPUT_CONTRACT);
        out
    }
}

const STRICT_RULES: &str = "【严格模式约束】
1. 原文中形如 {{DATE_1}}、{{NUM_2}}、{{ORG_3}}、{{LIT_4}} 的占位符代表日期、数字和机构名称，必须逐字原样保留，不得改写、拆分或删除
2. 不得添加原文中不存在的数字或事实信息
3. 如发现冲突，优先保证事实准确
";

const OUTPUT_CONTRACT: &str = "【输出要求】
严格按照以下JSON格式输出，不要包含markdown代码块标记或其他内容：
{\"title\": \"...\", \"lead\": \"...\", \"body\": \"...\"}
正文按“背景→举措→结果→意义”组织，3-8段，段落之间用空行（\\n\\n）分隔。
";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::Sample;
    use crate::style::column::ColumnSource;
    use std::sync::Arc;

    fn column() -> ResolvedColumn {
        ResolvedColumn {
            id: "economic_data".to_string(),
            label: "经济运行".to_string(),
            source: ColumnSource::Requested,
        }
    }

    fn scored(title: &str) -> ScoredSample {
        ScoredSample {
            sample: Arc::new(Sample {
                id: title.to_string(),
                column: "economic_data".to_string(),
                title: title.to_string(),
                lead: "示例导语".to_string(),
                body: "示例正文增长5.1%。".to_string(),
                embedding: None,
                quality_score: None,
            }),
            lexical: 0.5,
            semantic: 0.5,
            score: 0.5,
        }
    }

    #[test]
    fn prompt_carries_guidance_examples_and_contract() {
        let guide = StyleGuide::default();
        let rewrite = RewriteSettings::default();
        let samples = vec![scored("示例一"), scored("示例二")];
        let cues = BTreeMap::from([("background".to_string(), vec!["今年以来销量上升。".to_string()])]);
        let column = column();

        let messages = PromptBuilder::new(&guide, &rewrite).build(&PromptInput {
            text: "原文内容",
            column: &column,
            samples: &samples,
            cues: &cues,
            strict: false,
        });

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        let user = &messages[1].content;
        assert!(user.contains("【经济运行栏目写作规范】"));
        assert!(user.contains("数字前置"));
        assert!(user.contains("标题15-30字，导语60-120字"));
        assert!(user.contains("【示例2】"));
        assert!(user.contains("- background: 今年以来销量上升。"));
        assert!(user.contains("\"title\""));
        assert!(!user.contains("严格模式"));
    }

    #[test]
    fn strict_prompt_explains_placeholders() {
        let guide = StyleGuide::default();
        let rewrite = RewriteSettings::default();
        let column = column();
        let messages = PromptBuilder::new(&guide, &rewrite).build(&PromptInput {
            text: "投入{{NUM_1}}",
            column: &column,
            samples: &[],
            cues: &BTreeMap::new(),
            strict: true,
        });
        let user = &messages[1].content;
        assert!(user.contains("【严格模式约束】"));
        assert!(user.contains("投入{{NUM_1}}"));
    }
}
