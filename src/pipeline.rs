use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::core::config::Settings;
use crate::core::errors::ApiError;
use crate::llm::{parse_article, LlmService, ParseMode};
use crate::postprocess::{append_sentence, char_len, normalize_punctuation, PostProcessor};
use crate::protect::{EntityAudit, EntityProtector, ProtectError};
use crate::quality::{QualityScorer, QualityScores};
use crate::retrieval::{HybridRetriever, RetrievedRef};
use crate::samples::SampleStore;
use crate::style::{
    extract_discourse_cues, resolve_column, split_sentences, PromptBuilder, PromptInput,
    ResolvedColumn,
};

#[derive(Debug, Clone, Default)]
pub struct RewriteRequest {
    pub text: String,
    /// Requested column labels, most preferred first.
    pub columns: Vec<String>,
    pub strict_mode: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RewriteResult {
    pub title: String,
    pub lead: String,
    pub body: String,
    pub scores: QualityScores,
    pub meta: RewriteMeta,
}

#[derive(Debug, Clone, Serialize)]
pub struct RewriteMeta {
    pub request_id: String,
    pub column: ResolvedColumn,
    pub samples: Vec<RetrievedRef>,
    pub strict_mode: bool,
    pub model: String,
    pub parse_mode: ParseMode,
    pub needs_review: bool,
    pub review_reasons: Vec<String>,
    pub entity_audit: EntityAudit,
    pub repaired_numbers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_note: Option<String>,
    pub latency_ms: u64,
    pub generated_at: DateTime<Utc>,
}

/// Runs one rewrite end to end. Shared read-only between requests.
pub struct RewriteService {
    settings: Arc<Settings>,
    retriever: HybridRetriever,
    protector: EntityProtector,
    llm: LlmService,
}

impl RewriteService {
    pub fn new(
        settings: Arc<Settings>,
        store: Arc<SampleStore>,
        llm: LlmService,
    ) -> Result<Self, ProtectError> {
        let protector = EntityProtector::new(&settings.protection)?;
        let retriever = HybridRetriever::new(
            store,
            settings.retrieval.clone(),
            settings.style.column_keywords(),
        );
        Ok(Self {
            settings,
            retriever,
            protector,
            llm,
        })
    }

    pub fn llm(&self) -> &LlmService {
        &self.llm
    }

    pub fn retriever(&self) -> &HybridRetriever {
        &self.retriever
    }

    pub async fn rewrite(&self, request: RewriteRequest) -> Result<RewriteResult, ApiError> {
        let started = Instant::now();
        let request_id = Uuid::new_v4().to_string();
        let settings = &*self.settings;

        let text = request.text.trim();
        if text.is_empty() {
            return Err(ApiError::BadRequest("text must not be empty".to_string()));
        }
        let input_chars = char_len(text);
        if input_chars > settings.rewrite.max_input_chars {
            return Err(ApiError::BadRequest(format!(
                "text has {} chars, limit is {}",
                input_chars, settings.rewrite.max_input_chars
            )));
        }

        let column = resolve_column(
            &settings.style,
            &request.columns,
            text,
            &settings.rewrite.default_column,
        );
        tracing::info!(
            "[{}] Rewrite started: {} chars, column {} ({:?}), strict={}",
            request_id,
            input_chars,
            column.id,
            column.source,
            request.strict_mode
        );

        let query_embedding = self.embed_query(text, &request_id).await;
        let samples = self.retriever.retrieve(
            text,
            query_embedding.as_deref(),
            Some(&column.id),
            settings.retrieval.top_k,
        );

        let protected = request.strict_mode.then(|| self.protector.protect(text));
        let prompt_text = protected.as_ref().map_or(text, |p| p.text.as_str());
        let cues = extract_discourse_cues(text, &settings.style.discourse_cues);

        let messages = PromptBuilder::new(&settings.style, &settings.rewrite).build(&PromptInput {
            text: prompt_text,
            column: &column,
            samples: &samples,
            cues: &cues,
            strict: request.strict_mode,
        });

        let reply = self.llm.chat(messages).await.map_err(|err| {
            tracing::error!("[{}] LLM call failed: {}", request_id, err);
            ApiError::from(err)
        })?;
        let parsed = parse_article(&reply);
        tracing::debug!("[{}] Parsed reply via {:?}", request_id, parsed.mode);

        let mut review_reasons = Vec::new();
        if parsed.is_degraded() {
            review_reasons.push(format!("model reply was not clean JSON (parsed as {:?})", parsed.mode));
        }

        let (mut title, mut lead, mut body) = (parsed.title, parsed.lead, parsed.body);
        let mut leaked = Vec::new();
        if let Some(protected) = &protected {
            for field in [&mut title, &mut lead, &mut body] {
                let restored = self.protector.restore(field, &protected.map);
                leaked.extend(restored.leaked);
                *field = restored.text;
            }
            if !leaked.is_empty() {
                tracing::warn!("[{}] Stripped unknown placeholders: {:?}", request_id, leaked);
                review_reasons.push(format!("unknown placeholders removed: {}", leaked.join(", ")));
            }
        }

        if title.trim().is_empty() {
            title = fallback_title(&body);
        }

        let processed = PostProcessor::new(&settings.rewrite).process(&title, &lead, &body, &column.id);
        review_reasons.extend(processed.warnings);
        let (title, lead, mut body) = (processed.title, processed.lead, processed.body);

        let mut repaired_numbers = Vec::new();
        if request.strict_mode {
            repaired_numbers = self.repair_missing_numbers(text, &title, &lead, &mut body);
            if !repaired_numbers.is_empty() {
                tracing::warn!(
                    "[{}] Restored dropped figures from the source: {:?}",
                    request_id,
                    repaired_numbers
                );
                review_reasons.push(format!(
                    "source figures re-inserted: {}",
                    repaired_numbers.join(", ")
                ));
            }
        }

        let output = format!("{}\n{}\n{}", title, lead, body);
        let mut audit = self.protector.verify(text, &output);
        audit.leaked_placeholders = leaked;
        if !audit.new_numbers.is_empty() {
            review_reasons.push(format!(
                "figures not found in the source: {}",
                audit.new_numbers.join(", ")
            ));
        }

        let scorer = QualityScorer::new(&settings.quality, &settings.rewrite, &settings.style);
        let scores = scorer.score(&title, &lead, &body, &audit);
        if scorer.needs_review(&scores) {
            review_reasons.push(format!(
                "quality score {:.2} below threshold {:.2}",
                scores.overall, settings.quality.review_threshold
            ));
        }

        let latency_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            "[{}] Rewrite finished in {}ms: score {:.2}, review={}",
            request_id,
            latency_ms,
            scores.overall,
            !review_reasons.is_empty()
        );

        Ok(RewriteResult {
            title,
            lead,
            body,
            scores,
            meta: RewriteMeta {
                request_id,
                column,
                samples: samples.iter().map(RetrievedRef::from).collect(),
                strict_mode: request.strict_mode,
                model: self.llm.model().to_string(),
                parse_mode: parsed.mode,
                needs_review: !review_reasons.is_empty(),
                review_reasons,
                entity_audit: audit,
                repaired_numbers,
                style_note: parsed.style_note,
                latency_ms,
                generated_at: Utc::now(),
            },
        })
    }

    async fn embed_query(&self, text: &str, request_id: &str) -> Option<Vec<f32>> {
        if !self.llm.embeddings_enabled() {
            return None;
        }
        match self.llm.embed(&[text.to_string()]).await {
            Ok(mut vectors) => vectors.pop(),
            Err(err) => {
                tracing::warn!("[{}] Query embedding failed, using concept overlap: {}", request_id, err);
                None
            }
        }
    }

    /// Appends the source sentence of every figure the rewrite dropped, so each
    /// source number reappears verbatim. Returns the repaired numbers.
    fn repair_missing_numbers(&self, source: &str, title: &str, lead: &str, body: &mut String) -> Vec<String> {
        let output = format!("{}\n{}\n{}", title, lead, body);
        let missing = self.protector.missing_numbers(source, &output);
        if missing.is_empty() {
            return missing;
        }

        let sentences = split_sentences(source);
        let mut appended: Vec<&str> = Vec::new();
        for number in &missing {
            let carrier = sentences
                .iter()
                .find(|sentence| self.protector.numbers(sentence).contains(number));
            if let Some(sentence) = carrier {
                if !appended.contains(sentence) {
                    appended.push(*sentence);
                }
            }
        }

        let mut paragraph = String::new();
        for sentence in &appended {
            append_sentence(&mut paragraph, sentence);
        }
        push_paragraph(body, &normalize_punctuation(&paragraph));

        // last resort: list whatever the sentence splice still could not carry
        let output = format!("{}\n{}\n{}", title, lead, body);
        let residual = self.protector.missing_numbers(source, &output);
        if !residual.is_empty() {
            tracing::warn!("Figures still missing after sentence repair: {:?}", residual);
            push_paragraph(body, &format!("（原文数据：{}）", residual.join("、")));
        }
        missing
    }
}

fn push_paragraph(body: &mut String, paragraph: &str) {
    if paragraph.is_empty() {
        return;
    }
    if !body.is_empty() {
        body.push_str("\n\n");
    }
    body.push_str(paragraph);
}

fn fallback_title(body: &str) -> String {
    split_sentences(body)
        .first()
        .map(|sentence| sentence.trim_end_matches(['。', '！', '？', '；']).to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatRequest, LlmError, LlmProvider};
    use crate::samples::Sample;
    use async_trait::async_trait;
    use regex::Regex;

    const SOURCE: &str = "2024年10月15日，山东省烟草专卖局召开会议。今年以来，全省销售卷烟45.2万箱，同比增长3.5%。全省投入资金5000万元推进数字化改造。";

    enum Reply {
        /// Copies every placeholder of the prompt into a JSON article.
        EchoPlaceholders,
        Fixed(String),
    }

    struct FakeProvider {
        reply: Reply,
    }

    #[async_trait]
    impl LlmProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        async fn health_check(&self) -> Result<bool, LlmError> {
            Ok(true)
        }

        async fn chat(&self, request: &ChatRequest, _model_id: &str) -> Result<String, LlmError> {
            match &self.reply {
                Reply::Fixed(text) => Ok(text.clone()),
                Reply::EchoPlaceholders => {
                    let prompt = request
                        .messages
                        .last()
                        .map(|m| m.content.clone())
                        .unwrap_or_default();
                    let source = prompt.split("原文：").last().unwrap_or_default();
                    let re = Regex::new(r"\{\{[A-Z]+_\d+\}\}").expect("regex");
                    let tokens: Vec<&str> = re.find_iter(source).map(|m| m.as_str()).collect();
                    Ok(serde_json::json!({
                        "title": "全省卷烟销售稳中有进结构持续优化成效明显",
                        "lead": format!("{}，全省烟草行业推进数字化转型，卷烟销售同比增长，市场运行平稳，经营效益持续提升。", tokens.join("，")),
                        "body": format!("今年以来，面对复杂形势，全省推进营销改革。\n\n{}。\n\n全年实现增长{{{{NUM_99}}}}。", tokens.join("，")),
                    })
                    .to_string())
                }
            }
        }

        async fn embed(&self, _inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, LlmError> {
            Err(LlmError::Disabled("embedding model"))
        }
    }

    fn service(reply: Reply) -> RewriteService {
        let samples = vec![
            Sample {
                id: "s1".to_string(),
                column: "economic_data".to_string(),
                title: "全省卷烟销售同比增长".to_string(),
                lead: "今年以来，全省卷烟销售保持增长。".to_string(),
                body: "销售收入同比增长8.1%。\n结构持续优化。".to_string(),
                embedding: None,
                quality_score: Some(0.95),
            },
            Sample {
                id: "s2".to_string(),
                column: "news_general".to_string(),
                title: "专卖局召开工作会议".to_string(),
                lead: "会议部署全年工作。".to_string(),
                body: "会议强调推进改革。".to_string(),
                embedding: None,
                quality_score: None,
            },
        ];
        let store = Arc::new(SampleStore::from_samples(samples).expect("store"));
        let settings = Arc::new(Settings::default());
        let llm = LlmService::new(Arc::new(FakeProvider { reply }), settings.llm.clone());
        RewriteService::new(settings, store, llm).expect("service")
    }

    fn request(text: &str, strict: bool) -> RewriteRequest {
        RewriteRequest {
            text: text.to_string(),
            columns: vec!["经济运行".to_string()],
            strict_mode: strict,
        }
    }

    #[tokio::test]
    async fn strict_mode_restores_every_figure() {
        let service = service(Reply::EchoPlaceholders);
        let result = service.rewrite(request(SOURCE, true)).await.expect("result");

        let output = format!("{}\n{}\n{}", result.title, result.lead, result.body);
        for number in service.protector.numbers(SOURCE) {
            assert!(
                service.protector.numbers(&output).contains(&number),
                "missing {}",
                number
            );
        }
        assert!(!output.contains("{{"));
        assert_eq!(result.meta.entity_audit.leaked_placeholders, vec!["NUM_99".to_string()]);
        assert!(result.meta.needs_review);
        assert_eq!(result.meta.column.id, "economic_data");
        assert_eq!(result.meta.samples.len(), 2);
        assert_eq!(result.meta.samples[0].id, "s1");
    }

    #[tokio::test]
    async fn strict_mode_reinserts_dropped_figures() {
        let reply = serde_json::json!({
            "title": "全省卷烟销售稳中有进结构持续优化",
            "lead": "今年以来，全省卷烟销售保持增长，结构持续优化，经营效益稳步提升，数字化改造全面推进，市场运行平稳有序。",
            "body": "全省推进数字化改造。\n\n销售实现增长。\n\n结构持续优化。"
        })
        .to_string();
        let service = service(Reply::Fixed(reply));
        let result = service.rewrite(request(SOURCE, true)).await.expect("result");

        assert!(result.meta.repaired_numbers.contains(&"45.2".to_string()));
        assert!(result.body.contains("全省销售卷烟45.2万箱，同比增长3.5%。"));
        let output = format!("{}\n{}\n{}", result.title, result.lead, result.body);
        assert!(service.protector.missing_numbers(SOURCE, &output).is_empty());
        assert!(result.meta.needs_review);
    }

    #[tokio::test]
    async fn repaired_figures_on_a_line_break_stay_separate() {
        let source = "本次共有企业12\n3家企业获得表彰。";
        let reply = serde_json::json!({
            "title": "各地积极推进企业表彰工作取得明显成效",
            "lead": "各地积极推进企业表彰工作，营造比学赶超的良好氛围，激发企业干事创业热情，推动行业高质量发展迈出新步伐。",
            "body": "各地积极推进。"
        })
        .to_string();
        let service = service(Reply::Fixed(reply));
        let result = service.rewrite(request(source, true)).await.expect("result");

        let output = format!("{}\n{}\n{}", result.title, result.lead, result.body);
        assert!(service.protector.missing_numbers(source, &output).is_empty(), "output: {}", output);
        assert!(result.body.contains("本次共有企业12。3家企业获得表彰。"));
        assert!(!result.body.contains("123"));
    }

    #[tokio::test]
    async fn unstructured_reply_is_degraded_not_failed() {
        let service = service(Reply::Fixed("这是一段没有结构的改写结果。第二句话。".to_string()));
        let result = service.rewrite(request(SOURCE, false)).await.expect("result");

        assert_eq!(result.meta.parse_mode, ParseMode::Raw);
        assert!(result.meta.needs_review);
        assert_eq!(result.title, "这是一段没有结构的改写结果");
        assert!(char_len(&result.lead) <= 120);
    }

    #[tokio::test]
    async fn lengths_stay_within_maxima() {
        let reply = serde_json::json!({
            "title": "标".repeat(80),
            "lead": format!("{}。", "导".repeat(300)),
            "body": "正文。"
        })
        .to_string();
        let service = service(Reply::Fixed(reply));
        let result = service.rewrite(request(SOURCE, false)).await.expect("result");

        let settings = Settings::default();
        assert!(char_len(&result.title) <= settings.rewrite.title.max);
        assert!(char_len(&result.lead) <= settings.rewrite.lead.max);
    }

    #[tokio::test]
    async fn rejects_empty_and_oversized_input() {
        let service = service(Reply::Fixed("{}".to_string()));
        assert!(matches!(
            service.rewrite(request("   ", false)).await,
            Err(ApiError::BadRequest(_))
        ));
        let huge = "字".repeat(20_001);
        assert!(matches!(
            service.rewrite(request(&huge, false)).await,
            Err(ApiError::BadRequest(_))
        ));
    }
}
