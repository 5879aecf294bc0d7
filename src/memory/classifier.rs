//! 相关性与分层分类策略
//!
//! 每条新消息先过相关性判断，相关才分类；分类结果是层的集合（可为空、一个或全部三个）。
//! TierClassifier 把判断策略与记忆管理器解耦：LLM 判断是一种实现，本地规则是另一种。

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;

use crate::config::PromptsSection;
use crate::core::MemoryError;
use crate::llm::LlmClient;
use crate::memory::{MemoryTier, Message, TierSet};

/// 分层判断策略
#[async_trait]
pub trait TierClassifier: Send + Sync {
    /// 该消息是否值得保存
    async fn evaluate_relevance(&self, message: &Message) -> Result<bool, MemoryError>;

    /// 该消息应写入哪些层
    async fn classify(&self, message: &Message) -> Result<TierSet, MemoryError>;

    /// 相关性门控 + 分类；不相关时返回空集合
    async fn assign(&self, message: &Message) -> Result<TierSet, MemoryError> {
        if !self.evaluate_relevance(message).await? {
            tracing::info!("Conversation deemed not relevant for storage.");
            return Ok(TierSet::new());
        }
        self.classify(message).await
    }
}

static SHORT_TERM_RE: OnceLock<Regex> = OnceLock::new();
static LONG_TERM_RE: OnceLock<Regex> = OnceLock::new();
static SESSION_RE: OnceLock<Regex> = OnceLock::new();

/// 从自由文本中提取层标签（子串匹配，忽略大小写；接受 short_term / short-term / short term 等写法）
pub fn parse_tiers(text: &str) -> TierSet {
    let short = SHORT_TERM_RE.get_or_init(|| Regex::new(r"(?i)short[_\- ]term").unwrap());
    let long = LONG_TERM_RE.get_or_init(|| Regex::new(r"(?i)long[_\- ]term").unwrap());
    let session = SESSION_RE.get_or_init(|| Regex::new(r"(?i)session").unwrap());

    let mut tiers = TierSet::new();
    if short.is_match(text) {
        tiers.insert(MemoryTier::ShortTerm);
    }
    if long.is_match(text) {
        tiers.insert(MemoryTier::LongTerm);
    }
    if session.is_match(text) {
        tiers.insert(MemoryTier::Session);
    }
    tiers
}

/// 回复中含 "store"（忽略大小写）即视为相关，其余一律丢弃
pub fn is_affirmative(reply: &str) -> bool {
    reply.to_lowercase().contains("store")
}

/// 将消息渲染为 Prompt 中的 {conversation}
fn render_conversation(message: &Message) -> String {
    serde_json::json!({
        "role": message.role.as_str(),
        "content": message.content,
    })
    .to_string()
}

/// LLM 分类器：两次独立调用（相关性、分层），Prompt 模板可配置
pub struct LlmTierClassifier {
    llm: Arc<dyn LlmClient>,
    relevance_prompt: String,
    classify_prompt: String,
}

impl LlmTierClassifier {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self::from_config(llm, &PromptsSection::default())
    }

    pub fn from_config(llm: Arc<dyn LlmClient>, prompts: &PromptsSection) -> Self {
        Self {
            llm,
            relevance_prompt: prompts.relevance.clone(),
            classify_prompt: prompts.classify.clone(),
        }
    }

    async fn ask(&self, template: &str, message: &Message) -> Result<String, MemoryError> {
        let prompt = template.replace("{conversation}", &render_conversation(message));
        self.llm
            .complete(&[Message::user(prompt)])
            .await
            .map_err(MemoryError::Classification)
    }
}

#[async_trait]
impl TierClassifier for LlmTierClassifier {
    async fn evaluate_relevance(&self, message: &Message) -> Result<bool, MemoryError> {
        let decision = self.ask(&self.relevance_prompt, message).await?;
        tracing::debug!("Relevance decision: {}", decision.trim());
        Ok(is_affirmative(&decision))
    }

    async fn classify(&self, message: &Message) -> Result<TierSet, MemoryError> {
        let classification = self.ask(&self.classify_prompt, message).await?;
        let tiers = parse_tiers(&classification);
        tracing::debug!("Classification '{}' -> {:?}", classification.trim(), tiers);
        Ok(tiers)
    }
}

/// 本地规则分类器：不调用 LLM，适合离线或测试
///
/// 寒暄类短句不保存；其余进入短期记忆；出现长期类关键词或内容很长时加入长期；
/// 出现会话类关键词时加入会话记忆。
#[derive(Debug, Clone)]
pub struct RuleTierClassifier {
    filler: Vec<String>,
    long_term_keywords: Vec<String>,
    session_keywords: Vec<String>,
    long_content_chars: usize,
}

impl Default for RuleTierClassifier {
    fn default() -> Self {
        Self {
            filler: ["ok", "okay", "thanks", "thank you", "hi", "hello", "bye", "yes", "no"]
                .into_iter()
                .map(String::from)
                .collect(),
            long_term_keywords: ["remember", "my name is", "i prefer", "always", "never"]
                .into_iter()
                .map(String::from)
                .collect(),
            session_keywords: ["today", "right now", "this session", "currently"]
                .into_iter()
                .map(String::from)
                .collect(),
            long_content_chars: 500,
        }
    }
}

impl RuleTierClassifier {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TierClassifier for RuleTierClassifier {
    async fn evaluate_relevance(&self, message: &Message) -> Result<bool, MemoryError> {
        let text = message
            .content
            .trim()
            .trim_end_matches(['.', '!', '?'])
            .to_lowercase();
        Ok(!text.is_empty() && !self.filler.iter().any(|f| *f == text))
    }

    async fn classify(&self, message: &Message) -> Result<TierSet, MemoryError> {
        let text = message.content.to_lowercase();
        let mut tiers = TierSet::from([MemoryTier::ShortTerm]);
        if self.long_term_keywords.iter().any(|k| text.contains(k.as_str()))
            || message.content.chars().count() > self.long_content_chars
        {
            tiers.insert(MemoryTier::LongTerm);
        }
        if self.session_keywords.iter().any(|k| text.contains(k.as_str())) {
            tiers.insert(MemoryTier::Session);
        }
        Ok(tiers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    #[test]
    fn test_parse_tiers() {
        assert_eq!(
            parse_tiers("short_term and session"),
            TierSet::from([MemoryTier::ShortTerm, MemoryTier::Session])
        );
        assert_eq!(parse_tiers("Long-Term storage"), TierSet::from([MemoryTier::LongTerm]));
        assert_eq!(parse_tiers("SHORT TERM, LONG_TERM, SESSION").len(), 3);
        assert!(parse_tiers("none of them").is_empty());
    }

    #[test]
    fn test_is_affirmative() {
        assert!(is_affirmative("Store it."));
        assert!(is_affirmative("You should STORE this"));
        assert!(!is_affirmative("discard"));
        assert!(!is_affirmative(""));
    }

    #[tokio::test]
    async fn test_llm_classifier_gate_and_fan_out() {
        let llm = Arc::new(
            MockLlmClient::new()
                .with_reply("relevant for future reference", "store")
                .with_reply("Classify this memory", "short_term and session"),
        );
        let classifier = LlmTierClassifier::new(llm.clone());

        let tiers = classifier.assign(&Message::user("I live in Paris")).await.unwrap();
        assert_eq!(tiers, TierSet::from([MemoryTier::ShortTerm, MemoryTier::Session]));
        assert_eq!(llm.call_count(), 2);

        let calls = llm.calls();
        assert!(calls[0][0].content.contains(r#""content":"I live in Paris""#));
    }

    #[tokio::test]
    async fn test_llm_classifier_discard_skips_classify() {
        let llm = Arc::new(MockLlmClient::new().with_reply("relevant for future reference", "discard"));
        let classifier = LlmTierClassifier::new(llm.clone());

        let tiers = classifier.assign(&Message::user("hm")).await.unwrap();
        assert!(tiers.is_empty());
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_llm_classifier_failure_propagates() {
        let llm = Arc::new(MockLlmClient::new().with_failure("relevant", "connection refused"));
        let classifier = LlmTierClassifier::new(llm);

        let err = classifier.assign(&Message::user("hi")).await.unwrap_err();
        assert!(matches!(err, MemoryError::Classification(ref e) if e == "connection refused"));
    }

    #[tokio::test]
    async fn test_rule_classifier() {
        let classifier = RuleTierClassifier::new();

        assert!(classifier.assign(&Message::user("Thanks!")).await.unwrap().is_empty());

        let tiers = classifier
            .assign(&Message::user("Please remember my name is Kim"))
            .await
            .unwrap();
        assert_eq!(tiers, TierSet::from([MemoryTier::ShortTerm, MemoryTier::LongTerm]));

        let tiers = classifier
            .assign(&Message::assistant("Today we are debugging the parser"))
            .await
            .unwrap();
        assert_eq!(tiers, TierSet::from([MemoryTier::ShortTerm, MemoryTier::Session]));
    }
}
