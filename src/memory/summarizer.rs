//! 摘要：把短期消息与已有长期摘要合并为新的长期摘要
//!
//! 新摘要须通过 SummaryValidator 才会替换旧摘要；校验是策略扩展点，默认按禁用话题过滤。

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::PromptsSection;
use crate::llm::LlmClient;
use crate::memory::Message;

/// 摘要器：由短期消息与旧摘要生成候选摘要
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, turns: &[Message], previous: &str) -> Result<String, String>;
}

/// 摘要校验：返回 false 时保留旧摘要
pub trait SummaryValidator: Send + Sync {
    fn validate(&self, candidate: &str) -> bool;
}

/// LLM 摘要器：单次调用，旧摘要与新对话行拼进同一个 Prompt
pub struct LlmSummarizer {
    llm: Arc<dyn LlmClient>,
    prompt_template: String,
}

impl LlmSummarizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self::from_config(llm, &PromptsSection::default())
    }

    pub fn from_config(llm: Arc<dyn LlmClient>, prompts: &PromptsSection) -> Self {
        Self {
            llm,
            prompt_template: prompts.summarize.clone(),
        }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, turns: &[Message], previous: &str) -> Result<String, String> {
        let new_lines = turns
            .iter()
            .map(Message::to_line)
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = self
            .prompt_template
            .replace("{summary}", previous)
            .replace("{new_lines}", &new_lines);

        let summary = self.llm.complete(&[Message::user(prompt)]).await?;
        Ok(summary.trim().to_string())
    }
}

/// 禁用话题校验：候选摘要包含任一片段（忽略大小写）即拒绝
#[derive(Debug, Clone)]
pub struct DenyListValidator {
    forbidden: Vec<String>,
}

impl DenyListValidator {
    pub fn new(forbidden: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            forbidden: forbidden
                .into_iter()
                .map(|s| s.into().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

impl Default for DenyListValidator {
    fn default() -> Self {
        Self::new(["math homework"])
    }
}

impl SummaryValidator for DenyListValidator {
    fn validate(&self, candidate: &str) -> bool {
        let lower = candidate.to_lowercase();
        !self.forbidden.iter().any(|f| lower.contains(f.as_str()))
    }
}
