//! Mock LLM 客户端（用于测试与离线运行，无需 API）
//!
//! 按规则返回固定字符串：请求中任一消息包含规则的关键片段即命中，按添加顺序匹配第一条；
//! 没有规则命中时回显最后一条 User 消息。

use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::{Message, Role};

/// Mock 客户端：脚本化应答，记录收到的每次请求
#[derive(Debug, Default)]
pub struct MockLlmClient {
    rules: Vec<(String, Result<String, String>)>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求包含 `pattern` 时返回 `reply`
    pub fn with_reply(mut self, pattern: impl Into<String>, reply: impl Into<String>) -> Self {
        self.rules.push((pattern.into(), Ok(reply.into())));
        self
    }

    /// 请求包含 `pattern` 时返回错误
    pub fn with_failure(mut self, pattern: impl Into<String>, error: impl Into<String>) -> Self {
        self.rules.push((pattern.into(), Err(error.into())));
        self
    }

    /// 已收到的请求数
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// 已收到的全部请求（按顺序）
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }

        for (pattern, outcome) in &self.rules {
            if messages.iter().any(|m| m.content.contains(pattern.as_str())) {
                return outcome.clone();
            }
        }

        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        Ok(format!("Echo from Mock: {}", last_user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rules_match_in_order() {
        let llm = MockLlmClient::new()
            .with_reply("relevant", "store")
            .with_failure("Summarize", "offline")
            .with_reply("Hello", "Hi there");

        let r = llm.complete(&[Message::user("is Hello relevant?")]).await;
        assert_eq!(r, Ok("store".to_string()));

        let r = llm.complete(&[Message::user("Summarize this")]).await;
        assert_eq!(r, Err("offline".to_string()));

        let r = llm.complete(&[Message::system("sys"), Message::user("Hello")]).await;
        assert_eq!(r, Ok("Hi there".to_string()));

        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn test_echo_fallback() {
        let llm = MockLlmClient::new();
        let r = llm.complete(&[Message::user("ping")]).await.unwrap();
        assert_eq!(r, "Echo from Mock: ping");
    }
}
