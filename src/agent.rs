//! 对话 Agent
//!
//! 每轮：用长期摘要 + 会话记忆拼 system prompt，附上短期记忆与本轮输入请求回复；
//! 然后用户消息与助手回复各自走一遍分类写入，最后做一次摘要。

use std::sync::Arc;

use futures_util::StreamExt;

use crate::config::AppConfig;
use crate::core::{ChatError, MemoryError};
use crate::llm::{create_llm_from_config, LlmClient};
use crate::memory::{create_memory_manager, MemoryManager, MemoryTier, Message};

/// 退出关键词（忽略大小写）
const EXIT_COMMANDS: [&str; 3] = ["exit", "quit", "bye"];

/// 输入清洗：去掉首尾空白
pub fn sanitize_user_input(input: &str) -> &str {
    input.trim()
}

pub fn is_exit_command(input: &str) -> bool {
    EXIT_COMMANDS
        .iter()
        .any(|c| c.eq_ignore_ascii_case(sanitize_user_input(input)))
}

/// 对话 Agent：持有 LLM 与记忆管理器
pub struct ChatAgent {
    name: String,
    llm: Arc<dyn LlmClient>,
    memory: Box<dyn MemoryManager>,
}

impl ChatAgent {
    pub fn new(name: impl Into<String>, llm: Arc<dyn LlmClient>, memory: Box<dyn MemoryManager>) -> Self {
        Self {
            name: name.into(),
            llm,
            memory,
        }
    }

    /// 从配置创建 LLM 与记忆管理器（两者共用同一个 LLM 客户端）
    pub fn from_config(cfg: &AppConfig) -> Self {
        let llm = create_llm_from_config(cfg);
        let memory = create_memory_manager(cfg, llm.clone());
        Self::new(cfg.app.name.clone(), llm, memory)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn memory(&self) -> &dyn MemoryManager {
        self.memory.as_ref()
    }

    pub fn load_memory(&mut self) -> Result<(), MemoryError> {
        self.memory.load_memory()?;
        tracing::debug!("Memory loaded successfully.");
        Ok(())
    }

    pub fn save_memory(&self) -> Result<(), MemoryError> {
        self.memory.save_memory()?;
        tracing::debug!("Memory saved successfully.");
        Ok(())
    }

    /// system prompt：助手名 + 长期摘要 + 会话记忆（每行 `role: content`）
    pub fn system_prompt(&self) -> String {
        let long_term = self.memory.get_memory(MemoryTier::LongTerm).summary();
        let session = self
            .memory
            .get_memory(MemoryTier::Session)
            .messages()
            .iter()
            .map(Message::to_line)
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "You are a helpful assistant named {}. Use the following information to assist in your responses:\n\n\
Long-term memory: {}\n\n\
Session information: {}",
            self.name, long_term, session
        )
    }

    /// 本轮请求：system prompt + 短期记忆 + 用户输入
    pub fn build_messages(&self, user_input: &str) -> Vec<Message> {
        let short_term = self.memory.get_memory(MemoryTier::ShortTerm).messages();
        let mut messages = Vec::with_capacity(short_term.len() + 2);
        messages.push(Message::system(self.system_prompt()));
        messages.extend_from_slice(short_term);
        messages.push(Message::user(user_input));
        messages
    }

    pub async fn respond(&mut self, user_input: &str) -> Result<String, ChatError> {
        self.respond_with(user_input, |_| {}).await
    }

    /// 流式生成回复（每个分片回调一次），随后写入记忆并摘要
    pub async fn respond_with(
        &mut self,
        user_input: &str,
        mut on_chunk: impl FnMut(&str),
    ) -> Result<String, ChatError> {
        let messages = self.build_messages(user_input);

        let mut stream = self
            .llm
            .complete_stream(&messages)
            .await
            .map_err(ChatError::CollaboratorCall)?;
        let mut reply = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(ChatError::CollaboratorCall)?;
            on_chunk(&chunk);
            reply.push_str(&chunk);
        }

        self.memory
            .add_to_memory_with_classification(Message::user(user_input))
            .await?;
        self.memory
            .add_to_memory_with_classification(Message::assistant(reply.clone()))
            .await?;

        let outcome = self.memory.review_and_summarize().await;
        tracing::debug!(
            "Summary pass: {:?}; long-term memory: {}",
            outcome,
            self.memory.get_memory(MemoryTier::LongTerm).summary()
        );

        Ok(reply)
    }
}
