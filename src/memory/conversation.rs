//! 消息存储：按顺序保存的角色 + 文本轮次
//!
//! 不去重、不设上限；容量由调用方通过摘要节奏控制（每次成功摘要后整体清空）。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// 持久化与 Prompt 中使用的角色名
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    /// 从持久化的角色名解析；旧格式中的 "ai" 视为 assistant，未知角色一律视为 system
    pub fn from_label(label: &str) -> Self {
        match label {
            "user" => Role::User,
            "assistant" | "ai" => Role::Assistant,
            _ => Role::System,
        }
    }
}

/// 单条消息（一轮），创建后只读
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// 渲染为 `role: content`，用于拼接 Prompt
    pub fn to_line(&self) -> String {
        format!("{}: {}", self.role.as_str(), self.content)
    }
}

/// 短期记忆的消息序列
#[derive(Clone, Debug, Default)]
pub struct ConversationMemory {
    messages: Vec<Message>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn append(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_order_and_duplicates() {
        let mut mem = ConversationMemory::new();
        mem.append(Message::user("hi"));
        mem.append(Message::assistant("hello"));
        mem.append(Message::user("hi"));

        assert_eq!(mem.len(), 3);
        assert_eq!(mem.all()[0], Message::user("hi"));
        assert_eq!(mem.all()[1].role, Role::Assistant);
        assert_eq!(mem.all()[2], Message::user("hi"));

        mem.clear();
        assert!(mem.is_empty());
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(Role::from_label("user"), Role::User);
        assert_eq!(Role::from_label("assistant"), Role::Assistant);
        assert_eq!(Role::from_label("ai"), Role::Assistant);
        assert_eq!(Role::from_label("tool"), Role::System);
        assert_eq!(Role::Assistant.as_str(), "assistant");
        assert_eq!(Message::user("Hello").to_line(), "user: Hello");
    }
}
