//! memchat - 带三层记忆的命令行对话助手
//!
//! 模块划分：
//! - **agent**: 对话 Agent（拼 Prompt、生成回复、驱动记忆写入与摘要）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 短期 / 长期 / 会话记忆、分类、摘要与持久化
//! - **observability**: 日志初始化

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;

pub use agent::ChatAgent;
pub use memory::{MemoryManager, MemoryTier};
