//! 记忆层：消息存储、分层分类、摘要、持久化与编排（短期 / 长期 / 会话）

pub mod classifier;
pub mod conversation;
pub mod manager;
pub mod persistence;
pub mod summarizer;
pub mod tier;

pub use classifier::{
    is_affirmative, parse_tiers, LlmTierClassifier, RuleTierClassifier, TierClassifier,
};
pub use conversation::{ConversationMemory, Message, Role};
pub use manager::{
    create_memory_manager, AdvancedMemoryManager, BasicMemoryManager, MemoryManager,
    SummaryOutcome, TierContents,
};
pub use persistence::{ConversationPersistence, MemorySnapshot, SnapshotPersistence};
pub use summarizer::{DenyListValidator, LlmSummarizer, Summarizer, SummaryValidator};
pub use tier::{MemoryTier, TierSet};
