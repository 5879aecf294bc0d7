//! 记忆管理器：分类写入、摘要、持久化的编排
//!
//! 两个变体共用 MemoryManager 接口，由 [memory].manager 选择：
//! - BasicMemoryManager：单一消息列表，读写旧格式（扁平列表）文件
//! - AdvancedMemoryManager：短期 / 长期摘要 / 会话三层，分类写入 + 摘要替换
//!
//! 所有方法顺序执行，管理器独占全部记忆状态，不支持多调用方并发。
//! 日志写在构造时注入的 tracing::Span 下，默认 Span::none()（不产生任何输出）。

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::Instrument;

use crate::config::{AppConfig, ClassifierKind, ManagerKind};
use crate::core::MemoryError;
use crate::llm::LlmClient;
use crate::memory::{
    ConversationMemory, ConversationPersistence, DenyListValidator, LlmSummarizer,
    LlmTierClassifier, MemorySnapshot, MemoryTier, Message, RuleTierClassifier,
    SnapshotPersistence, Summarizer, SummaryValidator, TierClassifier, TierSet,
};

/// get_memory 的返回：消息层或摘要文本
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierContents<'a> {
    Messages(&'a [Message]),
    Summary(&'a str),
}

impl<'a> TierContents<'a> {
    /// 摘要层返回空切片
    pub fn messages(&self) -> &'a [Message] {
        match *self {
            TierContents::Messages(m) => m,
            TierContents::Summary(_) => &[],
        }
    }

    /// 消息层返回空字符串
    pub fn summary(&self) -> &'a str {
        match *self {
            TierContents::Summary(s) => s,
            TierContents::Messages(_) => "",
        }
    }
}

/// 一次 review_and_summarize 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// 新摘要通过校验并替换旧摘要，短期记忆已清空
    Replaced,
    /// 新摘要未通过校验，保留旧摘要，短期记忆仍已清空
    Rejected,
    /// 摘要过程出错，旧摘要与短期记忆均保持不变
    Failed,
    /// 该变体不做摘要
    Skipped,
}

/// 记忆管理器接口
#[async_trait]
pub trait MemoryManager: Send + Sync {
    /// 从文件加载并替换当前内存状态；文件不存在时得到空状态
    fn load_memory(&mut self) -> Result<(), MemoryError>;

    /// 将当前状态整体写入文件
    fn save_memory(&self) -> Result<(), MemoryError>;

    /// 直接写入某一层（不经分类）
    fn add_to_memory(&mut self, tier: MemoryTier, message: Message);

    /// 相关性判断 + 分类后写入命中的层，返回命中的层；分类出错时直接上抛
    async fn add_to_memory_with_classification(
        &mut self,
        message: Message,
    ) -> Result<TierSet, MemoryError>;

    /// 摘要短期记忆并按校验结果替换长期摘要；出错只记录日志
    async fn review_and_summarize(&mut self) -> SummaryOutcome;

    fn get_memory(&self, tier: MemoryTier) -> TierContents<'_>;
}

/// 按配置创建记忆管理器
pub fn create_memory_manager(cfg: &AppConfig, llm: Arc<dyn LlmClient>) -> Box<dyn MemoryManager> {
    let path = &cfg.memory.file;
    match cfg.memory.manager {
        ManagerKind::Basic => {
            tracing::info!("Using basic memory manager ({})", path.display());
            Box::new(
                BasicMemoryManager::new(path)
                    .with_span(tracing::info_span!("memory", manager = "basic")),
            )
        }
        ManagerKind::Advanced => {
            tracing::info!(
                "Using advanced memory manager ({}, classifier: {:?})",
                path.display(),
                cfg.memory.classifier
            );
            let classifier: Arc<dyn TierClassifier> = match cfg.memory.classifier {
                ClassifierKind::Llm => {
                    Arc::new(LlmTierClassifier::from_config(llm.clone(), &cfg.memory.prompts))
                }
                ClassifierKind::Rules => Arc::new(RuleTierClassifier::new()),
            };
            Box::new(
                AdvancedMemoryManager::new(path, llm.clone())
                    .with_classifier(classifier)
                    .with_summarizer(Arc::new(LlmSummarizer::from_config(llm, &cfg.memory.prompts)))
                    .with_validator(Arc::new(DenyListValidator::new(
                        cfg.memory.forbidden_topics.clone(),
                    )))
                    .with_span(tracing::info_span!("memory", manager = "advanced")),
            )
        }
    }
}

/// 三层记忆管理器
pub struct AdvancedMemoryManager {
    short_term: ConversationMemory,
    long_term: String,
    session: Vec<Message>,
    classifier: Arc<dyn TierClassifier>,
    summarizer: Arc<dyn Summarizer>,
    validator: Arc<dyn SummaryValidator>,
    persistence: SnapshotPersistence,
    span: tracing::Span,
}

impl AdvancedMemoryManager {
    /// 默认使用 LLM 分类与 LLM 摘要，禁用话题为 ["math homework"]
    pub fn new(path: impl AsRef<Path>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            short_term: ConversationMemory::new(),
            long_term: String::new(),
            session: Vec::new(),
            classifier: Arc::new(LlmTierClassifier::new(llm.clone())),
            summarizer: Arc::new(LlmSummarizer::new(llm)),
            validator: Arc::new(DenyListValidator::default()),
            persistence: SnapshotPersistence::new(path),
            span: tracing::Span::none(),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn TierClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn SummaryValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// 从已有快照恢复（不读文件）
    pub fn restore(&mut self, snapshot: MemorySnapshot) {
        self.short_term = ConversationMemory::from_messages(snapshot.short_term);
        self.long_term = snapshot.long_term;
        self.session = snapshot.session;
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            short_term: self.short_term.all().to_vec(),
            long_term: self.long_term.clone(),
            session: self.session.clone(),
        }
    }

    async fn summarize_pass(&mut self) -> SummaryOutcome {
        let candidate = self
            .summarizer
            .summarize(self.short_term.all(), &self.long_term)
            .await;

        match candidate {
            Ok(summary) => {
                let outcome = if self.validator.validate(&summary) {
                    tracing::debug!("Long-term summary updated ({} chars)", summary.len());
                    self.long_term = summary;
                    SummaryOutcome::Replaced
                } else {
                    tracing::warn!("Invalid summary generated. Keeping previous summary.");
                    SummaryOutcome::Rejected
                };
                self.short_term.clear();
                outcome
            }
            Err(e) => {
                tracing::error!("Error during review and summarize: {}", e);
                SummaryOutcome::Failed
            }
        }
    }
}

#[async_trait]
impl MemoryManager for AdvancedMemoryManager {
    fn load_memory(&mut self) -> Result<(), MemoryError> {
        let span = self.span.clone();
        let _enter = span.enter();
        let snapshot = self.persistence.load()?;
        tracing::debug!(
            "Loaded {} short-term, {} session messages",
            snapshot.short_term.len(),
            snapshot.session.len()
        );
        self.restore(snapshot);
        Ok(())
    }

    fn save_memory(&self) -> Result<(), MemoryError> {
        let _enter = self.span.enter();
        self.persistence.save(&self.snapshot())
    }

    fn add_to_memory(&mut self, tier: MemoryTier, message: Message) {
        match tier {
            MemoryTier::ShortTerm => self.short_term.append(message),
            MemoryTier::LongTerm => {
                let _enter = self.span.enter();
                tracing::debug!("Long-term memory is only updated through summarization");
            }
            MemoryTier::Session => self.session.push(message),
        }
    }

    async fn add_to_memory_with_classification(
        &mut self,
        message: Message,
    ) -> Result<TierSet, MemoryError> {
        let classifier = self.classifier.clone();
        let tiers = classifier
            .assign(&message)
            .instrument(self.span.clone())
            .await?;
        for tier in &tiers {
            self.add_to_memory(*tier, message.clone());
        }
        Ok(tiers)
    }

    async fn review_and_summarize(&mut self) -> SummaryOutcome {
        let span = self.span.clone();
        self.summarize_pass().instrument(span).await
    }

    fn get_memory(&self, tier: MemoryTier) -> TierContents<'_> {
        match tier {
            MemoryTier::ShortTerm => TierContents::Messages(self.short_term.all()),
            MemoryTier::LongTerm => TierContents::Summary(&self.long_term),
            MemoryTier::Session => TierContents::Messages(&self.session),
        }
    }
}

/// 单列表记忆管理器：每条消息都写入同一列表，不分类、不摘要
pub struct BasicMemoryManager {
    conversation: ConversationMemory,
    persistence: ConversationPersistence,
    span: tracing::Span,
}

impl BasicMemoryManager {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            conversation: ConversationMemory::new(),
            persistence: ConversationPersistence::new(path),
            span: tracing::Span::none(),
        }
    }

    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }
}

#[async_trait]
impl MemoryManager for BasicMemoryManager {
    fn load_memory(&mut self) -> Result<(), MemoryError> {
        let _enter = self.span.enter();
        let messages = self.persistence.load()?;
        self.conversation = ConversationMemory::from_messages(messages);
        Ok(())
    }

    fn save_memory(&self) -> Result<(), MemoryError> {
        let _enter = self.span.enter();
        self.persistence.save(self.conversation.all())
    }

    /// 长期层在此变体中不存在，写入被忽略；其余层都落到同一列表
    fn add_to_memory(&mut self, tier: MemoryTier, message: Message) {
        if tier != MemoryTier::LongTerm {
            self.conversation.append(message);
        }
    }

    async fn add_to_memory_with_classification(
        &mut self,
        message: Message,
    ) -> Result<TierSet, MemoryError> {
        self.conversation.append(message);
        Ok(TierSet::from([MemoryTier::ShortTerm]))
    }

    async fn review_and_summarize(&mut self) -> SummaryOutcome {
        SummaryOutcome::Skipped
    }

    fn get_memory(&self, tier: MemoryTier) -> TierContents<'_> {
        match tier {
            MemoryTier::ShortTerm => TierContents::Messages(self.conversation.all()),
            MemoryTier::LongTerm => TierContents::Summary(""),
            MemoryTier::Session => TierContents::Messages(&[]),
        }
    }
}
