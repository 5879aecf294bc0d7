//! 记忆生命周期集成测试：对话 → 分类写入 → 摘要 → 保存 → 重新加载

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use memchat::llm::{LlmClient, MockLlmClient};
    use memchat::memory::{
        AdvancedMemoryManager, BasicMemoryManager, MemorySnapshot, Message, SnapshotPersistence,
    };
    use memchat::{ChatAgent, MemoryManager, MemoryTier};
    use tempfile::TempDir;

    const RELEVANCE: &str = "relevant for future reference";
    const CLASSIFY: &str = "Classify this memory";
    const SUMMARIZE: &str = "Progressively summarize";
    const GENERATE: &str = "You are a helpful assistant";

    fn advanced_agent(path: &Path, llm: MockLlmClient) -> ChatAgent {
        let llm: Arc<dyn LlmClient> = Arc::new(llm);
        let memory = AdvancedMemoryManager::new(path, llm.clone());
        ChatAgent::new("Ava", llm, Box::new(memory))
    }

    #[tokio::test]
    async fn test_single_exchange_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat_memory.json");

        // 摘要调用失败 => 短期记忆保持不变
        let mut agent = advanced_agent(
            &path,
            MockLlmClient::new()
                .with_reply(RELEVANCE, "store")
                .with_reply(CLASSIFY, "short_term")
                .with_failure(SUMMARIZE, "summarizer offline")
                .with_reply(GENERATE, "Hi there"),
        );
        agent.load_memory().unwrap();

        let reply = agent.respond("Hello").await.unwrap();
        assert_eq!(reply, "Hi there");

        let expected = vec![Message::user("Hello"), Message::assistant("Hi there")];
        assert_eq!(agent.memory().get_memory(MemoryTier::ShortTerm).messages(), expected.as_slice());
        assert!(agent.memory().get_memory(MemoryTier::Session).messages().is_empty());
        assert_eq!(agent.memory().get_memory(MemoryTier::LongTerm).summary(), "");

        agent.save_memory().unwrap();

        let snapshot = SnapshotPersistence::new(&path).load().unwrap();
        assert_eq!(
            snapshot,
            MemorySnapshot {
                short_term: expected.clone(),
                long_term: String::new(),
                session: Vec::new(),
            }
        );

        let mut reloaded = advanced_agent(&path, MockLlmClient::new());
        reloaded.load_memory().unwrap();
        assert_eq!(
            reloaded.memory().get_memory(MemoryTier::ShortTerm).messages(),
            expected.as_slice()
        );
    }

    #[tokio::test]
    async fn test_summary_carries_into_next_prompt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat_memory.json");
        let llm = Arc::new(
            MockLlmClient::new()
                .with_reply(RELEVANCE, "store")
                .with_reply(CLASSIFY, "short_term, session")
                .with_reply(SUMMARIZE, "The user is called Kim.")
                .with_reply(GENERATE, "Nice to meet you"),
        );
        let client: Arc<dyn LlmClient> = llm.clone();
        let memory = AdvancedMemoryManager::new(&path, client.clone());
        let mut agent = ChatAgent::new("Ava", client, Box::new(memory));

        agent.respond("My name is Kim").await.unwrap();

        assert!(agent.memory().get_memory(MemoryTier::ShortTerm).messages().is_empty());
        assert_eq!(agent.memory().get_memory(MemoryTier::Session).messages().len(), 2);
        assert_eq!(
            agent.memory().get_memory(MemoryTier::LongTerm).summary(),
            "The user is called Kim."
        );

        let prompt = agent.system_prompt();
        assert!(prompt.contains("Long-term memory: The user is called Kim."));
        assert!(prompt.contains("user: My name is Kim\nassistant: Nice to meet you"));

        // 生成 + 2×(相关性 + 分类) + 摘要
        assert_eq!(llm.call_count(), 6);
    }

    #[tokio::test]
    async fn test_discarded_exchange_touches_no_tier() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat_memory.json");
        let mut agent = advanced_agent(
            &path,
            MockLlmClient::new()
                .with_reply(RELEVANCE, "discard")
                .with_reply(SUMMARIZE, "")
                .with_reply(GENERATE, "Sure"),
        );

        agent.respond("ok").await.unwrap();

        assert!(agent.memory().get_memory(MemoryTier::ShortTerm).messages().is_empty());
        assert!(agent.memory().get_memory(MemoryTier::Session).messages().is_empty());
        assert_eq!(agent.memory().get_memory(MemoryTier::LongTerm).summary(), "");
    }

    #[tokio::test]
    async fn test_basic_manager_reads_legacy_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat_memory.json");
        std::fs::write(&path, r#"[{"role":"user","content":"hi"}]"#).unwrap();

        let llm: Arc<dyn LlmClient> = Arc::new(MockLlmClient::new().with_reply(GENERATE, "hello again"));
        let mut agent = ChatAgent::new("Ava", llm, Box::new(BasicMemoryManager::new(&path)));
        agent.load_memory().unwrap();
        assert_eq!(
            agent.memory().get_memory(MemoryTier::ShortTerm).messages(),
            &[Message::user("hi")]
        );

        agent.respond("hi?").await.unwrap();
        agent.save_memory().unwrap();

        let mut reloaded = BasicMemoryManager::new(&path);
        reloaded.load_memory().unwrap();
        assert_eq!(reloaded.get_memory(MemoryTier::ShortTerm).messages().len(), 3);
    }
}
