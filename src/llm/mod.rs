//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::AppConfig;

pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use traits::{LlmClient, TokenStream};

/// 按 [llm].provider 创建客户端：openai → OpenAiClient，mock → MockLlmClient
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    match cfg.llm.provider.to_lowercase().as_str() {
        "mock" => {
            tracing::warn!("Using Mock LLM, replies are echoed");
            Arc::new(MockLlmClient::new())
        }
        provider => {
            if provider != "openai" {
                tracing::warn!("Unknown LLM provider '{}', falling back to OpenAI-compatible client", provider);
            }
            tracing::info!("Using OpenAI-compatible LLM ({})", cfg.llm.model);
            Arc::new(OpenAiClient::from_config(&cfg.llm))
        }
    }
}
