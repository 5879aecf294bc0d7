//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `MEMCHAT__*` 覆盖（双下划线表示嵌套，如 `MEMCHAT__MEMORY__MANAGER=basic`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub memory: MemorySection,
}

/// [app] 段：助手名称
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    #[serde(default = "default_ai_name")]
    pub name: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: default_ai_name(),
        }
    }
}

fn default_ai_name() -> String {
    "Ava".to_string()
}

/// [llm] 段：后端选择、采样参数与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：openai / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// 未设置时读 OPENAI_API_BASE
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    512
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

/// [memory] 段：记忆文件、管理器变体、分类策略、摘要校验与 Prompt 模板
#[derive(Debug, Clone, Deserialize)]
pub struct MemorySection {
    #[serde(default = "default_memory_file")]
    pub file: PathBuf,
    #[serde(default)]
    pub manager: ManagerKind,
    #[serde(default)]
    pub classifier: ClassifierKind,
    /// 摘要中出现任一片段（忽略大小写）即拒绝该摘要
    #[serde(default = "default_forbidden_topics")]
    pub forbidden_topics: Vec<String>,
    #[serde(default)]
    pub prompts: PromptsSection,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            file: default_memory_file(),
            manager: ManagerKind::default(),
            classifier: ClassifierKind::default(),
            forbidden_topics: default_forbidden_topics(),
            prompts: PromptsSection::default(),
        }
    }
}

fn default_memory_file() -> PathBuf {
    PathBuf::from("chat_memory.json")
}

fn default_forbidden_topics() -> Vec<String> {
    vec!["math homework".into()]
}

/// 记忆管理器变体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ManagerKind {
    /// 单一消息列表，不分类、不摘要
    Basic,
    /// 短期 / 长期 / 会话三层
    #[default]
    Advanced,
}

/// 分层分类策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    /// 交给 LLM 判断
    #[default]
    Llm,
    /// 本地关键词规则
    Rules,
}

/// [memory.prompts] 段：占位符 {conversation} / {summary} / {new_lines}
#[derive(Debug, Clone, Deserialize)]
pub struct PromptsSection {
    #[serde(default = "default_relevance_prompt")]
    pub relevance: String,
    #[serde(default = "default_classify_prompt")]
    pub classify: String,
    #[serde(default = "default_summarize_prompt")]
    pub summarize: String,
}

impl Default for PromptsSection {
    fn default() -> Self {
        Self {
            relevance: default_relevance_prompt(),
            classify: default_classify_prompt(),
            summarize: default_summarize_prompt(),
        }
    }
}

pub(crate) fn default_relevance_prompt() -> String {
    "Is this conversation: {conversation} relevant for future reference? Should it be stored or discarded?"
        .to_string()
}

pub(crate) fn default_classify_prompt() -> String {
    "Classify this memory from the conversation: {conversation} into short_term, long_term, or session storage. \
Answer with every label that applies."
        .to_string()
}

pub(crate) fn default_summarize_prompt() -> String {
    "Progressively summarize the lines of conversation provided, adding onto the previous summary returning a new summary.\n\n\
Current summary:\n{summary}\n\n\
New lines of conversation:\n{new_lines}\n\n\
New summary:"
        .to_string()
}

/// 从 config 目录加载配置，环境变量 MEMCHAT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 MEMCHAT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("MEMCHAT")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.app.name, "Ava");
        assert_eq!(cfg.memory.file, PathBuf::from("chat_memory.json"));
        assert_eq!(cfg.memory.manager, ManagerKind::Advanced);
        assert_eq!(cfg.memory.classifier, ClassifierKind::Llm);
        assert_eq!(cfg.memory.forbidden_topics, vec!["math homework".to_string()]);
        assert_eq!(cfg.llm.max_tokens, 512);
    }

    #[test]
    fn test_load_from_file_overrides() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("memchat.toml");
        std::fs::write(
            &path,
            "[app]\nname = \"Bea\"\n\n[memory]\nmanager = \"basic\"\nforbidden_topics = [\"weather\"]\n",
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.app.name, "Bea");
        assert_eq!(cfg.memory.manager, ManagerKind::Basic);
        assert_eq!(cfg.memory.forbidden_topics, vec!["weather".to_string()]);
        assert!(cfg.memory.prompts.relevance.contains("{conversation}"));
    }
}
