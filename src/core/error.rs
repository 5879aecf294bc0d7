//! 错误类型
//!
//! 记忆子系统（加载 / 保存 / 分类）与对话层（回复生成）各自一个错误枚举；
//! 摘要失败不在此列：由 review_and_summarize 内部吞掉并记录日志。

use thiserror::Error;

/// 记忆子系统错误
#[derive(Error, Debug)]
pub enum MemoryError {
    /// 记忆文件无法读取或解析（携带底层 I/O 或解析错误文本）
    #[error("Error loading memory file: {0}")]
    Load(String),

    /// 写入记忆文件失败
    #[error("Error saving memory to file: {0}")]
    Save(String),

    /// 相关性判断或分层分类时 LLM 调用失败，直接上抛，不做本地重试
    #[error("Memory classification failed: {0}")]
    Classification(String),
}

/// 对话层错误：交互循环打印后继续下一轮，不终止进程
#[derive(Error, Debug)]
pub enum ChatError {
    /// 生成回复时 LLM 调用失败（包装原始传输错误文本）
    #[error("Error generating response: {0}")]
    CollaboratorCall(String),

    #[error(transparent)]
    Memory(#[from] MemoryError),
}
