//! 记忆持久化
//!
//! 单文件 JSON。两种形状：
//! - 分层快照 `{"short_term": [...], "long_term": "...", "session": [...]}`（AdvancedMemoryManager）
//! - 旧格式：扁平消息列表 `[{"role": "...", "content": "..."}]`（BasicMemoryManager）
//!
//! 两个加载器都接受两种形状。文件不存在时返回空状态而不是错误。
//! 没有文件锁：多个进程共用同一记忆文件时结果未定义。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::MemoryError;
use crate::memory::{Message, Role};

/// 三层记忆的持久化形式
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemorySnapshot {
    pub short_term: Vec<Message>,
    pub long_term: String,
    pub session: Vec<Message>,
}

impl MemorySnapshot {
    pub fn is_empty(&self) -> bool {
        self.short_term.is_empty() && self.long_term.is_empty() && self.session.is_empty()
    }
}

/// 分层快照文件：load / save 整个 MemorySnapshot
#[derive(Debug, Clone)]
pub struct SnapshotPersistence {
    path: PathBuf,
}

impl SnapshotPersistence {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// 文件不存在时返回空快照；旧格式的扁平列表映射到 short_term
    pub fn load(&self) -> Result<MemorySnapshot, MemoryError> {
        let Some(stored) = read_stored(&self.path)? else {
            tracing::warn!("Memory file not found, initializing empty memory.");
            return Ok(MemorySnapshot::default());
        };
        Ok(match stored {
            StoredMemory::Tiered(t) => MemorySnapshot {
                short_term: from_ser(t.short_term),
                long_term: t.long_term,
                session: from_ser(t.session),
            },
            StoredMemory::Flat(list) => MemorySnapshot {
                short_term: from_ser(list),
                ..MemorySnapshot::default()
            },
        })
    }

    pub fn save(&self, snapshot: &MemorySnapshot) -> Result<(), MemoryError> {
        let stored = SerSnapshot {
            short_term: to_ser(&snapshot.short_term),
            long_term: snapshot.long_term.clone(),
            session: to_ser(&snapshot.session),
        };
        write_json(&self.path, &stored)
    }
}

/// 扁平对话文件：load / save 单一消息列表
#[derive(Debug, Clone)]
pub struct ConversationPersistence {
    path: PathBuf,
}

impl ConversationPersistence {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// 文件不存在时返回空 Vec；分层快照取 short_term 与 session（按此顺序）
    pub fn load(&self) -> Result<Vec<Message>, MemoryError> {
        let Some(stored) = read_stored(&self.path)? else {
            tracing::warn!("Memory file not found, initializing empty memory.");
            return Ok(Vec::new());
        };
        Ok(match stored {
            StoredMemory::Flat(list) => from_ser(list),
            StoredMemory::Tiered(t) => {
                let mut messages = from_ser(t.short_term);
                messages.extend(from_ser(t.session));
                messages
            }
        })
    }

    pub fn save(&self, messages: &[Message]) -> Result<(), MemoryError> {
        write_json(&self.path, &to_ser(messages))
    }
}

#[derive(Serialize, Deserialize)]
struct SerMessage {
    role: String,
    content: String,
}

#[derive(Serialize, Deserialize)]
struct SerSnapshot {
    #[serde(default)]
    short_term: Vec<SerMessage>,
    #[serde(default)]
    long_term: String,
    #[serde(default)]
    session: Vec<SerMessage>,
}

/// 按 JSON 顶层形状区分：数组为旧格式，对象为分层快照
enum StoredMemory {
    Flat(Vec<SerMessage>),
    Tiered(SerSnapshot),
}

fn to_ser(messages: &[Message]) -> Vec<SerMessage> {
    messages
        .iter()
        .map(|m| SerMessage {
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
        })
        .collect()
}

fn from_ser(messages: Vec<SerMessage>) -> Vec<Message> {
    messages
        .into_iter()
        .map(|m| Message {
            role: Role::from_label(&m.role),
            content: m.content,
        })
        .collect()
}

/// 读取并解析；文件不存在返回 None，空文件视为空状态
///
/// 先解析为 Value 再按形状反序列化，字段类型错误的原始信息得以保留在 MemoryError::Load 中。
fn read_stored(path: &Path) -> Result<Option<StoredMemory>, MemoryError> {
    tracing::debug!("Loading memory from file: {}", path.display());
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(MemoryError::Load(format!(
                "cannot read {}: {}",
                path.display(),
                e
            )))
        }
    };
    if data.trim().is_empty() {
        return Ok(None);
    }

    let decode_err = |e: serde_json::Error| MemoryError::Load(format!("invalid JSON: {}", e));
    let value: serde_json::Value = serde_json::from_str(&data).map_err(decode_err)?;
    let stored = match value {
        serde_json::Value::Array(_) => {
            StoredMemory::Flat(serde_json::from_value(value).map_err(decode_err)?)
        }
        serde_json::Value::Object(_) => {
            StoredMemory::Tiered(serde_json::from_value(value).map_err(decode_err)?)
        }
        other => {
            return Err(MemoryError::Load(format!(
                "invalid JSON: expected a message list or a snapshot object, found {}",
                other
            )))
        }
    };
    tracing::debug!("Memory loaded successfully");
    Ok(Some(stored))
}

/// 整体覆盖写入：先写同目录临时文件再 rename；父目录不存在时自动创建
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), MemoryError> {
    tracing::debug!("Saving memory to file: {}", path.display());
    let save_err = |e: std::io::Error| MemoryError::Save(e.to_string());

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(save_err)?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|e| MemoryError::Save(e.to_string()))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, json).map_err(save_err)?;
    std::fs::rename(&tmp, path).map_err(save_err)?;
    tracing::debug!("Memory saved successfully.");
    Ok(())
}
