//! 记忆分层：短期 / 长期 / 会话
//!
//! 一条消息可以同时写入多个层（非互斥），因此分类结果是层的集合。

use std::collections::BTreeSet;
use std::fmt;

/// 记忆层
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MemoryTier {
    ShortTerm,
    LongTerm,
    Session,
}

impl MemoryTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryTier::ShortTerm => "short_term",
            MemoryTier::LongTerm => "long_term",
            MemoryTier::Session => "session",
        }
    }
}

impl fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 分类结果：0..=3 个层
pub type TierSet = BTreeSet<MemoryTier>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_set_is_ordered_and_deduplicated() {
        let tiers: TierSet = [MemoryTier::Session, MemoryTier::ShortTerm, MemoryTier::Session]
            .into_iter()
            .collect();
        let names: Vec<String> = tiers.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["short_term", "session"]);
    }
}
