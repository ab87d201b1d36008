//! 准入策略：决定某个来源能否承载发往某地址的连接。
//!
//! 策略是无状态谓词，按插入顺序求值，全部接受才放行。传入 `accept` 的地址已去除端口。

use std::{fmt, sync::Arc};

use super::bind_history::BindHistory;

/// 内置 stick 策略使用的标识。
pub const STICK_POLICY_ID: &str = "stick";

/// 策略类别。`Stick` 类策略的加入与移除会开启/关闭绑定历史录制。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    Filter,
    Stick,
}

pub trait Policy: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;

    fn accept(&self, source_id: &str, address: &str) -> bool;

    fn kind(&self) -> PolicyKind {
        PolicyKind::Filter
    }
}

pub type PolicyRef = Arc<dyn Policy>;

/// 完全禁用某个来源。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPolicy {
    pub id: String,
    pub source_id: String,
}

impl BlockPolicy {
    pub fn new(source_id: impl Into<String>) -> Self {
        let source_id = source_id.into();
        Self {
            id: format!("block_{source_id}"),
            source_id,
        }
    }
}

impl Policy for BlockPolicy {
    fn id(&self) -> &str {
        &self.id
    }

    fn accept(&self, source_id: &str, _address: &str) -> bool {
        source_id != self.source_id
    }
}

/// 不使用某来源访问指定地址。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvoidPolicy {
    pub id: String,
    pub source_id: String,
    pub address: String,
}

impl AvoidPolicy {
    pub fn new(source_id: impl Into<String>, address: impl Into<String>) -> Self {
        let source_id = source_id.into();
        let address = address.into();
        Self {
            id: format!("avoid_{source_id}_{address}"),
            source_id,
            address,
        }
    }
}

impl Policy for AvoidPolicy {
    fn id(&self) -> &str {
        &self.id
    }

    fn accept(&self, source_id: &str, address: &str) -> bool {
        !(source_id == self.source_id && address.eq_ignore_ascii_case(&self.address))
    }
}

/// 将来源保留给指定地址：该来源只承载该地址，该地址也只走该来源。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedPolicy {
    pub id: String,
    pub source_id: String,
    pub address: String,
}

impl ReservedPolicy {
    pub fn new(source_id: impl Into<String>, address: impl Into<String>) -> Self {
        let source_id = source_id.into();
        let address = address.into();
        Self {
            id: format!("reserve_{source_id}_{address}"),
            source_id,
            address,
        }
    }
}

impl Policy for ReservedPolicy {
    fn id(&self) -> &str {
        &self.id
    }

    fn accept(&self, source_id: &str, address: &str) -> bool {
        let same_address = address.eq_ignore_ascii_case(&self.address);
        if source_id == self.source_id {
            same_address
        } else {
            !same_address
        }
    }
}

/// 会话亲和：地址若已绑定到其他来源则拒绝。
pub struct StickyPolicy {
    history: Arc<BindHistory>,
}

impl StickyPolicy {
    pub fn new(history: Arc<BindHistory>) -> Self {
        Self { history }
    }
}

impl fmt::Debug for StickyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StickyPolicy")
            .field("recorded", &self.history.len())
            .finish()
    }
}

impl Policy for StickyPolicy {
    fn id(&self) -> &str {
        STICK_POLICY_ID
    }

    fn accept(&self, source_id: &str, address: &str) -> bool {
        match self.history.lookup(address) {
            Some(bound) => bound == source_id,
            None => true,
        }
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Stick
    }
}
