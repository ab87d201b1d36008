use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// 出口来源：一条可用的网络路径（通常对应一个网卡），以稳定的字符串 ID 标识。
///
/// 来源的创建与销毁由接口发现组件负责，存储层只持有其共享引用。
pub trait Source: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;
}

/// 来源的共享引用。
pub type SourceRef = Arc<dyn Source>;

/// 按名称标识的最简来源实现。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedSource {
    name: String,
}

impl NamedSource {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into() }
    }

    pub fn shared<S: Into<String>>(name: S) -> SourceRef {
        Arc::new(Self::new(name))
    }
}

impl Source for NamedSource {
    fn id(&self) -> &str {
        &self.name
    }
}

/// 来源快照：仅暴露 ID，调用方无法借此修改实际来源。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SourceSnapshot {
    #[serde(rename = "name")]
    pub id: String,
}

impl SourceSnapshot {
    pub fn of(source: &dyn Source) -> Self {
        Self {
            id: source.id().to_string(),
        }
    }
}

/// 判断 `source` 是否出现在 `list` 中（按 ID 比较）。
pub fn contains_source(list: &[SourceRef], source: &dyn Source) -> bool {
    list.iter().any(|item| item.id() == source.id())
}
