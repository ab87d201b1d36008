//! 受保护存储：持有实时来源集合并负责最终的选择策略。
//!
//! 源存储只通过黑名单收窄候选集合，挑选哪一个来源完全由存储实现决定。
//! 存储自行负责并发控制。

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{
    errors::SourceStoreError,
    source::{contains_source, SourceRef},
};

#[async_trait]
pub trait ProtectedStorage: Send + Sync {
    fn put(&self, sources: &[SourceRef]);

    fn del(&self, sources: &[SourceRef]);

    /// 返回一个不在 `blacklist` 中的来源；没有可用来源时返回
    /// [`SourceStoreError::NoEligibleSource`]。
    async fn get(&self, blacklist: &[SourceRef]) -> Result<SourceRef, SourceStoreError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 依次访问每个来源。访问期间可能持有存储内部锁，`visit` 不得回调存储。
    fn for_each(&self, visit: &mut dyn FnMut(&SourceRef));
}

#[derive(Debug, Default)]
struct RingState {
    sources: Vec<SourceRef>,
    cursor: usize,
}

/// 内置的轮询存储：按顺序轮流返回未被拉黑的来源。
#[derive(Debug, Default)]
pub struct RoundRobinStorage {
    inner: Mutex<RingState>,
}

impl RoundRobinStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sources(sources: Vec<SourceRef>) -> Self {
        let storage = Self::new();
        storage.put(&sources);
        storage
    }

    fn state(&self) -> MutexGuard<'_, RingState> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(target = "source_store", "round robin storage mutex poisoned; recovering");
            poisoned.into_inner()
        })
    }
}

#[async_trait]
impl ProtectedStorage for RoundRobinStorage {
    fn put(&self, sources: &[SourceRef]) {
        let mut state = self.state();
        for src in sources {
            match state.sources.iter().position(|s| s.id() == src.id()) {
                Some(idx) => state.sources[idx] = src.clone(),
                None => state.sources.push(src.clone()),
            }
        }
    }

    fn del(&self, sources: &[SourceRef]) {
        let mut state = self.state();
        state.sources.retain(|s| !contains_source(sources, s.as_ref()));
        if state.cursor >= state.sources.len() {
            state.cursor = 0;
        }
    }

    async fn get(&self, blacklist: &[SourceRef]) -> Result<SourceRef, SourceStoreError> {
        let mut state = self.state();
        let total = state.sources.len();
        for step in 0..total {
            let idx = (state.cursor + step) % total;
            let candidate = &state.sources[idx];
            if contains_source(blacklist, candidate.as_ref()) {
                continue;
            }
            let picked = candidate.clone();
            state.cursor = (idx + 1) % total;
            return Ok(picked);
        }
        Err(SourceStoreError::NoEligibleSource)
    }

    fn len(&self) -> usize {
        self.state().sources.len()
    }

    fn for_each(&self, visit: &mut dyn FnMut(&SourceRef)) {
        let state = self.state();
        for src in &state.sources {
            visit(src);
        }
    }
}
