use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use uplink_arbiter_lib::core::source_store::{
    NamedSource, Policy, ProtectedStorage, RoundRobinStorage, SourceRef, SourceStore,
    SourceStoreError,
};

use super::resolver::FakeResolver;

pub fn sources(ids: &[&str]) -> Vec<SourceRef> {
    ids.iter().map(|id| NamedSource::shared(*id)).collect()
}

/// 构造带轮询存储的源存储，并返回解析器句柄以便断言调用次数。
pub fn store_with(ids: &[&str], resolver: FakeResolver) -> (SourceStore, Arc<FakeResolver>) {
    let resolver = Arc::new(resolver);
    let storage = RoundRobinStorage::with_sources(sources(ids));
    let store = SourceStore::new(Arc::new(storage), resolver.clone());
    (store, resolver)
}

pub fn policy_ids(store: &SourceStore) -> Vec<String> {
    store
        .policies_snapshot()
        .iter()
        .map(|p| p.id().to_string())
        .collect()
}

pub fn source_ids(list: &[SourceRef]) -> Vec<String> {
    list.iter().map(|s| s.id().to_string()).collect()
}

/// 以闭包定义的测试策略。
pub struct FnPolicy<F> {
    id: String,
    accept: F,
}

impl<F> FnPolicy<F>
where
    F: Fn(&str, &str) -> bool + Send + Sync + 'static,
{
    pub fn shared(id: &str, accept: F) -> Arc<dyn Policy> {
        Arc::new(Self {
            id: id.to_string(),
            accept,
        })
    }
}

impl<F> std::fmt::Debug for FnPolicy<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnPolicy").field("id", &self.id).finish()
    }
}

impl<F> Policy for FnPolicy<F>
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn accept(&self, source_id: &str, address: &str) -> bool {
        (self.accept)(source_id, address)
    }
}

/// 包装轮询存储并统计 `for_each` 枚举次数。
#[derive(Default)]
pub struct CountingStorage {
    inner: RoundRobinStorage,
    enumerations: AtomicUsize,
}

impl CountingStorage {
    pub fn with_sources(ids: &[&str]) -> Self {
        Self {
            inner: RoundRobinStorage::with_sources(sources(ids)),
            enumerations: AtomicUsize::new(0),
        }
    }

    pub fn enumerations(&self) -> usize {
        self.enumerations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProtectedStorage for CountingStorage {
    fn put(&self, sources: &[SourceRef]) {
        self.inner.put(sources);
    }

    fn del(&self, sources: &[SourceRef]) {
        self.inner.del(sources);
    }

    async fn get(&self, blacklist: &[SourceRef]) -> Result<SourceRef, SourceStoreError> {
        self.inner.get(blacklist).await
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn for_each(&self, visit: &mut dyn FnMut(&SourceRef)) {
        self.enumerations.fetch_add(1, Ordering::SeqCst);
        self.inner.for_each(visit);
    }
}
