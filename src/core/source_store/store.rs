use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use anyhow::Result;
use tokio::{runtime::Handle, task::JoinHandle, time::timeout};

use super::{
    address::{parse_ip, trim_port},
    bind_history::{BindHistory, BindRecord},
    config::{default_bind_history_timeout_ms, PolicyConfig, SourceStoreConfig},
    errors::{BindHistoryError, SourceStoreError},
    events,
    policy::{AvoidPolicy, BlockPolicy, PolicyKind, PolicyRef, ReservedPolicy, StickyPolicy},
    resolver::{Resolver, SystemResolver},
    source::{SourceRef, SourceSnapshot},
    storage::ProtectedStorage,
};

/// 一次成功的来源获取，附带后台绑定录制任务（若已启动）。
#[derive(Debug)]
pub struct Acquisition {
    pub source: SourceRef,
    pub binding: Option<JoinHandle<()>>,
}

impl Acquisition {
    /// 等待绑定录制结束后返回来源。录制失败不影响结果。
    pub async fn binding_settled(self) -> SourceRef {
        if let Some(handle) = self.binding {
            if let Err(err) = handle.await {
                tracing::warn!(target = "source_store", error = %err, "bind history task aborted");
            }
        }
        self.source
    }
}

/// 源存储：在受保护存储之前执行策略准入，并维护 stick 策略所需的绑定历史。
///
/// 三类状态各自加锁：策略列表（本结构）、绑定历史（[`BindHistory`] 内部）、
/// 来源集合（受保护存储内部）。`put`/`del` 不经过策略锁。
pub struct SourceStore {
    protected: Arc<dyn ProtectedStorage>,
    policies: Mutex<Vec<PolicyRef>>,
    bind_history: Arc<BindHistory>,
    resolver: Arc<dyn Resolver>,
    bind_history_timeout: Duration,
}

impl fmt::Debug for SourceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceStore")
            .field("sources", &self.len())
            .field("policies", &self.policies().len())
            .field("recording", &self.bind_history.is_recording())
            .finish()
    }
}

impl SourceStore {
    pub fn new(protected: Arc<dyn ProtectedStorage>, resolver: Arc<dyn Resolver>) -> Self {
        Self {
            protected,
            policies: Mutex::new(Vec::new()),
            bind_history: Arc::new(BindHistory::new()),
            resolver,
            bind_history_timeout: Duration::from_millis(default_bind_history_timeout_ms()),
        }
    }

    /// 按配置构建：系统/自定义 DNS 解析器、录制超时与启动策略。
    pub fn from_config(
        protected: Arc<dyn ProtectedStorage>,
        cfg: &SourceStoreConfig,
    ) -> Result<Self> {
        let resolver = SystemResolver::from_config(&cfg.dns)?;
        let store = Self::new(protected, Arc::new(resolver))
            .with_bind_history_timeout(cfg.bind_history_timeout());
        store.apply_config_policies(&cfg.policies)?;
        Ok(store)
    }

    pub fn with_bind_history_timeout(mut self, limit: Duration) -> Self {
        self.bind_history_timeout = limit;
        self
    }

    pub fn bind_history_timeout(&self) -> Duration {
        self.bind_history_timeout
    }

    pub fn bind_history(&self) -> Arc<BindHistory> {
        self.bind_history.clone()
    }

    /// 构造读取本存储绑定历史的 stick 策略。
    pub fn sticky_policy(&self) -> PolicyRef {
        Arc::new(StickyPolicy::new(self.bind_history.clone()))
    }

    fn policies(&self) -> MutexGuard<'_, Vec<PolicyRef>> {
        self.policies.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(target = "source_store", "policy list mutex poisoned; recovering");
            poisoned.into_inner()
        })
    }

    /// 为 `address` 获取一个来源，避开调用方黑名单与策略拒绝的来源。
    pub async fn get(
        &self,
        address: &str,
        blacklist: &[SourceRef],
    ) -> Result<SourceRef, SourceStoreError> {
        self.acquire(address, blacklist).await.map(|acq| acq.source)
    }

    /// 与 [`get`](Self::get) 相同，但同时交回后台绑定录制任务的句柄。
    pub async fn acquire(
        &self,
        address: &str,
        blacklist: &[SourceRef],
    ) -> Result<Acquisition, SourceStoreError> {
        let address = trim_port(address);

        let mut combined: Vec<SourceRef> = blacklist.to_vec();
        combined.extend(self.make_blacklist(address));
        tracing::debug!(
            target = "source_store",
            address,
            blacklist = ?combined.iter().map(|s| s.id()).collect::<Vec<_>>(),
            "blacklist computed"
        );

        let source = match self.protected.get(&combined).await {
            Ok(source) => source,
            Err(err) => {
                tracing::debug!(
                    target = "source_store",
                    address,
                    category = err.category(),
                    error = %err,
                    "protected storage returned no source"
                );
                return Err(err);
            }
        };

        let binding = self.spawn_bind_recording(source.id(), address);
        Ok(Acquisition { source, binding })
    }

    fn spawn_bind_recording(&self, source_id: &str, address: &str) -> Option<JoinHandle<()>> {
        let generation = self.bind_history.recording_generation()?;
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(
                    target = "source_store",
                    address,
                    "no tokio runtime available; skipping bind history"
                );
                return None;
            }
        };

        let history = self.bind_history.clone();
        let resolver = self.resolver.clone();
        let limit = self.bind_history_timeout;
        let source_id = source_id.to_string();
        let address = address.to_string();
        Some(handle.spawn(async move {
            let recorded =
                record_binding(&history, resolver.as_ref(), limit, generation, &source_id, &address);
            match recorded.await {
                Ok(records) => events::emit_bind_recorded(&source_id, &address, records),
                Err(err) => events::emit_bind_failed(&source_id, &address, &err),
            }
        }))
    }

    /// 保存地址与来源的关联，受录制超时约束。仅在录制开启时执行（涉及 DNS 查询）。
    pub async fn save_bind_history(
        &self,
        source_id: &str,
        address: &str,
    ) -> Result<usize, BindHistoryError> {
        let Some(generation) = self.bind_history.recording_generation() else {
            return Ok(0);
        };
        record_binding(
            &self.bind_history,
            self.resolver.as_ref(),
            self.bind_history_timeout,
            generation,
            source_id,
            trim_port(address),
        )
        .await
    }

    /// 返回第一个拒绝 `(source_id, address)` 的策略；全部接受时返回 `None`。
    pub fn rejecting_policy(&self, source_id: &str, address: &str) -> Option<PolicyRef> {
        let policies = self.policies();
        let address = trim_port(address);
        policies
            .iter()
            .find(|policy| !policy.accept(source_id, address))
            .cloned()
    }

    pub fn should_accept(&self, source_id: &str, address: &str) -> bool {
        self.rejecting_policy(source_id, address).is_none()
    }

    /// 计算 `address` 的策略黑名单。
    ///
    /// 每个来源的检查单独获取策略锁，而非整轮使用同一快照：并发增删策略时，
    /// 不同来源可能按不同版本的策略列表求值。
    pub fn make_blacklist(&self, address: &str) -> Vec<SourceRef> {
        if self.policies().is_empty() {
            return Vec::new();
        }

        let address = trim_port(address);
        let mut acc = Vec::new();
        self.protected.for_each(&mut |src| {
            if let Some(policy) = self.rejecting_policy(src.id(), address) {
                tracing::trace!(
                    target = "source_store",
                    source = src.id(),
                    address,
                    policy = policy.id(),
                    "source rejected by policy"
                );
                acc.push(src.clone());
            }
        });
        acc
    }

    pub fn len(&self) -> usize {
        self.protected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn for_each(&self, visit: &mut dyn FnMut(&SourceRef)) {
        self.protected.for_each(visit);
    }

    pub fn put(&self, sources: &[SourceRef]) {
        self.protected.put(sources);
        events::emit_sources_added(sources);
    }

    pub fn del(&self, sources: &[SourceRef]) {
        self.protected.del(sources);
        events::emit_sources_removed(sources);
    }

    /// 将策略追加到列表末尾；`Stick` 类策略同时开启绑定历史录制。
    pub fn append_policy(&self, policy: PolicyRef) -> Result<(), SourceStoreError> {
        let position = {
            let mut policies = self.policies();
            if policies.iter().any(|p| p.id() == policy.id()) {
                return Err(SourceStoreError::DuplicatePolicy(policy.id().to_string()));
            }
            policies.push(policy.clone());
            if policy.kind() == PolicyKind::Stick {
                self.bind_history.start_recording();
            }
            policies.len() - 1
        };

        events::emit_policy_appended(policy.id(), position);
        if policy.kind() == PolicyKind::Stick {
            events::emit_bind_history_toggled(true);
        }
        Ok(())
    }

    /// 移除指定 ID 的策略，其余策略保持相对顺序。
    pub fn del_policy(&self, id: &str) -> Result<(), SourceStoreError> {
        let (removed, remaining, stopped) = {
            let mut policies = self.policies();
            let idx = policies
                .iter()
                .position(|p| p.id() == id)
                .ok_or_else(|| SourceStoreError::PolicyNotFound(id.to_string()))?;
            let removed = policies.remove(idx);
            let stopped = removed.kind() == PolicyKind::Stick
                && !policies.iter().any(|p| p.kind() == PolicyKind::Stick);
            if stopped {
                self.bind_history.stop_recording();
            }
            (removed, policies.len(), stopped)
        };

        events::emit_policy_removed(removed.id(), remaining);
        if stopped {
            events::emit_bind_history_toggled(false);
        }
        Ok(())
    }

    /// 按配置顺序追加策略。任一 ID 与现有策略或同批策略重复时整体拒绝，不追加任何策略。
    pub fn apply_config_policies(&self, configs: &[PolicyConfig]) -> Result<(), SourceStoreError> {
        let batch: Vec<PolicyRef> = configs
            .iter()
            .map(|cfg| -> PolicyRef {
                match cfg {
                    PolicyConfig::Block { source_id } => {
                        Arc::new(BlockPolicy::new(source_id.as_str()))
                    }
                    PolicyConfig::Avoid { source_id, address } => {
                        Arc::new(AvoidPolicy::new(source_id.as_str(), address.as_str()))
                    }
                    PolicyConfig::Reserve { source_id, address } => {
                        Arc::new(ReservedPolicy::new(source_id.as_str(), address.as_str()))
                    }
                    PolicyConfig::Stick => self.sticky_policy(),
                }
            })
            .collect();

        let (first_position, starts_recording) = {
            let mut policies = self.policies();
            for (idx, policy) in batch.iter().enumerate() {
                let clash = policies.iter().any(|p| p.id() == policy.id())
                    || batch[..idx].iter().any(|p| p.id() == policy.id());
                if clash {
                    return Err(SourceStoreError::DuplicatePolicy(policy.id().to_string()));
                }
            }
            let first_position = policies.len();
            policies.extend(batch.iter().cloned());
            let starts_recording = batch.iter().any(|p| p.kind() == PolicyKind::Stick);
            if starts_recording {
                self.bind_history.start_recording();
            }
            (first_position, starts_recording)
        };

        for (offset, policy) in batch.iter().enumerate() {
            events::emit_policy_appended(policy.id(), first_position + offset);
        }
        if starts_recording {
            events::emit_bind_history_toggled(true);
        }
        Ok(())
    }

    pub fn policies_snapshot(&self) -> Vec<PolicyRef> {
        self.policies().clone()
    }

    pub fn sources_snapshot(&self) -> Vec<SourceSnapshot> {
        let mut acc = Vec::with_capacity(self.protected.len());
        self.protected
            .for_each(&mut |src| acc.push(SourceSnapshot::of(src.as_ref())));
        acc
    }

    /// 开启绑定历史录制（丢弃旧历史）。
    pub fn record_bind_history(&self) {
        self.bind_history.start_recording();
        events::emit_bind_history_toggled(true);
    }

    /// 停止录制并丢弃历史。
    pub fn stop_recording_bind_history(&self) {
        self.bind_history.stop_recording();
        events::emit_bind_history_toggled(false);
    }

    pub fn query_bind_history(&self, address: &str) -> Option<String> {
        self.bind_history.lookup(address)
    }

    pub fn bind_history_snapshot(&self) -> Vec<BindRecord> {
        self.bind_history.snapshot()
    }
}

/// 录制单次绑定：IP 先反查主机名，再正查该主机的全部 IP，逐一记录。
/// 查询期间不持锁；`generation` 为发起时的录制代数，期间录制被重置则丢弃结果。
async fn record_binding(
    history: &BindHistory,
    resolver: &dyn Resolver,
    limit: Duration,
    generation: u64,
    source_id: &str,
    address: &str,
) -> Result<usize, BindHistoryError> {
    match timeout(limit, resolve_equivalents(resolver, address)).await {
        Ok(Ok(addrs)) => Ok(history.record(source_id, &addrs, generation)),
        Ok(Err(err)) => Err(err),
        Err(_) => Err(BindHistoryError::Timeout(limit.as_millis() as u64)),
    }
}

async fn resolve_equivalents(
    resolver: &dyn Resolver,
    address: &str,
) -> Result<Vec<std::net::IpAddr>, BindHistoryError> {
    let host = match parse_ip(address) {
        Some(ip) => {
            let hosts = resolver
                .lookup_addr(ip)
                .await
                .map_err(|err| BindHistoryError::resolve(address, format!("{err:#}")))?;
            // 任取一个主机名即可
            hosts
                .into_iter()
                .next()
                .ok_or_else(|| BindHistoryError::NoHosts(address.to_string()))?
        }
        None => address.to_string(),
    };

    resolver
        .lookup_host(&host)
        .await
        .map_err(|err| BindHistoryError::resolve(host.as_str(), format!("{err:#}")))
}
