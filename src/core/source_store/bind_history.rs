//! 绑定历史：记录目标地址最近一次使用的来源，为 stick 策略提供会话亲和。
//!
//! 仅在录制开启时累积记录；关闭录制会整体丢弃历史，不保留任何部分数据。
//! 每次开启或关闭录制都会推进代数，写入须携带开始查询时读到的代数，
//! 旧会话的迟到写入不会落入新表。

use std::{
    collections::HashMap,
    net::IpAddr,
    sync::{Mutex, MutexGuard},
};

use serde::{Deserialize, Serialize};

/// 单条绑定记录（用于管理面展示）。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BindRecord {
    pub address: String,
    pub source_id: String,
}

#[derive(Debug, Default)]
struct BindTable {
    recording: bool,
    generation: u64,
    entries: Option<HashMap<String, String>>,
}

#[derive(Debug, Default)]
pub struct BindHistory {
    inner: Mutex<BindTable>,
}

impl BindHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, BindTable> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(target = "source_store", "bind history mutex poisoned; recovering");
            poisoned.into_inner()
        })
    }

    /// 开启录制，并以空表重新开始。
    pub fn start_recording(&self) {
        let mut table = self.table();
        table.entries = Some(HashMap::new());
        table.recording = true;
        table.generation += 1;
    }

    /// 停止录制并丢弃已有历史。
    pub fn stop_recording(&self) {
        let mut table = self.table();
        table.entries = None;
        table.recording = false;
        table.generation += 1;
    }

    pub fn is_recording(&self) -> bool {
        self.table().recording
    }

    /// 录制中时返回当前代数，供后续 [`record`](Self::record) 校验。
    pub fn recording_generation(&self) -> Option<u64> {
        let table = self.table();
        table.recording.then_some(table.generation)
    }

    /// 查询地址对应的来源 ID，无副作用。
    pub fn lookup(&self, address: &str) -> Option<String> {
        self.table()
            .entries
            .as_ref()
            .and_then(|entries| entries.get(address).cloned())
    }

    /// 将 `source_id` 记录到每个地址上，返回写入条数。
    /// 未在录制，或 `generation` 已不是当前代数时不做任何事。
    pub fn record(&self, source_id: &str, addresses: &[IpAddr], generation: u64) -> usize {
        let mut table = self.table();
        if !table.recording || table.generation != generation {
            return 0;
        }
        let entries = table.entries.get_or_insert_with(HashMap::new);
        for addr in addresses {
            entries.insert(addr.to_string(), source_id.to_string());
        }
        addresses.len()
    }

    pub fn len(&self) -> usize {
        self.table().entries.as_ref().map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 返回按地址排序的历史副本。
    pub fn snapshot(&self) -> Vec<BindRecord> {
        let table = self.table();
        let mut out: Vec<BindRecord> = table
            .entries
            .iter()
            .flatten()
            .map(|(address, source_id)| BindRecord {
                address: address.clone(),
                source_id: source_id.clone(),
            })
            .collect();
        out.sort_by(|a, b| a.address.cmp(&b.address));
        out
    }
}
