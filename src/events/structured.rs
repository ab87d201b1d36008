use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::{Arc, Mutex};

/// 源存储相关事件：策略变更与绑定历史
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceStoreEvent {
    PolicyAppended { id: String, position: usize },
    PolicyRemoved { id: String, remaining: usize },
    BindHistoryToggled { recording: bool },
    BindRecorded { source_id: String, address: String, records: usize },
    BindFailed { source_id: String, address: String, category: String, message: String },
}

/// 来源集合变更事件
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceEvent {
    Added { ids: Vec<String> },
    Removed { ids: Vec<String> },
}

/// 统一顶层事件枚举
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    SourceStore(SourceStoreEvent),
    Source(SourceEvent),
}

/// 事件总线 trait
pub trait EventBus: Send + Sync + 'static {
    fn publish(&self, evt: Event);
}

// 为 downcast 提供标记 trait
pub trait EventBusAny: EventBus + Any {}
impl<T: EventBus + Any> EventBusAny for T {}

/// 内存事件总线（测试与开发期使用）
#[derive(Clone, Default)]
pub struct MemoryEventBus {
    inner: Arc<Mutex<Vec<Event>>>,
}

impl MemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_all(&self) -> Vec<Event> {
        if let Ok(mut g) = self.inner.lock() {
            let out = g.clone();
            g.clear();
            out
        } else {
            Vec::new()
        }
    }

    pub fn snapshot(&self) -> Vec<Event> {
        if let Ok(g) = self.inner.lock() {
            g.clone()
        } else {
            Vec::new()
        }
    }
}

impl EventBus for MemoryEventBus {
    fn publish(&self, evt: Event) {
        if let Ok(mut g) = self.inner.lock() {
            g.push(evt);
        }
    }
}

// ====== 全局可选事件总线 ======
static GLOBAL_BUS: OnceCell<Arc<dyn EventBusAny>> = OnceCell::new();

pub fn set_global_event_bus(bus: Arc<dyn EventBusAny>) -> Result<(), &'static str> {
    GLOBAL_BUS.set(bus).map_err(|_| "global event bus already set")
}

pub fn publish_global(evt: Event) {
    // 允许线程局部覆盖（集成测试 crate 也可使用）
    if let Some(bus) = TEST_OVERRIDE_BUS.with(|cell| cell.borrow().clone()) {
        bus.publish(evt.clone());
    }
    if let Some(bus) = GLOBAL_BUS.get() {
        bus.publish(evt);
    }
}

/// 若全局已设置且为 MemoryEventBus，获取其克隆副本（共享同一内部存储）。
pub fn get_global_memory_bus() -> Option<MemoryEventBus> {
    GLOBAL_BUS.get().and_then(|b| {
        let any_ref = b.as_ref() as &dyn Any;
        any_ref.downcast_ref::<MemoryEventBus>().cloned()
    })
}

// ==== 测试覆盖专用：线程局部可替换总线（不影响生产 OnceCell） ====
thread_local! {
    static TEST_OVERRIDE_BUS: std::cell::RefCell<Option<Arc<dyn EventBusAny>>> = const { std::cell::RefCell::new(None) };
}

/// 为当前线程安装测试总线。
///
/// 只能收到在本线程上发布的事件：多线程运行时里由后台任务发布的
/// `BindRecorded` / `BindFailed` 可能落在其他工作线程上而被漏掉，
/// 需要这类事件时使用单线程运行时或全局总线。
pub fn set_test_event_bus(bus: Arc<dyn EventBusAny>) {
    TEST_OVERRIDE_BUS.with(|cell| *cell.borrow_mut() = Some(bus));
}

pub fn clear_test_event_bus() {
    TEST_OVERRIDE_BUS.with(|cell| *cell.borrow_mut() = None);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_event_bus_basic() {
        let bus = MemoryEventBus::new();
        bus.publish(Event::SourceStore(SourceStoreEvent::PolicyAppended {
            id: "stick".into(),
            position: 0,
        }));
        bus.publish(Event::Source(SourceEvent::Added {
            ids: vec!["eth0".into()],
        }));
        let snapshot = bus.snapshot();
        assert_eq!(snapshot.len(), 2);
        // take_all should clear
        let taken = bus.take_all();
        assert_eq!(taken.len(), 2);
        assert!(bus.take_all().is_empty());
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let evt = Event::SourceStore(SourceStoreEvent::BindHistoryToggled { recording: true });
        let json = serde_json::to_string(&evt).unwrap();
        assert!(json.contains("\"type\":\"SourceStore\""));
        assert!(json.contains("\"recording\":true"));
    }
}
