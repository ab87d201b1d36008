pub mod core;
pub mod events;
pub mod logging;

// 便于嵌入方直接使用源存储
pub use crate::core::source_store;
