// tracing 初始化
use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::model::LoggingCfg;

pub fn init_logging() {
    init_logging_with_default("info");
}

/// 按配置中的日志级别初始化；`RUST_LOG` 优先。
pub fn init_logging_from_config(cfg: &LoggingCfg) {
    init_logging_with_default(&cfg.log_level);
}

fn init_logging_with_default(default_level: &str) {
    // 若已经初始化，避免重复 panic
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .compact()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
    tracing::info!(target = "app", "tracing initialized");
}
