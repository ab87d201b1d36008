use std::sync::Once;

static INIT: Once = Once::new();

/// 统一测试环境初始化：日志（tracing）
pub fn init_test_env() {
    INIT.call_once(|| {
        // 若用户未设置 RUST_LOG，则提供一个默认级别。
        if std::env::var("RUST_LOG").is_err() {
            std::env::set_var("RUST_LOG", "info");
        }
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}
