//! 日志初始化
//!
//! 使用 tracing 日志框架，`RUST_LOG` 环境变量优先于配置中的级别。

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// 初始化日志系统
///
/// 重复调用是安全的，已经安装过订阅器时直接返回。
pub fn init_logging(config: &LoggingConfig) {
    if !config.log_to_console {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.directive()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    tracing::debug!(target: "behavior", "Logging initialized");
}
