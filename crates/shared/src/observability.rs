//! 日志初始化模块
//!
//! 基于 tracing-subscriber 提供统一的结构化日志初始化。
//! 日志级别优先读取 RUST_LOG 环境变量，其次使用配置文件中的 log_level；
//! 输出格式支持 pretty（本地开发）与 json（生产采集）。

use anyhow::Result;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::ObservabilityConfig;

/// 初始化日志
///
/// 进程内只应调用一次；重复调用（如测试中）返回错误但不 panic。
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = if config.log_format == "json" {
        fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_pretty_format() {
        let config = ObservabilityConfig {
            log_level: "debug".to_string(),
            log_format: "pretty".to_string(),
        };

        // 测试进程内全局 subscriber 可能已被其他测试注册，
        // 这里只验证 init 不 panic
        let _ = init(&config);
    }

    #[test]
    fn test_init_is_idempotent_safe() {
        let config = ObservabilityConfig::default();
        let _ = init(&config);
        // 第二次初始化返回 Err 而非 panic
        let _ = init(&config);
    }
}
