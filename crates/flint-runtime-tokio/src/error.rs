use std::io;

use flint_core::error::{CoreError, ErrorCategory};

/// 事件循环不可用（线程或运行时构造失败）。
pub(crate) const EVENT_LOOP_FAILED: &str = "flint.runtime.tokio.event_loop_failed";
/// 系统 DNS 查询失败。
pub(crate) const RESOLVE_FAILED: &str = "flint.runtime.tokio.resolve_failed";

/// 适配层内部错误，作为 [`CoreError`] 的根因挂载。
#[derive(Debug, thiserror::Error)]
pub(crate) enum RuntimeError {
    #[error("event loop thread exited before handing over a runtime handle")]
    HandleUnavailable,
    #[error("failed to spawn event loop thread: {0}")]
    Spawn(#[source] io::Error),
    #[error("failed to build current-thread runtime: {0}")]
    Build(#[source] io::Error),
    #[error("dns lookup for {authority} failed: {source}")]
    Lookup {
        authority: String,
        #[source]
        source: io::Error,
    },
}

/// 把事件循环故障映射为框架错误；循环缺失无法靠重试恢复。
pub(crate) fn event_loop_error(cause: RuntimeError) -> CoreError {
    CoreError::new(EVENT_LOOP_FAILED, "tokio event loop unavailable")
        .with_category(ErrorCategory::NonRetryable)
        .with_cause(cause)
}

/// 把 DNS 故障映射为框架错误；名字服务抖动通常值得重试。
pub(crate) fn resolve_error(cause: RuntimeError) -> CoreError {
    CoreError::new(RESOLVE_FAILED, "dns resolution failed")
        .with_category(ErrorCategory::Retryable)
        .with_cause(cause)
}
