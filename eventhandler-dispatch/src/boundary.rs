//! 调用边界
//!
//! 分发循环调用处理器的唯一入口：处理器返回的错误（以及可选的 panic）
//! 被转换为 `HandlerInvocation` 并记录日志，不会中断分发循环。
//!
use crate::config::DispatcherConfig;
use eventhandler_core::{BoxAnySend, EventError, EventResult, HandlerSpec};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{trace, warn};

pub(crate) fn invoke_isolated(
    config: &DispatcherConfig,
    spec: &HandlerSpec,
    payload: Option<BoxAnySend>,
) -> EventResult<()> {
    trace!(dispatcher = %config.name, event = %spec.name(), method = %spec.method(), "invoking handler");

    let outcome = if config.catch_panics {
        match catch_unwind(AssertUnwindSafe(|| spec.invoke(payload))) {
            Ok(result) => result.map_err(|e| format!("{e:#}")),
            Err(panic) => Err(format!("handler panicked: {}", panic_message(&*panic))),
        }
    } else {
        spec.invoke(payload).map_err(|e| format!("{e:#}"))
    };

    outcome.map_err(|reason| {
        warn!(
            dispatcher = %config.name,
            event = %spec.name(),
            method = %spec.method(),
            %reason,
            "handler invocation failed"
        );
        EventError::HandlerInvocation {
            event: spec.name().to_string(),
            reason,
        }
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
