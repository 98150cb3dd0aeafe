//! 事件分发库（eventhandler-dispatch）
//!
//! 将 `eventhandler-core` 构建的处理器注册表接入两种投递方式：
//! - 延迟队列（`queue`）：进程内、归属单一执行上下文的消息循环，支持立即/延迟投递与撤销；
//! - 订阅分发（`broadcast`，默认特性）：按事件名订阅外部发布/订阅基座，可随时启动与停止。
//!
//! 两者都在各自的分发循环上串行调用处理器；处理器失败（错误或 panic）只记录日志，循环继续。
//! 本库只通过 `tracing` 输出日志，不安装任何 subscriber。
//!
mod boundary;
pub mod config;
pub mod context;
pub mod queue;

#[cfg(feature = "broadcast")]
pub mod broadcast;

pub use config::DispatcherConfig;
pub use context::ExecutionContext;
pub use queue::{DelayedQueueDispatcher, PendingToken};

#[cfg(feature = "broadcast")]
pub use broadcast::{
    BroadcastBus, BroadcastMessage, InMemoryBroadcastBus, NameFilter, SubscriptionDispatcher,
};
