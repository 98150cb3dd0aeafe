//! 订阅分发子系统（broadcast）
//!
//! - `BroadcastBus`：外部发布/订阅基座的统一协议，按事件名过滤订阅；
//! - `InMemoryBroadcastBus`：基于 `tokio::sync::broadcast` 的内存实现；
//! - `SubscriptionDispatcher`：以 `BroadcastTag` 注册表的全部事件名订阅总线，
//!   将收到的消息分发给处理器，可随时启动/停止。
//!
pub mod bus;
pub mod bus_inmemory;
pub mod subscription;

pub use bus::{BroadcastBus, BroadcastMessage, NameFilter};
pub use bus_inmemory::InMemoryBroadcastBus;
pub use subscription::SubscriptionDispatcher;
