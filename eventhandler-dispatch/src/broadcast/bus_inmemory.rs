//! 内存版广播总线（InMemoryBroadcastBus）
//!
//! 基于 `tokio::sync::broadcast`：
//! - `publish`：克隆并广播消息，无订阅者时静默忽略；
//! - `subscribe`：按 `NameFilter` 过滤后的 `'static` 消息流；
//! - 订阅者落后超过缓冲区容量时，流中产出一个 `BroadcastBus` 错误后继续。
//!
use super::{BroadcastBus, BroadcastMessage, NameFilter};
use async_trait::async_trait;
use eventhandler_core::{EventError, EventResult};
use futures_core::stream::BoxStream;
use futures_util::{StreamExt, future};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

#[derive(Clone)]
pub struct InMemoryBroadcastBus {
    tx: broadcast::Sender<BroadcastMessage>,
}

impl InMemoryBroadcastBus {
    /// `capacity` 为广播缓冲区容量
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl BroadcastBus for InMemoryBroadcastBus {
    async fn publish(&self, message: &BroadcastMessage) -> EventResult<()> {
        let _ = self.tx.send(message.clone());
        Ok(())
    }

    async fn subscribe(
        &self,
        filter: &NameFilter,
    ) -> BoxStream<'static, EventResult<BroadcastMessage>> {
        let filter = filter.clone();
        let stream = BroadcastStream::new(self.tx.subscribe()).filter_map(move |r| {
            let item = match r {
                Ok(msg) if filter.matches(&msg.name) => Some(Ok(msg)),
                Ok(_) => None,
                Err(e) => Some(Err(EventError::broadcast_bus(e.to_string()))),
            };
            future::ready(item)
        });
        Box::pin(stream)
    }
}
