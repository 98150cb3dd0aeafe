//! 广播总线（BroadcastBus）协议
//!
//! 订阅返回 `'static` 生命周期的消息流，便于在独立的分发循环中消费。
//!
use async_trait::async_trait;
use eventhandler_core::{EventResult, PayloadBag};
use futures_core::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 总线上传递的消息：事件名 + 结构化负载
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    pub name: String,
    #[serde(default)]
    pub payload: PayloadBag,
}

impl BroadcastMessage {
    pub fn new(name: impl Into<String>, payload: PayloadBag) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// 不带负载的消息
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, PayloadBag::new())
    }
}

/// 订阅的事件名集合
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameFilter {
    names: BTreeSet<String>,
}

impl NameFilter {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// 广播总线：负责发布消息与按名订阅消息流
#[async_trait]
pub trait BroadcastBus: Send + Sync {
    async fn publish(&self, message: &BroadcastMessage) -> EventResult<()>;

    async fn publish_batch(&self, messages: &[BroadcastMessage]) -> EventResult<()> {
        for message in messages {
            self.publish(message).await?;
        }
        Ok(())
    }

    /// 只产出名字命中 `filter` 的消息
    async fn subscribe(&self, filter: &NameFilter)
    -> BoxStream<'static, EventResult<BroadcastMessage>>;
}
