//! 延迟队列分发器（DelayedQueueDispatcher）
//!
//! 通过 `EventTag` 注册表将事件名投递到处理器，调用发生在所属执行上下文的分发循环上：
//! - `send*`：立即投递；`send_delayed*`：延迟投递并返回 [`PendingToken`]；
//! - 事件名与负载类型在发送期同步校验，错误直接返回给调用方；
//! - 入队操作不阻塞，可在任意线程调用；处理器调用在循环内串行执行；
//! - 处理器失败只记录日志，循环继续。
//!
mod service;

use self::service::{QueueCommand, QueueService};
use crate::config::DispatcherConfig;
use crate::context::{ExecutionContext, LoopHandle};
use eventhandler_core::{BoxAnySend, EventError, EventResult, EventTag, HandlerRegistry};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

// 超出 `Instant` 表示范围的延迟被截断到此上限（约 30 年）
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// 一次延迟投递的凭据，可用于 [`DelayedQueueDispatcher::cancel`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PendingToken(pub(crate) u64);

impl fmt::Display for PendingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pending-{}", self.0)
    }
}

pub struct DelayedQueueDispatcher {
    registry: Arc<HandlerRegistry<EventTag>>,
    config: DispatcherConfig,
    cmd_tx: mpsc::UnboundedSender<QueueCommand>,
    shutdown: CancellationToken,
    next_token: AtomicU64,
    handle: Option<LoopHandle>,
}

impl DelayedQueueDispatcher {
    pub fn new(
        registry: Arc<HandlerRegistry<EventTag>>,
        context: ExecutionContext,
    ) -> EventResult<Self> {
        Self::with_config(registry, context, DispatcherConfig::default())
    }

    /// 在 `context` 上启动分发循环
    pub fn with_config(
        registry: Arc<HandlerRegistry<EventTag>>,
        context: ExecutionContext,
        config: DispatcherConfig,
    ) -> EventResult<Self> {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let service = QueueService::new(registry.clone(), config.clone(), cmd_rx, shutdown.clone());
        let handle = context.spawn(service.run())?;

        Ok(Self {
            registry,
            config,
            cmd_tx,
            shutdown,
            next_token: AtomicU64::new(0),
            handle: Some(handle),
        })
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry<EventTag>> {
        &self.registry
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// 立即投递给无参处理器（单参处理器返回 `MissingPayload`）
    pub fn send(&self, name: &str) -> EventResult<()> {
        self.check(name, None)?;
        self.submit(QueueCommand::Send {
            name: name.to_string(),
            payload: None,
        })
    }

    /// 立即投递并携带负载；无参处理器会丢弃负载
    pub fn send_with<P>(&self, name: &str, payload: P) -> EventResult<()>
    where
        P: Any + Send,
    {
        let payload = self.carry(name, payload)?;
        self.submit(QueueCommand::Send {
            name: name.to_string(),
            payload,
        })
    }

    pub fn send_delayed(&self, name: &str, delay: Duration) -> EventResult<PendingToken> {
        self.check(name, None)?;
        self.schedule(name, None, delay)
    }

    pub fn send_delayed_with<P>(
        &self,
        name: &str,
        payload: P,
        delay: Duration,
    ) -> EventResult<PendingToken>
    where
        P: Any + Send,
    {
        let payload = self.carry(name, payload)?;
        self.schedule(name, payload, delay)
    }

    /// 撤销所有尚未触发的延迟投递；已触发的不受影响
    pub fn cancel_all(&self) -> EventResult<()> {
        self.submit(QueueCommand::CancelAll)
    }

    /// 撤销指定事件名下尚未触发的延迟投递
    pub fn cancel_event(&self, name: &str) -> EventResult<()> {
        self.submit(QueueCommand::CancelEvent {
            name: name.to_string(),
        })
    }

    /// 撤销单个延迟投递；已触发或已撤销时无效果
    pub fn cancel(&self, token: PendingToken) -> EventResult<()> {
        self.submit(QueueCommand::Cancel { token })
    }

    /// 尚未触发的延迟投递数量
    pub async fn pending_count(&self) -> EventResult<usize> {
        let (reply, rx) = oneshot::channel();
        self.submit(QueueCommand::Pending { reply })?;
        rx.await.map_err(|_| EventError::DispatcherClosed)
    }

    /// 请求停止分发循环，未触发的延迟投递被丢弃
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.cmd_tx.is_closed()
    }

    /// 等待分发循环结束（通常在 `shutdown` 之后调用）
    pub async fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().await;
        }
    }

    fn schedule(
        &self,
        name: &str,
        payload: Option<BoxAnySend>,
        delay: Duration,
    ) -> EventResult<PendingToken> {
        let token = PendingToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let due = Instant::now() + delay.min(FAR_FUTURE);
        self.submit(QueueCommand::Schedule {
            token,
            due,
            name: name.to_string(),
            payload,
        })?;
        Ok(token)
    }

    fn carry<P>(&self, name: &str, payload: P) -> EventResult<Option<BoxAnySend>>
    where
        P: Any + Send,
    {
        let keep = self.check(name, Some(TypeId::of::<P>()))?;
        if keep {
            Ok(Some(Box::new(payload)))
        } else {
            trace!(dispatcher = %self.config.name, event = %name, "nullary handler, payload dropped");
            Ok(None)
        }
    }

    /// 校验事件名与负载类型，返回负载是否需要随投递携带
    fn check(&self, name: &str, payload: Option<TypeId>) -> EventResult<bool> {
        let spec = self
            .registry
            .get(name)
            .ok_or_else(|| EventError::unknown_event(name))?;

        match (spec.invoker().payload_type(), payload) {
            (None, _) => Ok(false),
            (Some((_, expected)), None) => Err(EventError::MissingPayload {
                event: name.to_string(),
                expected,
            }),
            (Some((accepts, _)), Some(actual)) if accepts == actual => Ok(true),
            (Some((_, expected)), Some(_)) => Err(EventError::PayloadType {
                event: name.to_string(),
                expected,
            }),
        }
    }

    fn submit(&self, cmd: QueueCommand) -> EventResult<()> {
        if self.shutdown.is_cancelled() {
            return Err(EventError::DispatcherClosed);
        }
        self.cmd_tx.send(cmd).map_err(|_| EventError::DispatcherClosed)
    }
}

impl fmt::Debug for DelayedQueueDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayedQueueDispatcher")
            .field("name", &self.config.name)
            .field("handlers", &self.registry.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Drop for DelayedQueueDispatcher {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
