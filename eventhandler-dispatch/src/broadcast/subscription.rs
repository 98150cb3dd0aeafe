//! 订阅分发器（SubscriptionDispatcher）
//!
//! 状态机：Inactive ⇄ Active。
//! - `start`：以注册表全部事件名组成一个 `NameFilter` 订阅总线，启动分发循环；已激活时无操作；
//! - `deliver`：宿主直接注入一条消息（与总线消息同一循环串行处理）；未激活时无操作；
//! - `stop`：取消分发循环并回到 Inactive，可重复调用；返回后不再有新的处理器调用。
//!
//! 总线流结束（或分发循环异常退出）时循环取消自身的 token，分发器随即视为 Inactive，
//! 可再次 `start` 重新订阅。
//!
//! 未注册的事件名静默丢弃。
//!
use super::{BroadcastBus, BroadcastMessage, NameFilter};
use crate::boundary::invoke_isolated;
use crate::config::DispatcherConfig;
use crate::context::{ExecutionContext, LoopHandle};
use eventhandler_core::{BoxAnySend, BroadcastTag, EventResult, HandlerRegistry, PayloadBag};
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, trace, warn};

enum State {
    Inactive,
    Active {
        token: CancellationToken,
        inject: mpsc::UnboundedSender<BroadcastMessage>,
        _handle: LoopHandle,
    },
}

impl State {
    // 循环已自行退出的 Active 等同于 Inactive
    fn is_live(&self) -> bool {
        matches!(self, State::Active { token, .. } if !token.is_cancelled())
    }
}

pub struct SubscriptionDispatcher {
    registry: Arc<HandlerRegistry<BroadcastTag>>,
    bus: Arc<dyn BroadcastBus>,
    context: ExecutionContext,
    config: DispatcherConfig,
    state: Mutex<State>,
}

impl SubscriptionDispatcher {
    pub fn new(
        registry: Arc<HandlerRegistry<BroadcastTag>>,
        bus: Arc<dyn BroadcastBus>,
        context: ExecutionContext,
    ) -> Self {
        Self::with_config(registry, bus, context, DispatcherConfig::default())
    }

    pub fn with_config(
        registry: Arc<HandlerRegistry<BroadcastTag>>,
        bus: Arc<dyn BroadcastBus>,
        context: ExecutionContext,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            registry,
            bus,
            context,
            config,
            state: Mutex::new(State::Inactive),
        }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry<BroadcastTag>> {
        &self.registry
    }

    /// 注册表全部事件名组成的过滤器
    pub fn filter(&self) -> NameFilter {
        NameFilter::new(self.registry.names())
    }

    pub fn is_active(&self) -> bool {
        self.lock_state().is_live()
    }

    pub async fn start(&self) -> EventResult<()> {
        if self.is_active() {
            trace!(dispatcher = %self.config.name, "already active");
            return Ok(());
        }

        let filter = self.filter();
        let stream = self.bus.subscribe(&filter).await;

        let mut state = self.lock_state();
        // 订阅期间可能已被并发启动
        if state.is_live() {
            return Ok(());
        }

        let token = CancellationToken::new();
        let (inject, inject_rx) = mpsc::unbounded_channel();
        let delivery = DeliveryLoop {
            registry: self.registry.clone(),
            config: self.config.clone(),
            token: token.clone(),
            _exit: token.clone().drop_guard(),
            stream,
            inject_rx,
        };
        let handle = self.context.spawn(delivery.run())?;

        info!(dispatcher = %self.config.name, names = filter.len(), "subscription started");
        *state = State::Active {
            token,
            inject,
            _handle: handle,
        };
        Ok(())
    }

    /// 将一条消息排入分发循环；处理器稍后在循环所在的执行上下文中调用，而非在本调用内同步执行。
    ///
    /// 未激活时无操作。
    pub fn deliver(&self, name: &str, payload: PayloadBag) {
        match &*self.lock_state() {
            State::Active { token, inject, .. } if !token.is_cancelled() => {
                let _ = inject.send(BroadcastMessage::new(name, payload));
            }
            _ => {
                trace!(dispatcher = %self.config.name, event = %name, "inactive, delivery ignored");
            }
        }
    }

    pub fn stop(&self) {
        let previous = std::mem::replace(&mut *self.lock_state(), State::Inactive);
        if let State::Active { token, .. } = previous
            && !token.is_cancelled()
        {
            token.cancel();
            info!(dispatcher = %self.config.name, "subscription stopped");
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SubscriptionDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionDispatcher")
            .field("name", &self.config.name)
            .field("handlers", &self.registry.len())
            .field("active", &self.is_active())
            .finish()
    }
}

impl Drop for SubscriptionDispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

struct DeliveryLoop {
    registry: Arc<HandlerRegistry<BroadcastTag>>,
    config: DispatcherConfig,
    token: CancellationToken,
    // 循环无论以何种方式结束（含未能启动），都让分发器回到 Inactive
    _exit: DropGuard,
    stream: BoxStream<'static, EventResult<BroadcastMessage>>,
    inject_rx: mpsc::UnboundedReceiver<BroadcastMessage>,
}

impl DeliveryLoop {
    async fn run(mut self) {
        loop {
            let message = tokio::select! {
                biased;

                _ = self.token.cancelled() => break,

                Some(message) = self.inject_rx.recv() => message,

                next = self.stream.next() => match next {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => {
                        warn!(dispatcher = %self.config.name, error = %e, "broadcast stream error");
                        continue;
                    }
                    None => {
                        debug!(dispatcher = %self.config.name, "broadcast stream closed");
                        break;
                    }
                },
            };

            // stop 之后到达或尚未处理的消息一律不生效
            if self.token.is_cancelled() {
                break;
            }
            self.dispatch(message);
        }

        debug!(dispatcher = %self.config.name, "delivery loop exited");
    }

    fn dispatch(&self, message: BroadcastMessage) {
        let Some(spec) = self.registry.get(&message.name) else {
            trace!(dispatcher = %self.config.name, event = %message.name, "unregistered name, dropping");
            return;
        };
        let payload = spec
            .invoker()
            .payload_type()
            .map(|_| -> BoxAnySend { Box::new(message.payload) });
        let _ = invoke_isolated(&self.config, spec, payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::InMemoryBroadcastBus;

    type Log = Arc<Mutex<Vec<String>>>;

    fn registry(log: &Log) -> Arc<HandlerRegistry<BroadcastTag>> {
        let (a, b) = (log.clone(), log.clone());
        Arc::new(
            HandlerRegistry::<BroadcastTag>::builder()
                .nullary("ping", "ping", move || a.lock().unwrap().push("ping".into()))
                .unary("score", "score", move |bag: PayloadBag| {
                    let points = bag.get_i64("points").unwrap_or_default();
                    b.lock().unwrap().push(format!("score:{points}"))
                })
                .build()
                .unwrap(),
        )
    }

    fn dispatcher(log: &Log, bus: &InMemoryBroadcastBus) -> SubscriptionDispatcher {
        SubscriptionDispatcher::new(
            registry(log),
            Arc::new(bus.clone()),
            ExecutionContext::current().unwrap(),
        )
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn inactive_dispatcher_ignores_deliveries() {
        let log = Log::default();
        let bus = InMemoryBroadcastBus::new(8);
        let sub = dispatcher(&log, &bus);

        assert!(!sub.is_active());
        sub.deliver("ping", PayloadBag::new());
        bus.publish(&BroadcastMessage::named("ping")).await.unwrap();
        settle().await;
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn start_subscribes_registry_names() {
        let log = Log::default();
        let bus = InMemoryBroadcastBus::new(8);
        let sub = dispatcher(&log, &bus);

        assert_eq!(sub.filter().names().collect::<Vec<_>>(), vec!["ping", "score"]);
        sub.start().await.unwrap();
        // 重复 start 无操作
        sub.start().await.unwrap();
        assert!(sub.is_active());
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(&BroadcastMessage::new("score", PayloadBag::new().with("points", 7)))
            .await
            .unwrap();
        bus.publish(&BroadcastMessage::named("foreign")).await.unwrap();
        sub.deliver("ping", PayloadBag::new().with("ignored", true));
        sub.deliver("unknown", PayloadBag::new());
        settle().await;

        let mut seen = log.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec!["ping", "score:7"]);
    }

    // 订阅流立即结束的总线，记录订阅次数
    #[derive(Default)]
    struct ClosingBus {
        subscribes: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl BroadcastBus for ClosingBus {
        async fn publish(&self, _message: &BroadcastMessage) -> EventResult<()> {
            Ok(())
        }

        async fn subscribe(
            &self,
            _filter: &NameFilter,
        ) -> BoxStream<'static, EventResult<BroadcastMessage>> {
            self.subscribes
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            futures_util::stream::empty().boxed()
        }
    }

    #[tokio::test]
    async fn closed_stream_returns_to_inactive() {
        let log = Log::default();
        let bus = Arc::new(ClosingBus::default());
        let sub = SubscriptionDispatcher::new(
            registry(&log),
            bus.clone(),
            ExecutionContext::current().unwrap(),
        );

        sub.start().await.unwrap();
        settle().await;
        assert!(!sub.is_active());

        sub.deliver("ping", PayloadBag::new());
        settle().await;
        assert!(log.lock().unwrap().is_empty());

        // 流结束后可以重新订阅
        sub.start().await.unwrap();
        assert_eq!(
            bus.subscribes.load(std::sync::atomic::Ordering::SeqCst),
            2
        );
        sub.stop();
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_final() {
        let log = Log::default();
        let bus = InMemoryBroadcastBus::new(8);
        let sub = dispatcher(&log, &bus);

        sub.start().await.unwrap();
        sub.stop();
        sub.stop();
        assert!(!sub.is_active());

        sub.deliver("ping", PayloadBag::new());
        bus.publish(&BroadcastMessage::named("ping")).await.unwrap();
        settle().await;
        assert!(log.lock().unwrap().is_empty());

        // 可再次启动
        sub.start().await.unwrap();
        sub.deliver("ping", PayloadBag::new());
        settle().await;
        assert_eq!(*log.lock().unwrap(), vec!["ping"]);
    }
}
