#![cfg(feature = "broadcast")]

use anyhow::Result as AnyResult;
use eventhandler_core::{BroadcastTag, HandlerRegistry, PayloadBag};
use eventhandler_dispatch::{
    BroadcastBus, BroadcastMessage, ExecutionContext, InMemoryBroadcastBus, NameFilter,
    SubscriptionDispatcher,
};
use eventhandler_macros::event_handlers;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

struct Scoreboard {
    seen: mpsc::UnboundedSender<String>,
}

#[event_handlers]
impl Scoreboard {
    #[broadcast("game.score")]
    fn score(&self, bag: PayloadBag) {
        let player = bag.get_str("player").unwrap_or("?");
        let points = bag.get_i64("points").unwrap_or_default();
        let _ = self.seen.send(format!("{player}:{points}"));
    }

    #[broadcast("game.reset")]
    fn reset(&self) {
        let _ = self.seen.send("reset".into());
    }

    #[broadcast("game.cheat")]
    fn cheat(&self, _bag: PayloadBag) -> AnyResult<()> {
        anyhow::bail!("rejected")
    }

    #[broadcast("game.crash")]
    fn crash(&self) {
        panic!("scoreboard crashed");
    }
}

// 记录订阅过滤器的总线包装
struct RecordingBus {
    inner: InMemoryBroadcastBus,
    filters: Mutex<Vec<NameFilter>>,
}

#[async_trait::async_trait]
impl BroadcastBus for RecordingBus {
    async fn publish(&self, message: &BroadcastMessage) -> eventhandler_core::EventResult<()> {
        self.inner.publish(message).await
    }

    async fn subscribe(
        &self,
        filter: &NameFilter,
    ) -> futures_core::stream::BoxStream<'static, eventhandler_core::EventResult<BroadcastMessage>>
    {
        self.filters.lock().unwrap().push(filter.clone());
        self.inner.subscribe(filter).await
    }
}

async fn next(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("handler not invoked in time")
        .expect("channel closed")
}

#[tokio::test(flavor = "multi_thread")]
async fn feed_delivers_until_stopped() -> AnyResult<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let registry = Arc::new(HandlerRegistry::<BroadcastTag>::build(Arc::new(Scoreboard {
        seen: tx,
    }))?);
    let bus = Arc::new(RecordingBus {
        inner: InMemoryBroadcastBus::new(32),
        filters: Mutex::new(Vec::new()),
    });

    let sub = SubscriptionDispatcher::new(registry, bus.clone(), ExecutionContext::thread("feed"));
    sub.start().await?;
    sub.start().await?;

    {
        let filters = bus.filters.lock().unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(
            filters[0].names().collect::<Vec<_>>(),
            vec!["game.cheat", "game.crash", "game.reset", "game.score"]
        );
    }

    bus.publish_batch(&[
        BroadcastMessage::new("game.cheat", PayloadBag::new()),
        BroadcastMessage::named("game.crash"),
        BroadcastMessage::named("game.unrelated"),
        BroadcastMessage::new(
            "game.score",
            PayloadBag::new().with("player", "ada").with("points", 3),
        ),
        BroadcastMessage::named("game.reset"),
    ])
    .await?;

    // 失败与 panic 的处理器不影响后续消息
    assert_eq!(next(&mut rx).await, "ada:3");
    assert_eq!(next(&mut rx).await, "reset");

    sub.stop();
    assert!(!sub.is_active());
    bus.publish(&BroadcastMessage::named("game.reset")).await?;
    sub.deliver("game.reset", PayloadBag::new());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
    Ok(())
}
