/// 订阅分发示例
/// 展示以注册表事件名订阅内存总线、按名过滤、停止后不再投递
use anyhow::Result as AnyResult;
use eventhandler_core::{BroadcastTag, HandlerRegistry, PayloadBag};
use eventhandler_dispatch::{
    BroadcastBus, BroadcastMessage, ExecutionContext, InMemoryBroadcastBus, SubscriptionDispatcher,
};
use eventhandler_macros::event_handlers;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Default)]
struct Thermostat {
    readings: Mutex<Vec<f64>>,
}

#[event_handlers]
impl Thermostat {
    #[broadcast("sensor.temperature")]
    fn on_temperature(&self, bag: PayloadBag) -> AnyResult<()> {
        let celsius = bag
            .get_f64("celsius")
            .ok_or_else(|| anyhow::anyhow!("missing celsius"))?;
        self.readings.lock().unwrap().push(celsius);
        Ok(())
    }

    #[broadcast("sensor.reset")]
    fn on_reset(&self) {
        self.readings.lock().unwrap().clear();
    }
}

fn init_logging() -> AnyResult<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("debug"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to set subscriber: {e}"))
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    init_logging()?;

    let thermostat = Arc::new(Thermostat::default());
    let registry = Arc::new(HandlerRegistry::<BroadcastTag>::build(thermostat.clone())?);
    let bus = Arc::new(InMemoryBroadcastBus::new(64));

    let feed = SubscriptionDispatcher::new(registry, bus.clone(), ExecutionContext::current()?);
    feed.start().await?;

    for celsius in [20.5, 21.0, 21.5] {
        bus.publish(&BroadcastMessage::new(
            "sensor.temperature",
            PayloadBag::new().with("celsius", celsius),
        ))
        .await?;
    }
    // 未订阅的事件名被过滤
    bus.publish(&BroadcastMessage::named("sensor.humidity")).await?;
    // 缺少字段，处理器返回错误，仅记录日志
    bus.publish(&BroadcastMessage::named("sensor.temperature")).await?;

    tokio::time::sleep(Duration::from_millis(50)).await;
    println!("readings: {:?}", thermostat.readings.lock().unwrap());

    feed.stop();
    bus.publish(&BroadcastMessage::named("sensor.reset")).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!("after stop: {:?}", thermostat.readings.lock().unwrap());
    Ok(())
}
