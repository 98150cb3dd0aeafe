/// 延迟队列示例
/// 展示宏标记处理器、立即/延迟投递、按事件撤销，以及处理器失败后循环继续
use anyhow::Result as AnyResult;
use eventhandler_core::{EventTag, HandlerRegistry};
use eventhandler_dispatch::{DelayedQueueDispatcher, DispatcherConfig, ExecutionContext};
use eventhandler_macros::event_handlers;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Download {
    url: String,
    attempt: u32,
}

#[derive(Default)]
struct Downloader {
    completed: AtomicUsize,
}

#[event_handlers]
impl Downloader {
    #[event("download.start")]
    fn start(&self, job: Download) -> AnyResult<()> {
        if job.attempt == 0 {
            anyhow::bail!("connection refused: {}", job.url);
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        tracing::info!(url = %job.url, attempt = job.attempt, "download finished");
        Ok(())
    }

    #[event("download.report")]
    fn report(&self) {
        tracing::info!(completed = self.completed.load(Ordering::SeqCst), "progress report");
    }

    #[event("download.timeout")]
    fn timeout() {
        tracing::warn!("download timed out");
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

    let downloader = Arc::new(Downloader::default());
    let registry = Arc::new(HandlerRegistry::<EventTag>::build(downloader.clone())?);

    let config = DispatcherConfig::builder().name("downloads").build();
    let queue = DelayedQueueDispatcher::with_config(
        registry,
        ExecutionContext::thread("download-loop"),
        config,
    )?;

    // 第一次尝试失败，只记录日志
    queue.send_with(
        "download.start",
        Download {
            url: "https://example.invalid/a".into(),
            attempt: 0,
        },
    )?;
    // 重试
    queue.send_delayed_with(
        "download.start",
        Download {
            url: "https://example.invalid/a".into(),
            attempt: 1,
        },
        Duration::from_millis(100),
    )?;
    queue.send_delayed("download.timeout", Duration::from_millis(150))?;
    queue.send_delayed("download.report", Duration::from_millis(200))?;

    // 重试成功后超时提醒不再需要
    tokio::time::sleep(Duration::from_millis(120)).await;
    queue.cancel_event("download.timeout")?;
    println!("pending after cancel: {}", queue.pending_count().await?);

    tokio::time::sleep(Duration::from_millis(150)).await;
    println!("completed: {}", downloader.completed.load(Ordering::SeqCst));

    queue.shutdown();
    queue.join().await;
    Ok(())
}
