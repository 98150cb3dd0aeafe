//! 执行上下文（ExecutionContext）
//!
//! 分发循环运行在哪里由构造方显式指定：
//! - `Runtime(handle)`：作为任务运行在已有的 tokio 运行时上；
//! - `Thread { name }`：独占一个 OS 线程，线程内运行 current-thread 运行时。
//!
//! 同一分发器的所有处理器调用都在其分发循环内串行执行。
//!
use eventhandler_core::{EventError, EventResult};
use std::future::Future;
use tokio::runtime::{Builder, Handle};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Clone, Debug)]
pub enum ExecutionContext {
    Runtime(Handle),
    Thread { name: String },
}

impl ExecutionContext {
    /// 当前所在的 tokio 运行时
    pub fn current() -> EventResult<Self> {
        Handle::try_current()
            .map(ExecutionContext::Runtime)
            .map_err(|e| EventError::Spawn {
                reason: e.to_string(),
            })
    }

    pub fn thread(name: impl Into<String>) -> Self {
        ExecutionContext::Thread { name: name.into() }
    }

    pub(crate) fn spawn<F>(&self, fut: F) -> EventResult<LoopHandle>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self {
            ExecutionContext::Runtime(handle) => Ok(LoopHandle::Task(handle.spawn(fut))),
            ExecutionContext::Thread { name } => {
                let thread_name = name.clone();
                let thread = std::thread::Builder::new()
                    .name(name.clone())
                    .spawn(move || {
                        let rt = match Builder::new_current_thread().enable_time().build() {
                            Ok(rt) => rt,
                            Err(e) => {
                                warn!(thread = %thread_name, error = %e, "failed to build loop runtime");
                                return;
                            }
                        };
                        debug!(thread = %thread_name, "dispatch thread started");
                        rt.block_on(fut);
                        debug!(thread = %thread_name, "dispatch thread stopped");
                    })
                    .map_err(|e| EventError::Spawn {
                        reason: e.to_string(),
                    })?;
                Ok(LoopHandle::Thread(thread))
            }
        }
    }
}

/// 分发循环的句柄
pub(crate) enum LoopHandle {
    Task(JoinHandle<()>),
    Thread(std::thread::JoinHandle<()>),
}

impl LoopHandle {
    pub(crate) async fn join(self) {
        match self {
            LoopHandle::Task(task) => {
                let _ = task.await;
            }
            LoopHandle::Thread(thread) => {
                let _ = tokio::task::spawn_blocking(move || thread.join()).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn runtime_context_runs_on_current_runtime() {
        let ctx = ExecutionContext::current().unwrap();
        let (tx, rx) = oneshot::channel();
        let handle = ctx
            .spawn(async move {
                let _ = tx.send(7);
            })
            .unwrap();
        assert_eq!(rx.await.unwrap(), 7);
        handle.join().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn thread_context_uses_named_thread() {
        let ctx = ExecutionContext::thread("loop-under-test");
        let (tx, rx) = oneshot::channel();
        let handle = ctx
            .spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                let name = std::thread::current().name().map(str::to_string);
                let _ = tx.send(name);
            })
            .unwrap();
        assert_eq!(rx.await.unwrap().as_deref(), Some("loop-under-test"));
        handle.join().await;
    }

    #[test]
    fn current_fails_outside_runtime() {
        let err = ExecutionContext::current().unwrap_err();
        assert!(matches!(err, EventError::Spawn { .. }));
    }
}
