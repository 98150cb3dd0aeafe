//! 延迟队列的分发循环
//!
//! 以 `BTreeMap<(到期时间, 序号), PendingSend>` 作为优先队列，
//! 通过 `sleep_until` 等待最早的到期时间，无轮询。
//! 序号单调递增，到期时间相同者按入队顺序触发。
//!
use super::PendingToken;
use crate::boundary::invoke_isolated;
use crate::config::DispatcherConfig;
use eventhandler_core::{BoxAnySend, EventTag, HandlerRegistry};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

pub(crate) enum QueueCommand {
    Send {
        name: String,
        payload: Option<BoxAnySend>,
    },
    Schedule {
        token: PendingToken,
        due: Instant,
        name: String,
        payload: Option<BoxAnySend>,
    },
    Cancel {
        token: PendingToken,
    },
    CancelEvent {
        name: String,
    },
    CancelAll,
    Pending {
        reply: oneshot::Sender<usize>,
    },
}

struct PendingSend {
    name: String,
    payload: Option<BoxAnySend>,
}

type QueueKey = (Instant, u64);

pub(crate) struct QueueService {
    registry: Arc<HandlerRegistry<EventTag>>,
    config: DispatcherConfig,
    cmd_rx: mpsc::UnboundedReceiver<QueueCommand>,
    shutdown: CancellationToken,
    queue: BTreeMap<QueueKey, PendingSend>,
    // token -> 队列键，用于按 token 撤销
    index: HashMap<PendingToken, QueueKey>,
}

impl QueueService {
    pub(crate) fn new(
        registry: Arc<HandlerRegistry<EventTag>>,
        config: DispatcherConfig,
        cmd_rx: mpsc::UnboundedReceiver<QueueCommand>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            registry,
            config,
            cmd_rx,
            shutdown,
            queue: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    pub(crate) async fn run(mut self) {
        info!(dispatcher = %self.config.name, handlers = self.registry.len(), "delayed queue running");

        loop {
            let next_due = self.queue.keys().next().map(|(due, _)| *due);

            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    break;
                }

                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd),
                        // 所有发送端都已释放
                        None => break,
                    }
                }

                _ = async {
                    match next_due {
                        Some(due) => tokio::time::sleep_until(due).await,
                        None => std::future::pending().await,
                    }
                } => {
                    if let Some((key, pending)) = self.queue.pop_first() {
                        self.index.remove(&PendingToken(key.1));
                        trace!(dispatcher = %self.config.name, event = %pending.name, token = key.1, "delayed send due");
                        self.dispatch(&pending.name, pending.payload);
                    }
                }
            }
        }

        info!(
            dispatcher = %self.config.name,
            discarded = self.queue.len(),
            "delayed queue stopped"
        );
    }

    fn handle_command(&mut self, cmd: QueueCommand) {
        match cmd {
            QueueCommand::Send { name, payload } => {
                self.dispatch(&name, payload);
            }
            QueueCommand::Schedule {
                token,
                due,
                name,
                payload,
            } => {
                let key = (due, token.0);
                debug!(dispatcher = %self.config.name, event = %name, token = token.0, ?due, "scheduled");
                self.queue.insert(key, PendingSend { name, payload });
                self.index.insert(token, key);
            }
            QueueCommand::Cancel { token } => match self.index.remove(&token) {
                Some(key) => {
                    self.queue.remove(&key);
                    debug!(dispatcher = %self.config.name, token = token.0, "cancelled");
                }
                None => {
                    trace!(dispatcher = %self.config.name, token = token.0, "cancel: not pending");
                }
            },
            QueueCommand::CancelEvent { name } => {
                let before = self.queue.len();
                self.queue.retain(|_, pending| pending.name != name);
                let queue = &self.queue;
                self.index.retain(|_, key| queue.contains_key(key));
                debug!(
                    dispatcher = %self.config.name,
                    event = %name,
                    removed = before - self.queue.len(),
                    "cancelled pending sends for event"
                );
            }
            QueueCommand::CancelAll => {
                debug!(dispatcher = %self.config.name, removed = self.queue.len(), "cancelled all pending sends");
                self.queue.clear();
                self.index.clear();
            }
            QueueCommand::Pending { reply } => {
                let _ = reply.send(self.queue.len());
            }
        }
    }

    fn dispatch(&self, name: &str, payload: Option<BoxAnySend>) {
        // 注册表不可变，发送期已校验过；找不到时静默丢弃
        let Some(spec) = self.registry.get(name) else {
            trace!(dispatcher = %self.config.name, event = %name, "no handler, dropping");
            return;
        };
        let _ = invoke_isolated(&self.config, spec, payload);
    }
}
