//! Scheduler - TaskOptions を WorkItem に変換して enqueue する
//!
//! # 二段階
//! 1. `prepare()` - 全件を WorkItem に組み立てる（副作用なし。シリアライズ失敗はここで出る）
//! 2. `Batch::submit()` / `Batch::submit_into(txn)` - 挿入順に enqueue
//!
//! 名前付き Task の `AlreadyExists` は fan-in として握りつぶす。
//! それ以外のキューエラーで残りを中断する（投入済みの分はそのまま）。
//! 失敗した flush の後、pending には自分のキューに未投入の分だけが残る。
//!
//! # 使用例
//!
//! ```ignore
//! let mut scheduler = schedulers.scheduler();
//! scheduler
//!     .add(TaskOptions::event(OrderPlaced { order_id }))
//!     .add(TaskOptions::task::<RebuildReport>().named("rebuild-2024"));
//! scheduler.flush().await?;
//! ```

use std::sync::Arc;
use tracing::{debug, warn};

use crate::app::config::CourierConfig;
use crate::domain::keys::{self, EVENT, EVENT_JSON, HANDLER, LISTENER, TASK_QUEUE};
use crate::domain::{CourierError, CourierResult, WorkItem};
use crate::ports::{EventTransport, HeadersProvider, QueueError, TaskQueue};
use crate::typed::{EventRoute, Target, TaskOptions};

/// Outbound wiring shared by every Scheduler of one application.
#[derive(Clone)]
pub struct SchedulerFactory {
    queue: Arc<dyn TaskQueue>,
    transport: Arc<dyn EventTransport>,
    headers: Arc<dyn HeadersProvider>,
    config: Arc<CourierConfig>,
}

impl SchedulerFactory {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        transport: Arc<dyn EventTransport>,
        headers: Arc<dyn HeadersProvider>,
        config: Arc<CourierConfig>,
    ) -> Self {
        Self {
            queue,
            transport,
            headers,
            config,
        }
    }

    pub fn scheduler(&self) -> Scheduler {
        Scheduler {
            wiring: self.clone(),
            pending: Vec::new(),
        }
    }

    pub fn transport(&self) -> &Arc<dyn EventTransport> {
        &self.transport
    }

    pub fn config(&self) -> &CourierConfig {
        &self.config
    }
}

/// Accumulates pending options. Nothing is enqueued before `flush`.
pub struct Scheduler {
    wiring: SchedulerFactory,
    pending: Vec<TaskOptions>,
}

impl Scheduler {
    pub fn add(&mut self, options: TaskOptions) -> &mut Self {
        self.pending.push(options);
        self
    }

    pub fn add_all(&mut self, options: impl IntoIterator<Item = TaskOptions>) -> &mut Self {
        self.pending.extend(options);
        self
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Builds every pending option into a work item without enqueueing.
    pub fn prepare(&self) -> CourierResult<Batch> {
        let items = self
            .pending
            .iter()
            .map(|options| self.build(options))
            .collect::<CourierResult<Vec<_>>>()?;
        Ok(Batch {
            queue: self.wiring.queue.clone(),
            items,
        })
    }

    /// Enqueues everything on the scheduler's own queue. On failure the
    /// options already enqueued are dropped from `pending`, so a retry
    /// submits only the rest.
    pub async fn flush(&mut self) -> CourierResult<()> {
        let (submitted, result) = self.prepare()?.submit_counted::<dyn TaskQueue>(None).await;
        self.pending.drain(..submitted);
        result
    }

    /// Enqueues through `txn`, except transactionless options. On failure
    /// only the transactionless options already enqueued are dropped from
    /// `pending`; the rest stay until the caller's transaction outcome is known.
    pub async fn flush_into<Q: TaskQueue + ?Sized>(&mut self, txn: &Q) -> CourierResult<()> {
        let (submitted, result) = self.prepare()?.submit_counted(Some(txn)).await;
        match result {
            Ok(()) => self.pending.clear(),
            Err(_) => {
                let mut index = 0;
                self.pending.retain(|options| {
                    let keep = index >= submitted || !options.is_transactionless();
                    index += 1;
                    keep
                });
            }
        }
        result
    }

    fn build(&self, options: &TaskOptions) -> CourierResult<Prepared> {
        let config = &self.wiring.config;
        let endpoint = config.worker_endpoint.as_str();

        let item = match options.target() {
            Target::Task { task_type } => {
                let queue = config.queue_for(&[task_type.as_str()]);
                WorkItem::new(queue, endpoint)
                    .with_param(TASK_QUEUE, task_type.as_str())
                    .with_name(options.name().map(str::to_owned))
            }
            Target::Event { event, route } => {
                let event_json = self.wiring.transport.encode(&event.to_value()?)?;
                let event_type = event.event_type();
                if let Some(name) = options.name() {
                    debug!(event = event_type, name, "idempotency name ignored for events");
                }

                let item = match route {
                    EventRoute::FanOut => WorkItem::new(config.queue_for(&[event_type]), endpoint),
                    EventRoute::Handler(handler) => {
                        WorkItem::new(config.queue_for(&[handler.as_str(), event_type]), endpoint)
                            .with_param(HANDLER, handler.as_str())
                    }
                    EventRoute::Listener(listener) => {
                        WorkItem::new(config.queue_for(&[listener.as_str(), event_type]), endpoint)
                            .with_param(LISTENER, listener.as_str())
                    }
                };
                item.with_param(EVENT, event_type)
                    .with_param(EVENT_JSON, event_json)
            }
        };

        let mut item = item
            .with_schedule(options.schedule().normalized())
            .with_headers(self.wiring.headers.headers());

        for (key, value) in options.params() {
            // 予約済みのキーはルーティング用の値が優先
            if keys::is_reserved(key) {
                warn!(param = %key, "reserved parameter name supplied by caller, ignoring");
                continue;
            }
            item = item.with_param(key.as_str(), value.as_str());
        }

        Ok(Prepared {
            item,
            transactionless: options.is_transactionless(),
        })
    }
}

struct Prepared {
    item: WorkItem,
    transactionless: bool,
}

/// Work items built by [`Scheduler::prepare`], ready to enqueue in order.
pub struct Batch {
    queue: Arc<dyn TaskQueue>,
    items: Vec<Prepared>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &WorkItem> {
        self.items.iter().map(|p| &p.item)
    }

    pub async fn submit(self) -> CourierResult<()> {
        self.submit_counted::<dyn TaskQueue>(None).await.1
    }

    pub async fn submit_into<Q: TaskQueue + ?Sized>(self, txn: &Q) -> CourierResult<()> {
        self.submit_counted(Some(txn)).await.1
    }

    /// Submits in order and stops at the first error. Returns how many items
    /// went through before it.
    async fn submit_counted<Q: TaskQueue + ?Sized>(
        self,
        txn: Option<&Q>,
    ) -> (usize, CourierResult<()>) {
        let mut submitted = 0;
        for prepared in self.items {
            let result = match txn {
                Some(txn) if !prepared.transactionless => submit_one(txn, prepared.item).await,
                _ => submit_one(&*self.queue, prepared.item).await,
            };
            if let Err(err) = result {
                return (submitted, Err(err));
            }
            submitted += 1;
        }
        (submitted, Ok(()))
    }
}

async fn submit_one<Q: TaskQueue + ?Sized>(queue: &Q, item: WorkItem) -> CourierResult<()> {
    let named = item.name().is_some();
    debug!(
        queue = item.queue(),
        endpoint = item.endpoint(),
        name = item.name(),
        "enqueueing work item"
    );
    match queue.enqueue(item).await {
        Err(QueueError::AlreadyExists(name)) if named => {
            debug!(name = %name, "task already enqueued under this name, fan-in");
            Ok(())
        }
        other => other.map_err(CourierError::from),
    }
}
