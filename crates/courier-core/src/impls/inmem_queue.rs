//! InMemoryTaskQueue - 開発・テスト用のキューサービス
//!
//! # 実装詳細
//! - HashMap<String, VecDeque<QueuedItem>> でキュー名ごとに FIFO を管理
//! - 受理した idempotency name は配送後も保持する（同名の再 enqueue は AlreadyExists）
//! - countdown / ETA は Clock で判定する（`drain_ready` は期限前の item を残す）
//! - `fail_after` で enqueue 失敗を注入できる

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::domain::{ItemId, WorkItem};
use crate::ports::{Clock, IdGenerator, QueueError, SystemClock, TaskQueue, UlidGenerator};

/// An accepted work item together with what the queue stamped on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedItem {
    pub id: ItemId,
    pub enqueued_at: DateTime<Utc>,
    pub item: WorkItem,
    seq: u64,
}

impl QueuedItem {
    pub fn eligible_at(&self) -> DateTime<Utc> {
        self.item.schedule().eligible_at(self.enqueued_at)
    }
}

#[derive(Default)]
struct State {
    queues: HashMap<String, VecDeque<QueuedItem>>,
    names: HashSet<String>,
    next_seq: u64,
    /// Remaining successful enqueues before `Unavailable` is returned.
    fail_after: Option<usize>,
}

/// # 使用例
/// ```ignore
/// let queue = Arc::new(InMemoryTaskQueue::new());
/// queue.enqueue(item).await?;
///
/// for queued in queue.drain_ready() {
///     worker.handle_item(&queued.item).await?;
/// }
/// ```
pub struct InMemoryTaskQueue {
    state: Mutex<State>,
    clock: Arc<dyn Clock>,
    ids: Box<dyn IdGenerator>,
}

impl InMemoryTaskQueue {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            ids: Box::new(UlidGenerator::new(clock.clone())),
            clock,
        }
    }

    /// Accept `n` more items, then fail every enqueue with `Unavailable`.
    pub fn fail_after(&self, n: usize) {
        self.lock().fail_after = Some(n);
    }

    pub fn recover(&self) {
        self.lock().fail_after = None;
    }

    /// Total number of items waiting in all queues.
    pub fn len(&self) -> usize {
        self.lock().queues.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len_of(&self, queue: &str) -> usize {
        self.lock().queues.get(queue).map_or(0, VecDeque::len)
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.lock().names.contains(name)
    }

    /// Snapshot of every waiting item in enqueue order.
    pub fn items(&self) -> Vec<QueuedItem> {
        let state = self.lock();
        let mut items: Vec<QueuedItem> = state.queues.values().flatten().cloned().collect();
        items.sort_by_key(|q| q.seq);
        items
    }

    pub fn items_in(&self, queue: &str) -> Vec<QueuedItem> {
        self.lock()
            .queues
            .get(queue)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Removes and returns every item whose schedule has come due, across all
    /// queues, in enqueue order.
    pub fn drain_ready(&self) -> Vec<QueuedItem> {
        let now = self.clock.now();
        let mut state = self.lock();
        let mut ready = Vec::new();
        for queue in state.queues.values_mut() {
            let (due, waiting): (VecDeque<_>, VecDeque<_>) =
                queue.drain(..).partition(|q| q.eligible_at() <= now);
            *queue = waiting;
            ready.extend(due);
        }
        ready.sort_by_key(|q| q.seq);
        ready
    }

    /// Accepts a whole batch or nothing. Used by the in-memory store on commit.
    pub(crate) fn publish(&self, items: Vec<WorkItem>) -> Result<(), QueueError> {
        let mut state = self.lock();
        let mut batch_names = HashSet::new();
        for name in items.iter().filter_map(WorkItem::name) {
            if state.names.contains(name) || !batch_names.insert(name) {
                return Err(QueueError::AlreadyExists(name.to_string()));
            }
        }
        for item in items {
            self.accept(&mut state, item);
        }
        Ok(())
    }

    fn accept(&self, state: &mut State, item: WorkItem) {
        if let Some(name) = item.name() {
            state.names.insert(name.to_string());
        }
        let queued = QueuedItem {
            id: self.ids.generate_item_id(),
            enqueued_at: self.clock.now(),
            seq: state.next_seq,
            item,
        };
        state.next_seq += 1;
        debug!(
            id = %queued.id,
            queue = queued.item.queue(),
            name = queued.item.name(),
            "work item accepted"
        );
        state
            .queues
            .entry(queued.item.queue().to_string())
            .or_default()
            .push_back(queued);
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryTaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn enqueue(&self, item: WorkItem) -> Result<(), QueueError> {
        let mut state = self.lock();

        if let Some(remaining) = state.fail_after.as_mut() {
            if *remaining == 0 {
                return Err(QueueError::Unavailable("injected enqueue failure".into()));
            }
            *remaining -= 1;
        }
        if let Some(name) = item.name() {
            if state.names.contains(name) {
                return Err(QueueError::AlreadyExists(name.to_string()));
            }
        }

        self.accept(&mut state, item);
        Ok(())
    }
}
