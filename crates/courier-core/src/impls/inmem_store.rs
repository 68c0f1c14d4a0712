//! InMemoryStore - 開発・テスト用のトランザクションストア
//!
//! Transaction は enqueue された WorkItem を手元に溜めておき、
//! commit で InMemoryTaskQueue に一括で公開する。rollback では捨てる。
//! begin / staging / commit の失敗を注入できる。

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::domain::WorkItem;
use crate::impls::InMemoryTaskQueue;
use crate::ports::{QueueError, StoreError, TaskQueue, Transaction, TransactionalStore};

#[derive(Default)]
struct Stats {
    begun: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

pub struct InMemoryStore {
    queue: Arc<InMemoryTaskQueue>,
    stats: Arc<Stats>,
    fail_begin: AtomicBool,
    fail_commit: AtomicBool,
    fail_staging_after: Mutex<Option<usize>>,
}

impl InMemoryStore {
    pub fn new(queue: Arc<InMemoryTaskQueue>) -> Self {
        Self {
            queue,
            stats: Arc::new(Stats::default()),
            fail_begin: AtomicBool::new(false),
            fail_commit: AtomicBool::new(false),
            fail_staging_after: Mutex::new(None),
        }
    }

    pub fn queue(&self) -> &Arc<InMemoryTaskQueue> {
        &self.queue
    }

    pub fn fail_next_begin(&self) {
        self.fail_begin.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_commit(&self) {
        self.fail_commit.store(true, Ordering::SeqCst);
    }

    /// The next transaction accepts `n` staged items, then fails every enqueue.
    pub fn fail_next_staging_after(&self, n: usize) {
        *self
            .fail_staging_after
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(n);
    }

    pub fn begun(&self) -> usize {
        self.stats.begun.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.stats.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.stats.rollbacks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionalStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        if self.fail_begin.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Begin("injected begin failure".into()));
        }
        self.stats.begun.fetch_add(1, Ordering::SeqCst);

        let fail_after = self
            .fail_staging_after
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        Ok(Box::new(InMemoryTransaction {
            queue: self.queue.clone(),
            stats: self.stats.clone(),
            staged: Mutex::new(Vec::new()),
            fail_commit: self.fail_commit.swap(false, Ordering::SeqCst),
            fail_after,
        }))
    }
}

struct InMemoryTransaction {
    queue: Arc<InMemoryTaskQueue>,
    stats: Arc<Stats>,
    staged: Mutex<Vec<WorkItem>>,
    fail_commit: bool,
    fail_after: Option<usize>,
}

impl InMemoryTransaction {
    fn take_staged(&self) -> Vec<WorkItem> {
        std::mem::take(&mut *self.staged.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[async_trait]
impl TaskQueue for InMemoryTransaction {
    async fn enqueue(&self, item: WorkItem) -> Result<(), QueueError> {
        let mut staged = self.staged.lock().unwrap_or_else(PoisonError::into_inner);

        if self.fail_after.is_some_and(|n| staged.len() >= n) {
            return Err(QueueError::Unavailable("injected staging failure".into()));
        }
        if let Some(name) = item.name() {
            let staged_names: HashSet<&str> = staged.iter().filter_map(WorkItem::name).collect();
            if staged_names.contains(name) || self.queue.has_name(name) {
                return Err(QueueError::AlreadyExists(name.to_string()));
            }
        }

        staged.push(item);
        Ok(())
    }
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn commit(&self) -> Result<(), StoreError> {
        // 失敗時は staged を残し、rollback で捨てる
        if self.fail_commit {
            return Err(StoreError::Commit("injected commit failure".into()));
        }
        let staged = self.take_staged();
        let count = staged.len();
        self.queue
            .publish(staged)
            .map_err(|e| StoreError::Commit(e.to_string()))?;
        self.stats.commits.fetch_add(1, Ordering::SeqCst);
        debug!(items = count, "transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let discarded = self.take_staged().len();
        self.stats.rollbacks.fetch_add(1, Ordering::SeqCst);
        debug!(items = discarded, "transaction rolled back");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(n: u32) -> WorkItem {
        WorkItem::new("default", "/worker/taskQueue").with_param("n", n.to_string())
    }

    fn store() -> InMemoryStore {
        InMemoryStore::new(Arc::new(InMemoryTaskQueue::new()))
    }

    #[tokio::test]
    async fn commit_publishes_staged_items() {
        let store = store();
        let txn = store.begin().await.unwrap();
        txn.enqueue(item(1)).await.unwrap();
        txn.enqueue(item(2)).await.unwrap();

        // commit 前はキューに見えない
        assert!(store.queue().is_empty());

        txn.commit().await.unwrap();
        assert_eq!(store.queue().len(), 2);
        assert_eq!(store.commits(), 1);
    }

    #[tokio::test]
    async fn rollback_discards_staged_items() {
        let store = store();
        let txn = store.begin().await.unwrap();
        txn.enqueue(item(1)).await.unwrap();
        txn.rollback().await.unwrap();

        assert!(store.queue().is_empty());
        assert_eq!(store.rollbacks(), 1);
    }

    #[tokio::test]
    async fn injected_commit_failure_publishes_nothing() {
        let store = store();
        store.fail_next_commit();

        let txn = store.begin().await.unwrap();
        txn.enqueue(item(1)).await.unwrap();
        let err = txn.commit().await.unwrap_err();

        assert!(matches!(err, StoreError::Commit(_)));
        assert!(store.queue().is_empty());
        assert_eq!(store.commits(), 0);

        // commit に失敗したトランザクションはまだ rollback できる
        txn.rollback().await.unwrap();
        assert_eq!(store.rollbacks(), 1);
        assert!(store.queue().is_empty());
    }

    #[tokio::test]
    async fn injected_begin_failure_is_one_shot() {
        let store = store();
        store.fail_next_begin();

        assert!(matches!(store.begin().await, Err(StoreError::Begin(_))));
        assert!(store.begin().await.is_ok());
        assert_eq!(store.begun(), 1);
    }

    #[tokio::test]
    async fn staging_failure_after_n_items() {
        let store = store();
        store.fail_next_staging_after(1);

        let txn = store.begin().await.unwrap();
        txn.enqueue(item(1)).await.unwrap();
        assert!(matches!(
            txn.enqueue(item(2)).await,
            Err(QueueError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn staged_names_collide_with_published_ones() {
        let store = store();
        store
            .queue()
            .enqueue(item(0).with_name(Some("once".into())))
            .await
            .unwrap();

        let txn = store.begin().await.unwrap();
        let err = txn
            .enqueue(item(1).with_name(Some("once".into())))
            .await
            .unwrap_err();
        assert_eq!(err, QueueError::AlreadyExists("once".into()));
    }
}
