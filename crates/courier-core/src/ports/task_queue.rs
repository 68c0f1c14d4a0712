//! TaskQueue port - 外部キューサービス
//!
//! enqueue された WorkItem は、スケジュールに従って worker endpoint に
//! at-least-once で配送される。

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::domain::WorkItem;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// A work item with the same idempotency name was already accepted.
    #[error("work item named '{0}' already exists")]
    AlreadyExists(String),

    #[error("queue unavailable: {0}")]
    Unavailable(String),
}

/// Accepts work items for later delivery.
///
/// # Thread Safety
/// - `Send + Sync` を要求（Scheduler / Dispatcher から共有される）
#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn enqueue(&self, item: WorkItem) -> Result<(), QueueError>;
}

#[async_trait]
impl<Q: TaskQueue + ?Sized> TaskQueue for Arc<Q> {
    async fn enqueue(&self, item: WorkItem) -> Result<(), QueueError> {
        (**self).enqueue(item).await
    }
}
