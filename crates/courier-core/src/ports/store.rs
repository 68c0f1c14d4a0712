//! TransactionalStore port - fan-out の all-or-nothing 境界
//!
//! Transaction 自体が TaskQueue として振る舞う（staged enqueue）。
//! commit で全件が配送対象になり、rollback では 1 件も残らない。
//! commit が失敗してもトランザクションは手元に残るので、呼び出し側が rollback する。
//!
//! # 使用例
//!
//! ```ignore
//! let txn = store.begin().await?;
//! txn.enqueue(handler_item).await?;
//! txn.enqueue(listener_item).await?;
//! if let Err(err) = txn.commit().await {
//!     txn.rollback().await?;
//!     return Err(err.into());
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::ports::TaskQueue;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("cannot begin transaction: {0}")]
    Begin(String),

    #[error("commit failed: {0}")]
    Commit(String),

    #[error("rollback failed: {0}")]
    Rollback(String),
}

#[async_trait]
pub trait TransactionalStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError>;
}

/// One open transaction. Consumed by `rollback`; after a failed `commit`
/// it is still open and must be rolled back.
#[async_trait]
pub trait Transaction: TaskQueue {
    async fn commit(&self) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
