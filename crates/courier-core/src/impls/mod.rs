//! Impls - 開発・テスト用の in-memory 実装

pub mod inmem_queue;
pub mod inmem_store;

pub use self::inmem_queue::{InMemoryTaskQueue, QueuedItem};
pub use self::inmem_store::InMemoryStore;
