//! courier-core
//!
//! Queue-backed event / task dispatch.
//!
//! Event は 1 つの Handler と 0 個以上の Listener に届けられる。
//! Listener ごとに独立した WorkItem として enqueue され、個別にリトライされる。
//! 1 回の fan-out で enqueue される WorkItem は、全件 commit されるか 1 件も残らないかのどちらか。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（errors, ids, keys, params, work_item）
//! - **ports**: 抽象化レイヤー（TaskQueue, TransactionalStore, EventTransport, HeadersProvider, Clock, IdGenerator）
//! - **typed**: 型付き API（Event, EventHandler, EventListener, Task, TaskOptions, registries）
//! - **app**: アプリケーションロジック（builder, scheduler, dispatcher, worker, event_bus, config）
//! - **impls**: in-memory 実装（開発・テスト用）

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod typed;

#[cfg(test)]
pub(crate) mod testing;

pub use app::{App, AppBuilder, CourierConfig, EventBus, Scheduler, Worker};
pub use domain::{CourierError, CourierResult, ParamBag, TaskParams, WorkItem};
pub use typed::{Event, EventHandler, EventListener, Task, TaskOptions};
