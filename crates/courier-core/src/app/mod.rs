//! App - アプリケーション層
//!
//! ports と typed を組み合わせて、producer 側と worker 側の処理を実装する。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: アプリケーションの構築とワイヤリング
//! - **Scheduler**: TaskOptions → WorkItem の変換と enqueue
//! - **Dispatcher**: worker 側の再入口（inline 実行 / fan-out）
//! - **Worker**: パラメータから Dispatcher の入口を選ぶ
//! - **EventBus**: `fire(event)`
//! - **CourierConfig**: キュー振り分け設定

pub mod builder;
pub mod config;
pub mod dispatcher;
pub mod event_bus;
pub mod scheduler;
pub mod worker;

pub use self::builder::{App, AppBuilder, BuildError};
pub use self::config::{ConfigError, CourierConfig};
pub use self::dispatcher::Dispatcher;
pub use self::event_bus::EventBus;
pub use self::scheduler::{Batch, Scheduler, SchedulerFactory};
pub use self::worker::{Route, Worker};
