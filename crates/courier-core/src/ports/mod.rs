//! Ports - 抽象化レイヤー
//!
//! 外部コラボレータ（キューサービス、トランザクションストア、
//! シリアライザ、ヘッダ供給元、時計、ID 生成）へのインターフェース。
//! in-memory 実装は `impls` にある。

pub mod clock;
pub mod headers;
pub mod id_generator;
pub mod store;
pub mod task_queue;
pub mod transport;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::headers::{HeadersProvider, NoHeaders, StaticHeaders};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::store::{StoreError, Transaction, TransactionalStore};
pub use self::task_queue::{QueueError, TaskQueue};
pub use self::transport::{EventTransport, JsonTransport};
