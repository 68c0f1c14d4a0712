//! Typed - 型付き Event / Task API
//!
//! Event 型キーや Handler / Listener 名の typo を型で排除する。
//!
//! # 二層構造
//! - **表層（Typed）**: `Event`, `EventHandler<E>`, `EventListener<E>`, `Task` - 型安全
//! - **内部（Dyn）**: `AnyEvent`, `DynEventHandler`, `DynEventListener`, `AsyncTask` - object-safe, type erasure

pub mod event;
pub mod handler;
pub mod listeners;
pub mod options;
pub mod registry;
pub mod task;

pub use self::event::{AnyEvent, Event, EventDecoder, TypedDecoder};
pub use self::handler::{
    DynEventHandler, DynEventListener, EventHandler, EventListener, TypedHandler, TypedListener,
};
pub use self::listeners::ListenerRegistry;
pub use self::options::{EventRoute, Target, TaskOptions};
pub use self::registry::{Component, ComponentRegistry, RegistryError};
pub use self::task::{AsyncTask, Task, TypedTask};
