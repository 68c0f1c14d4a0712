//! Handler / Listener trait - Event を処理する側の定義
//!
//! # 学習ポイント
//! - ジェネリック trait (`EventHandler<E>`, `EventListener<E>`)
//! - Object-safe trait (`DynEventHandler`, `DynEventListener`)
//! - Type erasure パターン (`TypedHandler<E, H>` → `DynEventHandler`)
//!
//! Dyn 側は `&dyn AnyEvent` を受け取り、具象型へ downcast する。
//! 型が合わなければ `InvalidArgument`。

use async_trait::async_trait;
use std::marker::PhantomData;

use crate::domain::{CourierError, CourierResult};
use crate::typed::event::{AnyEvent, Event};

/// Handler は Event ごとに 1 つだけ存在する処理
///
/// # 使用例
/// ```ignore
/// struct OrderPlacedHandler;
///
/// #[async_trait]
/// impl EventHandler<OrderPlaced> for OrderPlacedHandler {
///     const NAME: &'static str = "OrderPlacedHandler";
///
///     async fn handle(&self, event: OrderPlaced) -> CourierResult<()> {
///         println!("placed: {}", event.order_id);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler<E: Event>: Send + Sync + 'static {
    /// Name written into the `handler` parameter.
    const NAME: &'static str;

    async fn handle(&self, event: E) -> CourierResult<()>;
}

/// Listener は Event に対して独立に実行・リトライされる処理
#[async_trait]
pub trait EventListener<E: Event>: Send + Sync + 'static {
    /// Short name written into the `listener` parameter.
    const NAME: &'static str;

    async fn on_event(&self, event: E) -> CourierResult<()>;
}

/// DynEventHandler は object-safe な Handler の抽象化
#[async_trait]
pub trait DynEventHandler: Send + Sync {
    async fn handle_dyn(&self, event: &dyn AnyEvent) -> CourierResult<()>;

    fn name(&self) -> &str;

    fn event_type(&self) -> &str;
}

#[async_trait]
pub trait DynEventListener: Send + Sync {
    async fn on_event_dyn(&self, event: &dyn AnyEvent) -> CourierResult<()>;

    fn name(&self) -> &str;

    /// Fully qualified Rust type path of the listener.
    fn type_path(&self) -> &str;

    fn event_type(&self) -> &str;
}

fn downcast<E: Event>(event: &dyn AnyEvent, consumer: &str) -> CourierResult<E> {
    event
        .as_any()
        .downcast_ref::<E>()
        .cloned()
        .ok_or_else(|| {
            CourierError::invalid_argument(format!(
                "{consumer} accepts '{}' but received '{}'",
                E::TYPE,
                event.event_type()
            ))
        })
}

pub struct TypedHandler<E, H> {
    handler: H,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Event, H: EventHandler<E>> TypedHandler<E, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<E: Event, H: EventHandler<E>> DynEventHandler for TypedHandler<E, H> {
    async fn handle_dyn(&self, event: &dyn AnyEvent) -> CourierResult<()> {
        let event = downcast::<E>(event, H::NAME)?;
        self.handler.handle(event).await
    }

    fn name(&self) -> &str {
        H::NAME
    }

    fn event_type(&self) -> &str {
        E::TYPE
    }
}

pub struct TypedListener<E, L> {
    listener: L,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Event, L: EventListener<E>> TypedListener<E, L> {
    pub fn new(listener: L) -> Self {
        Self {
            listener,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<E: Event, L: EventListener<E>> DynEventListener for TypedListener<E, L> {
    async fn on_event_dyn(&self, event: &dyn AnyEvent) -> CourierResult<()> {
        let event = downcast::<E>(event, L::NAME)?;
        self.listener.on_event(event).await
    }

    fn name(&self) -> &str {
        L::NAME
    }

    fn type_path(&self) -> &str {
        std::any::type_name::<L>()
    }

    fn event_type(&self) -> &str {
        E::TYPE
    }
}
