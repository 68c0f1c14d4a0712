//! Event trait - ドメインイベントの定義
//!
//! Event は型キー（`TYPE`）と、ルーティング先の Handler 型を宣言する。
//! Listener の数は Event 側では決めない（ListenerRegistry が持つ）。
//!
//! # 二層構造
//! - **表層（Typed）**: `Event` trait - 型安全
//! - **内部（Dyn）**: `AnyEvent` / `EventDecoder` - object-safe, type erasure

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::domain::CourierResult;
use crate::typed::handler::EventHandler;

/// Event は 1 つの Handler と 0 個以上の Listener に届けられる値
///
/// # 使用例
/// ```ignore
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct OrderPlaced {
///     order_id: String,
/// }
///
/// impl Event for OrderPlaced {
///     const TYPE: &'static str = "shop.order.placed.v1";
///     type Handler = OrderPlacedHandler;
/// }
/// ```
pub trait Event: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    /// Stable type key written into the `event` parameter.
    const TYPE: &'static str;

    /// The single handler this event is routed to.
    type Handler: EventHandler<Self>;
}

/// Object-safe view of an event.
pub trait AnyEvent: fmt::Debug + Send + Sync {
    fn event_type(&self) -> &str;

    fn handler_name(&self) -> &str;

    fn to_value(&self) -> CourierResult<Value>;

    fn as_any(&self) -> &dyn Any;
}

impl<E: Event> AnyEvent for E {
    fn event_type(&self) -> &str {
        E::TYPE
    }

    fn handler_name(&self) -> &str {
        <E::Handler as EventHandler<E>>::NAME
    }

    fn to_value(&self) -> CourierResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Rehydrates a serialized event of one concrete type.
pub trait EventDecoder: Send + Sync {
    fn event_type(&self) -> &str;

    /// Name of the handler declared by the event type.
    fn handler_name(&self) -> &str;

    fn decode(&self, value: Value) -> CourierResult<Arc<dyn AnyEvent>>;
}

pub struct TypedDecoder<E> {
    _marker: PhantomData<fn() -> E>,
}

impl<E: Event> TypedDecoder<E> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<E: Event> Default for TypedDecoder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> EventDecoder for TypedDecoder<E> {
    fn event_type(&self) -> &str {
        E::TYPE
    }

    fn handler_name(&self) -> &str {
        <E::Handler as EventHandler<E>>::NAME
    }

    fn decode(&self, value: Value) -> CourierResult<Arc<dyn AnyEvent>> {
        let event: E = serde_json::from_value(value)?;
        Ok(Arc::new(event))
    }
}
