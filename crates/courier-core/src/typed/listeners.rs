//! ListenerRegistry - Event 型ごとの Listener 一覧
//!
//! 起動時に登録し、その後は `Arc` で共有して読み取り専用で使う。
//! 同じ Listener 型を同じ Event に 2 回登録しても 1 件のまま。
//! 一覧は登録順で安定している。
//!
//! 別の型が同じ `NAME` を名乗る場合は両方とも残す。配送用のキー
//! （`listener_keys`）ではその組だけ型パスに切り替えて区別する。

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::typed::event::Event;
use crate::typed::handler::{DynEventListener, EventListener, TypedListener};

type ListenerFactory = Arc<dyn Fn() -> Arc<dyn DynEventListener> + Send + Sync>;

struct Registration {
    listener_type: TypeId,
    name: &'static str,
    type_path: &'static str,
    factory: ListenerFactory,
}

impl Registration {
    fn matches(&self, name: &str) -> bool {
        self.name == name || self.type_path == name
    }
}

/// # 使用例
/// ```ignore
/// let mut listeners = ListenerRegistry::new();
/// listeners
///     .register::<OrderPlaced, _>(SendReceipt::default())
///     .register::<OrderPlaced, _>(UpdateSearchIndex::default());
///
/// assert_eq!(
///     listeners.listener_names(OrderPlaced::TYPE),
///     vec!["SendReceipt", "UpdateSearchIndex"],
/// );
/// ```
#[derive(Default)]
pub struct ListenerRegistry {
    by_event: HashMap<String, Vec<Registration>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one shared listener instance against `E`.
    pub fn register<E: Event, L: EventListener<E>>(&mut self, listener: L) -> &mut Self {
        let shared: Arc<dyn DynEventListener> = Arc::new(TypedListener::<E, _>::new(listener));
        self.push::<E, L>(Arc::new(move || shared.clone()))
    }

    /// Registers a factory that builds a fresh listener on every `create*` call.
    pub fn register_factory<E, L, F>(&mut self, factory: F) -> &mut Self
    where
        E: Event,
        L: EventListener<E>,
        F: Fn() -> L + Send + Sync + 'static,
    {
        self.push::<E, L>(Arc::new(move || -> Arc<dyn DynEventListener> {
            Arc::new(TypedListener::<E, _>::new(factory()))
        }))
    }

    fn push<E: Event, L: EventListener<E>>(&mut self, factory: ListenerFactory) -> &mut Self {
        let registrations = self.by_event.entry(E::TYPE.to_string()).or_default();
        let listener_type = TypeId::of::<L>();

        if registrations.iter().any(|r| r.listener_type == listener_type) {
            debug!(event = E::TYPE, listener = L::NAME, "listener already registered");
            return self;
        }
        if registrations.iter().any(|r| r.name == L::NAME) {
            debug!(
                event = E::TYPE,
                listener = L::NAME,
                type_path = std::any::type_name::<L>(),
                "listener name shared with another type, routing by type path"
            );
        }

        registrations.push(Registration {
            listener_type,
            name: L::NAME,
            type_path: std::any::type_name::<L>(),
            factory,
        });
        self
    }

    /// Short names of every listener registered for `event_type`, in
    /// registration order. Empty when there are none.
    pub fn listener_names(&self, event_type: &str) -> Vec<&str> {
        self.registrations(event_type).map(|r| r.name).collect()
    }

    /// Keys that address each listener on the wire, in registration order.
    /// The short name, or the type path when another listener registered for
    /// the same event uses the same short name.
    pub fn listener_keys(&self, event_type: &str) -> Vec<&str> {
        let registrations: Vec<&Registration> = self.registrations(event_type).collect();
        registrations
            .iter()
            .map(|r| {
                let shared = registrations.iter().filter(|o| o.name == r.name).count() > 1;
                if shared { r.type_path } else { r.name }
            })
            .collect()
    }

    /// Instantiates the listener whose short name or type path is `name`.
    /// A short name shared by several listeners resolves to the first one.
    pub fn create_listener(&self, event_type: &str, name: &str) -> Option<Arc<dyn DynEventListener>> {
        self.registrations(event_type)
            .find(|r| r.matches(name))
            .map(|r| (r.factory)())
    }

    /// Instantiates every listener registered for `event_type`.
    pub fn create(&self, event_type: &str) -> Vec<Arc<dyn DynEventListener>> {
        self.registrations(event_type).map(|r| (r.factory)()).collect()
    }

    pub fn event_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self
            .by_event
            .iter()
            .filter(|(_, regs)| !regs.is_empty())
            .map(|(event_type, _)| event_type.as_str())
            .collect();
        types.sort_unstable();
        types
    }

    fn registrations(&self, event_type: &str) -> impl Iterator<Item = &Registration> {
        self.by_event.get(event_type).into_iter().flatten()
    }
}
