//! ComponentRegistry - 型キーからコンポーネントを解決する
//!
//! ワーカー側は文字列しか受け取らないので、`event` / `handler` /
//! `taskQueue` パラメータの値をここで生きたインスタンスに戻す。
//!
//! # 学習ポイント
//! - HashMap での型消去された trait object の管理
//! - Generic methods での登録と型安全性
//! - factory closure による解決ごとのインスタンス生成

use std::collections::HashMap;
use std::sync::Arc;

use crate::typed::event::{Event, EventDecoder, TypedDecoder};
use crate::typed::handler::{DynEventHandler, EventHandler, TypedHandler};
use crate::typed::task::{AsyncTask, Task, TypedTask};

type Factory<T> = Arc<dyn Fn() -> Arc<T> + Send + Sync>;

#[derive(Clone)]
enum Entry {
    Event(Arc<dyn EventDecoder>),
    Handler(Factory<dyn DynEventHandler>),
    Task(Factory<dyn AsyncTask>),
}

/// A resolved component. Which variant comes back decides whether a key
/// can be used as an event, a handler or a task.
#[derive(Clone)]
pub enum Component {
    Event(Arc<dyn EventDecoder>),
    Handler(Arc<dyn DynEventHandler>),
    Task(Arc<dyn AsyncTask>),
}

impl Component {
    pub fn kind(&self) -> &'static str {
        match self {
            Component::Event(_) => "event",
            Component::Handler(_) => "handler",
            Component::Task(_) => "task",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("component key '{0}' is already registered")]
    AlreadyRegistered(String),
}

/// ComponentRegistry は型キー → コンポーネントの対応を保持
///
/// # 使用例
/// ```ignore
/// let mut registry = ComponentRegistry::new();
/// registry.register_event::<OrderPlaced>()?;
/// registry.register_handler::<OrderPlaced>(OrderPlacedHandler::default())?;
/// registry.register_task(RebuildReport)?;
///
/// let component = registry.resolve("shop.order.placed.v1");
/// ```
///
/// Handler と Task は `NAME` / `TYPE` に加えて Rust の型パスでも引ける。
#[derive(Default)]
pub struct ComponentRegistry {
    entries: HashMap<String, Entry>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_event<E: Event>(&mut self) -> Result<(), RegistryError> {
        let decoder: Arc<dyn EventDecoder> = Arc::new(TypedDecoder::<E>::new());
        self.insert(&[E::TYPE], Entry::Event(decoder))
    }

    /// Registers one shared handler instance for `E`.
    pub fn register_handler<E: Event>(&mut self, handler: E::Handler) -> Result<(), RegistryError> {
        let shared: Arc<dyn DynEventHandler> = Arc::new(TypedHandler::<E, _>::new(handler));
        self.insert(
            &Self::handler_keys::<E>(),
            Entry::Handler(Arc::new(move || shared.clone())),
        )
    }

    /// Registers a factory that builds a fresh handler on every resolution.
    pub fn register_handler_factory<E, F>(&mut self, factory: F) -> Result<(), RegistryError>
    where
        E: Event,
        F: Fn() -> E::Handler + Send + Sync + 'static,
    {
        let factory: Factory<dyn DynEventHandler> = Arc::new(move || -> Arc<dyn DynEventHandler> {
            Arc::new(TypedHandler::<E, _>::new(factory()))
        });
        self.insert(&Self::handler_keys::<E>(), Entry::Handler(factory))
    }

    pub fn register_task<T: Task>(&mut self, task: T) -> Result<(), RegistryError> {
        let shared: Arc<dyn AsyncTask> = Arc::new(TypedTask::new(task));
        self.insert(
            &Self::task_keys::<T>(),
            Entry::Task(Arc::new(move || shared.clone())),
        )
    }

    pub fn register_task_factory<T, F>(&mut self, factory: F) -> Result<(), RegistryError>
    where
        T: Task,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let factory: Factory<dyn AsyncTask> =
            Arc::new(move || -> Arc<dyn AsyncTask> { Arc::new(TypedTask::new(factory())) });
        self.insert(&Self::task_keys::<T>(), Entry::Task(factory))
    }

    /// Resolves a key to a live component. Handlers and tasks are produced by
    /// their factory on every call.
    pub fn resolve(&self, key: &str) -> Option<Component> {
        self.entries.get(key).map(|entry| match entry {
            Entry::Event(decoder) => Component::Event(decoder.clone()),
            Entry::Handler(factory) => Component::Handler(factory()),
            Entry::Task(factory) => Component::Task(factory()),
        })
    }

    /// Event types whose declared handler is not registered as a handler.
    pub fn unhandled_events(&self) -> Vec<String> {
        let mut missing: Vec<String> = self
            .entries
            .values()
            .filter_map(|entry| match entry {
                Entry::Event(decoder) => Some(decoder),
                _ => None,
            })
            .filter(|decoder| {
                !matches!(self.entries.get(decoder.handler_name()), Some(Entry::Handler(_)))
            })
            .map(|decoder| decoder.event_type().to_string())
            .collect();
        missing.sort();
        missing
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn registered_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn handler_keys<E: Event>() -> [&'static str; 2] {
        [
            <E::Handler as EventHandler<E>>::NAME,
            std::any::type_name::<E::Handler>(),
        ]
    }

    fn task_keys<T: Task>() -> [&'static str; 2] {
        [T::TYPE, std::any::type_name::<T>()]
    }

    fn insert(&mut self, keys: &[&str], entry: Entry) -> Result<(), RegistryError> {
        if let Some(taken) = keys.iter().find(|key| self.entries.contains_key(**key)) {
            return Err(RegistryError::AlreadyRegistered(taken.to_string()));
        }
        for key in keys {
            self.entries.insert(key.to_string(), entry.clone());
        }
        Ok(())
    }
}
