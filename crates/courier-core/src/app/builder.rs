//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 開発体験の改善（明確なエラーメッセージ）

use std::sync::Arc;
use tracing::info;

use crate::app::config::{ConfigError, CourierConfig};
use crate::app::dispatcher::Dispatcher;
use crate::app::event_bus::EventBus;
use crate::app::scheduler::{Scheduler, SchedulerFactory};
use crate::app::worker::Worker;
use crate::impls::{InMemoryStore, InMemoryTaskQueue};
use crate::ports::{
    EventTransport, HeadersProvider, JsonTransport, NoHeaders, TaskQueue, TransactionalStore,
};
use crate::typed::{
    ComponentRegistry, Event, EventListener, ListenerRegistry, RegistryError, Task,
};

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new()
///     .config(CourierConfig::load("courier.toml")?)
///     .queue(queue)
///     .store(store)
///     .register_event::<OrderPlaced>(OrderPlacedHandler::default())?
///     .register_listener::<OrderPlaced, _>(SendReceipt::default())
///     .register_task(RebuildReport)?
///     .expect_components(&["reports.rebuild.v1"])
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - キューとストアが無ければ BuildError
/// - Handler 未登録の Event、未登録の Event に対する Listener は BuildError
/// - expect_components() の期待集合 ⊆ 登録済み集合をチェック
pub struct AppBuilder {
    components: ComponentRegistry,
    listeners: ListenerRegistry,
    config: CourierConfig,
    queue: Option<Arc<dyn TaskQueue>>,
    store: Option<Arc<dyn TransactionalStore>>,
    transport: Arc<dyn EventTransport>,
    headers: Arc<dyn HeadersProvider>,
    expected: Option<Vec<String>>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing components: {0:?}. These keys were expected but not registered.")]
    MissingComponents(Vec<String>),

    #[error("Events without a registered handler: {0:?}")]
    MissingHandlers(Vec<String>),

    #[error("Listeners registered for unknown event types: {0:?}")]
    UnknownListenerEvents(Vec<String>),

    #[error("No {0} configured")]
    MissingPort(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            components: ComponentRegistry::new(),
            listeners: ListenerRegistry::new(),
            config: CourierConfig::default(),
            queue: None,
            store: None,
            transport: Arc::new(JsonTransport),
            headers: Arc::new(NoHeaders),
            expected: None,
        }
    }

    pub fn config(mut self, config: CourierConfig) -> Self {
        self.config = config;
        self
    }

    pub fn queue(mut self, queue: Arc<dyn TaskQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn store(mut self, store: Arc<dyn TransactionalStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// in-memory キューと、そこに commit する in-memory ストアを使う
    pub fn in_memory(self, queue: Arc<InMemoryTaskQueue>) -> Self {
        let store = Arc::new(InMemoryStore::new(queue.clone()));
        self.queue(queue).store(store)
    }

    pub fn transport(mut self, transport: Arc<dyn EventTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn headers(mut self, headers: Arc<dyn HeadersProvider>) -> Self {
        self.headers = headers;
        self
    }

    /// Replaces the component registry wholesale.
    pub fn components(mut self, components: ComponentRegistry) -> Self {
        self.components = components;
        self
    }

    pub fn listeners(mut self, listeners: ListenerRegistry) -> Self {
        self.listeners = listeners;
        self
    }

    /// Event 型とその Handler を登録
    pub fn register_event<E: Event>(mut self, handler: E::Handler) -> Result<Self, RegistryError> {
        self.components.register_event::<E>()?;
        self.components.register_handler::<E>(handler)?;
        Ok(self)
    }

    pub fn register_listener<E: Event, L: EventListener<E>>(mut self, listener: L) -> Self {
        self.listeners.register::<E, L>(listener);
        self
    }

    pub fn register_task<T: Task>(mut self, task: T) -> Result<Self, RegistryError> {
        self.components.register_task(task)?;
        Ok(self)
    }

    /// 期待されるコンポーネントキーのリストを設定
    pub fn expect_components(mut self, keys: &[&str]) -> Self {
        self.expected = Some(keys.iter().map(|k| k.to_string()).collect());
        self
    }

    /// # 検証
    /// - config の値
    /// - queue / store の有無
    /// - Handler 未登録の Event
    /// - 未登録 Event への Listener
    /// - expect_components() のキー
    pub fn build(self) -> Result<App, BuildError> {
        self.config.validate()?;
        let queue = self.queue.ok_or(BuildError::MissingPort("task queue"))?;
        let store = self.store.ok_or(BuildError::MissingPort("transactional store"))?;

        let unhandled = self.components.unhandled_events();
        if !unhandled.is_empty() {
            return Err(BuildError::MissingHandlers(unhandled));
        }

        let unknown: Vec<String> = self
            .listeners
            .event_types()
            .into_iter()
            .filter(|event_type| !self.components.contains(event_type))
            .map(str::to_owned)
            .collect();
        if !unknown.is_empty() {
            return Err(BuildError::UnknownListenerEvents(unknown));
        }

        if let Some(expected) = &self.expected {
            let missing: Vec<String> = expected
                .iter()
                .filter(|key| !self.components.contains(key))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingComponents(missing));
            }
        }

        info!(
            components = self.components.registered_keys().len(),
            listener_events = self.listeners.event_types().len(),
            default_queue = %self.config.default_queue,
            "courier app built"
        );

        let schedulers =
            SchedulerFactory::new(queue, self.transport, self.headers, Arc::new(self.config));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(self.components),
            Arc::new(self.listeners),
            schedulers.clone(),
            store,
        ));

        Ok(App {
            worker: Worker::new(dispatcher.clone()),
            event_bus: EventBus::new(schedulers.clone()),
            dispatcher,
            schedulers,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// App は producer 側と worker 側の入口をまとめたもの
pub struct App {
    dispatcher: Arc<Dispatcher>,
    schedulers: SchedulerFactory,
    worker: Worker,
    event_bus: EventBus,
}

impl App {
    /// A fresh, empty scheduler.
    pub fn scheduler(&self) -> Scheduler {
        self.schedulers.scheduler()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn worker(&self) -> &Worker {
        &self.worker
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn config(&self) -> &CourierConfig {
        self.schedulers.config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        ActionEvent, ActionEventHandler, DefaultActionEvent, Indexing, RecordingTask,
    };

    fn base() -> AppBuilder {
        AppBuilder::new().in_memory(Arc::new(InMemoryTaskQueue::new()))
    }

    #[test]
    fn test_build_success() {
        let app = base()
            .register_event::<ActionEvent>(ActionEventHandler::default())
            .unwrap()
            .register_listener::<ActionEvent, _>(Indexing::default())
            .register_task(RecordingTask::default())
            .unwrap()
            .expect_components(&[ActionEvent::TYPE, RecordingTask::TYPE])
            .build();
        assert!(app.is_ok());
    }

    #[test]
    fn test_build_missing_components() {
        let app = base()
            .register_task(RecordingTask::default())
            .unwrap()
            .expect_components(&[RecordingTask::TYPE, ActionEvent::TYPE])
            .build();
        assert!(matches!(
            app,
            Err(BuildError::MissingComponents(missing)) if missing == vec![ActionEvent::TYPE.to_string()]
        ));
    }

    #[test]
    fn test_build_requires_ports() {
        let app = AppBuilder::new().build();
        assert!(matches!(app, Err(BuildError::MissingPort("task queue"))));

        let app = AppBuilder::new()
            .queue(Arc::new(InMemoryTaskQueue::new()))
            .build();
        assert!(matches!(app, Err(BuildError::MissingPort("transactional store"))));
    }

    #[test]
    fn test_build_rejects_event_without_handler() {
        let mut components = ComponentRegistry::new();
        components.register_event::<DefaultActionEvent>().unwrap();

        let app = base().components(components).build();
        assert!(matches!(
            app,
            Err(BuildError::MissingHandlers(events)) if events == vec![DefaultActionEvent::TYPE.to_string()]
        ));
    }

    #[test]
    fn test_build_rejects_listener_for_unknown_event() {
        let app = base()
            .register_listener::<ActionEvent, _>(Indexing::default())
            .build();
        assert!(matches!(app, Err(BuildError::UnknownListenerEvents(_))));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let config = CourierConfig {
            worker_endpoint: "relative".into(),
            ..CourierConfig::default()
        };
        let app = base().config(config).build();
        assert!(matches!(app, Err(BuildError::Config(_))));
    }

    #[test]
    fn test_double_event_registration() {
        let result = base()
            .register_event::<ActionEvent>(ActionEventHandler::default())
            .unwrap()
            .register_event::<ActionEvent>(ActionEventHandler::default());
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(_))));
    }
}
