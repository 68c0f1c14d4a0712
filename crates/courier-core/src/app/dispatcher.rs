//! Dispatcher - ワーカー側の再入口
//!
//! シリアライズされた Event / Task を生きたインスタンスに戻して実行する。
//!
//! # fan-out の判断
//! - Listener なし → Handler をその場で実行（トランザクションなし）
//! - Listener あり → 1 トランザクションで Handler 用 1 件 + Listener ごとに 1 件を enqueue
//!
//! トランザクションは begin → enqueue → commit だけを囲む。
//! Handler / Listener の実行は決して囲まない。

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::app::scheduler::{Scheduler, SchedulerFactory};
use crate::domain::{CourierError, CourierResult, ParamBag, TaskParams};
use crate::ports::TransactionalStore;
use crate::typed::{
    AnyEvent, AsyncTask, Component, ComponentRegistry, DynEventHandler, EventRoute,
    ListenerRegistry, TaskOptions,
};

pub struct Dispatcher {
    components: Arc<ComponentRegistry>,
    listeners: Arc<ListenerRegistry>,
    schedulers: SchedulerFactory,
    store: Arc<dyn TransactionalStore>,
}

impl Dispatcher {
    pub fn new(
        components: Arc<ComponentRegistry>,
        listeners: Arc<ListenerRegistry>,
        schedulers: SchedulerFactory,
        store: Arc<dyn TransactionalStore>,
    ) -> Self {
        Self {
            components,
            listeners,
            schedulers,
            store,
        }
    }

    /// Fan-out entry point for an event with no explicit target.
    pub async fn dispatch_async_event(
        &self,
        event_type: Option<&str>,
        event_json: Option<&str>,
    ) -> CourierResult<()> {
        let event_type = require(event_type, "event type")?;
        let event_json = require(event_json, "event payload")?;

        let event = self.decode_event(event_type, event_json)?;
        let handler_name = event.handler_name().to_string();
        let listener_keys = self.listeners.listener_keys(event_type);

        if listener_keys.is_empty() {
            debug!(event = event_type, handler = %handler_name, "no listeners, handling inline");
            let handler = self.resolve_handler(&handler_name)?;
            return handler.handle_dyn(event.as_ref()).await;
        }

        let mut scheduler = self.schedulers.scheduler();
        scheduler.add(TaskOptions::for_event(
            event.clone(),
            EventRoute::Handler(handler_name),
        ));
        for key in &listener_keys {
            scheduler.add(TaskOptions::for_event(
                event.clone(),
                EventRoute::Listener(key.to_string()),
            ));
        }
        info!(
            event = event_type,
            listeners = listener_keys.len(),
            "fanning out event"
        );
        self.enqueue_atomically(scheduler).await
    }

    pub async fn dispatch_event_handler(
        &self,
        event_type: Option<&str>,
        event_json: Option<&str>,
        handler: Option<&str>,
    ) -> CourierResult<()> {
        let event_type = require(event_type, "event type")?;
        let event_json = require(event_json, "event payload")?;
        let handler_name = require(handler, "handler name")?;

        let event = self.decode_event(event_type, event_json)?;
        let handler = self.resolve_handler(handler_name)?;
        debug!(event = event_type, handler = handler_name, "running handler");
        handler.handle_dyn(event.as_ref()).await
    }

    pub async fn dispatch_event_listener(
        &self,
        event_type: Option<&str>,
        event_json: Option<&str>,
        listener: Option<&str>,
    ) -> CourierResult<()> {
        let event_type = require(event_type, "event type")?;
        let event_json = require(event_json, "event payload")?;
        let listener_name = require(listener, "listener name")?;

        let event = self.decode_event(event_type, event_json)?;
        let listener = self
            .listeners
            .create_listener(event_type, listener_name)
            .ok_or_else(|| {
                CourierError::class_resolution(format!("{listener_name} (listener of {event_type})"))
            })?;
        debug!(event = event_type, listener = listener.name(), "running listener");
        listener.on_event_dyn(event.as_ref()).await
    }

    pub async fn dispatch_async_task(
        &self,
        params: ParamBag,
        task_type: Option<&str>,
    ) -> CourierResult<()> {
        let task_type = require(task_type, "task type")?;
        let task = self.resolve_task(task_type)?;
        info!(task = task_type, "executing async task");
        task.execute_dyn(TaskParams::new(params)).await
    }

    async fn enqueue_atomically(&self, scheduler: Scheduler) -> CourierResult<()> {
        let batch = scheduler.prepare()?;
        let txn = self.store.begin().await?;

        let outcome = match batch.submit_into(&*txn).await {
            Ok(()) => txn.commit().await.map_err(|e| e.to_string()),
            Err(err) => Err(err.to_string()),
        };

        if let Err(reason) = outcome {
            warn!(error = %reason, "fan-out enqueue failed, rolling back");
            if let Err(rollback_err) = txn.rollback().await {
                warn!(error = %rollback_err, "rollback failed");
            }
            return Err(CourierError::Transaction(reason));
        }
        Ok(())
    }

    fn decode_event(&self, event_type: &str, event_json: &str) -> CourierResult<Arc<dyn AnyEvent>> {
        let decoder = match self.components.resolve(event_type) {
            Some(Component::Event(decoder)) => decoder,
            Some(other) => {
                return Err(CourierError::invalid_argument(format!(
                    "'{event_type}' is registered as a {}, not an event",
                    other.kind()
                )));
            }
            None => return Err(CourierError::class_resolution(event_type)),
        };
        let value = self.schedulers.transport().decode(event_json)?;
        decoder.decode(value)
    }

    fn resolve_handler(&self, name: &str) -> CourierResult<Arc<dyn DynEventHandler>> {
        match self.components.resolve(name) {
            Some(Component::Handler(handler)) => Ok(handler),
            Some(other) => Err(CourierError::invalid_argument(format!(
                "'{name}' is registered as a {}, not a handler",
                other.kind()
            ))),
            None => Err(CourierError::class_resolution(name)),
        }
    }

    fn resolve_task(&self, task_type: &str) -> CourierResult<Arc<dyn AsyncTask>> {
        match self.components.resolve(task_type) {
            Some(Component::Task(task)) => Ok(task),
            Some(other) => Err(CourierError::invalid_argument(format!(
                "'{task_type}' is registered as a {}, not a task",
                other.kind()
            ))),
            None => Err(CourierError::class_resolution(task_type)),
        }
    }
}

/// Present and non-empty, else `InvalidArgument`.
fn require<'a>(value: Option<&'a str>, what: &str) -> CourierResult<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(CourierError::invalid_argument(format!("{what} is required"))),
    }
}
