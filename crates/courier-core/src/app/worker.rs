//! Worker - worker endpoint に届いたパラメータを Dispatcher に振り分ける
//!
//! | パラメータ              | 入口                       |
//! |-------------------------|----------------------------|
//! | `event` + `listener`    | `dispatch_event_listener`  |
//! | `event` + `handler`     | `dispatch_event_handler`   |
//! | `event` のみ            | `dispatch_async_event`     |
//! | `taskQueue`             | `dispatch_async_task`      |

use std::sync::Arc;
use tracing::info;

use crate::app::dispatcher::Dispatcher;
use crate::domain::keys::{EVENT, EVENT_JSON, HANDLER, LISTENER, TASK_QUEUE};
use crate::domain::{CourierError, CourierResult, ParamBag, WorkItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    EventListener,
    EventHandler,
    EventFanOut,
    Task,
}

impl Route {
    /// Picks the entry point for a parameter bag. Empty values count as absent.
    pub fn select(params: &ParamBag) -> Option<Route> {
        let present = |key: &str| params.first(key).is_some_and(|v| !v.is_empty());

        if present(EVENT) {
            if present(LISTENER) {
                Some(Route::EventListener)
            } else if present(HANDLER) {
                Some(Route::EventHandler)
            } else {
                Some(Route::EventFanOut)
            }
        } else if present(TASK_QUEUE) {
            Some(Route::Task)
        } else {
            None
        }
    }
}

#[derive(Clone)]
pub struct Worker {
    dispatcher: Arc<Dispatcher>,
}

impl Worker {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub async fn handle(&self, params: ParamBag) -> CourierResult<()> {
        let route = Route::select(&params).ok_or_else(|| {
            CourierError::invalid_argument(format!(
                "request carries neither '{EVENT}' nor '{TASK_QUEUE}'"
            ))
        })?;
        info!(
            ?route,
            event = params.first(EVENT),
            task = params.first(TASK_QUEUE),
            "dispatching work item"
        );

        let dispatcher = &self.dispatcher;
        match route {
            Route::EventListener => {
                dispatcher
                    .dispatch_event_listener(
                        params.first(EVENT),
                        params.first(EVENT_JSON),
                        params.first(LISTENER),
                    )
                    .await
            }
            Route::EventHandler => {
                dispatcher
                    .dispatch_event_handler(
                        params.first(EVENT),
                        params.first(EVENT_JSON),
                        params.first(HANDLER),
                    )
                    .await
            }
            Route::EventFanOut => {
                dispatcher
                    .dispatch_async_event(params.first(EVENT), params.first(EVENT_JSON))
                    .await
            }
            Route::Task => {
                let task_type = params.first(TASK_QUEUE).map(str::to_owned);
                dispatcher
                    .dispatch_async_task(params, task_type.as_deref())
                    .await
            }
        }
    }

    /// Handles an item as the queue service would deliver it.
    pub async fn handle_item(&self, item: &WorkItem) -> CourierResult<()> {
        self.handle(item.to_param_bag()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::builder::{App, AppBuilder};
    use crate::impls::InMemoryTaskQueue;
    use crate::testing::{ActionEvent, ActionEventHandler, Indexing, RecordingTask, TestListener};
    use crate::typed::Task;
    use rstest::rstest;

    fn bag(pairs: &[(&str, &str)]) -> ParamBag {
        pairs.iter().copied().collect()
    }

    #[rstest]
    #[case::listener(&[("event", "E"), ("listener", "L"), ("handler", "H")], Some(Route::EventListener))]
    #[case::handler(&[("event", "E"), ("handler", "H")], Some(Route::EventHandler))]
    #[case::fan_out(&[("event", "E"), ("eventJson", "{}")], Some(Route::EventFanOut))]
    #[case::empty_listener(&[("event", "E"), ("listener", "")], Some(Route::EventFanOut))]
    #[case::task(&[("taskQueue", "T"), ("year", "2024")], Some(Route::Task))]
    #[case::event_wins_over_task(&[("event", "E"), ("taskQueue", "T")], Some(Route::EventFanOut))]
    #[case::nothing(&[("year", "2024")], None)]
    fn route_selection(#[case] pairs: &[(&str, &str)], #[case] expected: Option<Route>) {
        assert_eq!(Route::select(&bag(pairs)), expected);
    }

    struct Harness {
        app: App,
        queue: Arc<InMemoryTaskQueue>,
        handler: ActionEventHandler,
        indexing: Indexing,
        test_listener: TestListener,
        task: RecordingTask,
    }

    fn harness() -> Harness {
        let queue = Arc::new(InMemoryTaskQueue::new());
        let handler = ActionEventHandler::default();
        let indexing = Indexing::default();
        let test_listener = TestListener::default();
        let task = RecordingTask::default();

        let app = AppBuilder::new()
            .in_memory(queue.clone())
            .register_event::<ActionEvent>(handler.clone())
            .unwrap()
            .register_listener::<ActionEvent, _>(indexing.clone())
            .register_listener::<ActionEvent, _>(test_listener.clone())
            .register_task(task.clone())
            .unwrap()
            .build()
            .unwrap();

        Harness {
            app,
            queue,
            handler,
            indexing,
            test_listener,
            task,
        }
    }

    async fn drain(h: &Harness) -> usize {
        let mut handled = 0;
        loop {
            let ready = h.queue.drain_ready();
            if ready.is_empty() {
                return handled;
            }
            for queued in ready {
                h.app.worker().handle_item(&queued.item).await.unwrap();
                handled += 1;
            }
        }
    }

    #[tokio::test]
    async fn fired_event_reaches_handler_and_every_listener() {
        let h = harness();

        h.app.event_bus().fire(ActionEvent::new("test message")).await.unwrap();

        // fan-out 1 件 → handler 1 件 + listener 2 件
        assert_eq!(drain(&h).await, 4);
        assert_eq!(h.handler.last_message().as_deref(), Some("test message"));
        assert_eq!(h.indexing.seen(), vec!["test message".to_string()]);
        assert_eq!(h.test_listener.seen(), vec!["test message".to_string()]);
    }

    #[tokio::test]
    async fn task_params_pass_through() {
        let h = harness();
        let params = bag(&[(TASK_QUEUE, RecordingTask::TYPE), ("year", "2024")]);

        h.app.worker().handle(params).await.unwrap();

        let calls = h.task.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].get_int("year").unwrap(), Some(2024));
    }

    #[tokio::test]
    async fn request_without_route_is_invalid() {
        let h = harness();
        let err = h.app.worker().handle(bag(&[("year", "2024")])).await.unwrap_err();
        assert!(matches!(err, CourierError::InvalidArgument(_)));
        assert!(h.queue.is_empty());
    }
}
