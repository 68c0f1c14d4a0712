//! Test fixtures shared by the in-crate test modules.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::domain::{CourierResult, TaskParams};
use crate::typed::{Event, EventHandler, EventListener, Task};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEvent {
    pub message: String,
}

impl ActionEvent {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl Event for ActionEvent {
    const TYPE: &'static str = "courier.test.action.v1";
    type Handler = ActionEventHandler;
}

/// Captures the message of the last handled event.
#[derive(Debug, Clone, Default)]
pub struct ActionEventHandler {
    last: Arc<Mutex<Option<String>>>,
}

impl ActionEventHandler {
    pub fn last_message(&self) -> Option<String> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventHandler<ActionEvent> for ActionEventHandler {
    const NAME: &'static str = "ActionEventHandler";

    async fn handle(&self, event: ActionEvent) -> CourierResult<()> {
        *self.last.lock().unwrap() = Some(event.message);
        Ok(())
    }
}

/// Event with no listeners registered in any fixture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultActionEvent {
    pub message: String,
}

impl Event for DefaultActionEvent {
    const TYPE: &'static str = "courier.test.default_action.v1";
    type Handler = DefaultActionEventHandler;
}

#[derive(Debug, Clone, Default)]
pub struct DefaultActionEventHandler {
    handled: Arc<Mutex<usize>>,
}

impl DefaultActionEventHandler {
    pub fn handled(&self) -> usize {
        *self.handled.lock().unwrap()
    }
}

#[async_trait]
impl EventHandler<DefaultActionEvent> for DefaultActionEventHandler {
    const NAME: &'static str = "DefaultActionEventHandler";

    async fn handle(&self, _event: DefaultActionEvent) -> CourierResult<()> {
        *self.handled.lock().unwrap() += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Indexing {
    seen: Arc<Mutex<Vec<String>>>,
}

impl Indexing {
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventListener<ActionEvent> for Indexing {
    const NAME: &'static str = "Indexing";

    async fn on_event(&self, event: ActionEvent) -> CourierResult<()> {
        self.seen.lock().unwrap().push(event.message);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TestListener {
    seen: Arc<Mutex<Vec<String>>>,
}

impl TestListener {
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventListener<ActionEvent> for TestListener {
    const NAME: &'static str = "TestListener";

    async fn on_event(&self, event: ActionEvent) -> CourierResult<()> {
        self.seen.lock().unwrap().push(event.message);
        Ok(())
    }
}

/// Records the params of every execution.
#[derive(Debug, Clone, Default)]
pub struct RecordingTask {
    calls: Arc<Mutex<Vec<TaskParams>>>,
}

impl RecordingTask {
    pub fn calls(&self) -> Vec<TaskParams> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Task for RecordingTask {
    const TYPE: &'static str = "courier.test.recording.v1";

    async fn execute(&self, params: TaskParams) -> CourierResult<()> {
        self.calls.lock().unwrap().push(params);
        Ok(())
    }
}
