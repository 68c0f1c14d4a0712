//! EventBus - producer 側の入口
//!
//! `fire` は fan-out 用の Event を 1 件 enqueue してすぐ flush する。

use crate::app::scheduler::SchedulerFactory;
use crate::domain::CourierResult;
use crate::typed::{Event, TaskOptions};

#[derive(Clone)]
pub struct EventBus {
    schedulers: SchedulerFactory,
}

impl EventBus {
    pub fn new(schedulers: SchedulerFactory) -> Self {
        Self { schedulers }
    }

    pub async fn fire<E: Event>(&self, event: E) -> CourierResult<()> {
        self.schedulers
            .scheduler()
            .add(TaskOptions::event(event))
            .flush()
            .await
    }

    /// Several events in one flush.
    pub async fn fire_all<E: Event>(&self, events: impl IntoIterator<Item = E>) -> CourierResult<()> {
        let mut scheduler = self.schedulers.scheduler();
        scheduler.add_all(events.into_iter().map(TaskOptions::event));
        scheduler.flush().await
    }
}
