//! TaskOptions - 保留中の作業 1 件の記述子
//!
//! Task か Event のどちらか一方（enum なので両方は表現できない）。
//! delay と execution date は排他で、後から設定した方が勝つ。
//!
//! # 使用例
//!
//! ```ignore
//! let options = TaskOptions::task::<RebuildReport>()
//!     .param("year", "2024")
//!     .delay(30_000)
//!     .named("rebuild-2024");
//!
//! scheduler.add(options).flush().await?;
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::{format_with, CourierResult, DateTimeFormat, ParamFormat, Schedule};
use crate::typed::event::{AnyEvent, Event};
use crate::typed::task::Task;

/// How an event option is delivered on the worker side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventRoute {
    /// Re-enter the dispatcher and decide between inline handling and fan-out.
    FanOut,
    /// Run the named handler only.
    Handler(String),
    /// Run the named listener only.
    Listener(String),
}

#[derive(Clone)]
pub enum Target {
    Task {
        task_type: String,
    },
    Event {
        event: Arc<dyn AnyEvent>,
        route: EventRoute,
    },
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Task { task_type } => f.debug_struct("Task").field("task_type", task_type).finish(),
            Target::Event { event, route } => f
                .debug_struct("Event")
                .field("event_type", &event.event_type())
                .field("route", route)
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskOptions {
    target: Target,
    params: BTreeMap<String, String>,
    schedule: Schedule,
    name: Option<String>,
    transactionless: bool,
}

impl TaskOptions {
    fn with_target(target: Target) -> Self {
        Self {
            target,
            params: BTreeMap::new(),
            schedule: Schedule::Immediate,
            name: None,
            transactionless: false,
        }
    }

    pub fn task<T: Task>() -> Self {
        Self::for_task_type(T::TYPE)
    }

    /// Task addressed by its type key only.
    pub fn for_task_type(task_type: impl Into<String>) -> Self {
        Self::with_target(Target::Task {
            task_type: task_type.into(),
        })
    }

    /// Event scheduled for fan-out.
    pub fn event<E: Event>(event: E) -> Self {
        Self::for_event(Arc::new(event), EventRoute::FanOut)
    }

    pub fn for_event(event: Arc<dyn AnyEvent>, route: EventRoute) -> Self {
        Self::with_target(Target::Event { event, route })
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Adds a date-time parameter in the `dd-MM-yyyy HH:mm` wire format.
    pub fn param_date(self, key: impl Into<String>, value: NaiveDateTime) -> CourierResult<Self> {
        self.param_with::<DateTimeFormat>(key, &value)
    }

    /// Adds a parameter formatted through `F`.
    pub fn param_with<F: ParamFormat>(
        self,
        key: impl Into<String>,
        value: &F::Value,
    ) -> CourierResult<Self> {
        let formatted = format_with::<F>(value)?;
        Ok(self.param(key, formatted))
    }

    /// Relative delay in milliseconds. Clears any execution date.
    pub fn delay(mut self, millis: u64) -> Self {
        self.schedule = Schedule::Countdown { millis };
        self
    }

    /// Absolute execution time. Clears any delay.
    pub fn execution_date(mut self, at: DateTime<Utc>) -> Self {
        self.schedule = Schedule::Eta { at };
        self
    }

    /// Idempotency name (honoured for tasks only).
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Enqueue directly on the scheduler's queue even inside a transaction.
    pub fn transactionless(mut self) -> Self {
        self.transactionless = true;
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    pub fn delay_ms(&self) -> u64 {
        match self.schedule {
            Schedule::Countdown { millis } => millis,
            _ => 0,
        }
    }

    pub fn execution_date_ms(&self) -> i64 {
        match self.schedule {
            Schedule::Eta { at } => at.timestamp_millis(),
            _ => 0,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_transactionless(&self) -> bool {
        self.transactionless
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ActionEvent, RecordingTask};
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn delay_and_execution_date_are_exclusive() {
        let at = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

        let options = TaskOptions::task::<RecordingTask>().delay(500).execution_date(at);
        assert_eq!(options.delay_ms(), 0);
        assert_eq!(options.execution_date_ms(), at.timestamp_millis());

        let options = options.delay(250);
        assert_eq!(options.delay_ms(), 250);
        assert_eq!(options.execution_date_ms(), 0);
    }

    #[test]
    fn event_options_default_to_fan_out() {
        let options = TaskOptions::event(ActionEvent::new("m"));
        match options.target() {
            Target::Event { event, route } => {
                assert_eq!(event.event_type(), ActionEvent::TYPE);
                assert_eq!(*route, EventRoute::FanOut);
            }
            other => panic!("unexpected target: {other:?}"),
        }
    }

    #[test]
    fn param_date_uses_day_first_format() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 0)
            .unwrap();
        let options = TaskOptions::task::<RecordingTask>()
            .param_date("when", at)
            .unwrap();
        assert_eq!(options.params().get("when").map(String::as_str), Some("09-03-2024 07:05"));
    }

    #[test]
    fn builder_flags() {
        let options = TaskOptions::task::<RecordingTask>()
            .named("once")
            .transactionless();
        assert_eq!(options.name(), Some("once"));
        assert!(options.is_transactionless());
    }
}
