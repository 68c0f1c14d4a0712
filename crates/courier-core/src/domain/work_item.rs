//! WorkItem - キューサービスに渡す単位
//!
//! Scheduler が TaskOptions から組み立て、TaskQueue::enqueue に渡す。

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::params::ParamBag;

/// When a work item becomes eligible for delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    #[default]
    Immediate,
    /// Relative delay from enqueue time.
    Countdown { millis: u64 },
    /// Absolute execution time.
    Eta { at: DateTime<Utc> },
}

impl Schedule {
    /// Collapses non-positive controls to `Immediate`.
    pub fn normalized(self) -> Self {
        match self {
            Schedule::Countdown { millis: 0 } => Schedule::Immediate,
            Schedule::Eta { at } if at.timestamp_millis() <= 0 => Schedule::Immediate,
            other => other,
        }
    }

    pub fn eligible_at(&self, enqueued_at: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Schedule::Immediate => enqueued_at,
            Schedule::Countdown { millis } => {
                let millis = i64::try_from(millis).unwrap_or(i64::MAX);
                enqueued_at
                    .checked_add_signed(Duration::milliseconds(millis))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC)
            }
            Schedule::Eta { at } => at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    queue: String,
    endpoint: String,
    params: BTreeMap<String, String>,
    schedule: Schedule,
    name: Option<String>,
    headers: BTreeMap<String, String>,
}

impl WorkItem {
    pub fn new(queue: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            endpoint: endpoint.into(),
            params: BTreeMap::new(),
            schedule: Schedule::Immediate,
            name: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// The parameter bag a worker endpoint would decode from this item.
    pub fn to_param_bag(&self) -> ParamBag {
        ParamBag::from(&self.params)
    }
}
