//! Reserved work item parameter names and well-known defaults.
//!
//! These are the wire contract between the scheduler (producer side) and the
//! worker endpoint (re-entry side). Every other parameter is passed through
//! to `TaskParams` verbatim.

/// Event type key.
pub const EVENT: &str = "event";

/// Serialized event payload.
pub const EVENT_JSON: &str = "eventJson";

/// Name of the handler to run for the event.
pub const HANDLER: &str = "handler";

/// Short name of the listener to run for the event.
pub const LISTENER: &str = "listener";

/// Task type key (plain task path).
pub const TASK_QUEUE: &str = "taskQueue";

pub const DEFAULT_QUEUE: &str = "default";

pub const WORKER_ENDPOINT: &str = "/worker/taskQueue";

/// True for names the scheduler writes itself.
pub fn is_reserved(name: &str) -> bool {
    matches!(name, EVENT | EVENT_JSON | HANDLER | LISTENER | TASK_QUEUE)
}
