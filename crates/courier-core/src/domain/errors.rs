//! Errors - courier のエラー型
//!
//! Validation / resolution のエラーは呼び出し側に同期的に返す。
//! コア内部ではリトライしない（再配送はキューサービス側の責務）。

use thiserror::Error;

use crate::ports::{QueueError, StoreError};

/// Result type used across the crate.
pub type CourierResult<T> = Result<T, CourierError>;

#[derive(Debug, Error)]
pub enum CourierError {
    /// A required string was missing/empty, or a component has the wrong capability.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A type key does not resolve to any registered component.
    #[error("cannot resolve '{0}'")]
    ClassResolution(String),

    /// A present parameter value could not be parsed.
    #[error("parameter '{key}' has malformed value '{value}': {reason}")]
    Format {
        key: String,
        value: String,
        reason: String,
    },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Anything that went wrong between begin and commit of a fan-out batch.
    /// The batch was rolled back (or never committed).
    #[error("transaction failed: {0}")]
    Transaction(String),

    /// A handler, listener or task reported a failure.
    #[error("execution failed: {0}")]
    Execution(String),
}

impl CourierError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn class_resolution(key: impl Into<String>) -> Self {
        Self::ClassResolution(key.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    pub fn format(key: &str, value: &str, reason: impl ToString) -> Self {
        Self::Format {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for CourierError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<StoreError> for CourierError {
    fn from(err: StoreError) -> Self {
        Self::Transaction(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_surface_as_transaction_failures() {
        let err: CourierError = StoreError::Commit("disk full".into()).into();
        assert!(matches!(err, CourierError::Transaction(ref msg) if msg.contains("disk full")));
    }

    #[test]
    fn format_error_names_key_and_value() {
        let err = CourierError::format("count", "abc", "invalid digit");
        assert_eq!(
            err.to_string(),
            "parameter 'count' has malformed value 'abc': invalid digit"
        );
    }
}
