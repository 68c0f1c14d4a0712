//! CourierConfig - キュー振り分けとエンドポイントの設定
//!
//! TOML から読み込む。全フィールドに既定値があるので空ファイルでもよい。
//!
//! ```toml
//! default_queue = "default"
//! worker_endpoint = "/worker/taskQueue"
//!
//! [queues]
//! "Indexing" = "search"
//! "reports.rebuild.v1" = "reports"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::keys::{DEFAULT_QUEUE, WORKER_ENDPOINT};
use crate::domain::CourierError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<ConfigError> for CourierError {
    fn from(err: ConfigError) -> Self {
        CourierError::Configuration(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CourierConfig {
    /// Queue used when no routing entry matches.
    pub default_queue: String,
    /// Endpoint every work item is delivered to.
    pub worker_endpoint: String,
    /// Target key (task type, event type, handler or listener name) → queue.
    pub queues: BTreeMap<String, String>,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            default_queue: DEFAULT_QUEUE.to_string(),
            worker_endpoint: WORKER_ENDPOINT.to_string(),
            queues: BTreeMap::new(),
        }
    }
}

impl CourierConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_queue.trim().is_empty() {
            return Err(ConfigError::Invalid("default_queue must not be empty".into()));
        }
        if !self.worker_endpoint.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "worker_endpoint must be an absolute path, got '{}'",
                self.worker_endpoint
            )));
        }
        Ok(())
    }

    pub fn with_queue(mut self, key: impl Into<String>, queue: impl Into<String>) -> Self {
        self.queues.insert(key.into(), queue.into());
        self
    }

    /// First non-empty configured queue among `keys`, falling back to the
    /// default queue.
    pub fn queue_for(&self, keys: &[&str]) -> &str {
        keys.iter()
            .filter_map(|key| self.queues.get(*key))
            .find(|queue| !queue.is_empty())
            .map_or(self.default_queue.as_str(), String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = CourierConfig::from_toml_str("").unwrap();
        assert_eq!(config, CourierConfig::default());
        assert_eq!(config.default_queue, "default");
        assert_eq!(config.worker_endpoint, "/worker/taskQueue");
    }

    #[test]
    fn parses_queue_table() {
        let config = CourierConfig::from_toml_str(
            r#"
            default_queue = "background"

            [queues]
            "Indexing" = "search"
            "reports.rebuild.v1" = "reports"
            "#,
        )
        .unwrap();

        assert_eq!(config.queue_for(&["Indexing", "courier.test.action.v1"]), "search");
        assert_eq!(config.queue_for(&["reports.rebuild.v1"]), "reports");
        assert_eq!(config.queue_for(&["unknown"]), "background");
    }

    #[test]
    fn earlier_keys_win() {
        let config = CourierConfig::default()
            .with_queue("TestListener", "listeners")
            .with_queue("courier.test.action.v1", "events");

        assert_eq!(
            config.queue_for(&["TestListener", "courier.test.action.v1"]),
            "listeners"
        );
        assert_eq!(config.queue_for(&["Other", "courier.test.action.v1"]), "events");
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            CourierConfig::from_toml_str("default_queue = \"\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            CourierConfig::from_toml_str("worker_endpoint = \"worker\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            CourierConfig::from_toml_str("unknown_key = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = CourierConfig::load("/nonexistent/courier.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
