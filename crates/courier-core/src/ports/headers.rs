//! HeadersProvider port - WorkItem に付与するリクエストヘッダ

use std::collections::BTreeMap;

pub trait HeadersProvider: Send + Sync {
    fn headers(&self) -> BTreeMap<String, String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoHeaders;

impl HeadersProvider for NoHeaders {
    fn headers(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}

/// Fixed set of headers attached to every item.
#[derive(Debug, Clone, Default)]
pub struct StaticHeaders(BTreeMap<String, String>);

impl StaticHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }
}

impl HeadersProvider for StaticHeaders {
    fn headers(&self) -> BTreeMap<String, String> {
        self.0.clone()
    }
}
