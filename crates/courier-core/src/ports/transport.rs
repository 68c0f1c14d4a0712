//! EventTransport port - イベントのシリアライズ
//!
//! Event は serde_json::Value を経由して文字列化され、
//! `eventJson` パラメータとして WorkItem に載る。

use serde_json::Value;

use crate::domain::CourierResult;

pub trait EventTransport: Send + Sync {
    fn encode(&self, value: &Value) -> CourierResult<String>;

    fn decode(&self, text: &str) -> CourierResult<Value>;
}

/// Plain JSON text.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTransport;

impl EventTransport for JsonTransport {
    fn encode(&self, value: &Value) -> CourierResult<String> {
        Ok(serde_json::to_string(value)?)
    }

    fn decode(&self, text: &str) -> CourierResult<Value> {
        Ok(serde_json::from_str(text)?)
    }
}
