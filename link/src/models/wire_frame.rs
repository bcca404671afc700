use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Result;

/// A raw named event as it travels on the transport.
///
/// Serialized as `{"event": "<wire name>", "data": <payload>}` inside a
/// WebSocket text frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFrame {
    /// Server-defined event name, e.g. `wallet:balance_update`
    pub event: String,

    /// Event payload; missing `data` decodes as `null`
    #[serde(default)]
    pub data: JsonValue,
}

impl WireFrame {
    pub fn new(event: impl Into<String>, data: JsonValue) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
