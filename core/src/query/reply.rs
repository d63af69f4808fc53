use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque reply document from the external query endpoint. Its shape is
/// owned by the remote service, so it stays an open JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalReply(Value);

impl ExternalReply {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Top-level field lookup; `None` unless the reply is an object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.as_object().and_then(|object| object.get(key))
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Object(object) => object.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::String(text) => text.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }
}

impl From<Value> for ExternalReply {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
