//! The opaque state snapshot exchanged between publisher and subscribers.
//!
//! The relay never looks inside a payload. It is built once from the publish
//! body (compact JSON, key order preserved) and then shared by reference
//! count, so fanning it out to many subscribers does not copy the text.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload(Arc<str>);

impl Payload {
    /// Serializes a parsed publish body back to compact JSON.
    pub fn from_json(value: &Value) -> Self {
        Self(Arc::from(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self(Arc::from(text))
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self(Arc::from(text))
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
