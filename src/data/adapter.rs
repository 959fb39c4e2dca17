//! Response normalization
//!
//! Backend endpoints disagree on envelope shape: some return a bare array,
//! others wrap it as `{"items": [...], "total": n}` or under a resource-specific
//! key such as `{"batches": [...]}`. Adapters reduce all of them to a
//! [`Collection`] so nothing downstream branches on response shape.

use serde_json::Value;

use super::{Collection, Record};
use crate::error::LoadError;

/// Envelope keys every adapter accepts after its own
const GENERIC_ENVELOPE_KEYS: [&str; 2] = ["items", "data"];

/// Converts a raw JSON response into the canonical collection shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseAdapter {
    /// Resource-specific wrapper key, checked before the generic ones
    envelope_key: &'static str,
}

impl ResponseAdapter {
    pub const fn envelope(envelope_key: &'static str) -> Self {
        Self { envelope_key }
    }

    pub fn envelope_key(&self) -> &'static str {
        self.envelope_key
    }

    /// Normalizes `raw` into a collection of object records
    ///
    /// # Returns
    /// * `Ok(Collection)` for a bare array or a recognized envelope
    /// * `Err(LoadError::Parse)` for any other shape, or if an element is not an object
    pub fn adapt(&self, raw: Value) -> Result<Collection, LoadError> {
        match raw {
            Value::Array(items) => into_records(items),
            Value::Object(mut map) => {
                let key = std::iter::once(self.envelope_key)
                    .chain(GENERIC_ENVELOPE_KEYS)
                    .find(|key| map.contains_key(*key))
                    .ok_or_else(|| {
                        LoadError::parse(format!(
                            "expected an array or an object with '{}', 'items' or 'data'",
                            self.envelope_key
                        ))
                    })?;

                match map.remove(key) {
                    Some(Value::Array(items)) => into_records(items),
                    _ => Err(LoadError::parse(format!("'{}' is not an array", key))),
                }
            }
            other => Err(LoadError::parse(format!(
                "expected an array or object, got {}",
                kind(&other)
            ))),
        }
    }
}

fn into_records(items: Vec<Value>) -> Result<Collection, LoadError> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(record) => Ok::<Record, LoadError>(record),
            other => Err(LoadError::parse(format!(
                "element {} is {}, not an object",
                index,
                kind(&other)
            ))),
        })
        .collect()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
