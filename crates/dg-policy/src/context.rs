// context.rs — Caller-supplied context for a decision.
//
// A free-form JSON map. The engine reads one well-known key,
// `component_kind`; everything else is recorded in the audit entry as-is.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ContextError;

/// Context key naming the component kind about to be created.
pub const COMPONENT_KIND: &str = "component_kind";

/// Free-form decision context.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct DecisionContext {
    values: BTreeMap<String, Value>,
}

impl DecisionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Shorthand for a context carrying only a component kind.
    pub fn component_kind(kind: impl Into<String>) -> Self {
        Self::new().with(COMPONENT_KIND, kind.into())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// A string-valued key. `Ok(None)` when absent, an error when present
    /// with any other JSON type.
    pub fn get_str(&self, key: &str) -> Result<Option<&str>, ContextError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(ContextError::WrongType {
                key: key.to_string(),
                expected: "string",
                found: json_type_name(other).to_string(),
            }),
        }
    }
}

impl From<BTreeMap<String, Value>> for DecisionContext {
    fn from(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }
}

impl FromIterator<(String, Value)> for DecisionContext {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
