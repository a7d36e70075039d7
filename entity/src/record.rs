use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{CREATED_FIELD, ID_FIELD};

/// A stored API object: an ordered mapping from field name to value.
///
/// Field order is preserved so a record serializes the way it was created.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// The record's identifier, if it has a string `id` field.
    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_FIELD).and_then(Value::as_str)
    }

    /// Creation timestamp in unix seconds. Non-integer values count as missing.
    pub fn created(&self) -> Option<i64> {
        self.0.get(CREATED_FIELD).and_then(Value::as_i64)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn set_field(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl TryFrom<Value> for Record {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(other),
        }
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(record.0)
    }
}
