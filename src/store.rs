use std::{
    collections::HashMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use entity::{Record, CREATED_FIELD, ID_FIELD, OBJECT_FIELD};
use serde_json::Value;
use tracing::{debug, error};
use uuid::Uuid;

use crate::api::{ApiErrors, ResourceDefinition};

/// Generates a mock object id such as `test_in_5f0c...`.
pub fn new_id(prefix: &str) -> String {
    format!("test_{}_{}", prefix, Uuid::new_v4().simple())
}

/// Records of one resource in insertion order. Replacing a record keeps its
/// original position.
#[derive(Debug, Default)]
struct Collection {
    order: Vec<String>,
    records: HashMap<String, Record>,
}

impl Collection {
    fn upsert(&mut self, id: String, record: Record) {
        if !self.records.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.records.insert(id, record);
    }

    fn remove(&mut self, id: &str) -> Option<Record> {
        let record = self.records.remove(id)?;
        self.order.retain(|i| i != id);
        Some(record)
    }

    fn values(&self) -> Vec<Record> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .cloned()
            .collect()
    }
}

/// Process-local storage of mock API objects, keyed by object name.
#[derive(Debug, Default)]
pub struct Store {
    collections: RwLock<HashMap<String, Collection>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Collection>>, ApiErrors> {
        self.collections.read().map_err(|_| {
            error!("Store lock is poisoned");
            ApiErrors::InternalServerError
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Collection>>, ApiErrors> {
        self.collections.write().map_err(|_| {
            error!("Store lock is poisoned");
            ApiErrors::InternalServerError
        })
    }

    /// Stores a record, filling in `id`, `object` and `created` when absent.
    /// A record with an existing id replaces the stored one.
    pub fn insert(
        &self,
        definition: &ResourceDefinition,
        mut record: Record,
    ) -> Result<Record, ApiErrors> {
        let id = match record.get(ID_FIELD) {
            Some(Value::String(id)) => id.clone(),
            Some(other) => {
                return Err(ApiErrors::BadRequest(format!(
                    "Invalid id {other}: must be a string"
                )))
            }
            None => {
                let id = new_id(definition.id_prefix());
                record.set_field(ID_FIELD, Value::String(id.clone()));
                id
            }
        };
        if !record.contains_field(OBJECT_FIELD) {
            record.set_field(
                OBJECT_FIELD,
                Value::String(definition.kind().object().to_string()),
            );
        }
        if !record.contains_field(CREATED_FIELD) {
            record.set_field(CREATED_FIELD, Value::from(chrono::Utc::now().timestamp()));
        }

        let object = definition.kind().object();
        debug!("Storing {} {}", object, id);
        self.write()?
            .entry(object.to_string())
            .or_default()
            .upsert(id, record.clone());
        Ok(record)
    }

    pub fn get(&self, object: &str, id: &str) -> Result<Record, ApiErrors> {
        self.read()?
            .get(object)
            .and_then(|c| c.records.get(id))
            .cloned()
            .ok_or_else(|| ApiErrors::NotFound(format!("No such {object}: {id}")))
    }

    pub fn remove(&self, object: &str, id: &str) -> Result<Record, ApiErrors> {
        let removed = self
            .write()?
            .get_mut(object)
            .and_then(|c| c.remove(id))
            .ok_or_else(|| ApiErrors::NotFound(format!("No such {object}: {id}")))?;
        debug!("Removed {} {}", object, id);
        Ok(removed)
    }

    /// Copies the records of one resource in insertion order. Unknown
    /// resources yield an empty snapshot.
    pub fn snapshot(&self, object: &str) -> Result<Vec<Record>, ApiErrors> {
        Ok(self
            .read()?
            .get(object)
            .map(Collection::values)
            .unwrap_or_default())
    }
}
