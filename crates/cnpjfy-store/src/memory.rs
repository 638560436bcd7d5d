use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::{Collection, Storage, StoreError};

type Tables = HashMap<Collection, BTreeMap<String, Value>>;

/// Process-local storage. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: Mutex<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_tables<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> Result<T, StoreError> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {e}")))?;
        Ok(f(&mut tables))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, StoreError> {
        self.with_tables(|t| t.get(&collection).and_then(|c| c.get(key)).cloned())
    }

    async fn put(&self, collection: Collection, key: &str, value: Value) -> Result<(), StoreError> {
        self.with_tables(|t| {
            t.entry(collection).or_default().insert(key.to_string(), value);
        })
    }

    async fn delete(&self, collection: Collection, key: &str) -> Result<(), StoreError> {
        self.with_tables(|t| {
            if let Some(c) = t.get_mut(&collection) {
                c.remove(key);
            }
        })
    }

    async fn list(&self, collection: Collection) -> Result<Vec<(String, Value)>, StoreError> {
        self.with_tables(|t| {
            t.get(&collection)
                .map(|c| c.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default()
        })
    }

    async fn clear(&self, collection: Collection) -> Result<(), StoreError> {
        self.with_tables(|t| {
            t.remove(&collection);
        })
    }
}
