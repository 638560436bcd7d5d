//! DuckDB-backed storage: every collection lives in a single `kv` table.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use duckdb::{Connection, params};
use serde_json::Value;
use tracing::info;

use crate::{Collection, Storage, StoreError};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (
    collection VARCHAR NOT NULL,
    key VARCHAR NOT NULL,
    value VARCHAR NOT NULL,
    PRIMARY KEY (collection, key)
)";

/// Storage in an embedded DuckDB database.
///
/// Use [`open`](Self::open) for an in-memory database and
/// [`open_persistent`](Self::open_persistent) for a file that survives
/// process restarts.
pub struct DuckStorage {
    conn: Mutex<Connection>,
}

impl DuckStorage {
    pub fn open() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let storage = Self::init(Connection::open(path)?)?;
        info!(path = %path.display(), "opened duckdb storage");
        Ok(storage)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Other(format!("mutex poisoned: {e}")))
    }
}

#[async_trait]
impl Storage for DuckStorage {
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE collection = ? AND key = ?")?;
        let mut rows = stmt.query(params![collection.name(), key])?;
        match rows.next()? {
            Some(row) => {
                let text: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&text)?))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, collection: Collection, key: &str, value: Value) -> Result<(), StoreError> {
        let text = serde_json::to_string(&value)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO kv (collection, key, value) VALUES (?, ?, ?)",
            params![collection.name(), key, text],
        )?;
        Ok(())
    }

    async fn delete(&self, collection: Collection, key: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM kv WHERE collection = ? AND key = ?",
            params![collection.name(), key],
        )?;
        Ok(())
    }

    async fn list(&self, collection: Collection) -> Result<Vec<(String, Value)>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM kv WHERE collection = ? ORDER BY key")?;
        let rows = stmt.query_map(params![collection.name()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (key, text) = row?;
            out.push((key, serde_json::from_str(&text)?));
        }
        Ok(out)
    }

    async fn clear(&self, collection: Collection) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM kv WHERE collection = ?", params![collection.name()])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn put_replaces_existing_value() {
        let storage = DuckStorage::open().unwrap();
        storage.put(Collection::Favorites, "k", json!(1)).await.unwrap();
        storage.put(Collection::Favorites, "k", json!(2)).await.unwrap();
        assert_eq!(storage.get(Collection::Favorites, "k").await.unwrap(), Some(json!(2)));
        assert_eq!(storage.list(Collection::Favorites).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let storage = DuckStorage::open().unwrap();
        storage.put(Collection::Favorites, "k", json!("fav")).await.unwrap();
        storage.put(Collection::Companies, "k", json!("co")).await.unwrap();
        storage.clear(Collection::Favorites).await.unwrap();
        assert_eq!(storage.get(Collection::Favorites, "k").await.unwrap(), None);
        assert_eq!(storage.get(Collection::Companies, "k").await.unwrap(), Some(json!("co")));
    }

    #[tokio::test]
    async fn persistent_database_reopens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cnpjfy.duckdb");
        {
            let storage = DuckStorage::open_persistent(&path).unwrap();
            storage
                .put(Collection::SearchLog, "b", json!({"ok": true}))
                .await
                .unwrap();
            storage.put(Collection::SearchLog, "a", json!({"ok": false})).await.unwrap();
        }
        let storage = DuckStorage::open_persistent(&path).unwrap();
        let keys: Vec<String> = storage
            .list(Collection::SearchLog)
            .await
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, ["a", "b"]);
    }
}
