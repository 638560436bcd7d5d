//! JSON-file storage: one `<collection>.json` document per collection.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{Collection, Storage, StoreError};

type Document = BTreeMap<String, Value>;

/// Storage rooted at a data directory.
///
/// Each write rewrites the whole collection document through a temporary
/// file followed by a rename, so a crash leaves either the old or the new
/// document on disk. Writers within the process are serialised.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Open (creating if needed) the data directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, collection: Collection) -> PathBuf {
        self.dir.join(format!("{}.json", collection.name()))
    }

    async fn read(&self, collection: Collection) -> Result<Document, StoreError> {
        match tokio::fs::read(self.path(collection)).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Document::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Document::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, collection: Collection, doc: &Document) -> Result<(), StoreError> {
        let path = self.path(collection);
        let tmp = self.dir.join(format!(".{}.json.tmp", collection.name()));
        let bytes = serde_json::to_vec_pretty(doc)?;
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(path = %path.display(), entries = doc.len(), "wrote collection");
        Ok(())
    }

    async fn update(
        &self,
        collection: Collection,
        f: impl FnOnce(&mut Document) + Send,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read(collection).await?;
        f(&mut doc);
        self.write(collection, &doc).await
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.read(collection).await?.remove(key))
    }

    async fn put(&self, collection: Collection, key: &str, value: Value) -> Result<(), StoreError> {
        self.update(collection, |doc| {
            doc.insert(key.to_string(), value);
        })
        .await
    }

    async fn delete(&self, collection: Collection, key: &str) -> Result<(), StoreError> {
        self.update(collection, |doc| {
            doc.remove(key);
        })
        .await
    }

    async fn list(&self, collection: Collection) -> Result<Vec<(String, Value)>, StoreError> {
        Ok(self.read(collection).await?.into_iter().collect())
    }

    async fn clear(&self, collection: Collection) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.write(collection, &Document::new()).await
    }
}
