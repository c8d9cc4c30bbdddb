// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Persistent key / value state
//!
//! Link identities and sessions are persisted as strings via a [StateStore],
//! [MemoryStore] is provided for tests and ephemeral use, [FileStore] keeps a
//! JSON object on disk.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use log::debug;
use tokio::sync::Mutex;

use crate::Error;

/// String key / value store
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    async fn set(&self, key: &str, value: &str) -> Result<(), Error>;

    async fn remove(&self, key: &str) -> Result<(), Error>;

    async fn clear(&self) -> Result<(), Error>;
}

/// In-memory [StateStore]
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        self.values.lock().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.values.lock().await.clear();
        Ok(())
    }
}

/// [StateStore] backed by a JSON object file, rewritten on each change
pub struct FileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open a store, the file is created on first write
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        let values = match tokio::fs::read_to_string(&path).await {
            Ok(s) if s.trim().is_empty() => BTreeMap::new(),
            Ok(s) => serde_json::from_str(&s)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(Error::Store(format!("{}: {e}", path.display()))),
        };

        debug!("Loaded {} entries from {}", values.len(), path.display());

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), Error> {
        let s = serde_json::to_string_pretty(values)?;

        // Replace atomically
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, s)
            .await
            .map_err(|e| Error::Store(format!("{}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::Store(format!("{}: {e}", self.path.display())))
    }
}

#[async_trait]
impl StateStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let mut values = self.values.lock().await;
        values.insert(key.to_string(), value.to_string());
        self.persist(&values).await
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        let mut values = self.values.lock().await;
        if values.remove(key).is_some() {
            self.persist(&values).await?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        let mut values = self.values.lock().await;
        values.clear();
        self.persist(&values).await
    }
}
