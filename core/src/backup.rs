use crate::existence::{self, CheckExistence};
use crate::naming;
use crate::reader::{self, StoreReaderMaker};
use crate::sentinel::BackupSentinel;
use crate::store;
use crate::types::Prefix;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Query handle for one full backup. Holds no state beyond its keys; every
/// method goes to the store.
#[derive(Debug, Clone)]
pub struct Backup {
    prefix: Arc<Prefix>,
    path: String,
    name: String,
    js: String,
}

impl Backup {
    pub fn new(prefix: Arc<Prefix>, name: impl Into<String>) -> Self {
        let path = naming::backup_path(prefix.server());
        Self::with_path(prefix, path, name)
    }

    /// Handle for a backup living under an explicit key prefix. `path` ends with `/`.
    pub fn with_path(prefix: Arc<Prefix>, path: impl Into<String>, name: impl Into<String>) -> Self {
        let path = path.into();
        let name = name.into();
        let js = naming::sentinel_key(&path, &name);
        Self {
            prefix,
            path,
            name,
            js,
        }
    }

    pub fn prefix(&self) -> &Arc<Prefix> {
        &self.prefix
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key of the stop sentinel marking this backup complete.
    pub fn js(&self) -> &str {
        &self.js
    }

    /// Keys of every object in this backup's file set.
    pub async fn get_keys(&self) -> Result<Vec<String>> {
        let partitions = naming::tar_partitions_prefix(&self.path, &self.name);
        let objects =
            store::list_all(self.prefix.store(), self.prefix.bucket(), &partitions, None).await?;

        let keys: Vec<String> = objects.into_iter().map(|object| object.key).collect();
        debug!(backup = %self.name, count = keys.len(), "Enumerated backup keys");
        Ok(keys)
    }

    pub async fn reader_makers(&self) -> Result<Vec<StoreReaderMaker>> {
        Ok(self
            .get_keys()
            .await?
            .into_iter()
            .map(|key| StoreReaderMaker::new(self.prefix.clone(), key))
            .collect())
    }

    pub async fn fetch_sentinel(&self) -> Result<BackupSentinel> {
        let mut reader = reader::open(&self.prefix, &self.js).await?;
        let mut body = Vec::new();
        reader.read_to_end(&mut body).await?;
        BackupSentinel::from_slice(&body)
    }
}

#[async_trait]
impl CheckExistence for Backup {
    async fn check_existence(&self) -> Result<bool> {
        existence::probe(&self.prefix, &self.js).await
    }
}
