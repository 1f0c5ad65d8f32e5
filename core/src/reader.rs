use crate::naming;
use crate::store::ObjectReader;
use crate::types::Prefix;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Produces a fresh stream over one object each time it is asked.
#[async_trait]
pub trait ReaderMaker: Send + Sync {
    async fn reader(&self) -> Result<ObjectReader>;

    /// File extension of the object, e.g. `lz4`. Empty when the key has none.
    fn format(&self) -> &str;

    fn path(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct StoreReaderMaker {
    prefix: Arc<Prefix>,
    key: String,
    file_format: String,
}

impl StoreReaderMaker {
    pub fn new(prefix: Arc<Prefix>, key: impl Into<String>) -> Self {
        let key = key.into();
        let file_format = naming::file_format(&key).to_string();
        Self {
            prefix,
            key,
            file_format,
        }
    }
}

#[async_trait]
impl ReaderMaker for StoreReaderMaker {
    async fn reader(&self) -> Result<ObjectReader> {
        open(&self.prefix, &self.key).await
    }

    fn format(&self) -> &str {
        &self.file_format
    }

    fn path(&self) -> &str {
        &self.key
    }
}

pub(crate) async fn open(prefix: &Prefix, key: &str) -> Result<ObjectReader> {
    debug!(bucket = prefix.bucket(), key, "Opening object");
    prefix.store().get(prefix.bucket(), key).await
}
