use crate::existence::{self, CheckExistence};
use crate::naming;
use crate::reader::{self, StoreReaderMaker};
use crate::store::ObjectReader;
use crate::types::Prefix;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Query handle for a single archived object, usually one WAL segment.
#[derive(Debug, Clone)]
pub struct Archive {
    prefix: Arc<Prefix>,
    archive: String,
}

impl Archive {
    pub fn new(prefix: Arc<Prefix>, key: impl Into<String>) -> Self {
        Self {
            prefix,
            archive: key.into(),
        }
    }

    /// Archive stored under the server's WAL directory, e.g. `000000010000000000000002.lz4`.
    pub fn for_segment(prefix: Arc<Prefix>, file_name: &str) -> Self {
        let key = format!("{}{}", naming::wal_path(prefix.server()), file_name);
        Self::new(prefix, key)
    }

    pub fn key(&self) -> &str {
        &self.archive
    }

    pub async fn get_archive(&self) -> Result<ObjectReader> {
        reader::open(&self.prefix, &self.archive).await
    }

    pub fn reader_maker(&self) -> StoreReaderMaker {
        StoreReaderMaker::new(self.prefix.clone(), self.archive.clone())
    }
}

#[async_trait]
impl CheckExistence for Archive {
    async fn check_existence(&self) -> Result<bool> {
        existence::probe(&self.prefix, &self.archive).await
    }
}
