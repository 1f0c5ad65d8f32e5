use crate::store::ObjectStore;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Storage location shared by every backup and archive handle of one bucket.
#[derive(Clone)]
pub struct Prefix {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    server: String,
}

impl Prefix {
    /// `server` is the namespace directory at the top of every key. It must be a
    /// single path segment so listed backup keys keep their three-segment layout.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        server: impl Into<String>,
    ) -> Result<Self> {
        let bucket = bucket.into();
        let server = server.into().trim_matches('/').to_string();

        if bucket.is_empty() {
            return Err(Error::Config("bucket must not be empty".to_string()));
        }
        if server.is_empty() {
            return Err(Error::Config("server prefix must not be empty".to_string()));
        }
        if server.contains('/') {
            return Err(Error::Config(format!(
                "server prefix {} must be a single path segment",
                server
            )));
        }

        Ok(Self {
            store,
            bucket,
            server,
        })
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn server(&self) -> &str {
        &self.server
    }
}

impl fmt::Debug for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prefix")
            .field("store", &self.store.store_type())
            .field("bucket", &self.bucket)
            .field("server", &self.server)
            .finish()
    }
}

/// A backup name paired with the modification time of its sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupTime {
    pub name: String,
    pub time: DateTime<Utc>,
}
