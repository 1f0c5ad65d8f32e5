use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use walcat_core::store::{self, ListPage, ObjectInfo, ObjectReader, ObjectStore, StoreType};
use walcat_core::{Error, Result};

pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Failure a [`MemoryStore`] can be told to return for a key or listing prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Reported as [`Error::Transient`], e.g. a timeout or a 503.
    Transient,
    /// Reported as [`Error::Store`], e.g. a 403.
    Denied,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

#[derive(Debug)]
struct InjectedFailure {
    failure: Failure,
    remaining: Option<usize>,
}

/// In-process object store with S3 listing semantics, used for tests and dry runs.
#[derive(Debug)]
pub struct MemoryStore {
    buckets: RwLock<HashMap<String, BTreeMap<String, StoredObject>>>,
    failures: Mutex<HashMap<String, InjectedFailure>>,
    page_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Store whose listings return at most `page_size` entries per page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            page_size: page_size.max(1),
        }
    }

    pub async fn create_bucket(&self, bucket: &str) {
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default();
    }

    pub async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: impl Into<Bytes>,
        last_modified: DateTime<Utc>,
    ) {
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default()
            .insert(
                key.to_string(),
                StoredObject {
                    data: data.into(),
                    last_modified,
                },
            );
    }

    /// Makes every request for `target` (an object key, or a listing prefix) fail.
    pub async fn fail(&self, target: &str, failure: Failure) {
        self.inject(target, failure, None).await;
    }

    /// Makes the next `times` requests for `target` fail, then lets them through.
    pub async fn fail_times(&self, target: &str, failure: Failure, times: usize) {
        self.inject(target, failure, Some(times)).await;
    }

    pub async fn clear_failures(&self) {
        self.failures.lock().await.clear();
    }

    async fn inject(&self, target: &str, failure: Failure, remaining: Option<usize>) {
        self.failures
            .lock()
            .await
            .insert(target.to_string(), InjectedFailure { failure, remaining });
    }

    async fn check_failure(&self, key: &str) -> Result<()> {
        let mut failures = self.failures.lock().await;
        let Some(injected) = failures.get_mut(key) else {
            return Ok(());
        };

        if injected.remaining == Some(0) {
            failures.remove(key);
            return Ok(());
        }
        if let Some(remaining) = injected.remaining.as_mut() {
            *remaining -= 1;
        }

        let failure = injected.failure;
        debug!(key, ?failure, "Returning injected failure");
        Err(match failure {
            Failure::Transient => Error::Transient(format!("injected timeout for {}", key)),
            Failure::Denied => Error::Store(format!("injected access denied for {}", key)),
        })
    }

    async fn object(&self, bucket: &str, key: &str) -> Result<StoredObject> {
        self.buckets
            .read()
            .await
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
            .ok_or_else(|| Error::not_found(key))
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
        continuation_token: Option<String>,
    ) -> Result<ListPage> {
        self.check_failure(prefix).await?;

        let buckets = self.buckets.read().await;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| Error::Store(format!("NoSuchBucket: {}", bucket)))?;

        let entries = objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| ObjectInfo {
                key: key.clone(),
                size: object.data.len() as u64,
                last_modified: object.last_modified,
            });

        Ok(store::paginate(
            entries,
            prefix,
            delimiter,
            continuation_token.as_deref(),
            self.page_size,
        ))
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<ObjectInfo> {
        self.check_failure(key).await?;
        let object = self.object(bucket, key).await?;
        Ok(ObjectInfo {
            key: key.to_string(),
            size: object.data.len() as u64,
            last_modified: object.last_modified,
        })
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<ObjectReader> {
        self.check_failure(key).await?;
        let object = self.object(bucket, key).await?;
        Ok(Box::pin(Cursor::new(object.data)))
    }

    fn store_type(&self) -> StoreType {
        StoreType::Memory
    }
}
