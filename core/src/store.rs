use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::pin::Pin;
use tokio::io::AsyncRead;
use tracing::debug;

/// An open object body. Not rewindable; dropping it releases the underlying connection.
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    S3,
    Local,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// One page of a listing. `common_prefixes` is only populated when a delimiter was given.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub objects: Vec<ObjectInfo>,
    pub common_prefixes: Vec<String>,
    pub next_continuation_token: Option<String>,
}

/// Read-side object store capability.
///
/// Implementations report a missing object as [`Error::NotFound`], retryable
/// failures as [`Error::Transient`] and everything else as [`Error::Store`].
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
        continuation_token: Option<String>,
    ) -> Result<ListPage>;

    async fn head(&self, bucket: &str, key: &str) -> Result<ObjectInfo>;

    async fn get(&self, bucket: &str, key: &str) -> Result<ObjectReader>;

    fn store_type(&self) -> StoreType;
}

/// Lists every object under `prefix`, following continuation tokens until exhausted.
pub async fn list_all(
    store: &dyn ObjectStore,
    bucket: &str,
    prefix: &str,
    delimiter: Option<&str>,
) -> Result<Vec<ObjectInfo>> {
    let mut results = Vec::new();
    let mut continuation_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = store
            .list_page(bucket, prefix, delimiter, continuation_token.clone())
            .await?;
        pages += 1;
        results.extend(page.objects);

        match page.next_continuation_token {
            Some(token) if continuation_token.as_deref() == Some(token.as_str()) => {
                return Err(Error::Store(format!(
                    "Listing of {} returned the same continuation token twice",
                    prefix
                )));
            }
            Some(token) => continuation_token = Some(token),
            None => break,
        }
    }

    debug!(bucket, prefix, pages, objects = results.len(), "Listed objects");
    Ok(results)
}

enum Entry {
    Object(ObjectInfo),
    Prefix(String),
}

impl Entry {
    fn marker(&self) -> &str {
        match self {
            Entry::Object(object) => &object.key,
            Entry::Prefix(prefix) => prefix,
        }
    }
}

/// Builds one listing page over objects sorted by key, with S3 delimiter and
/// continuation semantics. The continuation token is the last key or common
/// prefix emitted.
pub fn paginate<I>(
    objects: I,
    prefix: &str,
    delimiter: Option<&str>,
    continuation_token: Option<&str>,
    max_keys: usize,
) -> ListPage
where
    I: IntoIterator<Item = ObjectInfo>,
{
    let max_keys = max_keys.max(1);
    let mut page = ListPage::default();
    let mut emitted = 0usize;
    let mut last_marker: Option<String> = None;

    for object in objects {
        if !object.key.starts_with(prefix) {
            continue;
        }

        let grouped = delimiter
            .filter(|d| !d.is_empty())
            .and_then(|d| {
                object.key[prefix.len()..]
                    .find(d)
                    .map(|idx| object.key[..prefix.len() + idx + d.len()].to_string())
            });
        let entry = match grouped {
            Some(common) => Entry::Prefix(common),
            None => Entry::Object(object),
        };

        if let Some(token) = continuation_token {
            if entry.marker() <= token {
                continue;
            }
        }
        if let Entry::Prefix(common) = &entry {
            if page.common_prefixes.last() == Some(common) {
                continue;
            }
        }

        if emitted == max_keys {
            page.next_continuation_token = last_marker;
            break;
        }

        last_marker = Some(entry.marker().to_string());
        emitted += 1;
        match entry {
            Entry::Object(object) => page.objects.push(object),
            Entry::Prefix(common) => page.common_prefixes.push(common),
        }
    }

    page
}
