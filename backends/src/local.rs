use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use walcat_core::store::{self, ListPage, ObjectInfo, ObjectReader, ObjectStore, StoreType};
use walcat_core::{Error, Result};
use walkdir::WalkDir;

use crate::memory::DEFAULT_PAGE_SIZE;

/// Object store over a local directory: `<base>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    base_path: PathBuf,
    page_size: usize,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn bucket_path(&self, bucket: &str) -> Result<PathBuf> {
        Ok(self.base_path.join(checked_relative(bucket)?))
    }

    fn full_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        Ok(self.bucket_path(bucket)?.join(checked_relative(key)?))
    }
}

/// Rejects keys that would escape the bucket directory.
fn checked_relative(key: &str) -> Result<&Path> {
    let path = Path::new(key);
    let escapes = key.is_empty()
        || path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(Error::malformed_key(key, "not a plain relative path"));
    }
    Ok(path)
}

fn map_io(key: &str, e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::not_found(key)
    } else {
        Error::Io(e)
    }
}

/// Directory part of a listing prefix: `srv/basebackups_005/base_1` walks
/// `srv/basebackups_005`. Empty for prefixes without a `/`.
fn prefix_directory(prefix: &str) -> &str {
    prefix.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Files below `root`, keyed relative to `bucket_path`.
fn scan_bucket(bucket_path: &Path, root: &Path) -> Result<Vec<ObjectInfo>> {
    let mut objects = Vec::new();
    if !root.is_dir() {
        return Ok(objects);
    }

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| Error::Store(format!("Failed to scan bucket: {}", e)))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(bucket_path)
            .map_err(|e| Error::Other(e.to_string()))?;
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let metadata = entry
            .metadata()
            .map_err(|e| Error::Store(format!("Failed to stat {}: {}", key, e)))?;
        let modified: DateTime<Utc> = metadata.modified()?.into();

        objects.push(ObjectInfo {
            key,
            size: metadata.len(),
            last_modified: modified,
        });
    }
    objects.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(objects)
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
        continuation_token: Option<String>,
    ) -> Result<ListPage> {
        let bucket_path = self.bucket_path(bucket)?;
        if !fs::try_exists(&bucket_path).await? {
            return Err(Error::Store(format!("NoSuchBucket: {}", bucket)));
        }

        let root = match prefix_directory(prefix) {
            "" => bucket_path.clone(),
            dir => bucket_path.join(checked_relative(dir)?),
        };
        let objects = tokio::task::spawn_blocking(move || scan_bucket(&bucket_path, &root))
            .await
            .map_err(|e| Error::Other(format!("Bucket scan task failed: {}", e)))??;

        Ok(store::paginate(
            objects,
            prefix,
            delimiter,
            continuation_token.as_deref(),
            self.page_size,
        ))
    }

    async fn head(&self, bucket: &str, key: &str) -> Result<ObjectInfo> {
        let full_path = self.full_path(bucket, key)?;
        let metadata = fs::metadata(&full_path).await.map_err(|e| map_io(key, e))?;
        if !metadata.is_file() {
            return Err(Error::not_found(key));
        }

        let modified: DateTime<Utc> = metadata.modified()?.into();
        Ok(ObjectInfo {
            key: key.to_string(),
            size: metadata.len(),
            last_modified: modified,
        })
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<ObjectReader> {
        let full_path = self.full_path(bucket, key)?;
        let file = fs::File::open(&full_path).await.map_err(|e| map_io(key, e))?;
        if !file.metadata().await?.is_file() {
            return Err(Error::not_found(key));
        }
        Ok(Box::pin(file))
    }

    fn store_type(&self) -> StoreType {
        StoreType::Local
    }
}
