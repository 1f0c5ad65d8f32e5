use crate::backup::Backup;
use crate::naming;
use crate::store;
use crate::types::{BackupTime, Prefix};
use crate::{Error, Result};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

/// Name accepted wherever a backup name is expected, resolving to the newest backup.
pub const LATEST: &str = "LATEST";

/// Catalog of the backups stored under one server prefix.
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # use walcat_core::{BackupCatalog, CheckExistence, Prefix};
/// # async fn run(prefix: Arc<Prefix>) -> walcat_core::Result<()> {
/// let catalog = BackupCatalog::new(prefix);
/// let backup = catalog.latest_backup().await?;
/// if backup.check_existence().await? {
///     for key in catalog.keys(&backup).await? {
///         println!("{key}");
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BackupCatalog {
    prefix: Arc<Prefix>,
    path: String,
}

impl BackupCatalog {
    pub fn new(prefix: Arc<Prefix>) -> Self {
        let path = naming::backup_path(prefix.server());
        Self { prefix, path }
    }

    /// Catalog over a non-default backup directory of the form
    /// `<server>/<directory>/`. Listed keys are named by their third segment,
    /// so deeper or shallower paths are rejected.
    pub fn with_path(prefix: Arc<Prefix>, path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let segments: Vec<&str> = path
            .strip_suffix('/')
            .map(|p| p.split('/').collect())
            .unwrap_or_default();
        if segments.len() != 2 || segments.iter().any(|s| s.is_empty()) {
            return Err(Error::Config(format!(
                "Backup path must look like <server>/<directory>/, got {:?}",
                path
            )));
        }
        Ok(Self { prefix, path })
    }

    pub fn prefix(&self) -> &Arc<Prefix> {
        &self.prefix
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Every backup under the catalog path, newest first.
    pub async fn list(&self) -> Result<Vec<BackupTime>> {
        let mut backups = self.backup_times().await?;
        backups.sort_by(|a, b| newest_first(a, b));
        Ok(backups)
    }

    /// Name of the backup with the most recent modification time.
    pub async fn latest(&self) -> Result<String> {
        let backups = self.backup_times().await?;
        let latest = select_latest(&backups).ok_or_else(|| Error::NoBackups {
            path: self.path.clone(),
        })?;

        info!(backup = %latest.name, modified = %latest.time, "Selected latest backup");
        Ok(latest.name.clone())
    }

    pub async fn latest_backup(&self) -> Result<Backup> {
        let name = self.latest().await?;
        Ok(self.backup(name))
    }

    pub fn backup(&self, name: impl Into<String>) -> Backup {
        Backup::with_path(self.prefix.clone(), self.path.clone(), name)
    }

    /// Resolves `LATEST` to the newest backup; any other name is taken as given.
    pub async fn resolve(&self, name: &str) -> Result<Backup> {
        if name == LATEST {
            self.latest_backup().await
        } else {
            Ok(self.backup(name))
        }
    }

    pub async fn keys(&self, backup: &Backup) -> Result<Vec<String>> {
        backup.get_keys().await
    }

    async fn backup_times(&self) -> Result<Vec<BackupTime>> {
        let objects = store::list_all(
            self.prefix.store(),
            self.prefix.bucket(),
            &self.path,
            Some("/"),
        )
        .await?;

        let backups = objects
            .into_iter()
            .map(|object| -> Result<BackupTime> {
                Ok(BackupTime {
                    name: naming::strip_name(&object.key)?,
                    time: object.last_modified,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(path = %self.path, count = backups.len(), "Listed backups");
        Ok(backups)
    }
}

fn newest_first(a: &BackupTime, b: &BackupTime) -> Ordering {
    b.time.cmp(&a.time).then_with(|| b.name.cmp(&a.name))
}

/// Most recent entry; equal timestamps fall back to the greater name.
pub fn select_latest(backups: &[BackupTime]) -> Option<&BackupTime> {
    backups
        .iter()
        .max_by(|a, b| a.time.cmp(&b.time).then_with(|| a.name.cmp(&b.name)))
}
