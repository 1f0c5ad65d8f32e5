use anyhow::{anyhow, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use walcat_core::{naming, Backup, BackupCatalog, CheckExistence, ReaderMaker};

use super::{archive_for, with_timeout};
use crate::config::Config;

#[derive(Args)]
pub struct WalFetchCommand {
    #[arg(help = "WAL segment file name, or a full object key")]
    segment: String,

    #[arg(help = "Destination file")]
    destination: PathBuf,
}

impl WalFetchCommand {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let archive = archive_for(config.open_prefix().await?, &self.segment);
        let bytes = download(&archive.reader_maker(), &self.destination).await?;
        info!(key = archive.key(), bytes, "Fetched archive");
        Ok(())
    }
}

#[derive(Args)]
pub struct BackupFetchCommand {
    #[arg(help = "Backup name, or LATEST")]
    name: String,

    #[arg(help = "Directory receiving the partition objects")]
    destination: PathBuf,
}

impl BackupFetchCommand {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let catalog = BackupCatalog::new(config.open_prefix().await?);
        let backup = with_timeout(config, "Backup lookup", catalog.resolve(&self.name)).await?;

        if !with_timeout(config, "Backup existence check", backup.check_existence()).await? {
            return Err(anyhow!("Backup {} has no stop sentinel", backup.name()));
        }

        let (count, total_bytes) = fetch_backup(config, &backup, &self.destination).await?;
        if count > 0 {
            println!(
                "Fetched {} objects ({} bytes) into {}",
                count,
                total_bytes,
                self.destination.display()
            );
        }
        Ok(())
    }
}

/// Downloads every partition object of `backup` below `destination`, keeping
/// each key's path relative to the backup's partition prefix.
async fn fetch_backup(config: &Config, backup: &Backup, destination: &Path) -> Result<(usize, u64)> {
    let makers = with_timeout(config, "Key enumeration", backup.reader_makers()).await?;
    if makers.is_empty() {
        println!("No partition objects found for {}", backup.name());
        return Ok((0, 0));
    }

    let partitions = naming::tar_partitions_prefix(backup.path(), backup.name());
    let targets = makers
        .iter()
        .map(|maker| local_target(destination, &partitions, maker.path()))
        .collect::<Result<Vec<_>>>()?;

    fs::create_dir_all(destination).await?;
    println!("Fetching {} objects of {}", makers.len(), backup.name());

    let pb = ProgressBar::new(makers.len() as u64);
    pb.set_style(ProgressStyle::default_bar().template("{bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")?);

    let mut total_bytes = 0u64;
    for (maker, target) in makers.iter().zip(&targets) {
        pb.set_message(maker.path().to_string());
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        match download(maker, target).await {
            Ok(bytes) => total_bytes += bytes,
            Err(e) => {
                pb.abandon_with_message("Fetch failed");
                warn!(key = maker.path(), error = %e, "Failed to fetch object");
                return Err(e);
            }
        }
        pb.inc(1);
    }

    pb.finish_with_message("Fetch completed");
    Ok((makers.len(), total_bytes))
}

/// Maps a partition key to its file under `destination`. Keys outside
/// `partitions` or with components other than plain names are refused.
fn local_target(destination: &Path, partitions: &str, key: &str) -> Result<PathBuf> {
    let relative = key
        .strip_prefix(partitions)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|rest| !rest.is_empty())
        .ok_or_else(|| anyhow!("Object key {} is not under {}/", key, partitions))?;

    let plain = Path::new(relative)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !plain || relative.split('/').any(|segment| segment.is_empty()) {
        return Err(anyhow!("Object key {} would escape {}", key, destination.display()));
    }

    Ok(destination.join(relative))
}

/// Streams one object into `destination`, going through a `.partial` file so
/// an interrupted download never leaves a truncated file under the final name.
pub async fn download(maker: &dyn ReaderMaker, destination: &Path) -> Result<u64> {
    let mut reader = maker
        .reader()
        .await
        .with_context(|| format!("opening {}", maker.path()))?;

    let partial = partial_path(destination);
    let mut file = fs::File::create(&partial)
        .await
        .with_context(|| format!("creating {}", partial.display()))?;

    let copied = tokio::io::copy(&mut reader, &mut file).await;
    drop(reader);

    let bytes = match copied {
        Ok(bytes) => bytes,
        Err(e) => {
            drop(file);
            let _ = fs::remove_file(&partial).await;
            return Err(e).with_context(|| format!("reading {}", maker.path()));
        }
    };

    file.sync_all().await?;
    drop(file);
    fs::rename(&partial, destination).await?;
    debug!(key = maker.path(), bytes, destination = %destination.display(), "Downloaded object");
    Ok(bytes)
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    destination.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;
    use walcat_backends::MemoryStore;
    use walcat_core::{Archive, Prefix};

    #[tokio::test]
    async fn test_download_writes_file() {
        let store = Arc::new(MemoryStore::new());
        store.put("b", "pg-main/wal_005/0001.lz4", "segment-bytes", Utc::now()).await;
        let prefix = Arc::new(Prefix::new(store, "b", "pg-main").unwrap());

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("0001.lz4");
        let maker = Archive::for_segment(prefix, "0001.lz4").reader_maker();

        let bytes = download(&maker, &destination).await.unwrap();
        assert_eq!(bytes, 13);
        assert_eq!(std::fs::read(&destination).unwrap(), b"segment-bytes");
        assert!(!partial_path(&destination).exists());
    }

    #[tokio::test]
    async fn test_download_missing_object_creates_nothing() {
        let store = Arc::new(MemoryStore::new());
        store.create_bucket("b").await;
        let prefix = Arc::new(Prefix::new(store, "b", "pg-main").unwrap());

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("0002.lz4");
        let maker = Archive::for_segment(prefix, "0002.lz4").reader_maker();

        assert!(download(&maker, &destination).await.is_err());
        assert!(!destination.exists());
        assert!(!partial_path(&destination).exists());
    }

    #[tokio::test]
    async fn test_fetch_backup_keeps_partition_subdirectories() {
        let store = Arc::new(MemoryStore::new());
        let partitions = "pg-main/basebackups_005/base_1/tar_partitions";
        store
            .put("b", &format!("{}/a/part_1.tar", partitions), "AAAA", Utc::now())
            .await;
        store
            .put("b", &format!("{}/b/part_1.tar", partitions), "BB", Utc::now())
            .await;
        let prefix = Arc::new(Prefix::new(store, "b", "pg-main").unwrap());
        let backup = Backup::new(prefix, "base_1");

        let dir = tempfile::tempdir().unwrap();
        let (count, bytes) = fetch_backup(&Config::default(), &backup, dir.path())
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(bytes, 6);
        assert_eq!(std::fs::read(dir.path().join("a/part_1.tar")).unwrap(), b"AAAA");
        assert_eq!(std::fs::read(dir.path().join("b/part_1.tar")).unwrap(), b"BB");
    }

    #[test]
    fn test_local_target_refuses_escaping_keys() {
        let destination = Path::new("/restore");
        let partitions = "srv/basebackups_005/base_1/tar_partitions";

        assert_eq!(
            local_target(destination, partitions, &format!("{}/part_1.tar", partitions)).unwrap(),
            PathBuf::from("/restore/part_1.tar")
        );
        assert!(local_target(destination, partitions, &format!("{}/../x.tar", partitions)).is_err());
        assert!(local_target(destination, partitions, &format!("{}//x.tar", partitions)).is_err());
        assert!(local_target(destination, partitions, &format!("{}/", partitions)).is_err());
        assert!(local_target(destination, partitions, "srv/wal_005/0001.lz4").is_err());
        assert!(local_target(destination, partitions, &format!("{}x/part_1.tar", partitions)).is_err());
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/tmp/x/0001.lz4")),
            PathBuf::from("/tmp/x/0001.lz4.partial")
        );
    }
}
