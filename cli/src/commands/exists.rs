use anyhow::Result;
use walcat_core::{BackupCatalog, CheckExistence};

use super::{archive_for, with_timeout};
use crate::config::Config;

fn report(exists: bool) {
    println!("{}", if exists { "exists" } else { "absent" });
}

pub async fn backup_exists(name: &str, config: &Config) -> Result<()> {
    let catalog = BackupCatalog::new(config.open_prefix().await?);
    let backup = with_timeout(config, "Backup lookup", catalog.resolve(name)).await?;
    let exists = with_timeout(config, "Backup existence check", backup.check_existence()).await?;
    report(exists);
    Ok(())
}

pub async fn wal_exists(segment: &str, config: &Config) -> Result<()> {
    let archive = archive_for(config.open_prefix().await?, segment);
    let exists = with_timeout(config, "Archive existence check", archive.check_existence()).await?;
    report(exists);
    Ok(())
}
