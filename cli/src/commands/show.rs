use anyhow::Result;
use walcat_core::BackupCatalog;

use super::with_timeout;
use crate::config::Config;

pub async fn keys(name: &str, config: &Config) -> Result<()> {
    let catalog = BackupCatalog::new(config.open_prefix().await?);
    let backup = with_timeout(config, "Backup lookup", catalog.resolve(name)).await?;
    let keys = with_timeout(config, "Key enumeration", catalog.keys(&backup)).await?;

    if keys.is_empty() {
        eprintln!("No partition objects found for {}", backup.name());
    }
    for key in keys {
        println!("{}", key);
    }
    Ok(())
}

pub async fn sentinel(name: &str, config: &Config) -> Result<()> {
    let catalog = BackupCatalog::new(config.open_prefix().await?);
    let backup = with_timeout(config, "Backup lookup", catalog.resolve(name)).await?;
    let sentinel = with_timeout(config, "Sentinel fetch", backup.fetch_sentinel()).await?;
    println!("{}", serde_json::to_string_pretty(&sentinel)?);
    Ok(())
}
