use anyhow::{anyhow, Result};
use clap::Args;
use walcat_core::BackupCatalog;

use super::with_timeout;
use crate::config::Config;

#[derive(Args)]
pub struct BackupListCommand {
    #[arg(long, help = "Output format (table, json)")]
    format: Option<String>,

    #[arg(long, help = "Show latest N backups")]
    latest: Option<usize>,
}

impl BackupListCommand {
    pub async fn run(&self, config: &Config) -> Result<()> {
        let catalog = BackupCatalog::new(config.open_prefix().await?);
        let mut backups = with_timeout(config, "Backup listing", catalog.list()).await?;

        if let Some(latest) = self.latest {
            backups.truncate(latest);
        }

        match self.format.as_deref().unwrap_or("table") {
            "table" => {
                if backups.is_empty() {
                    println!("No backups found");
                    return Ok(());
                }
                println!("{:<44} {}", "Name", "Modified");
                println!("{:-<70}", "");
                for backup in backups {
                    println!(
                        "{:<44} {}",
                        backup.name,
                        backup.time.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                }
            }
            "json" => {
                println!("{}", serde_json::to_string_pretty(&backups)?);
            }
            other => return Err(anyhow!("Unsupported format: {}", other)),
        }

        Ok(())
    }
}

pub async fn latest(config: &Config) -> Result<()> {
    let catalog = BackupCatalog::new(config.open_prefix().await?);
    let name = with_timeout(config, "Latest backup lookup", catalog.latest()).await?;
    println!("{}", name);
    Ok(())
}
