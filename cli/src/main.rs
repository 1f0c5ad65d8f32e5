mod commands;
mod config;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use commands::fetch::{BackupFetchCommand, WalFetchCommand};
use commands::list::BackupListCommand;
use config::{Config, Overrides, StoreKind};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(
    name = "walcat",
    about = "Catalog of database backups and WAL archives in object storage",
    long_about = "Walcat finds the latest base backup, checks backups and WAL segments for presence, and streams their objects out of S3-compatible or local storage"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, env = "WALCAT_CONFIG", help = "Config file path")]
    config: Option<PathBuf>,

    #[arg(long, env = "WALCAT_STORE", help = "Store type (s3, local)")]
    store: Option<StoreKind>,

    #[arg(long, env = "WALCAT_BUCKET", help = "Bucket name")]
    bucket: Option<String>,

    #[arg(long, env = "WALCAT_SERVER", help = "Server prefix at the top of every key")]
    server: Option<String>,

    #[arg(long, env = "WALCAT_ENDPOINT", help = "S3-compatible endpoint URL")]
    endpoint: Option<String>,

    #[arg(long, env = "WALCAT_REGION", help = "S3 region")]
    region: Option<String>,

    #[arg(long, env = "WALCAT_LOCAL_ROOT", help = "Root directory for the local store")]
    local_root: Option<PathBuf>,

    #[arg(long, env = "WALCAT_TIMEOUT", help = "Deadline in seconds for listing and probe commands")]
    timeout: Option<u64>,

    #[arg(short, long, help = "Enable verbose output")]
    verbose: bool,

    #[arg(short, long, help = "Enable quiet mode")]
    quiet: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            store: self.store,
            bucket: self.bucket.clone(),
            server: self.server.clone(),
            endpoint: self.endpoint.clone(),
            region: self.region.clone(),
            local_root: self.local_root.clone(),
            timeout_secs: self.timeout,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List backups, newest first")]
    BackupList(BackupListCommand),

    #[command(about = "Print the name of the latest backup")]
    Latest,

    #[command(about = "Check whether a backup's stop sentinel exists")]
    BackupExists {
        #[arg(help = "Backup name, or LATEST")]
        name: String,
    },

    #[command(about = "Check whether a WAL segment exists")]
    WalExists {
        #[arg(help = "WAL segment file name, or a full object key")]
        segment: String,
    },

    #[command(about = "List the object keys of a backup")]
    Keys {
        #[arg(help = "Backup name, or LATEST")]
        name: String,
    },

    #[command(about = "Print a backup's sentinel metadata")]
    Sentinel {
        #[arg(help = "Backup name, or LATEST")]
        name: String,
    },

    #[command(about = "Download a WAL segment")]
    WalFetch(WalFetchCommand),

    #[command(about = "Download every object of a backup")]
    BackupFetch(BackupFetchCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet)?;

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply(cli.overrides());
    debug!(?config, "Resolved configuration");

    match cli.command {
        Commands::BackupList(ref cmd) => cmd.run(&config).await,
        Commands::Latest => commands::list::latest(&config).await,
        Commands::BackupExists { ref name } => commands::exists::backup_exists(name, &config).await,
        Commands::WalExists { ref segment } => commands::exists::wal_exists(segment, &config).await,
        Commands::Keys { ref name } => commands::show::keys(name, &config).await,
        Commands::Sentinel { ref name } => commands::show::sentinel(name, &config).await,
        Commands::WalFetch(ref cmd) => cmd.run(&config).await,
        Commands::BackupFetch(ref cmd) => cmd.run(&config).await,
    }
}

fn init_tracing(verbose: bool, quiet: bool) -> Result<()> {
    let level = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "walcat={level},walcat_core={level},walcat_backends={level}"
        ))
    });

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("Setting default subscriber failed: {}", e))
}
