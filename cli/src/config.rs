use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use walcat_backends::{LocalStore, RetryConfig, RetryStore, S3Config, S3Store};
use walcat_core::{ObjectStore, Prefix};

pub const CONFIG_FILE_NAME: &str = "walcat.toml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    S3,
    Local,
}

impl std::str::FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "s3" => Ok(StoreKind::S3),
            "local" => Ok(StoreKind::Local),
            other => Err(anyhow!("Unsupported store type: {}. Supported: s3, local", other)),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Directory holding one subdirectory per bucket.
    pub root: Option<PathBuf>,
}

/// `walcat.toml` contents.
///
/// ```toml
/// store = "s3"
/// bucket = "pg-backups"
/// server = "pg-main"
/// timeout_secs = 60
///
/// [s3]
/// endpoint = "http://localhost:9000"
/// path_style = true
///
/// [retry]
/// max_attempts = 5
/// initial_backoff = 100
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreKind,
    pub bucket: Option<String>,
    pub server: Option<String>,
    /// Deadline for listing and probe commands.
    pub timeout_secs: u64,
    pub s3: S3Config,
    pub local: LocalConfig,
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreKind::default(),
            bucket: None,
            server: None,
            timeout_secs: 120,
            s3: S3Config::default(),
            local: LocalConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Values given on the command line or through `WALCAT_*` variables.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub store: Option<StoreKind>,
    pub bucket: Option<String>,
    pub server: Option<String>,
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub local_root: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "walcat").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Loads `path` if given (it must exist), otherwise the default location if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => path,
                None => {
                    debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(store) = overrides.store {
            self.store = store;
        }
        if overrides.bucket.is_some() {
            self.bucket = overrides.bucket;
        }
        if overrides.server.is_some() {
            self.server = overrides.server;
        }
        if overrides.endpoint.is_some() {
            self.s3.endpoint = overrides.endpoint;
        }
        if overrides.region.is_some() {
            self.s3.region = overrides.region;
        }
        if overrides.local_root.is_some() {
            self.local.root = overrides.local_root;
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.timeout_secs = timeout_secs;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub async fn open_store(&self) -> Result<Arc<dyn ObjectStore>> {
        let store: Arc<dyn ObjectStore> = match self.store {
            StoreKind::S3 => {
                let s3 = S3Store::from_config(&self.s3).await?;
                Arc::new(RetryStore::new(s3, self.retry.clone()))
            }
            StoreKind::Local => {
                let root = self
                    .local
                    .root
                    .as_ref()
                    .ok_or_else(|| anyhow!("Local store root required (--local-root or [local] root)"))?;
                Arc::new(RetryStore::new(LocalStore::new(root), self.retry.clone()))
            }
        };
        Ok(store)
    }

    pub async fn open_prefix(&self) -> Result<Arc<Prefix>> {
        let bucket = self
            .bucket
            .as_deref()
            .ok_or_else(|| anyhow!("Bucket required (--bucket, WALCAT_BUCKET or config file)"))?;
        let server = self
            .server
            .as_deref()
            .ok_or_else(|| anyhow!("Server prefix required (--server, WALCAT_SERVER or config file)"))?;

        let store = self.open_store().await?;
        info!(store = ?store.store_type(), bucket, server, "Opening catalog");
        Ok(Arc::new(Prefix::new(store, bucket, server)?))
    }
}
