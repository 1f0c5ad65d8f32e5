pub mod exists;
pub mod fetch;
pub mod list;
pub mod show;

use anyhow::{anyhow, Result};
use std::future::Future;
use std::sync::Arc;
use walcat_core::{Archive, Prefix};

use crate::config::Config;

/// Runs a store-bound operation under the configured deadline.
pub async fn with_timeout<T, F>(config: &Config, operation: &str, future: F) -> Result<T>
where
    F: Future<Output = walcat_core::Result<T>>,
{
    match tokio::time::timeout(config.timeout(), future).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(anyhow!(
            "{} timed out after {}s",
            operation,
            config.timeout().as_secs()
        )),
    }
}

/// Bare segment names live in the server's WAL directory; anything with a `/` is a full key.
pub fn archive_for(prefix: Arc<Prefix>, segment_or_key: &str) -> Archive {
    if segment_or_key.contains('/') {
        Archive::new(prefix, segment_or_key)
    } else {
        Archive::for_segment(prefix, segment_or_key)
    }
}
