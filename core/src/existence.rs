use crate::types::Prefix;
use crate::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Answers whether the object behind a handle is present in the store.
///
/// `Ok(false)` means the store positively reported the object missing. Any
/// other store failure is returned as an error, since it says nothing about
/// presence.
#[async_trait]
pub trait CheckExistence {
    async fn check_existence(&self) -> Result<bool>;
}

pub(crate) async fn probe(prefix: &Prefix, key: &str) -> Result<bool> {
    match prefix.store().head(prefix.bucket(), key).await {
        Ok(_) => {
            debug!(key, "Object exists");
            Ok(true)
        }
        Err(e) if e.is_not_found() => {
            debug!(key, "Object does not exist");
            Ok(false)
        }
        Err(e) => {
            warn!(key, error = %e, "Existence check failed");
            Err(e)
        }
    }
}
