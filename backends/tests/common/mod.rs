use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use walcat_backends::MemoryStore;
use walcat_core::{naming, Prefix};

pub const BUCKET: &str = "pg-backups";
pub const SERVER: &str = "pg-main";

pub fn day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// Builds a prefix over `store` for the test bucket and server.
pub fn prefix_for(store: Arc<MemoryStore>) -> Arc<Prefix> {
    Arc::new(Prefix::new(store, BUCKET, SERVER).expect("valid prefix"))
}

/// Writes a complete backup: stop sentinel plus `partitions` tar partitions.
pub async fn put_backup(
    store: &MemoryStore,
    name: &str,
    modified: DateTime<Utc>,
    partitions: usize,
) {
    let path = naming::backup_path(SERVER);
    let sentinel = format!(
        r#"{{"LSN": 33554472, "FinishLSN": 33554720, "Hostname": "{}"}}"#,
        SERVER
    );
    store
        .put(BUCKET, &naming::sentinel_key(&path, name), sentinel, modified)
        .await;

    let partitions_prefix = naming::tar_partitions_prefix(&path, name);
    for i in 1..=partitions {
        store
            .put(
                BUCKET,
                &format!("{}/part_{}.tar.lz4", partitions_prefix, i),
                format!("{}-part-{}", name, i),
                modified,
            )
            .await;
    }
}
