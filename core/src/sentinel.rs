use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of a backup's stop sentinel. Every field is optional since older
/// writers emitted fewer of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupSentinel {
    #[serde(rename = "LSN", default, skip_serializing_if = "Option::is_none")]
    pub lsn: Option<u64>,

    #[serde(rename = "FinishLSN", default, skip_serializing_if = "Option::is_none")]
    pub finish_lsn: Option<u64>,

    #[serde(rename = "PgVersion", default, skip_serializing_if = "Option::is_none")]
    pub pg_version: Option<u32>,

    #[serde(rename = "StartTime", default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(rename = "FinishTime", default, skip_serializing_if = "Option::is_none")]
    pub finish_time: Option<DateTime<Utc>>,

    #[serde(rename = "Hostname", default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(rename = "UncompressedSize", default, skip_serializing_if = "Option::is_none")]
    pub uncompressed_size: Option<u64>,

    #[serde(rename = "CompressedSize", default, skip_serializing_if = "Option::is_none")]
    pub compressed_size: Option<u64>,

    #[serde(rename = "UserData", default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<serde_json::Value>,
}

impl BackupSentinel {
    pub fn from_slice(data: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}
