//! Mapping between logical backup / WAL names and object keys.
//!
//! ```text
//! <server>/basebackups_005/<name>_backup_stop_sentinel.json   sentinel
//! <server>/basebackups_005/<name>/tar_partitions/part_1.tar   file set
//! <server>/wal_005/<segment>.lz4                              archive
//! ```

use crate::{Error, Result};

pub const BACKUP_DIRECTORY: &str = "basebackups_005";
pub const WAL_DIRECTORY: &str = "wal_005";
pub const BACKUP_MARKER: &str = "_backup";
pub const SENTINEL_SUFFIX: &str = "_stop_sentinel.json";
pub const TAR_PARTITIONS: &str = "tar_partitions";

/// Strips a listed backup key down to its base name.
///
/// `srv/basebackups_005/base_000000010000000000000002_backup_stop_sentinel.json`
/// becomes `base_000000010000000000000002`.
pub fn strip_name(key: &str) -> Result<String> {
    let segments: Vec<&str> = key.split('/').collect();
    if segments.len() < 3 {
        return Err(Error::malformed_key(
            key,
            format!("expected at least 3 path segments, found {}", segments.len()),
        ));
    }

    let (name, _) = segments[2]
        .split_once(BACKUP_MARKER)
        .ok_or_else(|| Error::malformed_key(key, format!("missing `{}` marker", BACKUP_MARKER)))?;

    if name.is_empty() {
        return Err(Error::malformed_key(key, "empty backup name"));
    }

    Ok(name.to_string())
}

/// Key prefix under which all backups of a server live, with trailing slash.
pub fn backup_path(server: &str) -> String {
    format!("{}/{}/", server, BACKUP_DIRECTORY)
}

/// Builds the root object key for `name`; `strip_name` recovers `name` from it.
pub fn backup_key(server: &str, name: &str, suffix: &str) -> String {
    format!("{}{}{}{}", backup_path(server), name, BACKUP_MARKER, suffix)
}

pub fn sentinel_key(path: &str, name: &str) -> String {
    format!("{}{}{}{}", path, name, BACKUP_MARKER, SENTINEL_SUFFIX)
}

pub fn tar_partitions_prefix(path: &str, name: &str) -> String {
    format!("{}{}/{}", path, name, TAR_PARTITIONS)
}

pub fn wal_path(server: &str) -> String {
    format!("{}/{}/", server, WAL_DIRECTORY)
}

/// Extension of the last key segment (`lz4`, `tar`, ...), empty when there is none.
pub fn file_format(key: &str) -> &str {
    let file = key.rsplit('/').next().unwrap_or(key);
    match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext,
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_name() {
        assert_eq!(
            strip_name("srv/basebackups_005/base_000000010000000000000002_backup_stop_sentinel.json")
                .unwrap(),
            "base_000000010000000000000002"
        );
        assert_eq!(strip_name("srv/base/20230601_backupB").unwrap(), "20230601");
        assert_eq!(strip_name("s/p/name_backup").unwrap(), "name");
    }

    #[test]
    fn test_strip_name_keeps_text_before_first_marker() {
        assert_eq!(strip_name("s/p/a_backup_b_backup_c").unwrap(), "a");
    }

    #[test]
    fn test_strip_name_ignores_deeper_segments() {
        assert_eq!(
            strip_name("srv/basebackups_005/base_1_backup/tar_partitions/part_1.tar").unwrap(),
            "base_1"
        );
    }

    #[test]
    fn test_strip_name_too_few_segments() {
        let err = strip_name("srv/base_1_backup").unwrap_err();
        assert!(matches!(err, Error::MalformedKey { .. }));

        let err = strip_name("").unwrap_err();
        assert!(matches!(err, Error::MalformedKey { .. }));
    }

    #[test]
    fn test_strip_name_missing_marker() {
        let err = strip_name("srv/basebackups_005/base_1.json").unwrap_err();
        match err {
            Error::MalformedKey { key, reason } => {
                assert_eq!(key, "srv/basebackups_005/base_1.json");
                assert!(reason.contains("_backup"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_strip_name_empty_name() {
        assert!(matches!(
            strip_name("srv/basebackups_005/_backup_stop_sentinel.json"),
            Err(Error::MalformedKey { .. })
        ));
    }

    #[test]
    fn test_backup_key_round_trip() {
        let names = ["base_000000010000000000000002", "20230101", "nightly-1"];
        let suffixes = ["", "_stop_sentinel.json", "A", "/extra"];
        for name in names {
            for suffix in suffixes {
                let key = backup_key("pg-main", name, suffix);
                assert_eq!(strip_name(&key).unwrap(), name, "key {key}");
            }
        }
    }

    #[test]
    fn test_layout_helpers() {
        let path = backup_path("srv");
        assert_eq!(path, "srv/basebackups_005/");
        assert_eq!(
            sentinel_key(&path, "base_1"),
            "srv/basebackups_005/base_1_backup_stop_sentinel.json"
        );
        assert_eq!(
            tar_partitions_prefix(&path, "base_1"),
            "srv/basebackups_005/base_1/tar_partitions"
        );
        assert_eq!(wal_path("srv"), "srv/wal_005/");
        assert_eq!(strip_name(&sentinel_key(&path, "base_1")).unwrap(), "base_1");
    }

    #[test]
    fn test_file_format() {
        assert_eq!(file_format("srv/wal_005/000000010000000000000002.lz4"), "lz4");
        assert_eq!(file_format("srv/basebackups_005/b/tar_partitions/part_1.tar.lz4"), "lz4");
        assert_eq!(file_format("srv/wal_005/000000010000000000000002"), "");
        assert_eq!(file_format("srv/v1.2/segment"), "");
        assert_eq!(file_format(".hidden"), "");
    }
}
