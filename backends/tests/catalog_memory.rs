mod common;

use common::{day, prefix_for, put_backup, BUCKET, SERVER};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use walcat_backends::{Failure, MemoryStore};
use walcat_core::{naming, Backup, BackupCatalog, CheckExistence, Error, ReaderMaker, LATEST};

/// Latest selection must return the newest backup, not the first entry of an
/// ascending sort.
#[tokio::test]
async fn test_latest_returns_maximum_timestamp() {
    let store = Arc::new(MemoryStore::new());
    store
        .put(BUCKET, "srv/base/20230101_backupA", "", day(2023, 1, 1))
        .await;
    store
        .put(BUCKET, "srv/base/20230601_backupB", "", day(2023, 6, 1))
        .await;
    store
        .put(BUCKET, "srv/base/20230301_backupC", "", day(2023, 3, 1))
        .await;

    let prefix = Arc::new(walcat_core::Prefix::new(store.clone(), BUCKET, "srv").unwrap());
    let catalog = BackupCatalog::with_path(prefix, "srv/base/").unwrap();

    assert_eq!(catalog.latest().await.unwrap(), "20230601");
}

#[tokio::test]
async fn test_latest_in_default_layout_ignores_partition_objects() {
    let store = Arc::new(MemoryStore::new());
    put_backup(&store, "base_000000010000000000000002", day(2024, 3, 1), 2).await;
    put_backup(&store, "base_000000010000000000000009", day(2024, 3, 8), 3).await;
    put_backup(&store, "base_000000010000000000000005", day(2024, 3, 4), 1).await;

    let catalog = BackupCatalog::new(prefix_for(store));
    assert_eq!(
        catalog.latest().await.unwrap(),
        "base_000000010000000000000009"
    );

    let listed: Vec<_> = catalog
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(
        listed,
        vec![
            "base_000000010000000000000009",
            "base_000000010000000000000005",
            "base_000000010000000000000002",
        ]
    );
}

#[tokio::test]
async fn test_latest_across_paginated_listing() {
    let store = Arc::new(MemoryStore::with_page_size(2));
    for i in 1..=7u32 {
        put_backup(&store, &format!("base_{:02}", i), day(2024, 1, 10 - i), 0).await;
    }

    let catalog = BackupCatalog::new(prefix_for(store));
    // base_01 carries the newest timestamp even though it sorts first by key.
    assert_eq!(catalog.latest().await.unwrap(), "base_01");
    assert_eq!(catalog.list().await.unwrap().len(), 7);
}

#[tokio::test]
async fn test_latest_empty_listing_is_no_backups() {
    let store = Arc::new(MemoryStore::new());
    store.create_bucket(BUCKET).await;

    let catalog = BackupCatalog::new(prefix_for(store));
    match catalog.latest().await {
        Err(Error::NoBackups { path }) => assert_eq!(path, naming::backup_path(SERVER)),
        other => panic!("expected NoBackups, got {:?}", other),
    }
    assert!(catalog.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_latest_reports_malformed_key() {
    let store = Arc::new(MemoryStore::new());
    put_backup(&store, "base_1", day(2024, 1, 1), 0).await;
    store
        .put(
            BUCKET,
            &format!("{}README.txt", naming::backup_path(SERVER)),
            "notes",
            day(2024, 1, 2),
        )
        .await;

    let catalog = BackupCatalog::new(prefix_for(store));
    match catalog.latest().await {
        Err(Error::MalformedKey { key, .. }) => assert!(key.ends_with("README.txt")),
        other => panic!("expected MalformedKey, got {:?}", other),
    }
}

#[tokio::test]
async fn test_latest_propagates_listing_failure() {
    let store = Arc::new(MemoryStore::new());
    put_backup(&store, "base_1", day(2024, 1, 1), 0).await;
    store
        .fail(&naming::backup_path(SERVER), Failure::Transient)
        .await;

    let catalog = BackupCatalog::new(prefix_for(store));
    assert!(catalog.latest().await.unwrap_err().is_transient());
}

#[tokio::test]
async fn test_resolve_latest_keyword() {
    let store = Arc::new(MemoryStore::new());
    put_backup(&store, "base_old", day(2024, 1, 1), 0).await;
    put_backup(&store, "base_new", day(2024, 2, 1), 0).await;

    let catalog = BackupCatalog::new(prefix_for(store));
    assert_eq!(catalog.resolve(LATEST).await.unwrap().name(), "base_new");
    assert_eq!(catalog.resolve("base_old").await.unwrap().name(), "base_old");
}

#[tokio::test]
async fn test_backup_existence_three_outcomes() {
    let store = Arc::new(MemoryStore::new());
    put_backup(&store, "base_present", day(2024, 1, 1), 1).await;
    let catalog = BackupCatalog::new(prefix_for(store.clone()));

    let present = catalog.backup("base_present");
    assert!(present.check_existence().await.unwrap());

    let absent = catalog.backup("base_absent");
    assert!(!absent.check_existence().await.unwrap());

    store.fail(present.js(), Failure::Transient).await;
    assert!(present.check_existence().await.unwrap_err().is_transient());

    store.fail(present.js(), Failure::Denied).await;
    assert!(matches!(
        present.check_existence().await,
        Err(Error::Store(_))
    ));
}

#[tokio::test]
async fn test_get_keys_returns_only_partitions_across_pages() {
    let store = Arc::new(MemoryStore::with_page_size(3));
    put_backup(&store, "base_a", day(2024, 1, 1), 8).await;
    put_backup(&store, "base_ab", day(2024, 1, 2), 2).await;
    let path = naming::backup_path(SERVER);
    store
        .put(BUCKET, &format!("{}base_a/metadata.json", path), "{}", day(2024, 1, 1))
        .await;

    let catalog = BackupCatalog::new(prefix_for(store));
    let backup = catalog.backup("base_a");
    let keys = catalog.keys(&backup).await.unwrap();

    assert_eq!(keys.len(), 8);
    let expected_prefix = naming::tar_partitions_prefix(&path, "base_a");
    assert!(keys.iter().all(|k| k.starts_with(&expected_prefix)));
    assert!(keys.iter().any(|k| k.ends_with("part_8.tar.lz4")));
}

#[tokio::test]
async fn test_get_keys_for_unknown_backup_is_empty() {
    let store = Arc::new(MemoryStore::new());
    put_backup(&store, "base_a", day(2024, 1, 1), 2).await;

    let catalog = BackupCatalog::new(prefix_for(store));
    assert!(catalog.backup("base_z").get_keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reader_makers_stream_each_partition() {
    let store = Arc::new(MemoryStore::new());
    put_backup(&store, "base_a", day(2024, 1, 1), 2).await;

    let catalog = BackupCatalog::new(prefix_for(store));
    let makers = catalog.backup("base_a").reader_makers().await.unwrap();
    assert_eq!(makers.len(), 2);

    for (i, maker) in makers.iter().enumerate() {
        assert_eq!(maker.format(), "lz4");
        // Every call opens an independent stream from the start.
        for _ in 0..2 {
            let mut body = String::new();
            maker.reader().await.unwrap().read_to_string(&mut body).await.unwrap();
            assert_eq!(body, format!("base_a-part-{}", i + 1));
        }
    }
}

#[tokio::test]
async fn test_fetch_sentinel() {
    let store = Arc::new(MemoryStore::new());
    put_backup(&store, "base_a", day(2024, 1, 1), 0).await;

    let catalog = BackupCatalog::new(prefix_for(store));
    let sentinel = catalog.backup("base_a").fetch_sentinel().await.unwrap();
    assert_eq!(sentinel.lsn, Some(33554472));
    assert_eq!(sentinel.hostname.as_deref(), Some(SERVER));

    assert!(catalog
        .backup("base_missing")
        .fetch_sentinel()
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn test_with_path_requires_two_segment_directory() {
    let store = Arc::new(MemoryStore::new());
    let prefix = prefix_for(store);

    assert!(BackupCatalog::with_path(prefix.clone(), "pg-main/basebackups_005/").is_ok());
    for bad in ["pg-main/", "pg-main/a/b/", "pg-main/basebackups_005", "/basebackups_005/", ""] {
        assert!(
            matches!(BackupCatalog::with_path(prefix.clone(), bad), Err(Error::Config(_))),
            "{bad:?} accepted"
        );
    }
}

#[tokio::test]
async fn test_backup_new_matches_catalog_handle() {
    let store = Arc::new(MemoryStore::new());
    put_backup(&store, "base_000000010000000000000004", day(2024, 5, 1), 1).await;
    let prefix = prefix_for(store);

    let direct = Backup::new(prefix.clone(), "base_000000010000000000000004");
    let from_catalog = BackupCatalog::new(prefix).backup("base_000000010000000000000004");

    assert_eq!(direct.path(), from_catalog.path());
    assert_eq!(direct.js(), from_catalog.js());
    assert_eq!(
        direct.js(),
        format!("{}/basebackups_005/base_000000010000000000000004_backup_stop_sentinel.json", SERVER)
    );
    assert!(direct.check_existence().await.unwrap());
}
