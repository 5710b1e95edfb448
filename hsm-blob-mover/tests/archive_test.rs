/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

#![cfg(target_family = "unix")]


use std::os::unix::fs::MetadataExt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hsm_blob_mover::error::ErrorKind;
use hsm_blob_mover::metadata::{
    GROUP_KEY, IS_FOLDER_KEY, MOD_TIME_KEY, OWNER_KEY, PERMISSIONS_KEY,
};
use hsm_blob_mover::metrics::Throughput;
use hsm_blob_mover::runtime::pacer::Pacer;
use hsm_blob_mover::store::in_memory::{InMemoryBlobStore, StoreCall};
use hsm_blob_mover::types::{ConcurrencySetting, NamespaceMode};
use test_common::{create_mount, pattern_bytes, set_mode};
use test_utils::{client, config, config_builder, RecordingProgress};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_archive_replicates_ancestors_then_content() {
    let mount = create_mount(&[("a/b/file.txt", 100)], &[("a", 0o750), ("a/b", 0o700)]);
    set_mode(&mount.path().join("a/b/file.txt"), 0o640);
    let store = Arc::new(InMemoryBlobStore::new());
    let client = client(config(mount.path(), 1024, NamespaceMode::Flat), &store);

    let output = client
        .archive()
        .object_name("a/b/file.txt")
        .send()
        .await
        .unwrap();

    assert_eq!(100, output.bytes_transferred());
    assert_eq!("export1/a/b/file.txt", output.object_key());
    assert_eq!(vec!["export1/a", "export1/a/b"], output.placeholders());
    assert!(!output.is_degraded());
    assert_eq!(
        vec!["export1/a", "export1/a/b", "export1/a/b/file.txt"],
        store.keys()
    );
    // placeholders land before any content request
    assert_eq!(
        vec!["export1/a", "export1/a/b", "export1/a/b/file.txt"],
        store.calls(StoreCall::PutBlob)
    );

    let file_meta = std::fs::metadata(mount.path().join("a/b/file.txt")).unwrap();
    let blob = store.blob("export1/a/b/file.txt").unwrap();
    assert_eq!(&pattern_bytes(100)[..], &blob.data[..]);
    assert_eq!(4, blob.metadata.len());
    assert_eq!("640", blob.metadata[PERMISSIONS_KEY]);
    assert_eq!(file_meta.uid().to_string(), blob.metadata[OWNER_KEY]);
    assert_eq!(file_meta.gid().to_string(), blob.metadata[GROUP_KEY]);
    assert!(!blob.metadata[MOD_TIME_KEY].is_empty());
    assert!(blob.access_control.is_none());

    for (key, mode) in [("export1/a", "750"), ("export1/a/b", "700")] {
        let placeholder = store.blob(key).unwrap();
        assert!(placeholder.data.is_empty());
        assert_eq!(5, placeholder.metadata.len());
        assert_eq!("true", placeholder.metadata[IS_FOLDER_KEY]);
        assert_eq!(mode, placeholder.metadata[PERMISSIONS_KEY]);
    }
    assert!(store.calls(StoreCall::SetAccessControl).is_empty());
    assert!(store.calls(StoreCall::GetAccessControl).is_empty());
}

#[tokio::test]
async fn test_archive_without_ancestors() {
    let mount = create_mount(&[("top.dat", 10)], &[]);
    let store = Arc::new(InMemoryBlobStore::new());
    let client = client(config(mount.path(), 1024, NamespaceMode::Flat), &store);

    let output = client.archive().object_name("top.dat").send().await.unwrap();
    assert!(output.placeholders().is_empty());
    assert_eq!(vec!["export1/top.dat"], store.keys());
}

#[tokio::test]
async fn test_archive_empty_file() {
    let mount = create_mount(&[("d/empty", 0)], &[]);
    let store = Arc::new(InMemoryBlobStore::new());
    let client = client(config(mount.path(), 1024, NamespaceMode::Flat), &store);

    let output = client.archive().object_name("d/empty").send().await.unwrap();
    assert_eq!(0, output.bytes_transferred());
    let blob = store.blob("export1/d/empty").unwrap();
    assert!(blob.data.is_empty());
    assert!(!blob.metadata.contains_key(IS_FOLDER_KEY));
}

#[tokio::test]
async fn test_archive_multiple_blocks() {
    let mount = create_mount(&[("big.bin", 10_000)], &[]);
    let store = Arc::new(InMemoryBlobStore::new());
    let client = client(config(mount.path(), 1024, NamespaceMode::Flat), &store);
    let progress = Arc::new(RecordingProgress::default());

    let output = client
        .archive()
        .object_name("big.bin")
        .progress_listener(progress.clone())
        .send()
        .await
        .unwrap();

    assert_eq!(10_000, output.bytes_transferred());
    assert_eq!(10, store.calls(StoreCall::StageBlock).len());
    assert_eq!(vec!["export1/big.bin"], store.calls(StoreCall::CommitBlockList));
    assert!(store.calls(StoreCall::PutBlob).is_empty());
    assert_eq!(0, store.staged_block_count("export1/big.bin"));

    let blob = store.blob("export1/big.bin").unwrap();
    assert_eq!(&pattern_bytes(10_000)[..], &blob.data[..]);
    assert_eq!(4, blob.metadata.len());

    assert_eq!(10_000, progress.total());
    let ranges = progress.ranges();
    assert_eq!((0, 1024), ranges[0]);
    assert_eq!((9216, 784), ranges[9]);
}

#[tokio::test]
async fn test_archive_hierarchical_namespace() {
    let mount = create_mount(&[("a/b/file.txt", 3000)], &[("a", 0o755), ("a/b", 0o750)]);
    set_mode(&mount.path().join("a/b/file.txt"), 0o640);
    let store = Arc::new(InMemoryBlobStore::hierarchical());
    let client = client(config(mount.path(), 1024, NamespaceMode::Hierarchical), &store);

    let output = client
        .archive()
        .object_name("a/b/file.txt")
        .send()
        .await
        .unwrap();
    assert!(!output.is_degraded());

    let uid = std::fs::metadata(mount.path()).unwrap().uid().to_string();
    let placeholder = store.blob("export1/a/b").unwrap();
    assert_eq!(1, placeholder.metadata.len());
    assert_eq!("true", placeholder.metadata[IS_FOLDER_KEY]);
    let acl = placeholder.access_control.unwrap();
    assert_eq!("user::rwx,group::r-x,other::---", acl.acl());
    assert_eq!(uid, acl.owner());

    let acl = store.blob("export1/a").unwrap().access_control.unwrap();
    assert_eq!("user::rwx,group::r-x,other::r-x", acl.acl());

    // the file keeps its generic metadata and gains an ACL
    let blob = store.blob("export1/a/b/file.txt").unwrap();
    assert_eq!(4, blob.metadata.len());
    assert_eq!(
        "user::rw-,group::r--,other::---",
        blob.access_control.unwrap().acl()
    );
    assert_eq!(
        vec!["export1/a", "export1/a/b", "export1/a/b/file.txt"],
        store.calls(StoreCall::SetAccessControl)
    );
    assert!(store
        .calls(StoreCall::GetAccessControl)
        .contains(&"export1/a/b/file.txt".to_string()));
}

#[tokio::test]
async fn test_rearchive_keeps_existing_acl() {
    let mount = create_mount(&[("f.txt", 10)], &[]);
    let store = Arc::new(InMemoryBlobStore::hierarchical());
    let client = client(config(mount.path(), 1024, NamespaceMode::Hierarchical), &store);

    client.archive().object_name("f.txt").send().await.unwrap();
    let first = store.blob("export1/f.txt").unwrap().access_control;

    set_mode(&mount.path().join("f.txt"), 0o600);
    client.archive().object_name("f.txt").send().await.unwrap();
    assert_eq!(first, store.blob("export1/f.txt").unwrap().access_control);
}

#[tokio::test]
async fn test_placeholder_failure_aborts_before_content() {
    let mount = create_mount(&[("a/b/file.txt", 100)], &[]);
    let store = Arc::new(InMemoryBlobStore::new());
    store.fail_on(StoreCall::PutBlob, "export1/a/b");
    let client = client(config(mount.path(), 1024, NamespaceMode::Flat), &store);

    let err = client
        .archive()
        .object_name("a/b/file.txt")
        .send()
        .await
        .unwrap_err();

    assert_eq!(&ErrorKind::BackendUnavailable, err.kind());
    // the shallower placeholder stays
    assert_eq!(vec!["export1/a"], store.keys());
    assert_eq!(
        vec!["export1/a", "export1/a/b"],
        store.calls(StoreCall::PutBlob)
    );
}

#[tokio::test]
async fn test_directory_acl_failure_is_fatal() {
    let mount = create_mount(&[("a/file.txt", 100)], &[]);
    let store = Arc::new(InMemoryBlobStore::hierarchical());
    store.fail_on(StoreCall::SetAccessControl, "export1/a");
    let client = client(config(mount.path(), 1024, NamespaceMode::Hierarchical), &store);

    let err = client
        .archive()
        .object_name("a/file.txt")
        .send()
        .await
        .unwrap_err();
    assert_eq!(&ErrorKind::BackendUnavailable, err.kind());
    assert!(store.blob("export1/a/file.txt").is_none());
}

#[tokio::test]
async fn test_file_acl_failure_degrades() {
    let mount = create_mount(&[("a/file.txt", 100)], &[]);
    let store = Arc::new(InMemoryBlobStore::hierarchical());
    store.fail_on(StoreCall::SetAccessControl, "export1/a/file.txt");
    let client = client(config(mount.path(), 1024, NamespaceMode::Hierarchical), &store);

    let output = client
        .archive()
        .object_name("a/file.txt")
        .send()
        .await
        .unwrap();

    assert!(output.is_degraded());
    assert_eq!(
        &ErrorKind::BackendUnavailable,
        output.acl_degradation().unwrap().kind()
    );
    assert_eq!(100, output.bytes_transferred());
    let blob = store.blob("export1/a/file.txt").unwrap();
    assert_eq!(&pattern_bytes(100)[..], &blob.data[..]);
}

#[tokio::test]
async fn test_file_acl_lookup_failure_is_fatal() {
    let mount = create_mount(&[("file.txt", 100)], &[]);
    let store = Arc::new(InMemoryBlobStore::hierarchical());
    store.fail_on(StoreCall::GetAccessControl, "export1/file.txt");
    let client = client(config(mount.path(), 1024, NamespaceMode::Hierarchical), &store);

    let err = client
        .archive()
        .object_name("file.txt")
        .send()
        .await
        .unwrap_err();
    assert_eq!(&ErrorKind::BackendUnavailable, err.kind());
    assert!(store.keys().is_empty());
}

#[tokio::test]
async fn test_failed_block_leaves_nothing_committed() {
    let mount = create_mount(&[("big.bin", 8192)], &[]);
    let store = Arc::new(InMemoryBlobStore::new());
    store.fail_all(StoreCall::StageBlock);
    let client = client(config(mount.path(), 1024, NamespaceMode::Flat), &store);

    let err = client
        .archive()
        .object_name("big.bin")
        .send()
        .await
        .unwrap_err();
    assert_eq!(&ErrorKind::BackendUnavailable, err.kind());
    assert!(store.blob("export1/big.bin").is_none());
    assert!(store.calls(StoreCall::CommitBlockList).is_empty());
}

#[tokio::test]
async fn test_missing_source() {
    let mount = create_mount(&[], &[]);
    let store = Arc::new(InMemoryBlobStore::new());
    let client = client(config(mount.path(), 1024, NamespaceMode::Flat), &store);

    let err = client
        .archive()
        .object_name("nope.txt")
        .send()
        .await
        .unwrap_err();
    assert_eq!(&ErrorKind::MetadataUnavailable, err.kind());
    assert!(store.journal().is_empty());
}

#[tokio::test]
async fn test_directory_source_rejected() {
    let mount = create_mount(&[("dir/inner/file", 1)], &[]);
    let store = Arc::new(InMemoryBlobStore::new());
    let client = client(config(mount.path(), 1024, NamespaceMode::Flat), &store);

    let err = client
        .archive()
        .object_name("dir/inner")
        .send()
        .await
        .unwrap_err();
    assert_eq!(&ErrorKind::InputInvalid, err.kind());
    assert!(store.blob("export1/dir/inner").is_none());
}

#[tokio::test]
async fn test_explicit_source_path() {
    let mount = create_mount(&[("a/placeholder-only", 1)], &[]);
    let staging = create_mount(&[("data.bin", 2048)], &[]);
    let store = Arc::new(InMemoryBlobStore::new());
    let client = client(config(mount.path(), 1024, NamespaceMode::Flat), &store);

    let output = client
        .archive()
        .object_name("a/file.bin")
        .source_path(staging.path().join("data.bin"))
        .send()
        .await
        .unwrap();
    assert_eq!(2048, output.bytes_transferred());
    assert_eq!(vec!["export1/a", "export1/a/file.bin"], store.keys());
}

#[tokio::test]
async fn test_escaping_object_name_rejected() {
    let mount = create_mount(&[], &[]);
    let store = Arc::new(InMemoryBlobStore::new());
    let client = client(config(mount.path(), 1024, NamespaceMode::Flat), &store);

    let err = client
        .archive()
        .object_name("../outside.txt")
        .send()
        .await
        .unwrap_err();
    assert_eq!(&ErrorKind::InputInvalid, err.kind());

    let err = client.archive().send().await.unwrap_err();
    assert_eq!(&ErrorKind::InputInvalid, err.kind());
}

#[tokio::test]
async fn test_cancel_mid_upload_commits_nothing() {
    let mount = create_mount(&[("a/big.bin", 8192)], &[]);
    let store = Arc::new(InMemoryBlobStore::new().with_latency(Duration::from_millis(100)));
    let config = config_builder(mount.path(), 1024, NamespaceMode::Flat)
        .parallelism(ConcurrencySetting::Explicit(1))
        .build()
        .unwrap();
    let client = client(config, &store);
    let token = CancellationToken::new();

    let handle = tokio::spawn({
        let client = client.clone();
        let token = token.clone();
        async move {
            client
                .archive()
                .object_name("a/big.bin")
                .cancellation_token(token)
                .send()
                .await
        }
    });

    // placeholder done after ~100ms, then one block per ~100ms
    tokio::time::sleep(Duration::from_millis(250)).await;
    token.cancel();
    let err = handle.await.unwrap().unwrap_err();

    assert_eq!(&ErrorKind::OperationCancelled, err.kind());
    assert_eq!(vec!["export1/a"], store.keys());
    assert!(store.calls(StoreCall::CommitBlockList).is_empty());
    assert!(store.calls(StoreCall::StageBlock).len() < 8);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let mount = create_mount(&[("a/file.txt", 10)], &[]);
    let store = Arc::new(InMemoryBlobStore::new());
    let client = client(config(mount.path(), 1024, NamespaceMode::Flat), &store);
    let token = CancellationToken::new();
    token.cancel();

    let err = client
        .archive()
        .object_name("a/file.txt")
        .cancellation_token(token)
        .send()
        .await
        .unwrap_err();
    assert_eq!(&ErrorKind::OperationCancelled, err.kind());
    assert!(store.journal().is_empty());
}

#[tokio::test]
async fn test_rate_limit_is_shared_across_operations() {
    let mount = create_mount(&[("one.bin", 32 * 1024), ("two.bin", 32 * 1024)], &[]);
    let store = Arc::new(InMemoryBlobStore::new());
    // the bucket starts with one second of burst, so 64 KiB at 32 KiB/s needs ~1s
    let pacer = Pacer::new(Throughput::new_bytes_per_sec(32 * 1024));
    let config = config_builder(mount.path(), 4096, NamespaceMode::Flat)
        .pacer(pacer)
        .build()
        .unwrap();
    let client = client(config, &store);

    let start = Instant::now();
    let (one, two) = tokio::join!(
        client.archive().object_name("one.bin").send(),
        client.archive().object_name("two.bin").send(),
    );
    let elapsed = start.elapsed();

    assert_eq!(32 * 1024, one.unwrap().bytes_transferred());
    assert_eq!(32 * 1024, two.unwrap().bytes_transferred());
    assert!(
        elapsed >= Duration::from_millis(900),
        "expected throttling, finished in {elapsed:?}"
    );
}
